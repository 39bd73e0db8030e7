//! Product image upload to the media host.

use color_eyre::{eyre::eyre, Result};
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::catalog::api_types::{ApiErrorBody, ApiUploadResponse};
use crate::config::MediaConfig;

/// Folder used when no category is given
pub const DEFAULT_FOLDER: &str = "uncategorized";

#[derive(Debug, Error)]
pub enum UploadError {
  /// A required product field was empty
  #[error("Please enter a {0} before uploading")]
  MissingField(&'static str),

  #[error("Failed to read image {path}: {reason}")]
  ReadImage { path: String, reason: String },

  /// Transport failure
  #[error("Upload request failed: {0}")]
  Request(String),

  /// Media host answered with an error status
  #[error("Upload rejected (HTTP {status}): {message}")]
  Rejected { status: u16, message: String },

  /// Success status but an unreadable body
  #[error("Unexpected upload response: {0}")]
  Response(String),
}

/// One product image plus the metadata stored with it
#[derive(Debug, Clone)]
pub struct UploadRequest {
  pub image: PathBuf,
  pub name: Option<String>,
  pub price: String,
  pub description: String,
  /// Also used as the media folder
  pub category: String,
}

impl UploadRequest {
  /// Price and description are mandatory, as on the storefront admin page.
  pub fn validate(&self) -> Result<(), UploadError> {
    if self.price.trim().is_empty() {
      return Err(UploadError::MissingField("price"));
    }
    if self.description.trim().is_empty() {
      return Err(UploadError::MissingField("description"));
    }
    Ok(())
  }

  /// Explicit name, else the image file stem.
  pub fn display_name(&self) -> String {
    self
      .name
      .as_deref()
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .map(String::from)
      .unwrap_or_else(|| file_stem(&self.image))
  }

  pub fn folder(&self) -> &str {
    let category = self.category.trim();
    if category.is_empty() {
      DEFAULT_FOLDER
    } else {
      category
    }
  }

  /// Contextual metadata in the media host's `key=value|key=value` form.
  pub fn context(&self) -> String {
    [
      ("name", self.display_name()),
      ("price", self.price.trim().to_string()),
      ("description", self.description.trim().to_string()),
      ("category", self.folder().to_string()),
    ]
    .iter()
    .map(|(key, value)| format!("{}={}", key, escape_context(value)))
    .collect::<Vec<_>>()
    .join("|")
  }
}

fn file_stem(path: &Path) -> String {
  path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// `|` and `=` separate context entries, so they are backslash-escaped.
fn escape_context(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for c in value.chars() {
    if c == '|' || c == '=' {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped
}

/// Unsigned-preset upload client for the media host
#[derive(Clone)]
pub struct MediaClient {
  http: reqwest::Client,
  endpoint: Url,
  upload_preset: String,
}

impl MediaClient {
  pub fn new(config: &MediaConfig) -> Result<Self> {
    let endpoint = upload_endpoint(&config.api_base, &config.cloud_name)?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("vitrine/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      endpoint,
      upload_preset: config.upload_preset.clone(),
    })
  }

  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }

  #[instrument(skip(self, request), fields(image = %request.image.display()))]
  pub async fn upload(&self, request: &UploadRequest) -> Result<ApiUploadResponse, UploadError> {
    request.validate()?;

    let bytes = tokio::fs::read(&request.image)
      .await
      .map_err(|e| UploadError::ReadImage {
        path: request.image.display().to_string(),
        reason: e.to_string(),
      })?;

    let file_name = request
      .image
      .file_name()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "upload".to_string());

    let form = Form::new()
      .text("upload_preset", self.upload_preset.clone())
      .text("folder", request.folder().to_string())
      .text("context", request.context())
      .part("file", Part::bytes(bytes).file_name(file_name));

    debug!(endpoint = %self.endpoint, "Uploading product image");

    let response = self
      .http
      .post(self.endpoint.clone())
      .multipart(form)
      .send()
      .await
      .map_err(|e| UploadError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| UploadError::Request(e.to_string()))?;

    if !status.is_success() {
      let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);
      error!(status = status.as_u16(), %message, "Upload rejected");
      return Err(UploadError::Rejected {
        status: status.as_u16(),
        message,
      });
    }

    serde_json::from_str(&body).map_err(|e| UploadError::Response(e.to_string()))
  }
}

/// `<api_base>/v1_1/<cloud_name>/image/upload`
pub fn upload_endpoint(api_base: &str, cloud_name: &str) -> Result<Url> {
  let base = format!("{}/", api_base.trim_end_matches('/'));
  Url::parse(&base)
    .and_then(|b| b.join(&format!("v1_1/{}/image/upload", cloud_name)))
    .map_err(|e| eyre!("Invalid media API base {}: {}", api_base, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  fn request() -> UploadRequest {
    UploadRequest {
      image: PathBuf::from("/tmp/photos/wireless-mouse.jpg"),
      name: None,
      price: "10.00".to_string(),
      description: "Quiet clicks".to_string(),
      category: "accessories".to_string(),
    }
  }

  #[test]
  fn test_validate_requires_price_and_description() {
    assert!(request().validate().is_ok());

    let no_price = UploadRequest {
      price: "  ".to_string(),
      ..request()
    };
    assert!(matches!(
      no_price.validate(),
      Err(UploadError::MissingField("price"))
    ));

    let no_description = UploadRequest {
      description: String::new(),
      ..request()
    };
    assert_eq!(
      no_description.validate().unwrap_err().to_string(),
      "Please enter a description before uploading"
    );
  }

  #[test]
  fn test_context_defaults_and_escaping() {
    assert_eq!(
      request().context(),
      "name=wireless-mouse|price=10.00|description=Quiet clicks|category=accessories"
    );

    let custom = UploadRequest {
      name: Some("Mouse | Pro".to_string()),
      description: "a=b".to_string(),
      category: String::new(),
      ..request()
    };
    assert_eq!(custom.folder(), DEFAULT_FOLDER);
    assert_eq!(
      custom.context(),
      "name=Mouse \\| Pro|price=10.00|description=a\\=b|category=uncategorized"
    );
  }

  #[test]
  fn test_upload_endpoint() {
    assert_eq!(
      upload_endpoint("https://api.cloudinary.com/", "demo")
        .unwrap()
        .as_str(),
      "https://api.cloudinary.com/v1_1/demo/image/upload"
    );
    assert!(upload_endpoint("not a url", "demo").is_err());
  }

  async fn serve_once(status: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
      "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
      status,
      body.len(),
      body
    );

    let handle = tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut received = Vec::new();
      let mut buf = [0u8; 8192];
      // Read until the closing multipart boundary arrives
      loop {
        let n = socket.read(&mut buf).await.unwrap();
        received.extend_from_slice(&buf[..n]);
        if n == 0 || has_closing_boundary(&String::from_utf8_lossy(&received)) {
          break;
        }
      }
      socket.write_all(response.as_bytes()).await.unwrap();
      let _ = socket.shutdown().await;
      String::from_utf8_lossy(&received).into_owned()
    });

    (format!("http://{}", addr), handle)
  }

  fn has_closing_boundary(request: &str) -> bool {
    let boundary = request
      .split("boundary=")
      .nth(1)
      .and_then(|rest| rest.split("\r\n").next());
    match boundary {
      Some(b) => request.contains(&format!("--{}--", b)),
      None => false,
    }
  }

  fn write_image() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vitrine-upload-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("mouse.jpg");
    std::fs::write(&path, b"not really a jpeg").unwrap();
    path
  }

  #[tokio::test]
  async fn test_upload_sends_preset_folder_and_context() {
    let (base, server) = serve_once(
      "200 OK",
      r#"{"public_id":"accessories/mouse","secure_url":"https://cdn.example.com/mouse.jpg"}"#,
    )
    .await;
    let client = MediaClient::new(&MediaConfig {
      api_base: base,
      cloud_name: "demo".to_string(),
      upload_preset: "shop".to_string(),
    })
    .unwrap();

    let upload = UploadRequest {
      image: write_image(),
      ..request()
    };
    let response = client.upload(&upload).await.unwrap();
    assert_eq!(response.public_id, "accessories/mouse");

    let sent = server.await.unwrap();
    assert!(sent.starts_with("POST /v1_1/demo/image/upload"));
    assert!(sent.contains("name=\"upload_preset\"\r\n\r\nshop"));
    assert!(sent.contains("name=\"folder\"\r\n\r\naccessories"));
    assert!(sent.contains("name=mouse|price=10.00"));
    assert!(sent.contains("not really a jpeg"));
  }

  #[tokio::test]
  async fn test_upload_rejection_uses_error_message() {
    let (base, _server) = serve_once("400 Bad Request", r#"{"error":{"message":"Upload preset not found"}}"#).await;
    let client = MediaClient::new(&MediaConfig {
      api_base: base,
      cloud_name: "demo".to_string(),
      upload_preset: "missing".to_string(),
    })
    .unwrap();

    let upload = UploadRequest {
      image: write_image(),
      ..request()
    };
    match client.upload(&upload).await {
      Err(UploadError::Rejected { status, message }) => {
        assert_eq!(status, 400);
        assert_eq!(message, "Upload preset not found");
      }
      other => panic!("expected rejection, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_upload_validates_before_reading() {
    let client = MediaClient::new(&MediaConfig {
      api_base: "http://127.0.0.1:9".to_string(),
      cloud_name: "demo".to_string(),
      upload_preset: "shop".to_string(),
    })
    .unwrap();
    let upload = UploadRequest {
      price: String::new(),
      image: PathBuf::from("/does/not/exist.jpg"),
      ..request()
    };
    assert!(matches!(
      client.upload(&upload).await,
      Err(UploadError::MissingField("price"))
    ));
  }
}

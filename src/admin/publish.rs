//! Workflow dispatch that rebuilds and republishes the product feed.

use color_eyre::{eyre::eyre, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument};
use url::Url;

use crate::config::{Config, WorkflowConfig};

#[derive(Debug, Error)]
pub enum PublishError {
  #[error("Countdown cancelled")]
  Cancelled,

  #[error("Workflow request failed: {0}")]
  Request(String),

  #[error("Failed: HTTP {status}")]
  Rejected { status: u16, body: String },
}

/// Where the dispatch request goes
#[derive(Debug)]
pub enum DispatchTarget {
  /// Straight to the workflow API with a bearer token
  Direct { url: Url, token: SecretString },
  /// A server-side proxy that holds the credential
  Proxy { url: Url },
}

#[derive(Serialize)]
struct DispatchBody<'a> {
  #[serde(rename = "ref")]
  git_ref: &'a str,
}

#[derive(Debug)]
pub struct WorkflowTrigger {
  http: reqwest::Client,
  target: DispatchTarget,
  branch: String,
  delay_secs: u32,
}

impl WorkflowTrigger {
  /// Build a trigger from config. Without a proxy the token is read from
  /// the environment.
  pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
    let target = match config.proxy_url.as_deref() {
      Some(proxy) => DispatchTarget::Proxy {
        url: Url::parse(proxy).map_err(|e| eyre!("Invalid workflow proxy URL {}: {}", proxy, e))?,
      },
      None => DispatchTarget::Direct {
        url: dispatch_url(config)?,
        token: Config::get_workflow_token()?,
      },
    };

    Self::new(target, &config.branch, config.delay_secs)
  }

  pub fn new(target: DispatchTarget, branch: &str, delay_secs: u32) -> Result<Self> {
    let http = reqwest::Client::builder()
      .user_agent(concat!("vitrine/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      target,
      branch: branch.to_string(),
      delay_secs,
    })
  }

  pub fn delay_secs(&self) -> u32 {
    self.delay_secs
  }

  /// Count down, then dispatch. `cancel` resolving aborts the countdown.
  pub async fn publish<C, T>(&self, cancel: C, on_tick: T) -> Result<(), PublishError>
  where
    C: Future<Output = ()>,
    T: FnMut(u32),
  {
    run_countdown(self.delay_secs, cancel, on_tick).await?;
    self.dispatch().await
  }

  #[instrument(skip(self), fields(branch = %self.branch))]
  pub async fn dispatch(&self) -> Result<(), PublishError> {
    let body = DispatchBody {
      git_ref: &self.branch,
    };

    let (request, via_proxy) = match &self.target {
      DispatchTarget::Direct { url, token } => (
        self
          .http
          .post(url.clone())
          .bearer_auth(token.expose_secret())
          .header("Accept", "application/vnd.github.v3+json"),
        false,
      ),
      DispatchTarget::Proxy { url } => (self.http.post(url.clone()), true),
    };

    let response = request
      .json(&body)
      .send()
      .await
      .map_err(|e| PublishError::Request(e.to_string()))?;

    let status = response.status();
    let accepted = if via_proxy {
      status.is_success()
    } else {
      status == reqwest::StatusCode::NO_CONTENT
    };

    if accepted {
      info!(status = status.as_u16(), "Workflow dispatched");
      return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    error!(status = status.as_u16(), %body, "Workflow dispatch rejected");
    Err(PublishError::Rejected {
      status: status.as_u16(),
      body,
    })
  }
}

/// `<api_base>/repos/<owner>/<repo>/actions/workflows/<workflow>/dispatches`
pub fn dispatch_url(config: &WorkflowConfig) -> Result<Url> {
  for (field, value) in [
    ("owner", &config.owner),
    ("repo", &config.repo),
    ("workflow", &config.workflow),
  ] {
    if value.trim().is_empty() {
      return Err(eyre!("workflow.{} is not configured", field));
    }
  }

  let url = format!(
    "{}/repos/{}/{}/actions/workflows/{}/dispatches",
    config.api_base.trim_end_matches('/'),
    config.owner,
    config.repo,
    config.workflow
  );
  Url::parse(&url).map_err(|e| eyre!("Invalid workflow URL {}: {}", url, e))
}

/// Tick once per second from `seconds` down to zero.
///
/// `on_tick` sees the remaining seconds, starting with `seconds` itself.
/// Returns `Cancelled` as soon as `cancel` resolves.
pub async fn run_countdown<C, T>(seconds: u32, cancel: C, mut on_tick: T) -> Result<(), PublishError>
where
  C: Future<Output = ()>,
  T: FnMut(u32),
{
  tokio::pin!(cancel);

  let mut remaining = seconds;
  on_tick(remaining);

  let mut interval = tokio::time::interval(Duration::from_secs(1));
  // First tick completes immediately
  interval.tick().await;

  while remaining > 0 {
    tokio::select! {
      _ = &mut cancel => return Err(PublishError::Cancelled),
      _ = interval.tick() => {
        remaining -= 1;
        on_tick(remaining);
      }
    }
  }

  Ok(())
}

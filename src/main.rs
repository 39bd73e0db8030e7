mod admin;
mod app;
mod cache;
mod catalog;
mod commands;
mod config;
mod controller;
mod event;
mod logging;
mod refresh;
mod store;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use tracing::info;

use crate::admin::publish::{PublishError, WorkflowTrigger};
use crate::admin::upload::{MediaClient, UploadRequest, DEFAULT_FOLDER};
use crate::cache::{CacheStorage, CacheStore, NoopStorage, SqliteStorage, PRODUCTS_CACHE_KEY};
use crate::catalog::client::FeedClient;
use crate::catalog::export::{render_gallery, ExportRequest};
use crate::catalog::types::Product;
use crate::catalog::view::{SortKey, ViewState};
use crate::config::Config;
use crate::controller::{fetcher_fn, load_snapshot, FetcherFn};
use crate::event::EventHandler;

/// Countdown seconds that get a warning before the workflow fires
const PUBLISH_WARN_SECS: u32 = 5;

#[derive(Parser, Debug)]
#[command(name = "vitrine")]
#[command(about = "A terminal storefront for JSON product feeds")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/vitrine/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Skip the cache and fetch the feed on startup
  #[arg(short, long, global = true)]
  refresh: bool,

  /// Debug-level logging (overridden by VITRINE_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Write the gallery as a static HTML page
  Export {
    /// Output file
    #[arg(short, long, default_value = "gallery.html")]
    out: PathBuf,
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, default_value = "")]
    category: String,
    /// featured, name-asc, name-desc, price-asc, price-desc, date-newest, date-oldest
    #[arg(long)]
    sort: Option<String>,
  },
  /// Upload a product image with its metadata, then publish
  Upload {
    #[arg(long)]
    image: PathBuf,
    /// Defaults to the file name without extension
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    price: String,
    #[arg(long)]
    description: String,
    #[arg(long, default_value = DEFAULT_FOLDER)]
    category: String,
    /// Upload only; do not trigger the site rebuild
    #[arg(long)]
    no_publish: bool,
  },
  /// Trigger the workflow that regenerates the product feed
  Publish,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.verbose)?;

  let config = Config::load(args.config.as_deref())?;
  info!(feed = %config.feed.url, "Starting vitrine");

  match args.command {
    None => run_tui(config, args.refresh).await,
    Some(Command::Export {
      out,
      search,
      category,
      sort,
    }) => {
      let sort = sort.map(|s| SortKey::parse(&s)).unwrap_or(config.default_sort());
      let view = ViewState {
        search,
        category,
        sort,
      };
      export(&config, view, &out, args.refresh).await
    }
    Some(Command::Upload {
      image,
      name,
      price,
      description,
      category,
      no_publish,
    }) => {
      let request = UploadRequest {
        image,
        name,
        price,
        description,
        category,
      };
      upload(&config, &request, !no_publish).await
    }
    Some(Command::Publish) => publish(&config).await,
  }
}

fn open_cache(config: &Config) -> Result<CacheStore<Product>> {
  let storage: Arc<dyn CacheStorage> = if config.cache.enabled {
    Arc::new(SqliteStorage::open()?)
  } else {
    Arc::new(NoopStorage)
  };
  let ttl = chrono::Duration::seconds(i64::try_from(config.cache.ttl_secs).unwrap_or(i64::MAX));
  Ok(CacheStore::new(storage, PRODUCTS_CACHE_KEY, ttl))
}

fn feed_fetcher(config: &Config) -> Result<FetcherFn> {
  let client = FeedClient::new(&config.feed)?;
  Ok(fetcher_fn(move |bust| {
    let client = client.clone();
    async move { client.fetch(bust).await }
  }))
}

async fn run_tui(config: Config, force_refresh: bool) -> Result<()> {
  let cache = open_cache(&config)?;
  let fetcher = feed_fetcher(&config)?;

  let events = EventHandler::new(app::TICK_RATE);
  let mut app = app::App::new(config, fetcher, cache, events.sender());
  app.run(events, force_refresh).await
}

async fn export(config: &Config, view: ViewState, out: &Path, force_refresh: bool) -> Result<()> {
  let cache = open_cache(config)?;
  let fetcher = feed_fetcher(config)?;

  let snapshot = load_snapshot(&cache, &fetcher, force_refresh)
    .await
    .map_err(|e| eyre!("Failed to load products: {}", e))?;

  let title = config.display_title();
  let html = render_gallery(
    &ExportRequest {
      title: &title,
      products: &snapshot.products,
      view: &view,
      loaded_at: snapshot.loaded_at,
      contact: config.contact.as_ref(),
    },
    Utc::now(),
  )
  .wrap_err("Failed to render gallery")?;

  std::fs::write(out, html).wrap_err_with(|| format!("Failed to write {}", out.display()))?;
  println!(
    "Exported {} products ({:?}) to {}",
    snapshot.products.len(),
    snapshot.source,
    out.display()
  );
  Ok(())
}

async fn upload(config: &Config, request: &UploadRequest, then_publish: bool) -> Result<()> {
  let media = config
    .media
    .as_ref()
    .ok_or_else(|| eyre!("No media section in config; cannot upload"))?;
  request.validate()?;

  let client = MediaClient::new(media)?;
  println!("Uploading {} to {}...", request.image.display(), client.endpoint());

  let uploaded = client.upload(request).await?;
  println!("Uploaded {} successfully!", request.display_name());
  println!("  id:  {}", uploaded.public_id);
  println!("  url: {}", uploaded.secure_url);

  if then_publish {
    publish(config).await?;
  } else {
    println!("Skipping publish. Run `vitrine publish` to update the site.");
  }
  Ok(())
}

async fn publish(config: &Config) -> Result<()> {
  let workflow = config
    .workflow
    .as_ref()
    .ok_or_else(|| eyre!("No workflow section in config; cannot publish"))?;
  let trigger = WorkflowTrigger::from_config(workflow)?;

  println!("Publishing in {}s. Press Ctrl-C to cancel.", trigger.delay_secs());
  let cancel = async {
    let _ = tokio::signal::ctrl_c().await;
  };
  let on_tick = |remaining: u32| {
    if remaining == 0 {
      println!("Triggering site rebuild...");
    } else if remaining <= PUBLISH_WARN_SECS {
      println!("  {}s left (Ctrl-C to cancel)", remaining);
    } else {
      println!("  {}s", remaining);
    }
  };

  match trigger.publish(cancel, on_tick).await {
    Ok(()) => {
      println!("Site rebuild triggered. Changes appear once the workflow finishes.");
      Ok(())
    }
    Err(PublishError::Cancelled) => {
      println!("Publish cancelled.");
      Ok(())
    }
    Err(e) => Err(e.into()),
  }
}

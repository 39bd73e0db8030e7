//! File logging. The terminal belongs to the UI, so everything goes to
//! `vitrine.log` in the data directory.

use color_eyre::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::data_dir;

/// Filter variable, e.g. `VITRINE_LOG=vitrine=debug`
pub const LOG_ENV: &str = "VITRINE_LOG";

pub const LOG_FILE: &str = "vitrine.log";

/// Install the global subscriber. Keep the guard alive for the whole run or
/// buffered lines are lost on exit.
pub fn init(verbose: bool) -> Result<WorkerGuard> {
  let dir = data_dir()?;
  std::fs::create_dir_all(&dir)?;

  let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
    .try_init()?;

  Ok(guard)
}

//! Catalog refresh loop: cache-first loading, bounded retries and silent
//! background refresh.
//!
//! All state is owned by `CatalogController` and only mutated from the
//! event loop. Network fetches and timers run as tokio tasks and report
//! back as `Event::Catalog` messages, which the loop hands to `handle`.
//!
//! ```ignore
//! let mut controller = CatalogController::new(fetcher, cache, &config.refresh, view, events.sender());
//! controller.start(false);
//!
//! while let Some(event) = events.next().await {
//!     if let Event::Catalog(event) = event {
//!         controller.handle(event);
//!     }
//! }
//! ```

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheSource, CacheStore};
use crate::catalog::client::FetchError;
use crate::catalog::types::Product;
use crate::catalog::view::{SortKey, ViewState};
use crate::config::RefreshConfig;
use crate::event::Event;
use crate::refresh::{LoadState, RetryDecision, RetryPolicy, RetrySession, Timer};
use crate::store::CatalogStore;

/// Shown when a silent refresh brought in different data
pub const BACKGROUND_UPDATE_NOTICE: &str = "Products updated in background";

/// A boxed future resolving to a fetched product list
pub type FetchFuture = BoxFuture<'static, Result<Vec<Product>, FetchError>>;

/// Creates a fetch future; the flag asks for cache busting
pub type FetcherFn = Arc<dyn Fn(bool) -> FetchFuture + Send + Sync>;

/// Wrap an async closure as a `FetcherFn`.
///
/// ```ignore
/// let client = FeedClient::new(&config.feed)?;
/// let fetcher = fetcher_fn(move |bust| {
///     let client = client.clone();
///     async move { client.fetch(bust).await }
/// });
/// ```
pub fn fetcher_fn<F, Fut>(fetch: F) -> FetcherFn
where
  F: Fn(bool) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Vec<Product>, FetchError>> + Send + 'static,
{
  Arc::new(move |bust| fetch(bust).boxed())
}

/// Messages posted back to the controller by its tasks
#[derive(Debug)]
pub enum CatalogEvent {
  /// A foreground fetch finished
  Fetched {
    ticket: u64,
    forced: bool,
    result: Result<Vec<Product>, FetchError>,
  },
  /// A silent refresh finished
  BackgroundFetched(Result<Vec<Product>, FetchError>),
  /// Retry delay elapsed
  RetryDue,
  /// Time for a silent refresh
  BackgroundDue,
  /// Notification display time elapsed
  NotificationExpired,
}

#[derive(Debug, Clone, Copy)]
struct Timings {
  background_delay: Duration,
  interval: Duration,
  notification: Duration,
}

impl From<&RefreshConfig> for Timings {
  fn from(config: &RefreshConfig) -> Self {
    Self {
      background_delay: Duration::from_secs(config.background_delay_secs),
      interval: Duration::from_secs(config.interval_secs),
      notification: Duration::from_secs(config.notification_secs),
    }
  }
}

pub struct CatalogController {
  store: CatalogStore,
  cache: CacheStore<Product>,
  fetcher: FetcherFn,
  retry: RetrySession,
  state: LoadState,
  timings: Timings,
  events: mpsc::UnboundedSender<Event>,
  /// Identifies the foreground fetch whose result is still wanted
  ticket: u64,
  background_in_flight: bool,
  /// Bumped whenever the authoritative product set changes
  revision: u64,
  notification: Option<String>,
  retry_timer: Timer,
  background_timer: Timer,
  periodic_timer: Timer,
  notification_timer: Timer,
}

impl CatalogController {
  pub fn new(
    fetcher: FetcherFn,
    cache: CacheStore<Product>,
    config: &RefreshConfig,
    view: ViewState,
    events: mpsc::UnboundedSender<Event>,
  ) -> Self {
    Self {
      store: CatalogStore::new(view),
      cache,
      fetcher,
      retry: RetrySession::new(RetryPolicy::from(config)),
      state: LoadState::Idle,
      timings: Timings::from(config),
      events,
      ticket: 0,
      background_in_flight: false,
      revision: 0,
      notification: None,
      retry_timer: Timer::new(),
      background_timer: Timer::new(),
      periodic_timer: Timer::new(),
      notification_timer: Timer::new(),
    }
  }

  pub fn store(&self) -> &CatalogStore {
    &self.store
  }

  pub fn state(&self) -> &LoadState {
    &self.state
  }

  pub fn revision(&self) -> u64 {
    self.revision
  }

  pub fn notification(&self) -> Option<&str> {
    self.notification.as_deref()
  }

  pub fn retry_attempts_used(&self) -> u32 {
    self.retry.attempts_used()
  }

  pub fn max_attempts(&self) -> u32 {
    self.retry.policy().max_attempts
  }

  /// Start the periodic silent refresh and run the initial load.
  pub fn start(&mut self, forced: bool) {
    let events = self.events.clone();
    self
      .periodic_timer
      .schedule_every(self.timings.interval, move || {
        let _ = events.send(Event::Catalog(CatalogEvent::BackgroundDue));
      });

    self.load(forced);
  }

  /// Foreground load.
  ///
  /// A normal load serves a fresh cache entry immediately and schedules a
  /// silent refresh; otherwise it fetches. A forced load skips the cache,
  /// busts intermediate caches and starts from a reset retry counter.
  pub fn load(&mut self, forced: bool) {
    self.retry_timer.cancel();

    if forced {
      self.retry.reset();
    } else if let Some(entry) = self.cache.load() {
      info!(count = entry.payload.len(), "Serving catalog from cache");
      let loaded_at = entry.loaded_at();
      self
        .store
        .replace(entry.payload, loaded_at, CacheSource::Cache);
      self.retry.reset();
      self.state = LoadState::Ready;
      self.revision += 1;
      self.schedule_background_refresh();
      return;
    }

    self.ticket += 1;
    self.state = LoadState::Loading { forced };

    let ticket = self.ticket;
    let fetch = (self.fetcher)(forced);
    let events = self.events.clone();
    tokio::spawn(async move {
      let result = fetch.await;
      let _ = events.send(Event::Catalog(CatalogEvent::Fetched {
        ticket,
        forced,
        result,
      }));
    });
  }

  pub fn handle(&mut self, event: CatalogEvent) {
    match event {
      CatalogEvent::Fetched {
        ticket,
        forced,
        result,
      } => {
        if ticket != self.ticket {
          debug!(ticket, current = self.ticket, "Dropping superseded fetch result");
          return;
        }
        match result {
          Ok(products) => self.apply_fetched(products),
          Err(e) => self.on_fetch_failed(forced, e),
        }
      }
      CatalogEvent::BackgroundFetched(result) => {
        self.background_in_flight = false;
        match result {
          Ok(products) => self.apply_background(products),
          Err(e) => debug!(error = %e, "Background refresh failed"),
        }
      }
      CatalogEvent::RetryDue => {
        if matches!(self.state, LoadState::WaitingRetry { .. }) {
          self.load(false);
        }
      }
      CatalogEvent::BackgroundDue => self.refresh_in_background(),
      CatalogEvent::NotificationExpired => self.notification = None,
    }
  }

  pub fn set_search(&mut self, search: impl Into<String>) {
    self.store.set_search(search);
  }

  pub fn set_category(&mut self, category: impl Into<String>) {
    self.store.set_category(category);
  }

  pub fn set_sort(&mut self, sort: SortKey) {
    self.store.set_sort(sort);
  }

  pub fn clear_filters(&mut self) {
    self.store.clear_filters();
  }

  fn apply_fetched(&mut self, products: Vec<Product>) {
    info!(count = products.len(), "Loaded catalog from network");
    self.cache.save(&products);
    self
      .store
      .replace(products, Some(Utc::now()), CacheSource::Network);
    self.retry.reset();
    self.state = LoadState::Ready;
    self.revision += 1;
  }

  fn on_fetch_failed(&mut self, forced: bool, e: FetchError) {
    warn!(error = %e, forced, attempts = self.retry.attempts_used(), "Catalog load failed");

    match self.retry.on_failure(forced) {
      RetryDecision::Retry { attempt, delay } => {
        self.state = LoadState::WaitingRetry {
          attempt,
          max_attempts: self.retry.policy().max_attempts,
          retry_at: Instant::now() + delay,
          error: e.to_string(),
        };
        let events = self.events.clone();
        self.retry_timer.schedule(delay, move || {
          let _ = events.send(Event::Catalog(CatalogEvent::RetryDue));
        });
      }
      RetryDecision::Terminal => {
        error!(error = %e, "Giving up on catalog load");
        self.state = LoadState::Failed {
          error: e.to_string(),
        };
      }
    }
  }

  fn schedule_background_refresh(&mut self) {
    let events = self.events.clone();
    self
      .background_timer
      .schedule(self.timings.background_delay, move || {
        let _ = events.send(Event::Catalog(CatalogEvent::BackgroundDue));
      });
  }

  fn refresh_in_background(&mut self) {
    if self.background_in_flight {
      return;
    }
    self.background_in_flight = true;

    let fetch = (self.fetcher)(true);
    let events = self.events.clone();
    tokio::spawn(async move {
      let result = fetch.await;
      let _ = events.send(Event::Catalog(CatalogEvent::BackgroundFetched(result)));
    });
  }

  fn apply_background(&mut self, products: Vec<Product>) {
    self.retry.reset();

    if !self.store.differs_from(&products) {
      debug!(count = products.len(), "Background refresh found no changes");
      return;
    }

    info!(
      before = self.store.products().len(),
      after = products.len(),
      "Background refresh changed the catalog"
    );
    self.cache.save(&products);
    self
      .store
      .replace(products, Some(Utc::now()), CacheSource::Network);
    self.revision += 1;

    if !self.state.is_loading() {
      self.retry_timer.cancel();
      self.state = LoadState::Ready;
    }

    self.notify(BACKGROUND_UPDATE_NOTICE);
  }

  fn notify(&mut self, message: &str) {
    self.notification = Some(message.to_string());
    let events = self.events.clone();
    self
      .notification_timer
      .schedule(self.timings.notification, move || {
        let _ = events.send(Event::Catalog(CatalogEvent::NotificationExpired));
      });
  }
}

/// A catalog loaded once, without retries or background refresh
#[derive(Debug)]
pub struct CatalogSnapshot {
  pub products: Vec<Product>,
  pub loaded_at: Option<DateTime<Utc>>,
  pub source: CacheSource,
}

/// Cache-then-fetch load for one-shot commands.
pub async fn load_snapshot(
  cache: &CacheStore<Product>,
  fetcher: &FetcherFn,
  forced: bool,
) -> Result<CatalogSnapshot, FetchError> {
  if !forced {
    if let Some(entry) = cache.load() {
      let loaded_at = entry.loaded_at();
      return Ok(CatalogSnapshot {
        products: entry.payload,
        loaded_at,
        source: CacheSource::Cache,
      });
    }
  }

  let products = fetcher(forced).await?;
  cache.save(&products);
  Ok(CatalogSnapshot {
    products,
    loaded_at: Some(Utc::now()),
    source: CacheSource::Network,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{SqliteStorage, PRODUCTS_CACHE_KEY};
  use crate::catalog::types::fixtures::product;
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Mutex;

  /// Fetcher that replays canned results in order
  #[derive(Default)]
  struct Script {
    responses: Mutex<VecDeque<Result<Vec<Product>, FetchError>>>,
    calls: AtomicU32,
    busts: Mutex<Vec<bool>>,
  }

  impl Script {
    fn push(&self, response: Result<Vec<Product>, FetchError>) {
      self.responses.lock().unwrap().push_back(response);
    }

    fn next(&self, bust: bool) -> Result<Vec<Product>, FetchError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.busts.lock().unwrap().push(bust);
      self
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(FetchError::Network("script exhausted".to_string())))
    }

    fn calls(&self) -> u32 {
      self.calls.load(Ordering::SeqCst)
    }
  }

  struct Harness {
    controller: CatalogController,
    rx: mpsc::UnboundedReceiver<Event>,
    script: Arc<Script>,
    cache: CacheStore<Product>,
  }

  impl Harness {
    fn new(responses: Vec<Result<Vec<Product>, FetchError>>) -> Self {
      let script = Arc::new(Script::default());
      for response in responses {
        script.push(response);
      }

      let replay = script.clone();
      let fetcher = fetcher_fn(move |bust| {
        let replay = replay.clone();
        async move { replay.next(bust) }
      });

      let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
      let cache = CacheStore::new(storage, PRODUCTS_CACHE_KEY, chrono::Duration::hours(1));
      let (tx, rx) = mpsc::unbounded_channel();
      let controller = CatalogController::new(
        fetcher,
        cache.clone(),
        &RefreshConfig::default(),
        ViewState::default(),
        tx,
      );

      Self {
        controller,
        rx,
        script,
        cache,
      }
    }

    /// Wait for the next catalog event and hand it to the controller.
    async fn step(&mut self) -> &'static str {
      let event = match self.rx.recv().await {
        Some(Event::Catalog(event)) => event,
        other => panic!("unexpected event: {:?}", other),
      };
      let name = match &event {
        CatalogEvent::Fetched { .. } => "fetched",
        CatalogEvent::BackgroundFetched(_) => "background-fetched",
        CatalogEvent::RetryDue => "retry-due",
        CatalogEvent::BackgroundDue => "background-due",
        CatalogEvent::NotificationExpired => "notification-expired",
      };
      self.controller.handle(event);
      name
    }
  }

  fn server_error() -> FetchError {
    FetchError::Http {
      status: 500,
      reason: "Internal Server Error".to_string(),
    }
  }

  fn catalog() -> Vec<Product> {
    vec![
      product("a", "Mouse", Some("10.00"), Some("accessories")),
      product("b", "Laptop", Some("1200"), Some("laptops")),
    ]
  }

  #[tokio::test(start_paused = true)]
  async fn test_network_load_fills_store_and_cache() {
    let mut h = Harness::new(vec![Ok(catalog())]);

    h.controller.load(false);
    assert_eq!(h.controller.state(), &LoadState::Loading { forced: false });

    assert_eq!(h.step().await, "fetched");
    assert_eq!(h.controller.state(), &LoadState::Ready);
    assert_eq!(h.controller.store().products(), catalog().as_slice());
    assert_eq!(h.controller.store().source(), Some(CacheSource::Network));
    assert_eq!(h.controller.revision(), 1);
    assert_eq!(h.cache.load().unwrap().payload, catalog());
    assert_eq!(*h.script.busts.lock().unwrap(), vec![false]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_four_failures_give_three_retries_then_terminal() {
    let mut h = Harness::new((0..4).map(|_| Err(server_error())).collect());

    h.controller.load(false);
    for attempt in 1..=3 {
      assert_eq!(h.step().await, "fetched");
      match h.controller.state() {
        LoadState::WaitingRetry {
          attempt: a,
          max_attempts,
          error,
          ..
        } => {
          assert_eq!(*a, attempt);
          assert_eq!(*max_attempts, 3);
          assert_eq!(error, "HTTP 500: Internal Server Error");
        }
        other => panic!("expected WaitingRetry, got {:?}", other),
      }

      let before = Instant::now();
      assert_eq!(h.step().await, "retry-due");
      assert_eq!(before.elapsed(), Duration::from_secs(5));
      assert!(h.controller.state().is_loading());
    }

    assert_eq!(h.step().await, "fetched");
    assert_eq!(
      h.controller.state(),
      &LoadState::Failed {
        error: "HTTP 500: Internal Server Error".to_string()
      }
    );
    assert_eq!(h.script.calls(), 4);

    // No more automatic attempts
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(h.rx.try_recv().is_err());
    assert_eq!(h.script.calls(), 4);

    // A manual retry starts from a fresh counter
    h.script.push(Ok(catalog()));
    h.controller.load(true);
    assert_eq!(h.controller.retry_attempts_used(), 0);
    assert_eq!(h.step().await, "fetched");
    assert_eq!(h.controller.state(), &LoadState::Ready);
    assert_eq!(h.script.busts.lock().unwrap().last(), Some(&true));
  }

  #[tokio::test(start_paused = true)]
  async fn test_forced_failure_is_terminal_and_resets_counter() {
    let mut h = Harness::new(vec![Err(server_error()), Err(server_error())]);

    h.controller.load(false);
    h.step().await;
    assert_eq!(h.controller.retry_attempts_used(), 1);

    // Forced refresh while a retry is pending cancels it
    h.controller.load(true);
    assert_eq!(h.controller.retry_attempts_used(), 0);
    assert_eq!(h.step().await, "fetched");
    assert!(matches!(h.controller.state(), LoadState::Failed { .. }));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(h.rx.try_recv().is_err());
    assert_eq!(h.script.calls(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_retry_recovers() {
    let mut h = Harness::new(vec![
      Err(FetchError::Timeout(Duration::from_secs(30))),
      Ok(catalog()),
    ]);

    h.controller.load(false);
    h.step().await;
    assert_eq!(
      h.controller.state().error(),
      Some("Request timed out after 30000ms")
    );
    h.step().await;
    h.step().await;

    assert_eq!(h.controller.state(), &LoadState::Ready);
    assert_eq!(h.controller.retry_attempts_used(), 0);
    assert_eq!(h.controller.store().products().len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_result_is_dropped() {
    let mut h = Harness::new(vec![Ok(catalog()), Ok(catalog())]);

    // Second load supersedes the first before its result is handled
    h.controller.load(true);
    h.controller.load(true);

    h.step().await;
    h.step().await;
    assert_eq!(h.controller.state(), &LoadState::Ready);
    assert_eq!(h.controller.revision(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_cache_hit_with_identical_background_data() {
    let mut h = Harness::new(vec![Ok(catalog())]);
    h.cache.save(&catalog());

    h.controller.load(false);
    // Served synchronously, no loading state
    assert_eq!(h.controller.state(), &LoadState::Ready);
    assert_eq!(h.controller.store().source(), Some(CacheSource::Cache));
    assert_eq!(h.controller.revision(), 1);
    assert_eq!(h.script.calls(), 0);

    let before = Instant::now();
    assert_eq!(h.step().await, "background-due");
    assert_eq!(before.elapsed(), Duration::from_secs(1));
    assert_eq!(h.step().await, "background-fetched");

    assert_eq!(h.script.calls(), 1);
    assert_eq!(h.controller.revision(), 1);
    assert_eq!(h.controller.notification(), None);
    assert_eq!(h.controller.store().source(), Some(CacheSource::Cache));
  }

  #[tokio::test(start_paused = true)]
  async fn test_background_refresh_with_added_product() {
    let mut grown = catalog();
    grown.push(product("c", "Monitor", Some("300"), Some("displays")));
    let mut h = Harness::new(vec![Ok(grown.clone())]);
    h.cache.save(&catalog());

    h.controller.load(false);
    h.step().await;
    h.step().await;

    assert_eq!(h.controller.store().products().len(), 3);
    assert_eq!(h.controller.revision(), 2);
    assert_eq!(h.cache.load().unwrap().payload, grown);
    assert_eq!(h.controller.notification(), Some(BACKGROUND_UPDATE_NOTICE));

    let before = Instant::now();
    assert_eq!(h.step().await, "notification-expired");
    assert_eq!(before.elapsed(), Duration::from_secs(3));
    assert_eq!(h.controller.notification(), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_background_failure_is_silent() {
    let mut h = Harness::new(vec![Err(server_error())]);
    h.cache.save(&catalog());

    h.controller.load(false);
    h.step().await;
    h.step().await;

    assert_eq!(h.controller.state(), &LoadState::Ready);
    assert_eq!(h.controller.retry_attempts_used(), 0);
    assert_eq!(h.controller.notification(), None);
    assert_eq!(h.controller.store().products(), catalog().as_slice());
  }

  #[tokio::test(start_paused = true)]
  async fn test_periodic_refresh() {
    let mut h = Harness::new(vec![Ok(catalog()), Ok(catalog())]);

    h.controller.start(false);
    assert_eq!(h.step().await, "fetched");

    let before = Instant::now();
    assert_eq!(h.step().await, "background-due");
    assert_eq!(before.elapsed(), Duration::from_secs(1800));
    assert_eq!(h.step().await, "background-fetched");
    assert_eq!(h.script.calls(), 2);
  }

  #[tokio::test]
  async fn test_load_snapshot_prefers_cache() {
    let h = Harness::new(vec![Ok(catalog())]);
    let fetcher = h.controller.fetcher.clone();

    let first = load_snapshot(&h.cache, &fetcher, false).await.unwrap();
    assert_eq!(first.source, CacheSource::Network);

    let second = load_snapshot(&h.cache, &fetcher, false).await.unwrap();
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.products, catalog());
    assert_eq!(h.script.calls(), 1);

    let err = load_snapshot(&h.cache, &fetcher, true).await.unwrap_err();
    assert_eq!(err, FetchError::Network("script exhausted".to_string()));
  }
}

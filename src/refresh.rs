//! Retry bookkeeping, load states and cancellable timers for the catalog
//! refresh loop.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::RefreshConfig;

/// Bounded fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub delay: Duration,
}

impl From<&RefreshConfig> for RetryPolicy {
  fn from(config: &RefreshConfig) -> Self {
    Self {
      max_attempts: config.max_retries,
      delay: Duration::from_secs(config.retry_delay_secs),
    }
  }
}

/// What to do after a failed foreground load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
  /// Try again after `delay`; `attempt` counts from 1
  Retry { attempt: u32, delay: Duration },
  /// Give up until the user asks again
  Terminal,
}

/// Retry counter for one process lifetime.
#[derive(Debug, Clone)]
pub struct RetrySession {
  policy: RetryPolicy,
  attempts_used: u32,
}

impl RetrySession {
  pub fn new(policy: RetryPolicy) -> Self {
    Self {
      policy,
      attempts_used: 0,
    }
  }

  pub fn policy(&self) -> RetryPolicy {
    self.policy
  }

  pub fn attempts_used(&self) -> u32 {
    self.attempts_used
  }

  /// Record a failure. Failures of a forced load are always terminal.
  pub fn on_failure(&mut self, forced: bool) -> RetryDecision {
    if forced || self.attempts_used >= self.policy.max_attempts {
      return RetryDecision::Terminal;
    }

    self.attempts_used += 1;
    RetryDecision::Retry {
      attempt: self.attempts_used,
      delay: self.policy.delay,
    }
  }

  pub fn reset(&mut self) {
    self.attempts_used = 0;
  }
}

/// Foreground load state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
  Idle,
  Loading {
    forced: bool,
  },
  Ready,
  WaitingRetry {
    attempt: u32,
    max_attempts: u32,
    retry_at: Instant,
    error: String,
  },
  Failed {
    error: String,
  },
}

impl LoadState {
  pub fn is_loading(&self) -> bool {
    matches!(self, LoadState::Loading { .. })
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      LoadState::WaitingRetry { error, .. } | LoadState::Failed { error } => Some(error),
      _ => None,
    }
  }

  /// Whole seconds left before the pending retry, rounded up.
  pub fn retry_countdown(&self) -> Option<u64> {
    match self {
      LoadState::WaitingRetry { retry_at, .. } => {
        let left = retry_at.saturating_duration_since(Instant::now());
        Some(left.as_millis().div_ceil(1000) as u64)
      }
      _ => None,
    }
  }
}

/// Handle to a single scheduled task.
///
/// Scheduling again aborts whatever was pending, so a timer never has two
/// tasks in flight. Dropping the timer cancels it.
#[derive(Default)]
pub struct Timer {
  handle: Option<JoinHandle<()>>,
}

impl Timer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Run `fire` once after `delay`.
  pub fn schedule<F>(&mut self, delay: Duration, fire: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.cancel();
    self.handle = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      fire();
    }));
  }

  /// Run `fire` every `period`, first after one full period.
  pub fn schedule_every<F>(&mut self, period: Duration, mut fire: F)
  where
    F: FnMut() + Send + 'static,
  {
    self.cancel();
    self.handle = Some(tokio::spawn(async move {
      let mut interval = tokio::time::interval_at(Instant::now() + period, period);
      interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        interval.tick().await;
        fire();
      }
    }));
  }

  pub fn cancel(&mut self) {
    if let Some(handle) = self.handle.take() {
      handle.abort();
    }
  }

  pub fn is_pending(&self) -> bool {
    self
      .handle
      .as_ref()
      .map(|h| !h.is_finished())
      .unwrap_or(false)
  }
}

impl Drop for Timer {
  fn drop(&mut self) {
    self.cancel();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  fn policy() -> RetryPolicy {
    RetryPolicy {
      max_attempts: 3,
      delay: Duration::from_secs(5),
    }
  }

  #[test]
  fn test_retry_session_is_bounded() {
    let mut session = RetrySession::new(policy());

    for attempt in 1..=3 {
      assert_eq!(
        session.on_failure(false),
        RetryDecision::Retry {
          attempt,
          delay: Duration::from_secs(5)
        }
      );
    }
    assert_eq!(session.on_failure(false), RetryDecision::Terminal);
    assert_eq!(session.attempts_used(), 3);

    session.reset();
    assert_eq!(session.attempts_used(), 0);
    assert!(matches!(
      session.on_failure(false),
      RetryDecision::Retry { attempt: 1, .. }
    ));
  }

  #[test]
  fn test_forced_failure_is_terminal() {
    let mut session = RetrySession::new(policy());
    assert_eq!(session.on_failure(true), RetryDecision::Terminal);
    assert_eq!(session.attempts_used(), 0);
  }

  #[test]
  fn test_policy_from_config() {
    let config = RefreshConfig {
      max_retries: 5,
      retry_delay_secs: 2,
      ..RefreshConfig::default()
    };
    assert_eq!(
      RetryPolicy::from(&config),
      RetryPolicy {
        max_attempts: 5,
        delay: Duration::from_secs(2)
      }
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_retry_countdown_rounds_up() {
    let state = LoadState::WaitingRetry {
      attempt: 1,
      max_attempts: 3,
      retry_at: Instant::now() + Duration::from_millis(4200),
      error: "HTTP 500: Internal Server Error".to_string(),
    };
    assert_eq!(state.retry_countdown(), Some(5));
    assert_eq!(state.error(), Some("HTTP 500: Internal Server Error"));

    tokio::time::advance(Duration::from_millis(4000)).await;
    assert_eq!(state.retry_countdown(), Some(1));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(state.retry_countdown(), Some(0));
    assert_eq!(LoadState::Ready.retry_countdown(), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_reschedule_cancels_pending_task() {
    let fired = Arc::new(AtomicU32::new(0));
    let mut timer = Timer::new();

    let first = fired.clone();
    timer.schedule(Duration::from_millis(300), move || {
      first.fetch_add(1, Ordering::SeqCst);
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let second = fired.clone();
    timer.schedule(Duration::from_millis(300), move || {
      second.fetch_add(10, Ordering::SeqCst);
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 10);
    assert!(!timer.is_pending());
  }

  #[tokio::test(start_paused = true)]
  async fn test_periodic_timer_and_drop() {
    let fired = Arc::new(AtomicU32::new(0));
    let mut timer = Timer::new();

    let counter = fired.clone();
    timer.schedule_every(Duration::from_secs(60), move || {
      counter.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(122)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 3);
    assert!(timer.is_pending());

    drop(timer);
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 3);
  }
}

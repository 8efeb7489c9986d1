// tests/common.rs
#![allow(dead_code)] // Not every test binary uses every helper.

use rdispatch::{Dispatcher, DispatcherOptions, PendingReply, ReplyResult, Strategy};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use tokio::time::timeout;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(250);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(10);

static TRACING_INIT: Once = Once::new();

// Can be overridden by RUST_LOG.
fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    let default_filter = "rdispatch=debug,warn";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_line_number(true)
      .with_span_events(FmtSpan::CLOSE)
      .with_test_writer()
      .finish();

    // Another test binary thread may have won the race; that is fine.
    let _ = tracing::subscriber::set_global_default(subscriber);
  });
}

/// Both strategies with the same concurrency limit.
pub fn both_strategies(limit: usize) -> [Strategy; 2] {
  [Strategy::Gated { capacity: limit }, Strategy::Pool { size: limit }]
}

/// Starts a dispatcher for `strategy` with an otherwise default configuration.
pub fn test_dispatcher(strategy: Strategy) -> Dispatcher {
  test_dispatcher_with(DispatcherOptions::new().with_strategy(strategy))
}

pub fn test_dispatcher_with(options: DispatcherOptions) -> Dispatcher {
  setup_tracing();
  let name = format!("test-{}", options.strategy);
  Dispatcher::start(options.with_name(name)).expect("Failed to start test dispatcher")
}

/// Awaits a reply, failing the test if it does not arrive in time.
pub async fn reply_within<T, E>(reply: PendingReply<T, E>, duration: Duration) -> ReplyResult<T, E> {
  timeout(duration, reply).await.expect("reply did not arrive in time")
}

/// Records how many instrumented work units are inside their body at once.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyProbe {
  current: Arc<AtomicUsize>,
  peak: Arc<AtomicUsize>,
  entries: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
  pub fn new() -> Self {
    Self::default()
  }

  /// Marks entry into a work unit; the returned guard marks the exit.
  pub fn enter(&self) -> ProbeGuard {
    let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
    self.entries.fetch_add(1, Ordering::SeqCst);
    ProbeGuard {
      current: self.current.clone(),
    }
  }

  pub fn peak(&self) -> usize {
    self.peak.load(Ordering::SeqCst)
  }

  pub fn current(&self) -> usize {
    self.current.load(Ordering::SeqCst)
  }

  pub fn entries(&self) -> usize {
    self.entries.load(Ordering::SeqCst)
  }
}

pub struct ProbeGuard {
  current: Arc<AtomicUsize>,
}

impl Drop for ProbeGuard {
  fn drop(&mut self) {
    self.current.fetch_sub(1, Ordering::SeqCst);
  }
}

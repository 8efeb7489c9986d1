// src/runtime/waitgroup.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// An asynchronous WaitGroup, similar to Go's `sync.WaitGroup`.
///
/// The dispatcher registers every task it spawns (`add`) and each task signals
/// completion (`done`). Shutdown waits (`wait`) until the count returns to zero.
#[derive(Debug, Clone)]
pub(crate) struct WaitGroup {
  count: Arc<AtomicUsize>,
  notify_on_zero: Arc<Notify>,
}

impl WaitGroup {
  /// Creates a new WaitGroup with an initial count of zero.
  pub fn new() -> Self {
    Self {
      count: Arc::new(AtomicUsize::new(0)),
      notify_on_zero: Arc::new(Notify::new()),
    }
  }

  /// Adds a delta to the WaitGroup counter.
  ///
  /// Must happen before the registered task is spawned, otherwise a concurrent
  /// `wait` could observe zero and return early.
  pub fn add(&self, delta: usize) {
    if delta == 0 {
      return;
    }
    let old_count = self.count.fetch_add(delta, Ordering::Relaxed);
    if old_count == 0 {
      tracing::trace!(delta, "WaitGroup count increased from zero");
    }
  }

  /// Decrements the WaitGroup counter by one, waking waiters at zero.
  ///
  /// Panics if the counter would drop below zero.
  pub fn done(&self) {
    let old_count = self.count.fetch_sub(1, Ordering::AcqRel);

    if old_count == 0 {
      self.count.fetch_add(1, Ordering::Relaxed);
      panic!("WaitGroup::done() called when count was already zero!");
    } else if old_count == 1 {
      self.notify_on_zero.notify_waiters();
      tracing::trace!("WaitGroup count reached zero, notifying waiters");
    }
  }

  /// Waits asynchronously until the WaitGroup counter becomes zero.
  ///
  /// If the counter is already zero when called, returns immediately.
  pub async fn wait(&self) {
    loop {
      // Register interest before reading the count: `notify_waiters` only
      // wakes futures that are already enabled.
      let notified = self.notify_on_zero.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();

      if self.count.load(Ordering::Acquire) == 0 {
        return;
      }
      notified.await;
    }
  }

  /// Returns the current count.
  pub fn get_count(&self) -> usize {
    self.count.load(Ordering::Acquire)
  }
}

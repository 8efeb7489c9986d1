// src/dispatcher/shutdown.rs

use crate::error::DispatchError;
use crate::runtime::{InboundSender, TaskGuard, TaskRole, WaitGroup};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One-shot shutdown signal plus the drain bookkeeping behind it.
///
/// Every task the dispatcher spawns is registered here through a
/// [`TaskGuard`]. Signalling closes the inbound queue: producers are refused
/// from then on, consumers keep receiving what was already queued and exit
/// once it is empty. The dispatcher has drained when the last guard is gone.
#[derive(Debug)]
pub(crate) struct ShutdownCoordinator {
  name: Arc<str>,
  initiated: AtomicBool,
  queue_tx: InboundSender,
  tasks: WaitGroup,
  drain_timeout: Option<Duration>,
}

impl ShutdownCoordinator {
  pub fn new(name: Arc<str>, queue_tx: InboundSender, drain_timeout: Option<Duration>) -> Self {
    Self {
      name,
      initiated: AtomicBool::new(false),
      queue_tx,
      tasks: WaitGroup::new(),
      drain_timeout,
    }
  }

  /// Registers a task that is about to be spawned.
  pub fn track(&self, role: TaskRole, id: usize) -> TaskGuard {
    TaskGuard::new(self.tasks.clone(), role, id)
  }

  /// The wait group tasks register with, for spawners that outlive `self`'s borrow.
  pub fn wait_group(&self) -> WaitGroup {
    self.tasks.clone()
  }

  /// Fires the shutdown signal. Returns `true` only for the call that fired it.
  pub fn signal(&self) -> bool {
    if self
      .initiated
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      self.queue_tx.close();
      tracing::info!(
        dispatcher = %self.name,
        queued = self.queue_tx.len(),
        tasks = self.tasks.get_count(),
        "Dispatcher shutdown initiated; inbound queue closed"
      );
      true
    } else {
      tracing::debug!(dispatcher = %self.name, "Dispatcher shutdown already initiated");
      false
    }
  }

  pub fn is_signalled(&self) -> bool {
    self.initiated.load(Ordering::Acquire)
  }

  pub fn tracked_tasks(&self) -> usize {
    self.tasks.get_count()
  }

  /// Waits until every tracked task has exited.
  pub async fn wait_drained(&self) -> Result<(), DispatchError> {
    if !self.is_signalled() {
      tracing::warn!(dispatcher = %self.name, "Waiting for drain before shutdown was signalled");
    }
    let initial_count = self.tasks.get_count();

    match self.drain_timeout {
      None => self.tasks.wait().await,
      Some(limit) => {
        if tokio::time::timeout(limit, self.tasks.wait()).await.is_err() {
          let remaining = self.tasks.get_count();
          tracing::error!(
            dispatcher = %self.name,
            initial_count,
            remaining,
            timeout = ?limit,
            "Dispatcher drain timed out; {} tasks still running",
            remaining
          );
          return Err(DispatchError::Timeout);
        }
      }
    }

    tracing::info!(dispatcher = %self.name, initial_count, "Dispatcher drained");
    Ok(())
  }
}

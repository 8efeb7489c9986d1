// src/dispatcher/worker.rs

//! Strategy B: a fixed set of long-lived workers sharing the inbound queue.

use crate::runtime::{InboundReceiver, TaskGuard};

use std::sync::Arc;

/// A pool worker. Holds no request state between iterations.
///
/// States: `IDLE -> EXECUTING -> IDLE` until the queue is closed and drained,
/// then `STOPPED`. Taking an envelope from the queue is the admission control;
/// with `size` workers at most `size` work units run at once.
pub(crate) struct Worker {
  id: usize,
  dispatcher: Arc<str>,
  queue: InboundReceiver,
}

impl Worker {
  pub fn new(id: usize, dispatcher: Arc<str>, queue: InboundReceiver) -> Self {
    Self { id, dispatcher, queue }
  }

  pub async fn run(self, guard: TaskGuard) {
    tracing::debug!(dispatcher = %self.dispatcher, worker = self.id, "Worker started");

    let mut executed: u64 = 0;
    loop {
      tracing::trace!(dispatcher = %self.dispatcher, worker = self.id, state = "IDLE");
      let envelope = match self.queue.recv().await {
        Ok(envelope) => envelope,
        Err(_) => break,
      };
      tracing::trace!(dispatcher = %self.dispatcher, worker = self.id, state = "EXECUTING");
      envelope.execute().await;
      executed += 1;
    }

    tracing::debug!(
      dispatcher = %self.dispatcher,
      worker = self.id,
      executed,
      state = "STOPPED",
      "Worker stopped: inbound queue closed and drained"
    );
    guard.complete();
  }
}

// src/dispatcher/gated.rs

//! Strategy A: one task per envelope, launched only while holding a permit.

use crate::gate::AdmissionGate;
use crate::runtime::{InboundReceiver, TaskGuard, TaskRole, WaitGroup};

use std::sync::Arc;

/// The single loop feeding gated tasks.
///
/// States: `WAITING_FOR_ENVELOPE -> ACQUIRING_TOKEN -> LAUNCHING_TASK` and back,
/// until the queue reports closed and empty (`DRAINING_THEN_STOPPED`).
/// Acquiring blocks the loop itself, so it never pulls envelopes faster than
/// permits come back.
pub(crate) struct GatedLoop {
  dispatcher: Arc<str>,
  queue: InboundReceiver,
  gate: AdmissionGate,
  tasks: WaitGroup,
}

impl GatedLoop {
  pub fn new(dispatcher: Arc<str>, queue: InboundReceiver, gate: AdmissionGate, tasks: WaitGroup) -> Self {
    Self {
      dispatcher,
      queue,
      gate,
      tasks,
    }
  }

  pub async fn run(self, guard: TaskGuard) {
    let GatedLoop {
      dispatcher,
      queue,
      gate,
      tasks,
    } = self;
    tracing::debug!(dispatcher = %dispatcher, capacity = gate.capacity(), "Gated dispatch loop started");

    let mut launched: usize = 0;
    loop {
      tracing::trace!(dispatcher = %dispatcher, state = "WAITING_FOR_ENVELOPE");
      let envelope = match queue.recv().await {
        Ok(envelope) => envelope,
        Err(_) => break, // Closed and drained.
      };

      tracing::trace!(
        dispatcher = %dispatcher,
        state = "ACQUIRING_TOKEN",
        outstanding = gate.outstanding()
      );
      let permit = match gate.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
          // Dropping the envelope resolves its reply as `Dropped`.
          tracing::error!(dispatcher = %dispatcher, error = %e, "Admission gate failed; stopping dispatch loop");
          break;
        }
      };

      tracing::trace!(dispatcher = %dispatcher, state = "LAUNCHING_TASK", task = launched);
      let task_guard = TaskGuard::new(tasks.clone(), TaskRole::GatedTask, launched);
      // `envelope`, `permit` and `task_guard` are fresh bindings of this
      // iteration and are moved into the task, which therefore owns exactly
      // the envelope it was launched for.
      tokio::spawn(async move {
        envelope.execute().await;
        drop(permit);
        task_guard.complete();
      });
      launched = launched.wrapping_add(1);
    }

    tracing::debug!(
      dispatcher = %dispatcher,
      state = "DRAINING_THEN_STOPPED",
      launched,
      outstanding = gate.outstanding(),
      "Gated dispatch loop stopped accepting envelopes"
    );
    guard.complete();
  }
}

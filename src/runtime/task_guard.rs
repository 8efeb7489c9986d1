// src/runtime/task_guard.rs

use crate::runtime::WaitGroup;

use std::fmt;

/// Kind of task a [`TaskGuard`] is tracking. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TaskRole {
  /// The loop that takes envelopes and launches gated tasks (Strategy A).
  GatedLoop,
  /// A task launched by the gated loop for one envelope.
  GatedTask,
  /// A long-lived pool worker (Strategy B).
  Worker,
}

impl fmt::Display for TaskRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TaskRole::GatedLoop => "gated-loop",
      TaskRole::GatedTask => "gated-task",
      TaskRole::Worker => "worker",
    };
    f.write_str(name)
  }
}

/// Registers a task with the dispatcher's wait group and balances it on drop.
///
/// Created by the spawner before the task exists and moved into it, so the
/// group is decremented on every exit path: normal completion, panic, or the
/// task being aborted with the runtime.
pub(crate) struct TaskGuard {
  wait_group: WaitGroup,
  role: TaskRole,
  id: usize,
  completed: bool,
}

impl TaskGuard {
  pub fn new(wait_group: WaitGroup, role: TaskRole, id: usize) -> Self {
    wait_group.add(1);
    Self {
      wait_group,
      role,
      id,
      completed: false,
    }
  }

  /// Marks a normal exit and releases the registration.
  pub fn complete(mut self) {
    self.completed = true;
  }
}

impl Drop for TaskGuard {
  fn drop(&mut self) {
    if !self.completed {
      tracing::warn!(
        role = %self.role,
        id = self.id,
        "Dispatcher task stopping abnormally (panicked or aborted)"
      );
    }
    self.wait_group.done();
  }
}

// src/options.rs

use crate::error::DispatchError;
use crate::gate::MAX_CAPACITY;
use crate::runtime::{DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Concurrency limit used when no strategy is configured.
pub const DEFAULT_CAPACITY: usize = 8;

/// How the dispatcher turns queued envelopes into running work.
///
/// Both strategies cap concurrently executing work units at the configured
/// number. They differ in what else they bound:
///
/// * `Gated` launches one fresh task per envelope once an admission permit is
///   held. Execution is bounded, but the inbound queue is the only thing
///   bounding how much work piles up in front of the loop, so pair it with a
///   bounded queue under bursty load.
/// * `Pool` starts `size` long-lived workers that all read the inbound queue.
///   Taking an envelope is the admission control, and the task footprint is
///   constant no matter how large a burst is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
  /// Strategy A: permit-gated task per envelope.
  Gated { capacity: usize },
  /// Strategy B: fixed worker pool.
  Pool { size: usize },
}

impl Strategy {
  /// Maximum number of work units that may execute at once.
  pub fn concurrency(&self) -> usize {
    match *self {
      Strategy::Gated { capacity } => capacity,
      Strategy::Pool { size } => size,
    }
  }

  fn validate(&self) -> Result<(), DispatchError> {
    match *self {
      Strategy::Gated { capacity: 0 } => Err(DispatchError::InvalidArgument(
        "gated strategy capacity must be at least 1".into(),
      )),
      Strategy::Pool { size: 0 } => Err(DispatchError::InvalidArgument(
        "worker pool size must be at least 1".into(),
      )),
      strategy if strategy.concurrency() > MAX_CAPACITY => Err(DispatchError::InvalidArgument(
        format!("concurrency limit of '{}' exceeds the maximum of {}", strategy, MAX_CAPACITY),
      )),
      _ => Ok(()),
    }
  }
}

impl Default for Strategy {
  fn default() -> Self {
    Strategy::Gated {
      capacity: DEFAULT_CAPACITY,
    }
  }
}

impl fmt::Display for Strategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Strategy::Gated { capacity } => write!(f, "gated:{}", capacity),
      Strategy::Pool { size } => write!(f, "pool:{}", size),
    }
  }
}

/// Parses `gated:<capacity>` or `pool:<size>`. A bare `gated` or `pool` uses
/// [`DEFAULT_CAPACITY`].
impl FromStr for Strategy {
  type Err = DispatchError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (kind, count) = match s.split_once(':') {
      Some((kind, count)) => {
        let count = count.trim().parse::<usize>().map_err(|_| {
          DispatchError::InvalidArgument(format!("invalid concurrency in strategy '{}'", s))
        })?;
        (kind, count)
      }
      None => (s, DEFAULT_CAPACITY),
    };

    let strategy = match kind.trim().to_ascii_lowercase().as_str() {
      "gated" | "a" => Strategy::Gated { capacity: count },
      "pool" | "b" => Strategy::Pool { size: count },
      other => {
        return Err(DispatchError::InvalidArgument(format!(
          "unknown dispatch strategy '{}' (expected 'gated' or 'pool')",
          other
        )))
      }
    };
    strategy.validate()?;
    Ok(strategy)
  }
}

/// Start-up configuration for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherOptions {
  /// Execution strategy and its concurrency limit.
  pub strategy: Strategy,
  /// Inbound queue capacity. `None` = unbounded.
  pub queue_capacity: Option<usize>,
  /// Upper bound on how long `request_shutdown` waits for drain. `None` = forever.
  pub drain_timeout: Option<Duration>,
  /// Name attached to every log line of this dispatcher.
  pub name: String,
}

impl Default for DispatcherOptions {
  fn default() -> Self {
    Self {
      strategy: Strategy::default(),
      queue_capacity: Some(DEFAULT_QUEUE_CAPACITY),
      drain_timeout: None,
      name: "rdispatch".to_string(),
    }
  }
}

impl DispatcherOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_strategy(mut self, strategy: Strategy) -> Self {
    self.strategy = strategy;
    self
  }

  pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
    self.queue_capacity = Some(capacity);
    self
  }

  /// Opts into an unbounded inbound queue.
  pub fn with_unbounded_queue(mut self) -> Self {
    self.queue_capacity = None;
    self
  }

  pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
    self.drain_timeout = Some(timeout);
    self
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Checks the options for values the dispatcher cannot run with.
  pub fn validate(&self) -> Result<(), DispatchError> {
    self.strategy.validate()?;
    if self.queue_capacity == Some(0) {
      return Err(DispatchError::InvalidArgument(
        "inbound queue capacity must be at least 1 (use an unbounded queue instead)".into(),
      ));
    }
    if let Some(capacity) = self.queue_capacity.filter(|&c| c > MAX_QUEUE_CAPACITY) {
      return Err(DispatchError::InvalidArgument(format!(
        "inbound queue capacity {} exceeds the maximum of {} (use an unbounded queue instead)",
        capacity, MAX_QUEUE_CAPACITY
      )));
    }
    Ok(())
  }
}

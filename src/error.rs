// src/error.rs

use thiserror::Error;

/// Systemic errors raised by the dispatcher itself.
///
/// These are visible to the owning process and to producers, and are never
/// produced by a work unit. Failures of a single work unit travel through its
/// reply channel as a [`ReplyError`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispatchError {
  // --- Submission ---
  #[error("Dispatcher is closed and no longer accepts envelopes")]
  Closed,
  #[error("Inbound queue is full")]
  QueueFull, // Only produced by the non-waiting submit path.

  // --- Configuration ---
  #[error("Invalid argument provided: {0}")]
  InvalidArgument(String),

  // --- Shutdown ---
  #[error("Timed out waiting for in-flight work to drain")]
  Timeout,

  // --- Internal Errors ---
  #[error("Internal dispatcher error: {0}")]
  Internal(String),
}

impl<T> From<async_channel::SendError<T>> for DispatchError {
  fn from(_: async_channel::SendError<T>) -> Self {
    DispatchError::Closed
  }
}

impl<T> From<async_channel::TrySendError<T>> for DispatchError {
  fn from(e: async_channel::TrySendError<T>) -> Self {
    match e {
      async_channel::TrySendError::Full(_) => DispatchError::QueueFull,
      async_channel::TrySendError::Closed(_) => DispatchError::Closed,
    }
  }
}

/// The failure half of a reply, as seen by the producer awaiting it.
///
/// `E` is the work unit's own error type and is delivered verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyError<E> {
  #[error("Work unit failed: {0}")]
  Failed(E),
  #[error("Work unit panicked: {0}")]
  Panicked(String),
  #[error("Envelope was dropped before a reply was written")]
  Dropped,
}

impl<E> ReplyError<E> {
  /// Returns `true` if the work unit itself returned an error.
  pub fn is_failure(&self) -> bool {
    matches!(self, ReplyError::Failed(_))
  }

  /// Extracts the work unit's error, discarding panics and dropped envelopes.
  pub fn into_failure(self) -> Option<E> {
    match self {
      ReplyError::Failed(e) => Some(e),
      _ => None,
    }
  }
}

/// Renders a `catch_unwind` payload for [`ReplyError::Panicked`].
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
  if let Some(s) = payload.downcast_ref::<&'static str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "non-string panic payload".to_string()
  }
}

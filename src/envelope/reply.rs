// src/envelope/reply.rs

//! Single-use reply path owned by exactly one envelope.

use crate::error::ReplyError;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// What a producer eventually reads: the work unit's value, or why there is none.
pub type ReplyResult<T, E> = Result<T, ReplyError<E>>;

/// Creates a connected reply pair.
pub(crate) fn reply_channel<T, E>() -> (ReplySender<T, E>, PendingReply<T, E>) {
  let (tx, rx) = oneshot::channel();
  (ReplySender { tx }, PendingReply { rx, taken: false })
}

/// Write side of a reply channel. Held by the envelope, consumed by the single write.
pub(crate) struct ReplySender<T, E> {
  tx: oneshot::Sender<ReplyResult<T, E>>,
}

impl<T, E> ReplySender<T, E> {
  /// Writes the single reply. Returns `false` if the producer already dropped
  /// its [`PendingReply`].
  pub(crate) fn send(self, result: ReplyResult<T, E>) -> bool {
    self.tx.send(result).is_ok()
  }
}

impl<T, E> fmt::Debug for ReplySender<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReplySender")
      .field("producer_waiting", &!self.tx.is_closed())
      .finish()
  }
}

/// Read side of a reply channel, returned to the producer that built the envelope.
///
/// Awaiting it suspends the producer (no spinning) until the executing task
/// writes the result. The reply can be read exactly once:
///
/// * [`recv`](Self::recv) and `.await` consume the handle, so a second read
///   does not compile.
/// * Polling the future again after it resolved, or calling
///   [`try_recv`](Self::try_recv) after a reply was taken, is a misuse and panics.
///
/// If the envelope is destroyed without ever being executed (for example the
/// runtime shuts down), the reply resolves to [`ReplyError::Dropped`].
#[must_use = "a reply is only observed by awaiting it"]
pub struct PendingReply<T, E> {
  rx: oneshot::Receiver<ReplyResult<T, E>>,
  taken: bool,
}

impl<T, E> PendingReply<T, E> {
  /// Waits for the reply.
  pub async fn recv(self) -> ReplyResult<T, E> {
    self.await
  }

  /// Returns the reply if it has already been written, without waiting.
  ///
  /// # Panics
  /// Panics if the reply was already taken from this handle.
  pub fn try_recv(&mut self) -> Option<ReplyResult<T, E>> {
    assert!(!self.taken, "PendingReply read twice: a reply channel carries exactly one value");
    match self.rx.try_recv() {
      Ok(result) => {
        self.taken = true;
        Some(result)
      }
      Err(oneshot::error::TryRecvError::Empty) => None,
      Err(oneshot::error::TryRecvError::Closed) => {
        self.taken = true;
        Some(Err(ReplyError::Dropped))
      }
    }
  }

  /// Returns `true` once the reply was read from this handle.
  pub fn is_taken(&self) -> bool {
    self.taken
  }
}

impl<T, E> Future for PendingReply<T, E> {
  type Output = ReplyResult<T, E>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    assert!(!self.taken, "PendingReply read twice: a reply channel carries exactly one value");
    let result = match Pin::new(&mut self.rx).poll(cx) {
      Poll::Pending => return Poll::Pending,
      Poll::Ready(Ok(result)) => result,
      Poll::Ready(Err(_)) => Err(ReplyError::Dropped),
    };
    self.taken = true;
    Poll::Ready(result)
  }
}

impl<T, E> fmt::Debug for PendingReply<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PendingReply").field("taken", &self.taken).finish_non_exhaustive()
  }
}

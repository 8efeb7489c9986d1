// src/envelope/mod.rs

//! Request envelopes: a work unit, its arguments and the reply path, bundled
//! so that whichever task executes the work knows where to answer.

mod reply;

pub use reply::{PendingReply, ReplyResult};
pub(crate) use reply::{reply_channel, ReplySender};

use crate::error::{panic_message, ReplyError};

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;

/// Type-erased view of an envelope, as carried by the inbound queue.
///
/// The queue only needs to run an envelope to completion; the argument,
/// result and error types stay private to the envelope and its producer.
pub trait Dispatch: Send + 'static {
  /// Runs the work unit and writes its outcome to the reply channel.
  ///
  /// The returned future never fails and never panics on behalf of the work
  /// unit: errors and panics both become the reply.
  fn execute(self: Box<Self>) -> BoxFuture<'static, ()>;
}

/// Boxed envelope as stored in the inbound queue.
pub type BoxedEnvelope = Box<dyn Dispatch>;

/// One request: `work(arguments)` plus the channel its result is written to.
///
/// Built by the producer right before submission with [`Envelope::new`], which
/// also hands back the matching [`PendingReply`].
pub struct Envelope<A, F, T, E> {
  arguments: A,
  work: F,
  reply: ReplySender<T, E>,
}

impl<A, F, Fut, T, E> Envelope<A, F, T, E>
where
  A: Send + 'static,
  F: FnOnce(A) -> Fut + Send + 'static,
  Fut: Future<Output = Result<T, E>> + Send + 'static,
  T: Send + 'static,
  E: Send + 'static,
{
  /// Bundles a work unit with its arguments and creates its reply channel.
  pub fn new(work: F, arguments: A) -> (Self, PendingReply<T, E>) {
    let (reply, pending) = reply_channel();
    (
      Self {
        arguments,
        work,
        reply,
      },
      pending,
    )
  }

  /// Arguments the work unit will be invoked with.
  pub fn arguments(&self) -> &A {
    &self.arguments
  }

  async fn run(self) {
    let Envelope { arguments, work, reply } = self;

    // The call itself sits inside the async block so that a panic while
    // building the future is caught as well.
    let outcome = AssertUnwindSafe(async move { work(arguments).await })
      .catch_unwind()
      .await;

    let result = match outcome {
      Ok(Ok(value)) => Ok(value),
      Ok(Err(error)) => Err(ReplyError::Failed(error)),
      Err(payload) => {
        let message = panic_message(payload);
        tracing::warn!(panic = %message, "Work unit panicked; reporting through reply channel");
        Err(ReplyError::Panicked(message))
      }
    };

    if !reply.send(result) {
      tracing::trace!("Producer dropped its pending reply before the result was written");
    }
  }
}

impl<A, F, Fut, T, E> Dispatch for Envelope<A, F, T, E>
where
  A: Send + 'static,
  F: FnOnce(A) -> Fut + Send + 'static,
  Fut: Future<Output = Result<T, E>> + Send + 'static,
  T: Send + 'static,
  E: Send + 'static,
{
  fn execute(self: Box<Self>) -> BoxFuture<'static, ()> {
    (*self).run().boxed()
  }
}

impl<A: fmt::Debug, F, T, E> fmt::Debug for Envelope<A, F, T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Envelope")
      .field("arguments", &self.arguments)
      .field("reply", &self.reply)
      .finish_non_exhaustive()
  }
}

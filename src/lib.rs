// src/lib.rs

//! rdispatch - bounded-concurrency request/response dispatch on Tokio.
//!
//! Every request travels in an [`Envelope`] that carries its work unit, the
//! arguments for it and its own single-use reply channel. A [`Dispatcher`]
//! pulls envelopes off one inbound queue and runs at most N of them at a time,
//! either by launching a permit-gated task per envelope
//! ([`Strategy::Gated`]) or by feeding a fixed pool of workers
//! ([`Strategy::Pool`]). Coordination happens only through the queue, the
//! admission gate and the reply channels.
//!
//! ```
//! use rdispatch::{Dispatcher, DispatcherOptions, Strategy};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), rdispatch::DispatchError> {
//! let options = DispatcherOptions::new().with_strategy(Strategy::Pool { size: 4 });
//! let dispatcher = Dispatcher::start(options)?;
//!
//! let reply = dispatcher
//!   .submit(|n: u32| async move { Ok::<_, String>(n + 1) }, 41)
//!   .await?;
//! assert_eq!(reply.await, Ok(42));
//!
//! dispatcher.request_shutdown().await?;
//! # Ok(())
//! # }
//! ```

/// The dispatcher handle and both execution strategies.
pub mod dispatcher;
/// Request envelopes and their reply channels.
pub mod envelope;
/// Error types for the dispatcher and for individual replies.
pub mod error;
/// The counting admission gate used by the gated strategy.
pub mod gate;
/// Start-up configuration.
pub mod options;
/// Queue, drain tracking and task guard primitives.
pub mod runtime;

/// Runs an `async fn main` on a multi-threaded Tokio runtime.
///
/// Accepts an optional `workers = N` argument for the worker thread count.
pub use rdispatch_macros::main;
/// Marks an `async fn` as a test running on a multi-threaded Tokio runtime.
///
/// Accepts an optional `workers = N` argument (default 4), so tests that
/// measure concurrency actually run work in parallel.
pub use rdispatch_macros::test;

pub use dispatcher::Dispatcher;
pub use envelope::{BoxedEnvelope, Dispatch, Envelope, PendingReply, ReplyResult};
pub use error::{DispatchError, ReplyError};
pub use gate::{AdmissionGate, Permit, MAX_CAPACITY};
pub use options::{DispatcherOptions, Strategy, DEFAULT_CAPACITY};
pub use runtime::{DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY};

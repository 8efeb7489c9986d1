// src/dispatcher/mod.rs

//! The dispatcher handle: start-up, submission, shutdown and introspection.

mod gated;
mod shutdown;
mod worker;

use crate::envelope::{BoxedEnvelope, Dispatch, Envelope, PendingReply};
use crate::error::DispatchError;
use crate::gate::AdmissionGate;
use crate::options::{DispatcherOptions, Strategy};
use crate::runtime::{inbound_queue, InboundSender, TaskRole};

use gated::GatedLoop;
use shutdown::ShutdownCoordinator;
use worker::Worker;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// State shared by all clones of a [`Dispatcher`] handle.
struct DispatcherInner {
  name: Arc<str>,
  strategy: Strategy,
  queue_tx: InboundSender,
  /// Present only for [`Strategy::Gated`].
  gate: Option<AdmissionGate>,
  shutdown: ShutdownCoordinator,
}

/// Handle to a running bounded-concurrency dispatcher.
///
/// Producers submit envelopes and await their own replies; the owning process
/// closes it with [`request_shutdown`](Self::request_shutdown). Handles are
/// cheap to clone. Dropping every handle closes the inbound queue as well,
/// after which the dispatcher drains and its tasks exit on their own.
#[derive(Clone)]
pub struct Dispatcher {
  inner: Arc<DispatcherInner>,
}

impl Dispatcher {
  /// Starts a dispatcher on the current tokio runtime.
  ///
  /// Spawns the gated dispatch loop or `size` pool workers, depending on
  /// `options.strategy`.
  pub fn start(options: DispatcherOptions) -> Result<Self, DispatchError> {
    options.validate()?;
    let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
      DispatchError::Internal(format!("dispatcher must be started inside a tokio runtime: {}", e))
    })?;

    let name: Arc<str> = Arc::from(options.name.as_str());
    let (queue_tx, queue_rx) = inbound_queue(options.queue_capacity);
    let shutdown = ShutdownCoordinator::new(name.clone(), queue_tx.clone(), options.drain_timeout);

    let gate = match options.strategy {
      Strategy::Gated { capacity } => {
        let gate = AdmissionGate::new(capacity)?;
        let guard = shutdown.track(TaskRole::GatedLoop, 0);
        let dispatch_loop = GatedLoop::new(name.clone(), queue_rx, gate.clone(), shutdown.wait_group());
        runtime.spawn(dispatch_loop.run(guard));
        Some(gate)
      }
      Strategy::Pool { size } => {
        for id in 0..size {
          let guard = shutdown.track(TaskRole::Worker, id);
          let worker = Worker::new(id, name.clone(), queue_rx.clone());
          runtime.spawn(worker.run(guard));
        }
        None
      }
    };

    tracing::debug!(
      dispatcher = %name,
      strategy = %options.strategy,
      queue_capacity = ?options.queue_capacity,
      "Dispatcher started"
    );

    Ok(Self {
      inner: Arc::new(DispatcherInner {
        name,
        strategy: options.strategy,
        queue_tx,
        gate,
        shutdown,
      }),
    })
  }

  /// Starts a Strategy A dispatcher with default options otherwise.
  pub fn gated(capacity: usize) -> Result<Self, DispatchError> {
    Self::start(DispatcherOptions::new().with_strategy(Strategy::Gated { capacity }))
  }

  /// Starts a Strategy B dispatcher with default options otherwise.
  pub fn pool(size: usize) -> Result<Self, DispatchError> {
    Self::start(DispatcherOptions::new().with_strategy(Strategy::Pool { size }))
  }

  // --- Producer API ---

  /// Enqueues an envelope, waiting for room if the queue is bounded and full.
  ///
  /// Fails with [`DispatchError::Closed`] once shutdown has been requested,
  /// including for producers that were already waiting for room.
  pub async fn dispatch<D: Dispatch>(&self, envelope: D) -> Result<(), DispatchError> {
    let envelope: BoxedEnvelope = Box::new(envelope);
    self.inner.queue_tx.send(envelope).await?;
    Ok(())
  }

  /// Enqueues an envelope without waiting.
  ///
  /// A full queue is reported as [`DispatchError::QueueFull`], distinct from
  /// [`DispatchError::Closed`].
  pub fn try_dispatch<D: Dispatch>(&self, envelope: D) -> Result<(), DispatchError> {
    let envelope: BoxedEnvelope = Box::new(envelope);
    self.inner.queue_tx.try_send(envelope)?;
    Ok(())
  }

  /// Builds an envelope for `work(arguments)`, enqueues it and returns its reply.
  pub async fn submit<A, F, Fut, T, E>(&self, work: F, arguments: A) -> Result<PendingReply<T, E>, DispatchError>
  where
    A: Send + 'static,
    F: FnOnce(A) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
  {
    let (envelope, reply) = Envelope::new(work, arguments);
    self.dispatch(envelope).await?;
    Ok(reply)
  }

  /// Non-waiting variant of [`submit`](Self::submit).
  pub fn try_submit<A, F, Fut, T, E>(&self, work: F, arguments: A) -> Result<PendingReply<T, E>, DispatchError>
  where
    A: Send + 'static,
    F: FnOnce(A) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
  {
    let (envelope, reply) = Envelope::new(work, arguments);
    self.try_dispatch(envelope)?;
    Ok(reply)
  }

  // --- Lifecycle ---

  /// Signals shutdown without waiting. Idempotent.
  ///
  /// New submissions are refused from now on; envelopes already queued are
  /// still executed and answered.
  pub fn close(&self) {
    self.inner.shutdown.signal();
  }

  /// Signals shutdown and waits until every accepted envelope has been
  /// answered and every dispatcher task has exited.
  ///
  /// Running work units are never cancelled. If a drain timeout is configured
  /// and elapses first, returns [`DispatchError::Timeout`] while the work keeps
  /// running in the background. Calling this from inside a work unit executed
  /// by this dispatcher never completes.
  pub async fn request_shutdown(&self) -> Result<(), DispatchError> {
    self.close();
    self.inner.shutdown.wait_drained().await
  }

  // --- Introspection ---

  pub fn name(&self) -> &str {
    &self.inner.name
  }

  pub fn strategy(&self) -> Strategy {
    self.inner.strategy
  }

  /// Whether shutdown has been signalled.
  pub fn is_closed(&self) -> bool {
    self.inner.shutdown.is_signalled()
  }

  /// Envelopes waiting in the inbound queue.
  pub fn queued(&self) -> usize {
    self.inner.queue_tx.len()
  }

  /// Admission permits currently held. `None` for the worker pool, which has no gate.
  pub fn outstanding(&self) -> Option<usize> {
    self.inner.gate.as_ref().map(AdmissionGate::outstanding)
  }

  /// Dispatcher tasks still alive: the loop or workers plus launched gated tasks.
  pub fn tracked_tasks(&self) -> usize {
    self.inner.shutdown.tracked_tasks()
  }
}

impl fmt::Debug for Dispatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Dispatcher")
      .field("name", &self.inner.name)
      .field("strategy", &self.inner.strategy)
      .field("closed", &self.is_closed())
      .field("queued", &self.queued())
      .finish_non_exhaustive()
  }
}

// src/runtime/queue.rs

//! Type aliases for the inbound envelope queue based on `async-channel`.

use crate::envelope::BoxedEnvelope;

/// Producer end of the inbound queue. Cloneable, shared by every producer.
pub type InboundSender = async_channel::Sender<BoxedEnvelope>;

/// Consumer end of the inbound queue. Cloned into the gated loop or into every
/// pool worker; each envelope is received by exactly one of them.
pub type InboundReceiver = async_channel::Receiver<BoxedEnvelope>;

/// Default capacity of the inbound queue when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Largest bounded queue capacity. A bounded queue reserves every slot up front.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

/// Creates the inbound queue.
///
/// `Some(capacity)` yields a bounded queue (clamped to `1..=MAX_QUEUE_CAPACITY`)
/// whose senders wait or are rejected when it is full. `None` yields an
/// unbounded queue, which grows without limit under sustained overload.
pub fn inbound_queue(capacity: Option<usize>) -> (InboundSender, InboundReceiver) {
  match capacity {
    Some(capacity) => async_channel::bounded(capacity.clamp(1, MAX_QUEUE_CAPACITY)),
    None => async_channel::unbounded(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::envelope::Envelope;

  fn noop() -> BoxedEnvelope {
    let (envelope, _reply) = Envelope::new(|(): ()| async { Ok::<(), ()>(()) }, ());
    Box::new(envelope)
  }

  #[test]
  fn bounded_queue_has_a_floor_of_one() {
    let (tx, _rx) = inbound_queue(Some(0));
    assert_eq!(tx.capacity(), Some(1));
    assert!(tx.try_send(noop()).is_ok());
    assert!(tx.try_send(noop()).is_err());
  }

  #[test]
  fn bounded_queue_is_clamped_to_the_maximum() {
    let (tx, _rx) = inbound_queue(Some(usize::MAX));
    assert_eq!(tx.capacity(), Some(MAX_QUEUE_CAPACITY));
  }

  #[test]
  fn unbounded_queue_reports_no_capacity() {
    let (tx, rx) = inbound_queue(None);
    assert_eq!(tx.capacity(), None);
    for _ in 0..10 {
      assert!(tx.try_send(noop()).is_ok());
    }
    assert_eq!(rx.len(), 10);
  }
}

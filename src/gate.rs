// src/gate.rs

//! Counting admission gate built on a bounded channel.
//!
//! Each in-flight unit of work holds one token sitting in the channel's
//! buffer: sending a token acquires, receiving one releases. The channel's
//! capacity is therefore the concurrency limit, and its length is the number
//! of outstanding permits.

use crate::error::DispatchError;

use std::fmt;
use std::sync::Arc;

/// Largest concurrency limit a gate accepts.
///
/// The token channel reserves a slot per permit up front, so the limit keeps
/// that reservation small enough to never fail.
pub const MAX_CAPACITY: usize = 1 << 16;

struct GateInner {
  tokens_tx: async_channel::Sender<()>,
  tokens_rx: async_channel::Receiver<()>,
  capacity: usize,
}

/// Permits at most `capacity` holders at any instant.
///
/// Blocked acquirers are woken in the order they started waiting, so no
/// acquirer starves while permits keep being released. Cloning yields another
/// handle to the same gate.
#[derive(Clone)]
pub struct AdmissionGate {
  inner: Arc<GateInner>,
}

impl AdmissionGate {
  /// Creates a gate with a fixed capacity in `1..=MAX_CAPACITY`.
  pub fn new(capacity: usize) -> Result<Self, DispatchError> {
    if capacity == 0 {
      return Err(DispatchError::InvalidArgument(
        "admission gate capacity must be at least 1".into(),
      ));
    }
    if capacity > MAX_CAPACITY {
      return Err(DispatchError::InvalidArgument(format!(
        "admission gate capacity {} exceeds the maximum of {}",
        capacity, MAX_CAPACITY
      )));
    }
    let (tokens_tx, tokens_rx) = async_channel::bounded(capacity);
    Ok(Self {
      inner: Arc::new(GateInner {
        tokens_tx,
        tokens_rx,
        capacity,
      }),
    })
  }

  /// Waits until fewer than `capacity` permits are outstanding, then takes one.
  pub async fn acquire(&self) -> Result<Permit, DispatchError> {
    // The gate owns both channel ends, so the channel can only be closed by
    // a bug elsewhere.
    self
      .inner
      .tokens_tx
      .send(())
      .await
      .map_err(|_| DispatchError::Internal("admission gate token channel closed".into()))?;
    Ok(Permit {
      gate: self.inner.clone(),
    })
  }

  /// Takes a permit only if one is immediately available.
  pub fn try_acquire(&self) -> Option<Permit> {
    self.inner.tokens_tx.try_send(()).ok().map(|()| Permit {
      gate: self.inner.clone(),
    })
  }

  /// Returns a permit to this gate.
  ///
  /// Equivalent to dropping it, but checks that the permit was issued here.
  ///
  /// # Panics
  /// Panics if `permit` belongs to a different gate.
  pub fn release(&self, permit: Permit) {
    assert!(
      Arc::ptr_eq(&self.inner, &permit.gate),
      "permit released to an admission gate that did not issue it"
    );
    drop(permit);
  }

  /// Maximum number of simultaneously outstanding permits.
  pub fn capacity(&self) -> usize {
    self.inner.capacity
  }

  /// Number of permits currently held.
  pub fn outstanding(&self) -> usize {
    self.inner.tokens_tx.len()
  }

  /// Number of permits that could be acquired right now without waiting.
  pub fn available(&self) -> usize {
    self.inner.capacity.saturating_sub(self.outstanding())
  }
}

impl fmt::Debug for AdmissionGate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AdmissionGate")
      .field("capacity", &self.capacity())
      .field("outstanding", &self.outstanding())
      .finish()
  }
}

/// Proof of admission. Releases its token exactly once, when dropped.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit {
  gate: Arc<GateInner>,
}

impl Drop for Permit {
  fn drop(&mut self) {
    if self.gate.tokens_rx.try_recv().is_err() && !std::thread::panicking() {
      panic!("admission gate released more permits than were acquired");
    }
  }
}

impl fmt::Debug for Permit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Permit").field("capacity", &self.gate.capacity).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;
  use tokio::time::timeout;

  #[test]
  fn zero_capacity_is_rejected() {
    assert!(matches!(AdmissionGate::new(0), Err(DispatchError::InvalidArgument(_))));
  }

  #[tokio::test]
  async fn counts_outstanding_permits() {
    let gate = AdmissionGate::new(2).unwrap();
    assert_eq!(gate.outstanding(), 0);

    let first = gate.acquire().await.unwrap();
    let second = gate.try_acquire().expect("second permit is available");
    assert_eq!(gate.outstanding(), 2);
    assert_eq!(gate.available(), 0);
    assert!(gate.try_acquire().is_none());

    gate.release(first);
    assert_eq!(gate.outstanding(), 1);
    drop(second);
    assert_eq!(gate.outstanding(), 0);
  }

  #[tokio::test]
  async fn acquire_waits_for_a_release() {
    let gate = AdmissionGate::new(1).unwrap();
    let held = gate.acquire().await.unwrap();

    let waiter = {
      let gate = gate.clone();
      tokio::spawn(async move { gate.acquire().await.map(|_permit| ()) })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished(), "acquire must block while the gate is full");

    drop(held);
    timeout(Duration::from_secs(1), waiter)
      .await
      .expect("waiter proceeds after release")
      .unwrap()
      .unwrap();
    assert_eq!(gate.outstanding(), 0);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn never_exceeds_capacity() {
    let gate = AdmissionGate::new(3).unwrap();
    let current = std::sync::Arc::new(AtomicUsize::new(0));
    let peak = std::sync::Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..50 {
      let gate = gate.clone();
      let current = current.clone();
      let peak = peak.clone();
      handles.push(tokio::spawn(async move {
        let _permit = gate.acquire().await.unwrap();
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        current.fetch_sub(1, Ordering::SeqCst);
      }));
    }
    for handle in handles {
      handle.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(gate.outstanding(), 0);
  }

  #[tokio::test]
  #[should_panic(expected = "released more permits than were acquired")]
  async fn releasing_a_token_that_was_never_acquired_panics() {
    let gate = AdmissionGate::new(2).unwrap();
    let permit = gate.acquire().await.unwrap();
    // A second permit for the same token, so the token is released twice.
    let duplicate = Permit {
      gate: gate.inner.clone(),
    };
    drop(permit);
    assert_eq!(gate.outstanding(), 0);
    drop(duplicate);
  }

  #[test]
  fn huge_capacity_is_rejected_without_allocating() {
    for capacity in [MAX_CAPACITY + 1, 1usize << 40, usize::MAX] {
      assert!(
        matches!(AdmissionGate::new(capacity), Err(DispatchError::InvalidArgument(_))),
        "capacity {} accepted",
        capacity
      );
    }
    let gate = AdmissionGate::new(MAX_CAPACITY).unwrap();
    assert_eq!(gate.available(), MAX_CAPACITY);
  }

  #[tokio::test]
  #[should_panic(expected = "did not issue it")]
  async fn release_to_foreign_gate_panics() {
    let a = AdmissionGate::new(1).unwrap();
    let b = AdmissionGate::new(1).unwrap();
    let permit = a.acquire().await.unwrap();
    b.release(permit);
  }
}

use std::sync::Arc;

use parking_lot::Mutex;

use super::{Subscription, SubscriptionLike};

/// Holds at most one live subscription; replacing it unsubscribes the
/// previous one. Used wherever a state machine keeps "the current timer" or
/// "the current inner subscription".
#[derive(Clone, Default)]
pub struct SerialSubscription {
  inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
  closed: bool,
  current: Option<Subscription>,
}

impl SerialSubscription {
  pub fn new() -> Self { Self::default() }

  /// Install `subscription` as the current one. The replaced subscription,
  /// or the new one if this serial is already closed, is unsubscribed
  /// outside the lock.
  pub fn set(&self, subscription: Subscription) {
    let stale = {
      let mut inner = self.inner.lock();
      if inner.closed {
        Some(subscription)
      } else {
        inner.current.replace(subscription)
      }
    };
    if let Some(stale) = stale {
      stale.unsubscribe();
    }
  }
}

impl SubscriptionLike for SerialSubscription {
  fn unsubscribe(&self) {
    let current = {
      let mut inner = self.inner.lock();
      if inner.closed {
        return;
      }
      inner.closed = true;
      inner.current.take()
    };
    if let Some(current) = current {
      current.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.inner.lock().closed }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;

  #[test]
  fn replace_disposes_previous() {
    let count = Arc::new(AtomicUsize::new(0));
    let serial = SerialSubscription::new();
    let c = count.clone();
    serial.set(Subscription::from_fn(move || {
      c.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(count.load(Ordering::SeqCst), 0);
    serial.set(Subscription::empty());
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn set_after_close_disposes_newcomer() {
    let count = Arc::new(AtomicUsize::new(0));
    let serial = SerialSubscription::new();
    serial.unsubscribe();
    let c = count.clone();
    serial.set(Subscription::from_fn(move || {
      c.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }
}

use std::sync::Arc;

use parking_lot::Mutex;

use super::{Subscription, SubscriptionLike};

/// A slot that accepts exactly one subscription.
///
/// Assigning twice is a programmer error and panics: the slot exists to hand
/// out a cancellation handle *before* the subscription it will cancel is
/// produced, and a second assignment means the caller's wiring is wrong.
#[derive(Clone, Default)]
pub struct SingleAssignmentSubscription {
  inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
  closed: bool,
  assigned: bool,
  current: Option<Subscription>,
}

impl SingleAssignmentSubscription {
  pub fn new() -> Self { Self::default() }

  /// # Panics
  ///
  /// Panics if a subscription was already assigned.
  pub fn set(&self, subscription: Subscription) {
    let late = {
      let mut inner = self.inner.lock();
      assert!(!inner.assigned, "SingleAssignmentSubscription assigned twice");
      inner.assigned = true;
      if inner.closed {
        true
      } else {
        inner.current = Some(subscription.clone());
        false
      }
    };
    if late {
      subscription.unsubscribe();
    }
  }
}

impl SubscriptionLike for SingleAssignmentSubscription {
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

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::{Subscription, SubscriptionLike};

/// A group of subscriptions disposed together.
///
/// Adding to an already-unsubscribed composite unsubscribes the newcomer
/// immediately, so a subscription handed over after the group was torn down
/// cannot leak.
#[derive(Clone, Default)]
pub struct CompositeSubscription {
  inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
  closed: bool,
  members: SmallVec<[Subscription; 2]>,
}

impl CompositeSubscription {
  pub fn new() -> Self { Self::default() }

  pub fn add(&self, subscription: Subscription) {
    let late = {
      let mut inner = self.inner.lock();
      if inner.closed {
        true
      } else {
        // Drop members that already finished so long-lived composites
        // (merge with many inners) do not grow without bound.
        inner.members.retain(|m| !m.is_closed());
        inner.members.push(subscription.clone());
        false
      }
    };
    if late {
      subscription.unsubscribe();
    }
  }

  pub fn len(&self) -> usize { self.inner.lock().members.len() }

  pub fn is_empty(&self) -> bool { self.inner.lock().members.is_empty() }
}

impl SubscriptionLike for CompositeSubscription {
  fn unsubscribe(&self) {
    let members = {
      let mut inner = self.inner.lock();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.members)
    };
    // Members tear down outside the lock: one of them may synchronously
    // dispose this composite again, which must be a no-op rather than a
    // deadlock.
    for member in members {
      member.unsubscribe();
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

  fn counting(count: &Arc<AtomicUsize>) -> Subscription {
    let c = count.clone();
    Subscription::from_fn(move || {
      c.fetch_add(1, Ordering::SeqCst);
    })
  }

  #[test]
  fn disposes_all_members() {
    let count = Arc::new(AtomicUsize::new(0));
    let group = CompositeSubscription::new();
    for _ in 0..3 {
      group.add(counting(&count));
    }
    group.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 3);
    group.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn late_add_disposes_immediately() {
    let count = Arc::new(AtomicUsize::new(0));
    let group = CompositeSubscription::new();
    group.unsubscribe();
    group.add(counting(&count));
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn reentrant_unsubscribe_from_member() {
    let group = CompositeSubscription::new();
    let inner = group.clone();
    group.add(Subscription::from_fn(move || inner.unsubscribe()));
    group.unsubscribe();
    assert!(group.is_closed());
  }

  #[test]
  fn closed_members_are_pruned() {
    let group = CompositeSubscription::new();
    let done = Subscription::from_fn(|| {});
    done.unsubscribe();
    group.add(done);
    group.add(Subscription::from_fn(|| {}));
    assert_eq!(group.len(), 1);
  }
}

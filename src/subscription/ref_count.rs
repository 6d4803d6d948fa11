use std::sync::Arc;

use parking_lot::Mutex;

use super::{Subscription, SubscriptionLike};

/// Shares ownership of a wrapped subscription through `retain` tokens.
///
/// The wrapped subscription is unsubscribed only once the primary handle has
/// been unsubscribed *and* every outstanding token has been released,
/// whichever happens last.
#[derive(Clone)]
pub struct RefCountSubscription {
  inner: Arc<Mutex<Inner>>,
}

struct Inner {
  primary_closed: bool,
  count: usize,
  wrapped: Option<Subscription>,
}

impl RefCountSubscription {
  pub fn new(wrapped: Subscription) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner { primary_closed: false, count: 0, wrapped: Some(wrapped) })),
    }
  }

  /// Hand out a token keeping the wrapped subscription alive. Unsubscribing
  /// the token releases it; releasing a token twice is a no-op.
  pub fn retain(&self) -> Subscription {
    {
      let mut inner = self.inner.lock();
      if inner.wrapped.is_none() {
        // Already torn down; the token has nothing to keep alive.
        return Subscription::empty();
      }
      inner.count += 1;
    }
    let shared = self.inner.clone();
    Subscription::from_fn(move || {
      let wrapped = {
        let mut inner = shared.lock();
        inner.count -= 1;
        if inner.primary_closed && inner.count == 0 { inner.wrapped.take() } else { None }
      };
      if let Some(wrapped) = wrapped {
        wrapped.unsubscribe();
      }
    })
  }
}

impl SubscriptionLike for RefCountSubscription {
  fn unsubscribe(&self) {
    let wrapped = {
      let mut inner = self.inner.lock();
      inner.primary_closed = true;
      if inner.count == 0 { inner.wrapped.take() } else { None }
    };
    if let Some(wrapped) = wrapped {
      wrapped.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    let inner = self.inner.lock();
    inner.primary_closed && inner.wrapped.is_none()
  }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;

  fn tracked() -> (RefCountSubscription, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let sub = RefCountSubscription::new(Subscription::from_fn(move || {
      c.fetch_add(1, Ordering::SeqCst);
    }));
    (sub, count)
  }

  #[test]
  fn waits_for_all_tokens() {
    let (sub, count) = tracked();
    let t1 = sub.retain();
    let t2 = sub.retain();
    sub.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    t1.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    t2.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn waits_for_primary() {
    let (sub, count) = tracked();
    let token = sub.retain();
    token.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    sub.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn no_tokens_disposes_immediately() {
    let (sub, count) = tracked();
    sub.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn retain_after_teardown_is_inert() {
    let (sub, count) = tracked();
    sub.unsubscribe();
    let token = sub.retain();
    assert!(token.is_closed());
    token.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }
}

//! Cancellation handles.
//!
//! Every `subscribe` and `schedule` call returns a [`Subscription`]. The
//! shared contract: `unsubscribe` is idempotent, thread-safe, and may be
//! called from inside an in-flight event callback without deadlocking;
//! teardown actions always run outside the internal locks.

use std::sync::Arc;

use parking_lot::Mutex;

mod composite;
mod ref_count;
mod serial;
mod single_assignment;
pub use composite::CompositeSubscription;
pub use ref_count::RefCountSubscription;
pub use serial::SerialSubscription;
pub use single_assignment::SingleAssignmentSubscription;

/// The cancellation contract.
pub trait SubscriptionLike: Send + Sync {
  /// Release the resources held by this handle. Calling it more than once
  /// has the same observable effect as calling it once.
  fn unsubscribe(&self);

  fn is_closed(&self) -> bool;
}

/// A cheaply clonable, type-erased subscription handle.
///
/// The default value is an already-closed handle that does nothing.
#[derive(Clone, Default)]
pub struct Subscription(Option<Arc<dyn SubscriptionLike>>);

impl Subscription {
  pub fn new(inner: impl SubscriptionLike + 'static) -> Self { Self(Some(Arc::new(inner))) }

  /// A handle that holds nothing and reports itself closed.
  pub fn empty() -> Self { Self(None) }

  /// Wrap a teardown action that runs exactly once, on the first
  /// `unsubscribe`.
  pub fn from_fn(f: impl FnOnce() + Send + 'static) -> Self {
    Self::new(FnSubscription { action: Mutex::new(Some(Box::new(f))) })
  }
}

impl SubscriptionLike for Subscription {
  fn unsubscribe(&self) {
    if let Some(inner) = &self.0 {
      inner.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.as_ref().map_or(true, |inner| inner.is_closed()) }
}

struct FnSubscription {
  action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl SubscriptionLike for FnSubscription {
  fn unsubscribe(&self) {
    // Take the action under the lock, run it outside.
    let action = self.action.lock().take();
    if let Some(action) = action {
      action();
    }
  }

  fn is_closed(&self) -> bool { self.action.lock().is_none() }
}

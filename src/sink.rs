//! The subscription engine every producer runs against.
//!
//! A [`Sink`] owns exactly one downstream observer and the set of upstream
//! subscriptions feeding it. Forwarding checks the disposed flag first and is
//! a no-op afterwards; forwarding a terminal event takes the observer out,
//! delivers outside the lock, and then cascade-disposes the upstream
//! subscriptions. The double-disposal path (the sink disposing itself after
//! a terminal while the caller disposes the returned handle) is idempotent.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::{
  diagnostics::Diagnostics,
  event::Event,
  observer::{BoxObserver, Observer},
  subscription::{CompositeSubscription, Subscription, SubscriptionLike},
  sync::ReentrantLock,
};

pub struct Sink<Item, Err> {
  shared: Arc<Shared<Item, Err>>,
}

struct Shared<Item, Err> {
  slot: ReentrantLock<Option<BoxObserver<Item, Err>>>,
  disposed: AtomicBool,
  upstream: CompositeSubscription,
  diagnostics: Arc<Diagnostics>,
}

impl<Item, Err> Clone for Sink<Item, Err> {
  fn clone(&self) -> Self { Self { shared: self.shared.clone() } }
}

impl<Item, Err> Sink<Item, Err> {
  pub(crate) fn new(observer: BoxObserver<Item, Err>, diagnostics: Arc<Diagnostics>) -> Self {
    diagnostics.record_sink_created();
    Self {
      shared: Arc::new(Shared {
        slot: ReentrantLock::new(Some(observer)),
        disposed: AtomicBool::new(false),
        upstream: CompositeSubscription::new(),
        diagnostics,
      }),
    }
  }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.shared.disposed.load(Ordering::Acquire) }

  pub(crate) fn diagnostics(&self) -> &Arc<Diagnostics> { &self.shared.diagnostics }

  /// Tie an upstream subscription to this sink's lifetime. If the sink is
  /// already disposed the subscription is unsubscribed immediately.
  pub fn add_upstream(&self, subscription: Subscription) { self.shared.upstream.add(subscription); }

  /// Forward a value downstream. No-op once disposed; a reentrant call into
  /// an observer that is already on this thread's stack is dropped and
  /// counted as an anomaly.
  pub fn next(&self, value: Item) {
    if self.is_disposed() {
      return;
    }
    let guard = self.shared.slot.lock();
    let delivered = guard.try_with(|slot| {
      if let Some(observer) = slot.as_mut() {
        observer.next(value);
      }
    });
    if delivered.is_none() {
      self.shared.diagnostics.record_reentrancy_anomaly();
      return;
    }
    // The observer may have disposed its own subscription from inside the
    // call above; the flag is set but the slot could not be cleared while
    // borrowed. Release the observer now.
    if self.is_disposed() {
      let stale = guard.try_with(|slot| slot.take());
      drop(guard);
      drop(stale);
    }
  }

  /// Forward the failure terminal event, then dispose.
  pub fn error(&self, err: Err) { self.terminate(Some(err)); }

  /// Forward the completion terminal event, then dispose.
  pub fn complete(&self) { self.terminate(None); }

  pub fn forward(&self, event: Event<Item, Err>) {
    match event {
      Event::Next(value) => self.next(value),
      Event::Error(err) => self.error(err),
      Event::Completed => self.complete(),
    }
  }

  fn terminate(&self, err: Option<Err>) {
    let taken = {
      let guard = self.shared.slot.lock();
      guard.try_with(|slot| slot.take())
    };
    let Some(observer) = taken else {
      self.shared.diagnostics.record_reentrancy_anomaly();
      return;
    };
    let first = !self.shared.disposed.swap(true, Ordering::AcqRel);
    if first {
      // Terminal delivery happens outside any lock, so an observer that
      // synchronously resubscribes (retry) or unsubscribes re-enters
      // nothing.
      if let Some(mut observer) = observer {
        match err {
          Some(err) => observer.error(err),
          None => observer.complete(),
        }
      }
      self.shared.upstream.unsubscribe();
      self.shared.diagnostics.record_sink_disposed();
    }
  }

  fn dispose(&self) {
    let first = !self.shared.disposed.swap(true, Ordering::AcqRel);
    let taken = {
      let guard = self.shared.slot.lock();
      // May fail during an in-flight delivery on this thread; `next` clears
      // the slot right after the call returns.
      guard.try_with(|slot| slot.take())
    };
    drop(taken);
    if first {
      self.shared.upstream.unsubscribe();
      self.shared.diagnostics.record_sink_disposed();
    }
  }
}

/// A sink is itself an observer, which lets operators plug one stage's sink
/// straight into another observable (`defer`, `catch_error` fallbacks, the
/// `create` closure).
impl<Item, Err> Observer<Item, Err> for Sink<Item, Err> {
  fn next(&mut self, value: Item) { Sink::next(self, value) }

  fn error(&mut self, err: Err) { Sink::error(self, err) }

  fn complete(&mut self) { Sink::complete(self) }

  fn is_closed(&self) -> bool { self.is_disposed() }
}

impl<Item, Err> SubscriptionLike for Sink<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn unsubscribe(&self) { self.dispose(); }

  fn is_closed(&self) -> bool { self.is_disposed() }
}

//! The Observable core: a lazy description of how to produce an event
//! stream, erased behind [`Producer`].
//!
//! `subscribe` builds a [`Sink`] around the caller's observer, hands it to
//! the producer's `run`, and returns the sink as the cancellation handle.
//! Every subscription is independent (cold) unless the pipeline goes through
//! a Subject or a connectable.

use std::sync::Arc;

use crate::{
  diagnostics::Diagnostics,
  observer::{CallbackObserver, Observer},
  sink::Sink,
  subscription::Subscription,
};

mod connectable;
mod create;
mod defer;
mod from_iter;
mod interval;
mod of;
mod timer;
mod trivial;
pub use connectable::ConnectableObservable;
pub use create::create;
pub use defer::defer;
pub use from_iter::from_iter;
pub use interval::interval;
pub use of::of;
pub use timer::timer;
pub use trivial::{empty, never, throw};

/// The single entry point every source and operator implements.
///
/// `run` receives the sink built by the engine; it subscribes the sink (or
/// observers derived from it) to its upstream source(s), registering every
/// upstream subscription with the sink so disposal cascades.
pub trait Producer: Send + Sync {
  type Item;
  type Err;

  fn run(&self, sink: Sink<Self::Item, Self::Err>);
}

/// A cheaply clonable handle to a stream description.
pub struct Observable<Item, Err> {
  source: Arc<dyn Producer<Item = Item, Err = Err>>,
}

impl<Item, Err> Clone for Observable<Item, Err> {
  fn clone(&self) -> Self { Self { source: self.source.clone() } }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  pub fn from_producer(producer: impl Producer<Item = Item, Err = Err> + 'static) -> Self {
    Self { source: Arc::new(producer) }
  }

  /// Subscribe with a full observer, using the global diagnostics context.
  pub fn subscribe_observer(&self, observer: impl Observer<Item, Err> + Send + 'static) -> Subscription {
    self.subscribe_observer_with(observer, Diagnostics::global())
  }

  /// Subscribe with an explicit [`Diagnostics`] context. The context is
  /// inherited by every stage the pipeline creates under this subscription.
  pub fn subscribe_observer_with(
    &self, observer: impl Observer<Item, Err> + Send + 'static, diagnostics: Arc<Diagnostics>,
  ) -> Subscription {
    let sink = Sink::new(Box::new(observer), diagnostics);
    let handle = Subscription::new(sink.clone());
    self.source.run(sink);
    handle
  }

  /// Subscribe caring only about values.
  pub fn subscribe(&self, next: impl FnMut(Item) + Send + 'static) -> Subscription {
    self.subscribe_observer(CallbackObserver::new(next, |_err: Err| {}, || {}))
  }

  pub fn subscribe_err(
    &self, next: impl FnMut(Item) + Send + 'static, error: impl FnMut(Err) + Send + 'static,
  ) -> Subscription {
    self.subscribe_observer(CallbackObserver::new(next, error, || {}))
  }

  pub fn subscribe_complete(
    &self, next: impl FnMut(Item) + Send + 'static, complete: impl FnMut() + Send + 'static,
  ) -> Subscription {
    self.subscribe_observer(CallbackObserver::new(next, |_err: Err| {}, complete))
  }

  pub fn subscribe_all(
    &self, next: impl FnMut(Item) + Send + 'static, error: impl FnMut(Err) + Send + 'static,
    complete: impl FnMut() + Send + 'static,
  ) -> Subscription {
    self.subscribe_observer(CallbackObserver::new(next, error, complete))
  }

  /// Subscribe an intermediate stage: the upstream sink is registered with
  /// `parent` *before* the producer runs, so a terminal event forwarded
  /// synchronously during emission can still cancel a busy upstream (the
  /// `take`-on-an-infinite-source case). All operators chain through here.
  pub(crate) fn attach<PItem, PErr>(
    &self, observer: impl Observer<Item, Err> + Send + 'static, parent: &Sink<PItem, PErr>,
  ) -> Subscription
  where
    PItem: Send + 'static,
    PErr: Send + 'static,
  {
    let sink = Sink::new(Box::new(observer), parent.diagnostics().clone());
    let handle = Subscription::new(sink.clone());
    parent.add_upstream(handle.clone());
    self.source.run(sink);
    handle
  }
}

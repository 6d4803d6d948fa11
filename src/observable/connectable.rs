use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  observer::BoxObserver,
  sink::Sink,
  subject::{BehaviorSubject, PublishSubject, ReplaySubject},
  subscription::{RefCountSubscription, Subscription, SubscriptionLike},
};

use super::{Observable, Producer};

/// The two faces a subject shows a connectable: somewhere to subscribe and
/// somewhere to feed the upstream into.
trait Multicast<Item, Err>: Send + Sync {
  fn observable(&self) -> Observable<Item, Err>;
  fn observer(&self) -> BoxObserver<Item, Err>;
}

impl<Item, Err> Multicast<Item, Err> for PublishSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn observable(&self) -> Observable<Item, Err> { PublishSubject::observable(self) }

  fn observer(&self) -> BoxObserver<Item, Err> { Box::new(self.clone()) }
}

impl<Item, Err> Multicast<Item, Err> for ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn observable(&self) -> Observable<Item, Err> { ReplaySubject::observable(self) }

  fn observer(&self) -> BoxObserver<Item, Err> { Box::new(self.clone()) }
}

impl<Item, Err> Multicast<Item, Err> for BehaviorSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn observable(&self) -> Observable<Item, Err> { BehaviorSubject::observable(self) }

  fn observer(&self) -> BoxObserver<Item, Err> { Box::new(self.clone()) }
}

/// A cold source multiplexed through a subject.
///
/// Subscribers attach to the subject; the source runs only when [`connect`]
/// is called, and exactly one upstream subscription is shared by everyone.
/// [`ref_count`] automates connect/disconnect around the subscriber count
/// and discards the spent subject on disconnect, so the cycle can restart
/// with a fresh one.
///
/// [`connect`]: ConnectableObservable::connect
/// [`ref_count`]: ConnectableObservable::ref_count
pub struct ConnectableObservable<Item, Err> {
  inner: Arc<Inner<Item, Err>>,
}

impl<Item, Err> Clone for ConnectableObservable<Item, Err> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

struct Inner<Item, Err> {
  source: Observable<Item, Err>,
  make_subject: Box<dyn Fn() -> Arc<dyn Multicast<Item, Err>> + Send + Sync>,
  state: Mutex<State<Item, Err>>,
}

struct State<Item, Err> {
  subject: Option<Arc<dyn Multicast<Item, Err>>>,
  connection: Option<Subscription>,
  // One per ref_count cycle; its retain tokens are what subscribers hold.
  ref_count: Option<RefCountSubscription>,
}

impl<Item, Err> ConnectableObservable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn with_factory(
    source: Observable<Item, Err>,
    make_subject: Box<dyn Fn() -> Arc<dyn Multicast<Item, Err>> + Send + Sync>,
  ) -> Self {
    Self {
      inner: Arc::new(Inner {
        source,
        make_subject,
        state: Mutex::new(State { subject: None, connection: None, ref_count: None }),
      }),
    }
  }

  /// Subscribers attach to the shared subject without triggering the source.
  pub fn observable(&self) -> Observable<Item, Err> {
    Observable::from_producer(ConnectableProducer { inner: self.inner.clone() })
  }

  /// Start the shared upstream subscription. Calling again while a
  /// connection is live returns a handle to the same connection; after a
  /// disconnect, a new connection feeds the same subject.
  pub fn connect(&self) -> Subscription {
    let mut state = self.inner.state.lock();
    if let Some(connection) = &state.connection {
      if !connection.is_closed() {
        return connection.clone();
      }
    }
    let subject = self.inner.subject(&mut state);
    let feed = self.inner.source.subscribe_observer(subject.observer());
    let connection = Subscription::new(ConnectionHandle { inner: self.inner.clone(), feed });
    state.connection = Some(connection.clone());
    connection
  }

  /// Connect on the first subscriber, disconnect and discard the subject
  /// when the last one leaves.
  pub fn ref_count(&self) -> Observable<Item, Err> {
    Observable::from_producer(RefCountProducer { inner: self.inner.clone() })
  }
}

impl<Item, Err> Inner<Item, Err> {
  fn subject(&self, state: &mut State<Item, Err>) -> Arc<dyn Multicast<Item, Err>> {
    state.subject.get_or_insert_with(|| (self.make_subject)()).clone()
  }

  fn disconnect_and_discard(&self) {
    let (connection, _subject, _ref_count) = {
      let mut state = self.state.lock();
      (state.connection.take(), state.subject.take(), state.ref_count.take())
    };
    if let Some(connection) = connection {
      connection.unsubscribe();
    }
  }
}

struct ConnectionHandle<Item, Err> {
  inner: Arc<Inner<Item, Err>>,
  feed: Subscription,
}

impl<Item, Err> SubscriptionLike for ConnectionHandle<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn unsubscribe(&self) {
    self.feed.unsubscribe();
    let mut state = self.inner.state.lock();
    if let Some(connection) = &state.connection {
      if connection.is_closed() {
        state.connection = None;
      }
    }
  }

  fn is_closed(&self) -> bool { self.feed.is_closed() }
}

struct ConnectableProducer<Item, Err> {
  inner: Arc<Inner<Item, Err>>,
}

impl<Item, Err> Producer for ConnectableProducer<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let subject = {
      let mut state = self.inner.state.lock();
      self.inner.subject(&mut state)
    };
    subject.observable().attach(sink.clone(), &sink);
  }
}

struct RefCountProducer<Item, Err> {
  inner: Arc<Inner<Item, Err>>,
}

impl<Item, Err> Producer for RefCountProducer<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let (subject, token, first) = {
      let mut state = self.inner.state.lock();
      let subject = self.inner.subject(&mut state);
      let (ref_count, first) = match &state.ref_count {
        Some(ref_count) => (ref_count.clone(), false),
        None => {
          let inner = self.inner.clone();
          let ref_count =
            RefCountSubscription::new(Subscription::from_fn(move || inner.disconnect_and_discard()));
          state.ref_count = Some(ref_count.clone());
          (ref_count, true)
        }
      };
      let token = ref_count.retain();
      if first {
        // From here on the retain tokens alone keep the cycle alive.
        ref_count.unsubscribe();
      }
      (subject, token, first)
    };
    sink.add_upstream(token);
    subject.observable().attach(sink.clone(), &sink);
    if first {
      let connectable = ConnectableObservable { inner: self.inner.clone() };
      connectable.connect();
    }
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// Multicast through a fresh [`PublishSubject`].
  pub fn publish(&self) -> ConnectableObservable<Item, Err> {
    ConnectableObservable::with_factory(self.clone(), Box::new(|| Arc::new(PublishSubject::new())))
  }

  /// Multicast through a [`ReplaySubject`] keeping the last `capacity`
  /// values for late subscribers.
  pub fn replay(&self, capacity: usize) -> ConnectableObservable<Item, Err> {
    ConnectableObservable::with_factory(
      self.clone(),
      Box::new(move || Arc::new(ReplaySubject::bounded(capacity))),
    )
  }

  /// `publish().ref_count()`: share one upstream subscription among all
  /// concurrent subscribers.
  pub fn share(&self) -> Observable<Item, Err> { self.publish().ref_count() }
}

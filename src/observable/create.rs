use std::marker::PhantomData;

use crate::{sink::Sink, subscription::Subscription};

use super::{Observable, Producer};

/// Build an observable from a subscribe closure.
///
/// The closure runs once per subscription, receives the sink to emit into
/// and returns a teardown subscription that is released when the stream
/// terminates or the subscriber unsubscribes. Emissions after a terminal
/// event or after disposal are silently dropped, so a sloppy closure cannot
/// break the event grammar downstream.
///
/// ```
/// use rxcore::prelude::*;
///
/// let numbers = create(|sink: Sink<i32, ()>| {
///   sink.next(1);
///   sink.next(2);
///   sink.complete();
///   Subscription::empty()
/// });
/// numbers.subscribe(|v| println!("{v}"));
/// ```
pub fn create<Item, Err, F>(subscribe: F) -> Observable<Item, Err>
where
  F: Fn(Sink<Item, Err>) -> Subscription + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  Observable::from_producer(CreateProducer { subscribe, _hint: PhantomData })
}

struct CreateProducer<F, Item, Err> {
  subscribe: F,
  _hint: PhantomData<fn() -> (Item, Err)>,
}

impl<F, Item, Err> Producer for CreateProducer<F, Item, Err>
where
  F: Fn(Sink<Item, Err>) -> Subscription + Send + Sync,
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let teardown = (self.subscribe)(sink.clone());
    sink.add_upstream(teardown);
  }
}

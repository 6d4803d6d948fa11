use std::marker::PhantomData;

use crate::sink::Sink;

use super::{Observable, Producer};

/// Complete immediately without emitting.
pub fn empty<Item, Err>() -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  Observable::from_producer(EmptyProducer { _hint: PhantomData })
}

/// Never emit and never terminate. Only unsubscribing releases the observer.
pub fn never<Item, Err>() -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  Observable::from_producer(NeverProducer { _hint: PhantomData })
}

/// Fail immediately with `err`.
pub fn throw<Item, Err>(err: Err) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + Sync + 'static,
{
  Observable::from_producer(ThrowProducer { err, _hint: PhantomData })
}

struct EmptyProducer<Item, Err> {
  _hint: PhantomData<fn() -> (Item, Err)>,
}

impl<Item, Err> Producer for EmptyProducer<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) { sink.complete(); }
}

struct NeverProducer<Item, Err> {
  _hint: PhantomData<fn() -> (Item, Err)>,
}

impl<Item, Err> Producer for NeverProducer<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, _sink: Sink<Item, Err>) {}
}

struct ThrowProducer<Item, Err> {
  err: Err,
  _hint: PhantomData<fn() -> Item>,
}

impl<Item, Err> Producer for ThrowProducer<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + Sync + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) { sink.error(self.err.clone()); }
}

use std::marker::PhantomData;

use crate::sink::Sink;

use super::{Observable, Producer};

/// Emit a single value, then complete.
pub fn of<Item, Err>(value: Item) -> Observable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  Observable::from_producer(OfProducer { value, _hint: PhantomData })
}

struct OfProducer<Item, Err> {
  value: Item,
  _hint: PhantomData<fn() -> Err>,
}

impl<Item, Err> Producer for OfProducer<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    sink.next(self.value.clone());
    sink.complete();
  }
}

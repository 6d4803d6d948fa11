use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
};

pub struct FilterOp<Item, Err, F> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) predicate: F,
}

impl<Item, Err, F> Producer for FilterOp<Item, Err, F>
where
  F: Fn(&Item) -> bool + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let observer = FilterObserver { sink: sink.clone(), predicate: self.predicate.clone() };
    self.source.attach(observer, &sink);
  }
}

struct FilterObserver<Item, Err, F> {
  sink: Sink<Item, Err>,
  predicate: F,
}

impl<Item, Err, F> Observer<Item, Err> for FilterObserver<Item, Err, F>
where
  F: Fn(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.predicate)(&value) {
      self.sink.next(value);
    }
  }

  fn error(&mut self, err: Err) { self.sink.error(err) }

  fn complete(&mut self) { self.sink.complete() }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Drop values the predicate rejects.
  pub fn filter<F>(&self, predicate: F) -> Observable<Item, Err>
  where
    F: Fn(&Item) -> bool + Clone + Send + Sync + 'static,
  {
    Observable::from_producer(FilterOp { source: self.clone(), predicate })
  }
}

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
};

pub struct MapOp<Item, Err, F> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) transform: F,
}

impl<Item, Err, Out, F> Producer for MapOp<Item, Err, F>
where
  F: Fn(Item) -> Out + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Out: Send + 'static,
{
  type Item = Out;
  type Err = Err;

  fn run(&self, sink: Sink<Out, Err>) {
    let observer = MapObserver { sink: sink.clone(), transform: self.transform.clone() };
    self.source.attach(observer, &sink);
  }
}

struct MapObserver<Out, Err, F> {
  sink: Sink<Out, Err>,
  transform: F,
}

impl<Item, Err, Out, F> Observer<Item, Err> for MapObserver<Out, Err, F>
where
  F: Fn(Item) -> Out,
{
  fn next(&mut self, value: Item) { self.sink.next((self.transform)(value)) }

  fn error(&mut self, err: Err) { self.sink.error(err) }

  fn complete(&mut self) { self.sink.complete() }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Transform every value with `transform`, leaving errors and completion
  /// untouched.
  pub fn map<Out, F>(&self, transform: F) -> Observable<Out, Err>
  where
    F: Fn(Item) -> Out + Clone + Send + Sync + 'static,
    Out: Send + 'static,
  {
    Observable::from_producer(MapOp { source: self.clone(), transform })
  }
}

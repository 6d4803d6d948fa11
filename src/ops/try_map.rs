use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
};

pub struct TryMapOp<Item, Err, F> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) transform: F,
}

impl<Item, Err, Out, F> Producer for TryMapOp<Item, Err, F>
where
  F: Fn(Item) -> Result<Out, Err> + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Out: Send + 'static,
{
  type Item = Out;
  type Err = Err;

  fn run(&self, sink: Sink<Out, Err>) {
    let observer = TryMapObserver { sink: sink.clone(), transform: self.transform.clone() };
    self.source.attach(observer, &sink);
  }
}

struct TryMapObserver<Out, Err, F> {
  sink: Sink<Out, Err>,
  transform: F,
}

impl<Item, Err, Out, F> Observer<Item, Err> for TryMapObserver<Out, Err, F>
where
  F: Fn(Item) -> Result<Out, Err>,
{
  fn next(&mut self, value: Item) {
    match (self.transform)(value) {
      Ok(out) => self.sink.next(out),
      Err(err) => self.sink.error(err),
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
  /// Like `map`, but a failed transform fails the stream: the `Err` channel
  /// is how user code reports conversion failures, since an emission
  /// callback has nowhere to return an error.
  pub fn try_map<Out, F>(&self, transform: F) -> Observable<Out, Err>
  where
    F: Fn(Item) -> Result<Out, Err> + Clone + Send + Sync + 'static,
    Out: Send + 'static,
  {
    Observable::from_producer(TryMapOp { source: self.clone(), transform })
  }
}

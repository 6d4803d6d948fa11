use std::{sync::Arc, time::Duration};

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  scheduler::Scheduler,
  sink::Sink,
};

pub struct TakeOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) count: usize,
}

impl<Item, Err> Producer for TakeOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    if self.count == 0 {
      sink.complete();
      return;
    }
    let observer = TakeObserver { sink: sink.clone(), remaining: self.count };
    self.source.attach(observer, &sink);
  }
}

struct TakeObserver<Item, Err> {
  sink: Sink<Item, Err>,
  remaining: usize,
}

impl<Item, Err> Observer<Item, Err> for TakeObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      return;
    }
    self.remaining -= 1;
    self.sink.next(value);
    // Completing here disposes the downstream sink, which cascades the
    // cancellation into a still-emitting source.
    if self.remaining == 0 {
      self.sink.complete();
    }
  }

  fn error(&mut self, err: Err) { self.sink.error(err) }

  fn complete(&mut self) { self.sink.complete() }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

pub struct TakeTimeOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) window: Duration,
  pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<Item, Err> Producer for TakeTimeOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let deadline_sink = sink.clone();
    let deadline = self
      .scheduler
      .schedule_after(self.window, Box::new(move || deadline_sink.complete()));
    sink.add_upstream(deadline);
    self.source.attach(sink.clone(), &sink);
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Pass through the first `count` values, then complete and cancel the
  /// source. `take(0)` completes at subscription without running the source.
  pub fn take(&self, count: usize) -> Observable<Item, Err> {
    Observable::from_producer(TakeOp { source: self.clone(), count })
  }

  /// Mirror the source for `window`, then complete and cancel it.
  pub fn take_time(&self, window: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<Item, Err> {
    Observable::from_producer(TakeTimeOp { source: self.clone(), window, scheduler })
  }
}

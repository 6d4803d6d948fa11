use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::Duration,
};

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  scheduler::Scheduler,
  sink::Sink,
};

pub struct SkipOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) count: usize,
}

impl<Item, Err> Producer for SkipOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let observer = SkipObserver { sink: sink.clone(), remaining: self.count };
    self.source.attach(observer, &sink);
  }
}

struct SkipObserver<Item, Err> {
  sink: Sink<Item, Err>,
  remaining: usize,
}

impl<Item, Err> Observer<Item, Err> for SkipObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if self.remaining > 0 {
      self.remaining -= 1;
      return;
    }
    self.sink.next(value);
  }

  fn error(&mut self, err: Err) { self.sink.error(err) }

  fn complete(&mut self) { self.sink.complete() }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

pub struct SkipTimeOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) window: Duration,
  pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<Item, Err> Producer for SkipTimeOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let open = Arc::new(AtomicBool::new(false));
    let gate = open.clone();
    let timer = self
      .scheduler
      .schedule_after(self.window, Box::new(move || gate.store(true, Ordering::Release)));
    sink.add_upstream(timer);
    let observer = SkipTimeObserver { sink: sink.clone(), open };
    self.source.attach(observer, &sink);
  }
}

struct SkipTimeObserver<Item, Err> {
  sink: Sink<Item, Err>,
  open: Arc<AtomicBool>,
}

impl<Item, Err> Observer<Item, Err> for SkipTimeObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if self.open.load(Ordering::Acquire) {
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
  /// Drop the first `count` values, then mirror the rest.
  pub fn skip(&self, count: usize) -> Observable<Item, Err> {
    Observable::from_producer(SkipOp { source: self.clone(), count })
  }

  /// Drop everything emitted during the first `window`, then mirror the
  /// rest. Terminal events always pass through.
  pub fn skip_time(&self, window: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<Item, Err> {
    Observable::from_producer(SkipTimeOp { source: self.clone(), window, scheduler })
  }
}

use std::{
  sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
  },
  time::Duration,
};

use crate::{
  error::SequenceError,
  observable::{Observable, Producer},
  observer::Observer,
  scheduler::Scheduler,
  sink::Sink,
  subscription::{SerialSubscription, Subscription},
};

pub struct TimeoutOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) due: Duration,
  pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<Item, Err> Producer for TimeoutOp<Item, Err>
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let generation = Arc::new(AtomicU64::new(0));
    let timer = SerialSubscription::new();
    sink.add_upstream(Subscription::new(timer.clone()));
    let observer = TimeoutObserver {
      sink: sink.clone(),
      due: self.due,
      scheduler: self.scheduler.clone(),
      generation,
      timer,
    };
    observer.arm(0);
    self.source.attach(observer, &sink);
  }
}

struct TimeoutObserver<Item, Err> {
  sink: Sink<Item, Err>,
  due: Duration,
  scheduler: Arc<dyn Scheduler>,
  generation: Arc<AtomicU64>,
  timer: SerialSubscription,
}

impl<Item, Err> TimeoutObserver<Item, Err>
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  /// Arm the deadline for the current generation; a value arriving first
  /// bumps the generation, so a stale timer firing late is a no-op.
  fn arm(&self, generation: u64) {
    let sink = self.sink.clone();
    let seen = self.generation.clone();
    let pending = self.scheduler.schedule_after(
      self.due,
      Box::new(move || {
        if seen.load(Ordering::Acquire) == generation {
          sink.error(SequenceError::Timeout.into());
        }
      }),
    );
    self.timer.set(pending);
  }
}

impl<Item, Err> Observer<Item, Err> for TimeoutObserver<Item, Err>
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  fn next(&mut self, value: Item) {
    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
    self.sink.next(value);
    if !self.sink.is_disposed() {
      self.arm(generation);
    }
  }

  fn error(&mut self, err: Err) {
    self.generation.fetch_add(1, Ordering::AcqRel);
    self.sink.error(err);
  }

  fn complete(&mut self) {
    self.generation.fetch_add(1, Ordering::AcqRel);
    self.sink.complete();
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  /// Fail with [`SequenceError::Timeout`] if the gap before the first value,
  /// or between consecutive values, exceeds `due`.
  pub fn timeout(&self, due: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<Item, Err> {
    Observable::from_producer(TimeoutOp { source: self.clone(), due, scheduler })
  }
}

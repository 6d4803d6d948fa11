use std::{
  sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
  },
  time::Duration,
};

use parking_lot::Mutex;

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  scheduler::Scheduler,
  sink::Sink,
  subscription::{SerialSubscription, Subscription},
};

pub struct DebounceOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) quiet: Duration,
  pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<Item, Err> Producer for DebounceOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let timer = SerialSubscription::new();
    sink.add_upstream(Subscription::new(timer.clone()));
    let observer = DebounceObserver {
      sink: sink.clone(),
      quiet: self.quiet,
      scheduler: self.scheduler.clone(),
      pending: Arc::new(Mutex::new(None)),
      generation: Arc::new(AtomicU64::new(0)),
      timer,
    };
    self.source.attach(observer, &sink);
  }
}

struct DebounceObserver<Item, Err> {
  sink: Sink<Item, Err>,
  quiet: Duration,
  scheduler: Arc<dyn Scheduler>,
  pending: Arc<Mutex<Option<Item>>>,
  generation: Arc<AtomicU64>,
  timer: SerialSubscription,
}

impl<Item, Err> Observer<Item, Err> for DebounceObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    // Each value supersedes the pending one and restarts the quiet window.
    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
    *self.pending.lock() = Some(value);
    let sink = self.sink.clone();
    let pending = self.pending.clone();
    let seen = self.generation.clone();
    let fire = self.scheduler.schedule_after(
      self.quiet,
      Box::new(move || {
        if seen.load(Ordering::Acquire) == generation {
          if let Some(value) = pending.lock().take() {
            sink.next(value);
          }
        }
      }),
    );
    self.timer.set(fire);
  }

  fn error(&mut self, err: Err) {
    self.generation.fetch_add(1, Ordering::AcqRel);
    self.pending.lock().take();
    self.sink.error(err);
  }

  fn complete(&mut self) {
    // Completion flushes a pending value that never got its quiet window.
    self.generation.fetch_add(1, Ordering::AcqRel);
    let held = self.pending.lock().take();
    if let Some(value) = held {
      self.sink.next(value);
    }
    self.sink.complete();
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emit a value only after `quiet` has elapsed with nothing newer; a
  /// pending value is flushed by completion.
  pub fn debounce(&self, quiet: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<Item, Err> {
    Observable::from_producer(DebounceOp { source: self.clone(), quiet, scheduler })
  }
}

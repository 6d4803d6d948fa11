use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  scheduler::Scheduler,
  sink::Sink,
  subscription::{SerialSubscription, Subscription},
};

/// Which value of a throttle window gets emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleEdge {
  /// The first value opens the window and is emitted immediately; the rest
  /// of the window is dropped.
  Leading,
  /// Values are collected silently and the most recent one is emitted when
  /// the window closes.
  Trailing,
}

pub struct ThrottleTimeOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) window: Duration,
  pub(crate) edge: ThrottleEdge,
  pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<Item, Err> Producer for ThrottleTimeOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let timer = SerialSubscription::new();
    sink.add_upstream(Subscription::new(timer.clone()));
    let observer = ThrottleObserver {
      sink: sink.clone(),
      window: self.window,
      edge: self.edge,
      scheduler: self.scheduler.clone(),
      trailing: Arc::new(Mutex::new(None)),
      window_open_until: None,
      timer,
    };
    self.source.attach(observer, &sink);
  }
}

struct ThrottleObserver<Item, Err> {
  sink: Sink<Item, Err>,
  window: Duration,
  edge: ThrottleEdge,
  scheduler: Arc<dyn Scheduler>,
  trailing: Arc<Mutex<Option<Item>>>,
  window_open_until: Option<Instant>,
  timer: SerialSubscription,
}

impl<Item, Err> Observer<Item, Err> for ThrottleObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    let now = Instant::now();
    let in_window = self.window_open_until.is_some_and(|until| now < until);
    match self.edge {
      ThrottleEdge::Leading => {
        if !in_window {
          self.window_open_until = Some(now + self.window);
          self.sink.next(value);
        }
      }
      ThrottleEdge::Trailing => {
        *self.trailing.lock() = Some(value);
        if !in_window {
          self.window_open_until = Some(now + self.window);
          let sink = self.sink.clone();
          let trailing = self.trailing.clone();
          let fire = self.scheduler.schedule_after(
            self.window,
            Box::new(move || {
              if let Some(value) = trailing.lock().take() {
                sink.next(value);
              }
            }),
          );
          self.timer.set(fire);
        }
      }
    }
  }

  fn error(&mut self, err: Err) {
    self.trailing.lock().take();
    self.sink.error(err);
  }

  fn complete(&mut self) {
    // A trailing value whose window has not closed yet is flushed.
    let held = self.trailing.lock().take();
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
  /// Rate-limit values to one per `window`, keeping the edge `edge` picks.
  pub fn throttle_time(
    &self, window: Duration, edge: ThrottleEdge, scheduler: Arc<dyn Scheduler>,
  ) -> Observable<Item, Err> {
    Observable::from_producer(ThrottleTimeOp { source: self.clone(), window, edge, scheduler })
  }
}

use std::{sync::Arc, time::Duration};

use crate::{
  observable::{Observable, Producer},
  scheduler::Scheduler,
  sink::Sink,
};

pub struct DelayOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) delay: Duration,
  pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<Item, Err> Producer for DelayOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let source = self.source.clone();
    let subscriber = sink.clone();
    let pending = self.scheduler.schedule_after(
      self.delay,
      Box::new(move || {
        source.attach(subscriber.clone(), &subscriber);
      }),
    );
    sink.add_upstream(pending);
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Shift the whole stream later by delaying the subscription itself; the
  /// relative timing of events is preserved.
  pub fn delay(&self, delay: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<Item, Err> {
    Observable::from_producer(DelayOp { source: self.clone(), delay, scheduler })
  }
}

use std::sync::Arc;

use crate::{
  observable::{Observable, Producer},
  scheduler::Scheduler,
  sink::Sink,
};

pub struct SubscribeOnOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<Item, Err> Producer for SubscribeOnOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let source = self.source.clone();
    let subscriber = sink.clone();
    let scheduled = self.scheduler.schedule(Box::new(move || {
      source.attach(subscriber.clone(), &subscriber);
    }));
    sink.add_upstream(scheduled);
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Run the subscription side effects (the source's `run`) on `scheduler`,
  /// leaving delivery wherever the source emits.
  pub fn subscribe_on(&self, scheduler: Arc<dyn Scheduler>) -> Observable<Item, Err> {
    Observable::from_producer(SubscribeOnOp { source: self.clone(), scheduler })
  }
}

use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;

use crate::{
  event::Event,
  observable::{Observable, Producer},
  observer::Observer,
  scheduler::Scheduler,
  sink::Sink,
  subscription::{SerialSubscription, Subscription},
};

pub struct ObserveOnOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<Item, Err> Producer for ObserveOnOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let drain_task = SerialSubscription::new();
    sink.add_upstream(Subscription::new(drain_task.clone()));
    let observer = ObserveOnObserver {
      sink: sink.clone(),
      scheduler: self.scheduler.clone(),
      queue: Arc::new(Mutex::new(VecDeque::new())),
      draining: Arc::new(AtomicBool::new(false)),
      drain_task,
    };
    self.source.attach(observer, &sink);
  }
}

struct ObserveOnObserver<Item, Err> {
  sink: Sink<Item, Err>,
  scheduler: Arc<dyn Scheduler>,
  queue: Arc<Mutex<VecDeque<Event<Item, Err>>>>,
  draining: Arc<AtomicBool>,
  drain_task: SerialSubscription,
}

impl<Item, Err> ObserveOnObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Enqueue the event and make sure exactly one drain is running; events
  /// keep their order because only the drain dequeues.
  fn push(&self, event: Event<Item, Err>) {
    self.queue.lock().push_back(event);
    if self.draining.swap(true, Ordering::AcqRel) {
      return;
    }
    let sink = self.sink.clone();
    let queue = self.queue.clone();
    let draining = self.draining.clone();
    let task = self.scheduler.schedule(Box::new(move || loop {
      let next = queue.lock().pop_front();
      match next {
        Some(event) => sink.forward(event),
        None => {
          draining.store(false, Ordering::Release);
          // A producer may have enqueued between the pop and the store; if
          // nobody reclaimed the drain, take it back and keep going.
          if queue.lock().is_empty() || draining.swap(true, Ordering::AcqRel) {
            break;
          }
        }
      }
    }));
    self.drain_task.set(task);
  }
}

impl<Item, Err> Observer<Item, Err> for ObserveOnObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.push(Event::Next(value)) }

  fn error(&mut self, err: Err) { self.push(Event::Error(err)) }

  fn complete(&mut self) { self.push(Event::Completed) }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Re-deliver every event on `scheduler`, preserving order.
  pub fn observe_on(&self, scheduler: Arc<dyn Scheduler>) -> Observable<Item, Err> {
    Observable::from_producer(ObserveOnOp { source: self.clone(), scheduler })
  }
}

#[cfg(test)]
mod test {
  use std::sync::Mutex as StdMutex;

  use crate::{observable::from_iter, scheduler};

  use super::*;

  #[test]
  fn delivery_hops_threads_but_keeps_order() {
    let caller = std::thread::current().id();
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let threads = Arc::new(StdMutex::new(Vec::new()));
    let (s, t) = (seen.clone(), threads.clone());
    let (tx, rx) = std::sync::mpsc::channel();
    from_iter::<_, ()>(1..=100)
      .observe_on(scheduler::shared())
      .subscribe_complete(
        move |v| {
          s.lock().unwrap().push(v);
          t.lock().unwrap().push(std::thread::current().id());
        },
        move || {
          let _ = tx.send(());
        },
      );
    rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap();
    assert_eq!(*seen.lock().unwrap(), (1..=100).collect::<Vec<_>>());
    assert!(threads.lock().unwrap().iter().all(|id| *id != caller));
  }
}

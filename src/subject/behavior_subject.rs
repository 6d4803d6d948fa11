use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
};

use super::{SubjectCore, Terminal};

/// A subject seeded with an initial value that always replays its latest
/// value to a new subscriber before live events. After a terminal event new
/// subscribers receive only the terminal.
pub struct BehaviorSubject<Item, Err> {
  core: Arc<SubjectCore<Item, Err>>,
  latest: Arc<Mutex<Item>>,
}

impl<Item, Err> Clone for BehaviorSubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone(), latest: self.latest.clone() } }
}

impl<Item, Err> BehaviorSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new(seed: Item) -> Self {
    Self { core: Arc::new(SubjectCore::default()), latest: Arc::new(Mutex::new(seed)) }
  }

  pub fn next(&self, value: Item) {
    self.core.next_and(value, |v| *self.latest.lock() = v.clone());
  }

  pub fn error(&self, err: Err) { self.core.terminate(Terminal::Error(err)); }

  pub fn complete(&self) { self.core.terminate(Terminal::Completed); }

  /// The value a subscriber would currently receive first.
  pub fn value(&self) -> Item { self.latest.lock().clone() }

  pub fn is_terminated(&self) -> bool { self.core.is_terminated() }

  pub fn observable(&self) -> Observable<Item, Err> {
    Observable::from_producer(BehaviorProducer { core: self.core.clone(), latest: self.latest.clone() })
  }
}

impl<Item, Err> Observer<Item, Err> for BehaviorSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) { BehaviorSubject::next(self, value) }

  fn error(&mut self, err: Err) { BehaviorSubject::error(self, err) }

  fn complete(&mut self) { BehaviorSubject::complete(self) }

  fn is_closed(&self) -> bool { self.is_terminated() }
}

struct BehaviorProducer<Item, Err> {
  core: Arc<SubjectCore<Item, Err>>,
  latest: Arc<Mutex<Item>>,
}

impl<Item, Err> Producer for BehaviorProducer<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let latest = &self.latest;
    self.core.insert(sink, |sink| sink.next(latest.lock().clone()));
  }
}

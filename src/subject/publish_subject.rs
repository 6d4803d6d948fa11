use std::sync::Arc;

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
};

use super::{SubjectCore, Terminal};

/// The plain hot pivot: subscribers see only values pushed after they
/// subscribed.
pub struct PublishSubject<Item, Err> {
  core: Arc<SubjectCore<Item, Err>>,
}

impl<Item, Err> Clone for PublishSubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Item, Err> Default for PublishSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl<Item, Err> PublishSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new() -> Self { Self { core: Arc::new(SubjectCore::default()) } }

  pub fn next(&self, value: Item) { self.core.next(value); }

  pub fn error(&self, err: Err) { self.core.terminate(Terminal::Error(err)); }

  pub fn complete(&self) { self.core.terminate(Terminal::Completed); }

  pub fn is_terminated(&self) -> bool { self.core.is_terminated() }

  pub fn subscriber_count(&self) -> usize { self.core.subscriber_count() }

  /// The subscribable face of this subject.
  pub fn observable(&self) -> Observable<Item, Err> {
    Observable::from_producer(PublishProducer { core: self.core.clone() })
  }
}

impl<Item, Err> Observer<Item, Err> for PublishSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) { PublishSubject::next(self, value) }

  fn error(&mut self, err: Err) { PublishSubject::error(self, err) }

  fn complete(&mut self) { PublishSubject::complete(self) }

  fn is_closed(&self) -> bool { self.is_terminated() }
}

struct PublishProducer<Item, Err> {
  core: Arc<SubjectCore<Item, Err>>,
}

impl<Item, Err> Producer for PublishProducer<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) { self.core.insert(sink, |_| {}); }
}

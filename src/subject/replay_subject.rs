use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
};

use super::{SubjectCore, Terminal};

/// A subject that buffers past values and replays them to every new
/// subscriber, followed by live events. Subscribers arriving after a
/// terminal event still receive the buffered history, then the terminal.
pub struct ReplaySubject<Item, Err> {
  core: Arc<SubjectCore<Item, Err>>,
  buffer: Arc<Mutex<Buffer<Item>>>,
}

struct Buffer<Item> {
  values: VecDeque<Item>,
  capacity: Option<usize>,
}

impl<Item, Err> Clone for ReplaySubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone(), buffer: self.buffer.clone() } }
}

impl<Item, Err> ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// Keep every value ever pushed.
  pub fn unbounded() -> Self { Self::with_capacity(None) }

  /// Keep only the most recent `capacity` values.
  pub fn bounded(capacity: usize) -> Self { Self::with_capacity(Some(capacity)) }

  fn with_capacity(capacity: Option<usize>) -> Self {
    Self {
      core: Arc::new(SubjectCore::default()),
      buffer: Arc::new(Mutex::new(Buffer { values: VecDeque::new(), capacity })),
    }
  }

  pub fn next(&self, value: Item) {
    self.core.next_and(value, |v| {
      let mut buffer = self.buffer.lock();
      buffer.values.push_back(v.clone());
      if let Some(capacity) = buffer.capacity {
        while buffer.values.len() > capacity {
          buffer.values.pop_front();
        }
      }
    });
  }

  pub fn error(&self, err: Err) { self.core.terminate(Terminal::Error(err)); }

  pub fn complete(&self) { self.core.terminate(Terminal::Completed); }

  pub fn is_terminated(&self) -> bool { self.core.is_terminated() }

  pub fn observable(&self) -> Observable<Item, Err> {
    Observable::from_producer(ReplayProducer { core: self.core.clone(), buffer: self.buffer.clone() })
  }
}

impl<Item, Err> Observer<Item, Err> for ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) { ReplaySubject::next(self, value) }

  fn error(&mut self, err: Err) { ReplaySubject::error(self, err) }

  fn complete(&mut self) { ReplaySubject::complete(self) }

  fn is_closed(&self) -> bool { self.is_terminated() }
}

struct ReplayProducer<Item, Err> {
  core: Arc<SubjectCore<Item, Err>>,
  buffer: Arc<Mutex<Buffer<Item>>>,
}

impl<Item, Err> Producer for ReplayProducer<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let buffer = &self.buffer;
    self.core.insert_replaying(sink, |sink| {
      let history: Vec<Item> = buffer.lock().values.iter().cloned().collect();
      for value in history {
        sink.next(value);
      }
    });
  }
}

#[cfg(test)]
mod test {
  use std::sync::Mutex;

  use super::*;

  #[test]
  fn replays_history_then_live_values() {
    let subject = ReplaySubject::<i32, ()>::unbounded();
    subject.next(1);
    subject.next(2);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    subject.observable().subscribe(move |v| s.lock().unwrap().push(v));
    subject.next(3);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
  }

  #[test]
  fn bounded_buffer_drops_the_oldest() {
    let subject = ReplaySubject::<i32, ()>::bounded(2);
    for v in 1..=4 {
      subject.next(v);
    }
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    subject.observable().subscribe(move |v| s.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![3, 4]);
  }

  #[test]
  fn history_still_replays_after_terminal() {
    let subject = ReplaySubject::<i32, &'static str>::unbounded();
    subject.next(1);
    subject.next(2);
    subject.error("boom");
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l, l2) = (log.clone(), log.clone());
    subject.observable().subscribe_err(
      move |v| l.lock().unwrap().push(format!("n{v}")),
      move |e| l2.lock().unwrap().push(format!("e{e}")),
    );
    assert_eq!(*log.lock().unwrap(), vec!["n1", "n2", "eboom"]);
  }
}

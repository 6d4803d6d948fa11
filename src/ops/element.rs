use crate::{
  error::SequenceError,
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
};

pub struct FirstOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
}

impl<Item, Err> Producer for FirstOp<Item, Err>
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let observer = FirstObserver { sink: sink.clone(), seen: false };
    self.source.attach(observer, &sink);
  }
}

struct FirstObserver<Item, Err> {
  sink: Sink<Item, Err>,
  seen: bool,
}

impl<Item, Err> Observer<Item, Err> for FirstObserver<Item, Err>
where
  Err: From<SequenceError>,
{
  fn next(&mut self, value: Item) {
    if self.seen {
      return;
    }
    self.seen = true;
    self.sink.next(value);
    self.sink.complete();
  }

  fn error(&mut self, err: Err) { self.sink.error(err) }

  fn complete(&mut self) {
    if self.seen {
      self.sink.complete();
    } else {
      self.sink.error(SequenceError::NoElements.into());
    }
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

pub struct SingleOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
}

impl<Item, Err> Producer for SingleOp<Item, Err>
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let observer = SingleObserver { sink: sink.clone(), held: None };
    self.source.attach(observer, &sink);
  }
}

struct SingleObserver<Item, Err> {
  sink: Sink<Item, Err>,
  held: Option<Item>,
}

impl<Item, Err> Observer<Item, Err> for SingleObserver<Item, Err>
where
  Err: From<SequenceError>,
{
  fn next(&mut self, value: Item) {
    if self.held.is_some() {
      // A second value disproves the claim; fail and cancel the source.
      self.held = None;
      self.sink.error(SequenceError::MoreThanOne.into());
      return;
    }
    self.held = Some(value);
  }

  fn error(&mut self, err: Err) { self.sink.error(err) }

  fn complete(&mut self) {
    match self.held.take() {
      Some(value) => {
        self.sink.next(value);
        self.sink.complete();
      }
      None => self.sink.error(SequenceError::NoElements.into()),
    }
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

pub struct ElementAtOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) index: usize,
}

impl<Item, Err> Producer for ElementAtOp<Item, Err>
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let observer = ElementAtObserver { sink: sink.clone(), remaining: self.index, done: false };
    self.source.attach(observer, &sink);
  }
}

struct ElementAtObserver<Item, Err> {
  sink: Sink<Item, Err>,
  remaining: usize,
  done: bool,
}

impl<Item, Err> Observer<Item, Err> for ElementAtObserver<Item, Err>
where
  Err: From<SequenceError>,
{
  fn next(&mut self, value: Item) {
    if self.done {
      return;
    }
    if self.remaining == 0 {
      self.done = true;
      self.sink.next(value);
      self.sink.complete();
    } else {
      self.remaining -= 1;
    }
  }

  fn error(&mut self, err: Err) { self.sink.error(err) }

  fn complete(&mut self) {
    if !self.done {
      self.sink.error(SequenceError::IndexOutOfRange.into());
    }
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  /// The first value, then complete. An empty source fails with
  /// [`SequenceError::NoElements`].
  pub fn first(&self) -> Observable<Item, Err> {
    Observable::from_producer(FirstOp { source: self.clone() })
  }

  /// The only value, emitted at completion. Fails with
  /// [`SequenceError::MoreThanOne`] on a second value and
  /// [`SequenceError::NoElements`] on an empty source.
  pub fn single(&self) -> Observable<Item, Err> {
    Observable::from_producer(SingleOp { source: self.clone() })
  }

  /// The value at `index` (zero-based), then complete. A source that ends
  /// earlier fails with [`SequenceError::IndexOutOfRange`].
  pub fn element_at(&self, index: usize) -> Observable<Item, Err> {
    Observable::from_producer(ElementAtOp { source: self.clone(), index })
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::observable::{empty, from_iter};

  use super::*;

  fn collect(source: &Observable<i32, SequenceError>) -> Vec<String> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l, l2, l3) = (log.clone(), log.clone(), log.clone());
    source.subscribe_all(
      move |v| l.lock().unwrap().push(format!("n{v}")),
      move |e| l2.lock().unwrap().push(format!("e{e:?}")),
      move || l3.lock().unwrap().push("c".into()),
    );
    let out = log.lock().unwrap().clone();
    out
  }

  #[test]
  fn first_takes_one_and_completes() {
    assert_eq!(collect(&from_iter(1..=3).first()), vec!["n1", "c"]);
    assert_eq!(collect(&empty::<i32, SequenceError>().first()), vec!["eNoElements"]);
  }

  #[test]
  fn single_requires_exactly_one() {
    assert_eq!(collect(&from_iter(5..6).single()), vec!["n5", "c"]);
    assert_eq!(collect(&from_iter(1..=3).single()), vec!["eMoreThanOne"]);
    assert_eq!(collect(&empty::<i32, SequenceError>().single()), vec!["eNoElements"]);
  }

  #[test]
  fn element_at_indexes_from_zero() {
    assert_eq!(collect(&from_iter(10..=13).element_at(2)), vec!["n12", "c"]);
    assert_eq!(collect(&from_iter(10..=13).element_at(9)), vec!["eIndexOutOfRange"]);
  }
}

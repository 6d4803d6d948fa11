use std::{collections::VecDeque, sync::Arc};

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
  sync::ReentrantLock,
};

pub struct ZipOp<A, B, Err> {
  pub(crate) left: Observable<A, Err>,
  pub(crate) right: Observable<B, Err>,
}

impl<A, B, Err> Producer for ZipOp<A, B, Err>
where
  A: Send + 'static,
  B: Send + 'static,
  Err: Send + 'static,
{
  type Item = (A, B);
  type Err = Err;

  fn run(&self, sink: Sink<(A, B), Err>) {
    let shared = Arc::new(ZipShared {
      sink: sink.clone(),
      state: ReentrantLock::new(ZipState {
        left: VecDeque::new(),
        right: VecDeque::new(),
        left_done: false,
        right_done: false,
      }),
    });
    self
      .left
      .attach(ZipLeftObserver { shared: shared.clone() }, &sink);
    self.right.attach(ZipRightObserver { shared }, &sink);
  }
}

struct ZipState<A, B> {
  left: VecDeque<A>,
  right: VecDeque<B>,
  left_done: bool,
  right_done: bool,
}

impl<A, B> ZipState<A, B> {
  /// Exhausted means a finished side's queue can never pair again.
  fn exhausted(&self) -> bool {
    self.left_done && self.left.is_empty() || self.right_done && self.right.is_empty()
  }
}

struct ZipShared<A, B, Err> {
  sink: Sink<(A, B), Err>,
  state: ReentrantLock<ZipState<A, B>>,
}

impl<A, B, Err> ZipShared<A, B, Err> {
  /// Pop and forward ready pairs while holding the state lock, so a pair
  /// popped by one producer thread cannot be overtaken by the next pair on
  /// its way to the sink. The terminal goes out after the lock is released;
  /// its cascade may have to wait on a producer still inside a sibling
  /// stage.
  fn drain(&self) {
    let exhausted = {
      let guard = self.state.lock();
      loop {
        let pair = guard.with(|state| {
          if !state.left.is_empty() && !state.right.is_empty() {
            let a = state.left.pop_front();
            let b = state.right.pop_front();
            a.zip(b)
          } else {
            None
          }
        });
        match pair {
          Some(pair) => self.sink.next(pair),
          None => break,
        }
      }
      guard.with(|state| state.exhausted())
    };
    if exhausted {
      self.sink.complete();
    }
  }

  fn side_done(&self, left: bool) {
    self.state.with(|state| {
      if left {
        state.left_done = true;
      } else {
        state.right_done = true;
      }
    });
    self.drain();
  }
}

struct ZipLeftObserver<A, B, Err> {
  shared: Arc<ZipShared<A, B, Err>>,
}

impl<A, B, Err> Observer<A, Err> for ZipLeftObserver<A, B, Err> {
  fn next(&mut self, value: A) {
    self.shared.state.with(|state| state.left.push_back(value));
    self.shared.drain();
  }

  fn error(&mut self, err: Err) { self.shared.sink.error(err) }

  fn complete(&mut self) { self.shared.side_done(true) }

  fn is_closed(&self) -> bool { self.shared.sink.is_disposed() }
}

struct ZipRightObserver<A, B, Err> {
  shared: Arc<ZipShared<A, B, Err>>,
}

impl<A, B, Err> Observer<B, Err> for ZipRightObserver<A, B, Err> {
  fn next(&mut self, value: B) {
    self.shared.state.with(|state| state.right.push_back(value));
    self.shared.drain();
  }

  fn error(&mut self, err: Err) { self.shared.sink.error(err) }

  fn complete(&mut self) { self.shared.side_done(false) }

  fn is_closed(&self) -> bool { self.shared.sink.is_disposed() }
}

impl<A, Err> Observable<A, Err>
where
  A: Send + 'static,
  Err: Send + 'static,
{
  /// Pair values positionally: the nth emission is the tuple of each side's
  /// nth value. Completes as soon as a finished side can never pair again.
  pub fn zip<B>(&self, other: &Observable<B, Err>) -> Observable<(A, B), Err>
  where
    B: Send + 'static,
  {
    Observable::from_producer(ZipOp { left: self.clone(), right: other.clone() })
  }
}

#[cfg(test)]
mod test {
  use std::sync::Mutex as StdMutex;

  use crate::{observable::from_iter, subject::PublishSubject};

  use super::*;

  #[test]
  fn pairs_positionally() {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, ()>(1..=3)
      .zip(&from_iter(vec!["a", "b", "c"]))
      .subscribe(move |pair| s.lock().unwrap().push(pair));
    assert_eq!(*seen.lock().unwrap(), vec![(1, "a"), (2, "b"), (3, "c")]);
  }

  #[test]
  fn the_shorter_side_ends_the_zip() {
    let a = PublishSubject::<i32, ()>::new();
    let b = PublishSubject::<i32, ()>::new();
    let log = Arc::new(StdMutex::new(Vec::new()));
    let (l, l2) = (log.clone(), log.clone());
    a.observable().zip(&b.observable()).subscribe_complete(
      move |pair| l.lock().unwrap().push(format!("{pair:?}")),
      move || l2.lock().unwrap().push("c".into()),
    );
    a.next(1);
    a.next(2);
    b.next(10);
    a.complete();
    // One left value is still queued, so the zip lives on.
    assert_eq!(*log.lock().unwrap(), vec!["(1, 10)"]);
    b.next(20);
    assert_eq!(*log.lock().unwrap(), vec!["(1, 10)", "(2, 20)", "c"]);
  }
}

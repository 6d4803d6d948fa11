use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
};

pub struct MergeOp<Item, Err> {
  pub(crate) left: Observable<Item, Err>,
  pub(crate) right: Observable<Item, Err>,
}

impl<Item, Err> Producer for MergeOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let active = Arc::new(AtomicUsize::new(2));
    self
      .left
      .attach(MergeObserver { sink: sink.clone(), active: active.clone() }, &sink);
    self.right.attach(MergeObserver { sink: sink.clone(), active }, &sink);
  }
}

struct MergeObserver<Item, Err> {
  sink: Sink<Item, Err>,
  active: Arc<AtomicUsize>,
}

impl<Item, Err> Observer<Item, Err> for MergeObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.sink.next(value) }

  // The first error wins and silences the sibling through disposal.
  fn error(&mut self, err: Err) { self.sink.error(err) }

  fn complete(&mut self) {
    if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.sink.complete();
    }
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Interleave this stream with `other`; completes when both complete, and
  /// any error ends the merge immediately.
  pub fn merge(&self, other: &Observable<Item, Err>) -> Observable<Item, Err> {
    Observable::from_producer(MergeOp { left: self.clone(), right: other.clone() })
  }
}

impl<Item, Err> Observable<Observable<Item, Err>, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Flatten a stream of streams, running at most `concurrent` inner
  /// subscriptions at a time; further inners wait in arrival order.
  pub fn merge_all(&self, concurrent: usize) -> Observable<Item, Err> {
    self.flat_map_concurrent(|inner| inner, concurrent)
  }
}

#[cfg(test)]
mod test {
  use crate::subscription::SubscriptionLike;
  use std::{sync::Mutex, time::Duration};

  use crate::{
    observable::{from_iter, interval, throw},
    scheduler,
  };

  use super::*;

  #[test]
  fn completes_only_when_both_sides_do() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l, l2) = (log.clone(), log.clone());
    from_iter::<_, ()>(1..=2).merge(&from_iter(3..=4)).subscribe_complete(
      move |v| l.lock().unwrap().push(v),
      move || l2.lock().unwrap().push(-1),
    );
    let mut values = log.lock().unwrap().clone();
    assert_eq!(values.pop(), Some(-1));
    values.sort_unstable();
    assert_eq!(values, vec![1, 2, 3, 4]);
  }

  #[test]
  fn interleaves_concurrent_sources() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let sub = interval::<()>(Duration::from_millis(10), scheduler::shared())
      .map(|n| (0, n))
      .merge(&interval::<()>(Duration::from_millis(10), scheduler::shared()).map(|n| (1, n)))
      .subscribe(move |v| s.lock().unwrap().push(v));
    std::thread::sleep(Duration::from_millis(100));
    sub.unsubscribe();
    let seen = seen.lock().unwrap().clone();
    assert!(seen.iter().any(|(side, _)| *side == 0));
    assert!(seen.iter().any(|(side, _)| *side == 1));
  }

  #[test]
  fn an_error_on_either_side_ends_the_merge() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l, l2) = (log.clone(), log.clone());
    from_iter(1..=2).merge(&throw::<i32, _>("boom")).subscribe_err(
      move |v| l.lock().unwrap().push(format!("n{v}")),
      move |e| l2.lock().unwrap().push(format!("e{e}")),
    );
    let log = log.lock().unwrap().clone();
    assert_eq!(log.last(), Some(&"eboom".to_string()));
  }
}

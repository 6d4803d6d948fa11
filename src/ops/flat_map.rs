use std::{collections::VecDeque, sync::Arc};

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
  sync::ReentrantLock,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Overflow {
  /// Inners beyond the concurrency limit wait in arrival order.
  Queue,
  /// Inners beyond the limit are discarded outright.
  Drop,
}

pub struct FlatMapOp<Item, Err, F> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) select: F,
  pub(crate) concurrent: usize,
  overflow: Overflow,
}

impl<Item, Err, Out, F> Producer for FlatMapOp<Item, Err, F>
where
  F: Fn(Item) -> Observable<Out, Err> + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Out: Send + 'static,
{
  type Item = Out;
  type Err = Err;

  fn run(&self, sink: Sink<Out, Err>) {
    let shared = Arc::new(FlatShared {
      sink: sink.clone(),
      state: ReentrantLock::new(FlatState {
        active: 0,
        waiting: VecDeque::new(),
        outer_done: false,
      }),
      concurrent: self.concurrent.max(1),
      overflow: self.overflow,
    });
    let observer = OuterObserver { shared, select: self.select.clone() };
    self.source.attach(observer, &sink);
  }
}

struct FlatState<Out, Err> {
  active: usize,
  waiting: VecDeque<Observable<Out, Err>>,
  outer_done: bool,
}

struct FlatShared<Out, Err> {
  sink: Sink<Out, Err>,
  state: ReentrantLock<FlatState<Out, Err>>,
  concurrent: usize,
  overflow: Overflow,
}

impl<Out, Err> FlatShared<Out, Err>
where
  Out: Send + 'static,
  Err: Send + 'static,
{
  /// Admit a freshly selected inner: start it if a slot is free, otherwise
  /// queue or drop per policy. Subscribing happens outside the state lock
  /// because a synchronous inner re-enters it on completion.
  fn admit(self: &Arc<Self>, inner: Observable<Out, Err>) {
    let start = self.state.with(|state| {
      if state.active < self.concurrent {
        state.active += 1;
        true
      } else {
        if self.overflow == Overflow::Queue {
          state.waiting.push_back(inner.clone());
        }
        false
      }
    });
    if start {
      self.start(inner);
    }
  }

  fn start(self: &Arc<Self>, inner: Observable<Out, Err>) {
    let observer = InnerObserver { shared: self.clone() };
    inner.attach(observer, &self.sink);
  }

  fn inner_finished(self: &Arc<Self>) {
    // Completion is forwarded under the state lock so a racing bookkeeping
    // update cannot slip between the decision and the terminal.
    let follow_up = {
      let guard = self.state.lock();
      let (follow_up, done) = guard.with(|state| match state.waiting.pop_front() {
        Some(next) => (Some(next), false),
        None => {
          state.active -= 1;
          (None, state.outer_done && state.active == 0)
        }
      });
      if done {
        self.sink.complete();
      }
      follow_up
    };
    if let Some(next) = follow_up {
      self.start(next);
    }
  }

  fn outer_finished(&self) {
    let guard = self.state.lock();
    let done = guard.with(|state| {
      state.outer_done = true;
      state.active == 0 && state.waiting.is_empty()
    });
    if done {
      self.sink.complete();
    }
  }
}

struct OuterObserver<Out, Err, F> {
  shared: Arc<FlatShared<Out, Err>>,
  select: F,
}

impl<Item, Err, Out, F> Observer<Item, Err> for OuterObserver<Out, Err, F>
where
  F: Fn(Item) -> Observable<Out, Err>,
  Out: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    // The selector runs exactly once per value, before any queueing
    // decision, so side effects in it never repeat.
    let inner = (self.select)(value);
    self.shared.admit(inner);
  }

  fn error(&mut self, err: Err) { self.shared.sink.error(err) }

  fn complete(&mut self) { self.shared.outer_finished() }

  fn is_closed(&self) -> bool { self.shared.sink.is_disposed() }
}

struct InnerObserver<Out, Err> {
  shared: Arc<FlatShared<Out, Err>>,
}

impl<Out, Err> Observer<Out, Err> for InnerObserver<Out, Err>
where
  Out: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Out) { self.shared.sink.next(value) }

  fn error(&mut self, err: Err) { self.shared.sink.error(err) }

  fn complete(&mut self) { self.shared.inner_finished() }

  fn is_closed(&self) -> bool { self.shared.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Map each value to an inner stream and interleave all of them.
  pub fn flat_map<Out, F>(&self, select: F) -> Observable<Out, Err>
  where
    F: Fn(Item) -> Observable<Out, Err> + Clone + Send + Sync + 'static,
    Out: Send + 'static,
  {
    self.flat_map_concurrent(select, usize::MAX)
  }

  /// `flat_map` with at most `concurrent` live inner subscriptions; excess
  /// inners wait their turn in arrival order.
  pub fn flat_map_concurrent<Out, F>(&self, select: F, concurrent: usize) -> Observable<Out, Err>
  where
    F: Fn(Item) -> Observable<Out, Err> + Clone + Send + Sync + 'static,
    Out: Send + 'static,
  {
    Observable::from_producer(FlatMapOp {
      source: self.clone(),
      select,
      concurrent,
      overflow: Overflow::Queue,
    })
  }

  /// Map to inner streams but ignore new values while one is in flight.
  pub fn flat_map_first<Out, F>(&self, select: F) -> Observable<Out, Err>
  where
    F: Fn(Item) -> Observable<Out, Err> + Clone + Send + Sync + 'static,
    Out: Send + 'static,
  {
    Observable::from_producer(FlatMapOp {
      source: self.clone(),
      select,
      concurrent: 1,
      overflow: Overflow::Drop,
    })
  }

  /// Run each inner stream to completion before starting the next.
  pub fn concat_map<Out, F>(&self, select: F) -> Observable<Out, Err>
  where
    F: Fn(Item) -> Observable<Out, Err> + Clone + Send + Sync + 'static,
    Out: Send + 'static,
  {
    self.flat_map_concurrent(select, 1)
  }
}

#[cfg(test)]
mod test {
  use std::{
    sync::{
      atomic::{AtomicUsize, Ordering},
      Mutex as StdMutex,
    },
    time::Duration,
  };

  use crate::{
    observable::{from_iter, timer},
    scheduler,
  };

  use super::*;

  #[test]
  fn flattens_synchronous_inners() {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, ()>(1..=3)
      .flat_map(|v| from_iter(vec![v * 10, v * 10 + 1]))
      .subscribe(move |v| s.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![10, 11, 20, 21, 30, 31]);
  }

  #[test]
  fn selector_runs_once_per_value_even_when_queued() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let (tx, rx) = std::sync::mpsc::channel();
    from_iter::<_, ()>(1..=4)
      .flat_map_concurrent(
        move |v| {
          c.fetch_add(1, Ordering::SeqCst);
          timer::<()>(Duration::from_millis(10), scheduler::shared()).map(move |_| v)
        },
        2,
      )
      .subscribe_complete(|_| {}, move || {
        let _ = tx.send(());
      });
    rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
  }

  #[test]
  fn concat_map_preserves_inner_order() {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let s = seen.clone();
    let (tx, rx) = std::sync::mpsc::channel();
    from_iter::<_, ()>(vec![30u64, 10, 20])
      .concat_map(|ms| timer::<()>(Duration::from_millis(ms), scheduler::shared()).map(move |_| ms))
      .subscribe_complete(
        move |v| s.lock().unwrap().push(v),
        move || {
          let _ = tx.send(());
        },
      );
    rx.recv_timeout(Duration::from_secs(2)).unwrap();
    // Arrival order, not duration order.
    assert_eq!(*seen.lock().unwrap(), vec![30, 10, 20]);
  }

  #[test]
  fn flat_map_first_drops_values_while_busy() {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, ()>(1..=3)
      .flat_map_first(|v| from_iter(vec![v]))
      .subscribe(move |v| s.lock().unwrap().push(v));
    // Synchronous inners finish before the next outer value, so none are
    // dropped here.
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
  }

  #[test]
  fn flat_map_first_ignores_overlapping_inners() {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let s = seen.clone();
    let (tx, rx) = std::sync::mpsc::channel();
    from_iter::<_, ()>(1..=3)
      .flat_map_first(|v| timer::<()>(Duration::from_millis(30), scheduler::shared()).map(move |_| v))
      .subscribe_complete(
        move |v| s.lock().unwrap().push(v),
        move || {
          let _ = tx.send(());
        },
      );
    rx.recv_timeout(Duration::from_secs(2)).unwrap();
    // The first inner is still running when 2 and 3 arrive.
    assert_eq!(*seen.lock().unwrap(), vec![1]);
  }
}

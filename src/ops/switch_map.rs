use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
  subscription::{SerialSubscription, Subscription},
};

pub struct SwitchMapOp<Item, Err, F> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) select: F,
}

impl<Item, Err, Out, F> Producer for SwitchMapOp<Item, Err, F>
where
  F: Fn(Item) -> Observable<Out, Err> + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Out: Send + 'static,
{
  type Item = Out;
  type Err = Err;

  fn run(&self, sink: Sink<Out, Err>) {
    let current = SerialSubscription::new();
    sink.add_upstream(Subscription::new(current.clone()));
    let shared = Arc::new(SwitchShared {
      sink: sink.clone(),
      state: Mutex::new(SwitchState { epoch: 0, outer_done: false, inner_live: false }),
      current,
    });
    let observer = SwitchOuterObserver { shared, select: self.select.clone() };
    self.source.attach(observer, &sink);
  }
}

struct SwitchState {
  // Bumped on every outer value; events from an inner belonging to an older
  // epoch are stale and dropped.
  epoch: u64,
  outer_done: bool,
  inner_live: bool,
}

struct SwitchShared<Out, Err> {
  sink: Sink<Out, Err>,
  state: Mutex<SwitchState>,
  current: SerialSubscription,
}

struct SwitchOuterObserver<Out, Err, F> {
  shared: Arc<SwitchShared<Out, Err>>,
  select: F,
}

impl<Item, Err, Out, F> Observer<Item, Err> for SwitchOuterObserver<Out, Err, F>
where
  F: Fn(Item) -> Observable<Out, Err>,
  Out: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    let inner = (self.select)(value);
    let epoch = {
      let mut state = self.shared.state.lock();
      state.epoch += 1;
      state.inner_live = true;
      state.epoch
    };
    let observer = SwitchInnerObserver { shared: self.shared.clone(), epoch };
    // Replacing the serial cancels the superseded inner.
    let handle = inner.attach(observer, &self.shared.sink);
    self.shared.current.set(handle);
  }

  fn error(&mut self, err: Err) { self.shared.sink.error(err) }

  fn complete(&mut self) {
    let done = {
      let mut state = self.shared.state.lock();
      state.outer_done = true;
      !state.inner_live
    };
    if done {
      self.shared.sink.complete();
    }
  }

  fn is_closed(&self) -> bool { self.shared.sink.is_disposed() }
}

struct SwitchInnerObserver<Out, Err> {
  shared: Arc<SwitchShared<Out, Err>>,
  epoch: u64,
}

impl<Out, Err> SwitchInnerObserver<Out, Err> {
  fn is_current(&self) -> bool { self.shared.state.lock().epoch == self.epoch }
}

impl<Out, Err> Observer<Out, Err> for SwitchInnerObserver<Out, Err>
where
  Out: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Out) {
    if self.is_current() {
      self.shared.sink.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if self.is_current() {
      self.shared.sink.error(err);
    }
  }

  fn complete(&mut self) {
    let done = {
      let mut state = self.shared.state.lock();
      if state.epoch != self.epoch {
        return;
      }
      state.inner_live = false;
      state.outer_done
    };
    if done {
      self.shared.sink.complete();
    }
  }

  fn is_closed(&self) -> bool { self.shared.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Map each value to an inner stream and mirror only the most recent one;
  /// a new value cancels the previous inner subscription.
  pub fn switch_map<Out, F>(&self, select: F) -> Observable<Out, Err>
  where
    F: Fn(Item) -> Observable<Out, Err> + Clone + Send + Sync + 'static,
    Out: Send + 'static,
  {
    Observable::from_producer(SwitchMapOp { source: self.clone(), select })
  }
}

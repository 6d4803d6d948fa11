use std::sync::Arc;

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
  sync::ReentrantLock,
};

pub struct CombineLatestOp<A, B, Err, F> {
  pub(crate) left: Observable<A, Err>,
  pub(crate) right: Observable<B, Err>,
  pub(crate) combine: F,
}

impl<A, B, Err, Out, F> Producer for CombineLatestOp<A, B, Err, F>
where
  F: Fn(&A, &B) -> Out + Clone + Send + Sync + 'static,
  A: Send + 'static,
  B: Send + 'static,
  Err: Send + 'static,
  Out: Send + 'static,
{
  type Item = Out;
  type Err = Err;

  fn run(&self, sink: Sink<Out, Err>) {
    let shared = Arc::new(CombineShared {
      sink: sink.clone(),
      state: ReentrantLock::new(CombineState {
        left: None,
        right: None,
        left_done: false,
        right_done: false,
      }),
      combine: self.combine.clone(),
    });
    self
      .left
      .attach(LeftObserver { shared: shared.clone() }, &sink);
    self.right.attach(RightObserver { shared }, &sink);
  }
}

struct CombineState<A, B> {
  left: Option<A>,
  right: Option<B>,
  left_done: bool,
  right_done: bool,
}

struct CombineShared<A, B, Err, Out, F> {
  sink: Sink<Out, Err>,
  state: ReentrantLock<CombineState<A, B>>,
  combine: F,
}

impl<A, B, Err, Out, F> CombineShared<A, B, Err, Out, F>
where
  F: Fn(&A, &B) -> Out,
{
  /// Combine and forward while holding the state lock: a result computed
  /// from the latest pair must reach the sink before another producer can
  /// overwrite either side and emit a fresher one.
  fn emit_if_ready(&self) {
    let guard = self.state.lock();
    let combined = guard.with(|state| match (&state.left, &state.right) {
      (Some(a), Some(b)) => Some((self.combine)(a, b)),
      _ => None,
    });
    if let Some(out) = combined {
      self.sink.next(out);
    }
  }

  /// A side completing ends the combination early only if it never emitted;
  /// otherwise its latest value keeps participating until the other side
  /// also finishes. The terminal is forwarded after the lock is released;
  /// its cascade may have to wait on a producer still inside a sibling
  /// stage.
  fn side_done(&self, left: bool) {
    let finished = self.state.with(|state| {
      if left {
        state.left_done = true;
      } else {
        state.right_done = true;
      }
      let starved = left && state.left.is_none() || !left && state.right.is_none();
      starved || state.left_done && state.right_done
    });
    if finished {
      self.sink.complete();
    }
  }
}

struct LeftObserver<A, B, Err, Out, F> {
  shared: Arc<CombineShared<A, B, Err, Out, F>>,
}

impl<A, B, Err, Out, F> Observer<A, Err> for LeftObserver<A, B, Err, Out, F>
where
  F: Fn(&A, &B) -> Out,
{
  fn next(&mut self, value: A) {
    let guard = self.shared.state.lock();
    guard.with(|state| state.left = Some(value));
    self.shared.emit_if_ready();
  }

  fn error(&mut self, err: Err) { self.shared.sink.error(err) }

  fn complete(&mut self) { self.shared.side_done(true) }

  fn is_closed(&self) -> bool { self.shared.sink.is_disposed() }
}

struct RightObserver<A, B, Err, Out, F> {
  shared: Arc<CombineShared<A, B, Err, Out, F>>,
}

impl<A, B, Err, Out, F> Observer<B, Err> for RightObserver<A, B, Err, Out, F>
where
  F: Fn(&A, &B) -> Out,
{
  fn next(&mut self, value: B) {
    let guard = self.shared.state.lock();
    guard.with(|state| state.right = Some(value));
    self.shared.emit_if_ready();
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
  /// Combine the latest values of two streams: every emission on either
  /// side, once both have emitted, produces `combine(latest_a, latest_b)`.
  pub fn combine_latest<B, Out, F>(
    &self, other: &Observable<B, Err>, combine: F,
  ) -> Observable<Out, Err>
  where
    F: Fn(&A, &B) -> Out + Clone + Send + Sync + 'static,
    B: Send + 'static,
    Out: Send + 'static,
  {
    Observable::from_producer(CombineLatestOp { left: self.clone(), right: other.clone(), combine })
  }
}

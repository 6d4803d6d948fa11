use std::{mem, sync::Arc, time::Duration};

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  scheduler::Scheduler,
  sink::Sink,
  subscription::{SerialSubscription, Subscription},
  sync::ReentrantLock,
};

pub struct BufferCountOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) capacity: usize,
}

impl<Item, Err> Producer for BufferCountOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Vec<Item>;
  type Err = Err;

  fn run(&self, sink: Sink<Vec<Item>, Err>) {
    let observer = BufferCountObserver {
      sink: sink.clone(),
      capacity: self.capacity.max(1),
      buffer: Vec::new(),
    };
    self.source.attach(observer, &sink);
  }
}

struct BufferCountObserver<Item, Err> {
  sink: Sink<Vec<Item>, Err>,
  capacity: usize,
  buffer: Vec<Item>,
}

impl<Item, Err> Observer<Item, Err> for BufferCountObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    self.buffer.push(value);
    if self.buffer.len() >= self.capacity {
      self.sink.next(mem::take(&mut self.buffer));
    }
  }

  fn error(&mut self, err: Err) {
    self.buffer.clear();
    self.sink.error(err);
  }

  fn complete(&mut self) {
    if !self.buffer.is_empty() {
      self.sink.next(mem::take(&mut self.buffer));
    }
    self.sink.complete();
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

pub struct BufferTimeOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) span: Duration,
  pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<Item, Err> Producer for BufferTimeOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Vec<Item>;
  type Err = Err;

  fn run(&self, sink: Sink<Vec<Item>, Err>) {
    let buffer = Arc::new(ReentrantLock::new(Vec::new()));
    let ticker_sink = sink.clone();
    let ticker_buffer = buffer.clone();
    let ticking = self.scheduler.schedule_periodic(
      self.span,
      Box::new(move || {
        // Forward while still holding the lock so two flushes cannot swap
        // batch order on the way to the sink.
        let guard = ticker_buffer.lock();
        let out = guard.with(|buffer| mem::take(buffer));
        ticker_sink.next(out);
      }),
    );
    sink.add_upstream(ticking);
    let observer = BufferTimeObserver { sink: sink.clone(), buffer };
    self.source.attach(observer, &sink);
  }
}

struct BufferTimeObserver<Item, Err> {
  sink: Sink<Vec<Item>, Err>,
  buffer: Arc<ReentrantLock<Vec<Item>>>,
}

impl<Item, Err> Observer<Item, Err> for BufferTimeObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.buffer.with(|buffer| buffer.push(value)); }

  fn error(&mut self, err: Err) {
    let guard = self.buffer.lock();
    guard.with(|buffer| buffer.clear());
    self.sink.error(err);
  }

  fn complete(&mut self) {
    let guard = self.buffer.lock();
    let out = guard.with(|buffer| mem::take(buffer));
    if !out.is_empty() {
      self.sink.next(out);
    }
    self.sink.complete();
  }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

pub struct BufferTimeCountOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) span: Duration,
  pub(crate) capacity: usize,
  pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl<Item, Err> Producer for BufferTimeCountOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Vec<Item>;
  type Err = Err;

  fn run(&self, sink: Sink<Vec<Item>, Err>) {
    let timer = SerialSubscription::new();
    sink.add_upstream(Subscription::new(timer.clone()));
    let shared = Arc::new(TimeCountShared {
      state: ReentrantLock::new(WindowState { buffer: Vec::new(), window: 0 }),
      sink: sink.clone(),
      scheduler: self.scheduler.clone(),
      span: self.span,
      timer,
    });
    shared.arm();
    let observer = BufferTimeCountObserver { shared, capacity: self.capacity.max(1) };
    self.source.attach(observer, &sink);
  }
}

struct WindowState<Item> {
  buffer: Vec<Item>,
  // Bumped on every flush; a timer armed for an older window is stale.
  window: u64,
}

struct TimeCountShared<Item, Err> {
  state: ReentrantLock<WindowState<Item>>,
  sink: Sink<Vec<Item>, Err>,
  scheduler: Arc<dyn Scheduler>,
  span: Duration,
  timer: SerialSubscription,
}

impl<Item, Err> TimeCountShared<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn arm(self: &Arc<Self>) {
    if self.sink.is_disposed() {
      return;
    }
    let window = self.state.with(|state| state.window);
    let this = self.clone();
    let fire = self.scheduler.schedule_after(
      self.span,
      Box::new(move || {
        this.flush_window(window);
        this.arm();
      }),
    );
    self.timer.set(fire);
  }

  fn flush_window(&self, window: u64) {
    let guard = self.state.lock();
    let out = guard.with(|state| {
      if state.window != window {
        return None;
      }
      state.window += 1;
      Some(mem::take(&mut state.buffer))
    });
    if let Some(out) = out {
      self.sink.next(out);
    }
  }
}

struct BufferTimeCountObserver<Item, Err> {
  shared: Arc<TimeCountShared<Item, Err>>,
  capacity: usize,
}

impl<Item, Err> Observer<Item, Err> for BufferTimeCountObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    let guard = self.shared.state.lock();
    let full = guard.with(|state| {
      state.buffer.push(value);
      if state.buffer.len() >= self.capacity {
        state.window += 1;
        Some(mem::take(&mut state.buffer))
      } else {
        None
      }
    });
    if let Some(out) = full {
      self.shared.sink.next(out);
      // The count flush closes the window, so the clock restarts.
      self.shared.arm();
    }
  }

  fn error(&mut self, err: Err) {
    let guard = self.shared.state.lock();
    guard.with(|state| state.buffer.clear());
    self.shared.sink.error(err);
  }

  fn complete(&mut self) {
    let guard = self.shared.state.lock();
    let out = guard.with(|state| {
      state.window += 1;
      mem::take(&mut state.buffer)
    });
    if !out.is_empty() {
      self.shared.sink.next(out);
    }
    self.shared.sink.complete();
  }

  fn is_closed(&self) -> bool { self.shared.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Group values into `Vec`s of `capacity`; a non-empty partial buffer is
  /// flushed at completion.
  pub fn buffer_count(&self, capacity: usize) -> Observable<Vec<Item>, Err> {
    Observable::from_producer(BufferCountOp { source: self.clone(), capacity })
  }

  /// Flush everything collected each `span`. Ticks with nothing collected
  /// emit an empty `Vec`.
  pub fn buffer_time(&self, span: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<Vec<Item>, Err> {
    Observable::from_producer(BufferTimeOp { source: self.clone(), span, scheduler })
  }

  /// Flush when `capacity` values have been collected or `span` elapses,
  /// whichever comes first; either flush restarts the clock.
  pub fn buffer_time_count(
    &self, span: Duration, capacity: usize, scheduler: Arc<dyn Scheduler>,
  ) -> Observable<Vec<Item>, Err> {
    Observable::from_producer(BufferTimeCountOp { source: self.clone(), span, capacity, scheduler })
  }
}

#[cfg(test)]
mod test {
  use crate::subscription::SubscriptionLike;
  use std::sync::Mutex as StdMutex;

  use crate::{observable::from_iter, scheduler, subject::PublishSubject};

  use super::*;

  #[test]
  fn count_buffers_fill_and_flush() {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, ()>(1..=7).buffer_count(3).subscribe(move |b| s.lock().unwrap().push(b));
    assert_eq!(*seen.lock().unwrap(), vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
  }

  #[test]
  fn time_buffers_flush_on_the_clock() {
    let subject = PublishSubject::<i32, ()>::new();
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let s = seen.clone();
    let sub = subject
      .observable()
      .buffer_time(Duration::from_millis(40), scheduler::shared())
      .subscribe(move |b| s.lock().unwrap().push(b));
    subject.next(1);
    subject.next(2);
    std::thread::sleep(Duration::from_millis(60));
    subject.next(3);
    std::thread::sleep(Duration::from_millis(60));
    sub.unsubscribe();
    let seen = seen.lock().unwrap().clone();
    assert!(seen.contains(&vec![1, 2]), "missing first window: {seen:?}");
    assert!(seen.contains(&vec![3]), "missing second window: {seen:?}");
  }

  #[test]
  fn count_or_clock_whichever_fires_first() {
    let subject = PublishSubject::<i32, ()>::new();
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let s = seen.clone();
    let sub = subject
      .observable()
      .buffer_time_count(Duration::from_millis(60), 2, scheduler::shared())
      .subscribe(move |b| s.lock().unwrap().push(b));
    // Count closes this window long before the clock would.
    subject.next(1);
    subject.next(2);
    // The clock closes this one.
    subject.next(3);
    std::thread::sleep(Duration::from_millis(120));
    sub.unsubscribe();
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.first(), Some(&vec![1, 2]));
    assert!(seen.contains(&vec![3]), "clock flush missing: {seen:?}");
  }
}

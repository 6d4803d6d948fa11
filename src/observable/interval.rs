use std::{
  marker::PhantomData,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  time::Duration,
};

use crate::{scheduler::Scheduler, sink::Sink};

use super::{Observable, Producer};

/// Emit `0, 1, 2, ...` every `period` on `scheduler`, forever.
///
/// The count restarts at zero for each subscription. Panics if `period` is
/// zero.
pub fn interval<Err>(period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<usize, Err>
where
  Err: Send + 'static,
{
  assert!(!period.is_zero(), "interval period must be non-zero");
  Observable::from_producer(IntervalProducer { period, scheduler, _hint: PhantomData })
}

struct IntervalProducer<Err> {
  period: Duration,
  scheduler: Arc<dyn Scheduler>,
  _hint: PhantomData<fn() -> Err>,
}

impl<Err> Producer for IntervalProducer<Err>
where
  Err: Send + 'static,
{
  type Item = usize;
  type Err = Err;

  fn run(&self, sink: Sink<usize, Err>) {
    let counter = AtomicUsize::new(0);
    let emitter = sink.clone();
    let ticking = self.scheduler.schedule_periodic(
      self.period,
      Box::new(move || {
        emitter.next(counter.fetch_add(1, Ordering::Relaxed));
      }),
    );
    sink.add_upstream(ticking);
  }
}

#[cfg(test)]
mod test {
  use crate::subscription::SubscriptionLike;
  use std::sync::Mutex;

  use crate::scheduler;

  use super::*;

  #[test]
  fn counts_from_zero_until_unsubscribed() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let sub = interval::<()>(Duration::from_millis(10), scheduler::shared())
      .subscribe(move |n| s.lock().unwrap().push(n));
    std::thread::sleep(Duration::from_millis(100));
    sub.unsubscribe();
    let seen = seen.lock().unwrap().clone();
    assert!(seen.len() >= 3, "expected several ticks, got {seen:?}");
    assert_eq!(seen, (0..seen.len()).collect::<Vec<_>>());
  }
}

use std::time::Duration;

use crate::subscription::Subscription;

use super::Scheduler;

/// Runs work synchronously on the calling thread.
///
/// Delayed and periodic work cannot be expressed without blocking the
/// caller, so `schedule_after` sleeps and `schedule_periodic` is refused.
/// Useful in tests and for forcing a pipeline to stay single-threaded.
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn schedule(&self, task: Box<dyn FnOnce() + Send>) -> Subscription {
    task();
    Subscription::empty()
  }

  fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> Subscription {
    if !delay.is_zero() {
      std::thread::sleep(delay);
    }
    task();
    Subscription::empty()
  }

  fn schedule_periodic(&self, _period: Duration, _task: Box<dyn FnMut() + Send>) -> Subscription {
    panic!("ImmediateScheduler cannot run periodic work; use TokioScheduler or EventLoopScheduler")
  }
}

#[cfg(test)]
mod test {
  use std::{
    sync::{
      atomic::{AtomicBool, Ordering},
      Arc,
    },
    time::Instant,
  };

  use super::*;

  #[test]
  fn runs_inline() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let scheduler = ImmediateScheduler;
    scheduler.schedule(Box::new(move || flag.store(true, Ordering::SeqCst)));
    assert!(ran.load(Ordering::SeqCst));
  }

  #[test]
  fn delay_blocks_the_caller() {
    let scheduler = ImmediateScheduler;
    let start = Instant::now();
    scheduler.schedule_after(Duration::from_millis(20), Box::new(|| {}));
    assert!(start.elapsed() >= Duration::from_millis(20));
  }
}

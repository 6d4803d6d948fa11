//! Execution-context abstraction.
//!
//! Pipelines run synchronously on whichever thread calls `subscribe` or
//! delivers an event; true asynchrony happens only at scheduler boundaries.
//! Every schedule call returns a [`Subscription`] that cancels the pending
//! (or periodic) work; cancelling a unit that is already running lets that
//! invocation finish but prevents subsequent firings.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};
pub use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::subscription::{Subscription, SubscriptionLike};

mod event_loop;
mod immediate;
mod tokio_scheduler;
pub use event_loop::EventLoopScheduler;
pub use immediate::ImmediateScheduler;
pub use tokio_scheduler::TokioScheduler;

pub trait Scheduler: Send + Sync {
  /// Run `task` as soon as the scheduler allows.
  fn schedule(&self, task: Box<dyn FnOnce() + Send>) -> Subscription;

  /// Run `task` once after `delay`.
  fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> Subscription;

  /// Run `task` every `period`, first firing one period from now.
  fn schedule_periodic(&self, period: Duration, task: Box<dyn FnMut() + Send>) -> Subscription;
}

/// The shared timer/pool scheduler backing timing operators by default.
pub fn shared() -> Arc<dyn Scheduler> { TokioScheduler::shared() }

/// Handed to recursive work so it can reschedule itself.
pub struct Recursion {
  pending: AtomicBool,
  cancelled: AtomicBool,
}

impl Recursion {
  /// Ask for another iteration. May be called any number of times per
  /// iteration; iterations do not stack.
  pub fn recurse(&self) { self.pending.store(true, Ordering::Release); }

  pub fn is_cancelled(&self) -> bool { self.cancelled.load(Ordering::Acquire) }
}

/// Schedule a self-rescheduling loop without call-stack growth.
///
/// `work` runs once, and runs again whenever it called
/// [`Recursion::recurse`] during its iteration. The repetition is a
/// trampoline loop inside a single scheduled unit rather than recursive
/// scheduling, so unbounded loops (generators, retry-until-success) keep a
/// flat stack.
/// Cancellation is checked between iterations.
pub fn schedule_recursive(
  scheduler: &Arc<dyn Scheduler>, mut work: impl FnMut(&Recursion) + Send + 'static,
) -> Subscription {
  let recursion = Arc::new(Recursion { pending: AtomicBool::new(false), cancelled: AtomicBool::new(false) });
  let driver = recursion.clone();
  let task = Box::new(move || loop {
    if driver.is_cancelled() {
      break;
    }
    work(&driver);
    if !driver.pending.swap(false, Ordering::AcqRel) {
      break;
    }
  });
  let scheduled = scheduler.schedule(task);
  let cancel = recursion.clone();
  Subscription::new(RecursiveHandle { recursion: cancel, scheduled: Mutex::new(Some(scheduled)) })
}

struct RecursiveHandle {
  recursion: Arc<Recursion>,
  scheduled: Mutex<Option<Subscription>>,
}

impl SubscriptionLike for RecursiveHandle {
  fn unsubscribe(&self) {
    self.recursion.cancelled.store(true, Ordering::Release);
    let scheduled = self.scheduled.lock().take();
    if let Some(scheduled) = scheduled {
      scheduled.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.recursion.is_cancelled() }
}

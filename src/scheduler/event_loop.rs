use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::Duration,
};

use tokio::sync::mpsc::{self, UnboundedSender};

use crate::subscription::{CompositeSubscription, Subscription};

use super::{Scheduler, TokioScheduler};

enum Message {
  Run(Box<dyn FnOnce() + Send>),
  Shutdown,
}

/// A scheduler backed by one dedicated thread.
///
/// All immediate work funnels through a single queue and runs in submission
/// order, which gives serialized execution without any locking in the work
/// itself. Timed work is armed on the shared timer and hops onto the loop
/// thread when it fires, so delayed tasks observe the same serialization.
///
/// Dropping the scheduler shuts the thread down after the queued work drains.
pub struct EventLoopScheduler {
  sender: UnboundedSender<Message>,
}

impl EventLoopScheduler {
  pub fn new() -> Arc<Self> {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    std::thread::Builder::new()
      .name("rxcore-event-loop".into())
      .spawn(move || {
        log::debug!("event loop thread started");
        while let Some(message) = receiver.blocking_recv() {
          match message {
            Message::Run(task) => task(),
            Message::Shutdown => break,
          }
        }
        log::debug!("event loop thread shut down");
      })
      .unwrap_or_else(|e| panic!("failed to spawn the event loop thread: {e}"));
    Arc::new(Self { sender })
  }
}

fn post(sender: &UnboundedSender<Message>, cancelled: Arc<AtomicBool>, task: Box<dyn FnOnce() + Send>) {
  let _ = sender.send(Message::Run(Box::new(move || {
    if !cancelled.load(Ordering::Acquire) {
      task();
    }
  })));
}

impl Scheduler for EventLoopScheduler {
  fn schedule(&self, task: Box<dyn FnOnce() + Send>) -> Subscription {
    let cancelled = Arc::new(AtomicBool::new(false));
    post(&self.sender, cancelled.clone(), task);
    cancel_flag(cancelled)
  }

  fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> Subscription {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    let sender = self.sender.clone();
    let timer = TokioScheduler.schedule_after(delay, Box::new(move || post(&sender, flag, task)));
    let both = CompositeSubscription::new();
    both.add(timer);
    both.add(cancel_flag(cancelled));
    Subscription::new(both)
  }

  fn schedule_periodic(&self, period: Duration, task: Box<dyn FnMut() + Send>) -> Subscription {
    let cancelled = Arc::new(AtomicBool::new(false));
    let task = Arc::new(parking_lot::Mutex::new(task));
    let sender = self.sender.clone();
    let flag = cancelled.clone();
    let timer = TokioScheduler.schedule_periodic(
      period,
      Box::new(move || {
        let task = task.clone();
        post(&sender, flag.clone(), Box::new(move || (*task.lock())()));
      }),
    );
    let both = CompositeSubscription::new();
    both.add(timer);
    both.add(cancel_flag(cancelled));
    Subscription::new(both)
  }
}

fn cancel_flag(cancelled: Arc<AtomicBool>) -> Subscription {
  Subscription::from_fn(move || cancelled.store(true, Ordering::Release))
}

impl Drop for EventLoopScheduler {
  fn drop(&mut self) { let _ = self.sender.send(Message::Shutdown); }
}

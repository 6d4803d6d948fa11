use std::{sync::Arc, time::Duration};

use once_cell::sync::Lazy;
use tokio::{runtime::Runtime, task::JoinHandle};

use crate::subscription::{Subscription, SubscriptionLike};

use super::Scheduler;

static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
  tokio::runtime::Builder::new_multi_thread()
    .thread_name("rxcore-pool")
    .enable_time()
    .build()
    .unwrap_or_else(|e| panic!("failed to start the shared scheduler runtime: {e}"))
});

static SHARED: Lazy<Arc<TokioScheduler>> = Lazy::new(|| Arc::new(TokioScheduler));

/// Pool scheduler on a process-wide tokio runtime.
///
/// Work units become spawned tasks; timed work awaits the tokio timer, so
/// delays and periods do not tie up a thread. Cancellation aborts the task,
/// which takes effect at the next await point and therefore never interrupts
/// a task mid-closure.
pub struct TokioScheduler;

impl TokioScheduler {
  pub fn shared() -> Arc<dyn Scheduler> { SHARED.clone() }
}

impl Scheduler for TokioScheduler {
  fn schedule(&self, task: Box<dyn FnOnce() + Send>) -> Subscription {
    let handle = RUNTIME.spawn(async move { task() });
    Subscription::new(SpawnHandle { handle })
  }

  fn schedule_after(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> Subscription {
    let handle = RUNTIME.spawn(async move {
      tokio::time::sleep(delay).await;
      task();
    });
    Subscription::new(SpawnHandle { handle })
  }

  fn schedule_periodic(&self, period: Duration, mut task: Box<dyn FnMut() + Send>) -> Subscription {
    let handle = RUNTIME.spawn(async move {
      let start = tokio::time::Instant::now() + period;
      let mut ticker = tokio::time::interval_at(start, period);
      loop {
        ticker.tick().await;
        task();
      }
    });
    Subscription::new(SpawnHandle { handle })
  }
}

struct SpawnHandle {
  handle: JoinHandle<()>,
}

impl SubscriptionLike for SpawnHandle {
  fn unsubscribe(&self) { self.handle.abort(); }

  fn is_closed(&self) -> bool { self.handle.is_finished() }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;

  #[test]
  fn runs_off_the_calling_thread() {
    let caller = std::thread::current().id();
    let (tx, rx) = std::sync::mpsc::channel();
    TokioScheduler.schedule(Box::new(move || {
      let _ = tx.send(std::thread::current().id());
    }));
    let worker = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_ne!(caller, worker);
  }

  #[test]
  fn delayed_work_can_be_cancelled() {
    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    let sub = TokioScheduler.schedule_after(
      Duration::from_millis(40),
      Box::new(move || {
        f.fetch_add(1, Ordering::SeqCst);
      }),
    );
    sub.unsubscribe();
    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn periodic_fires_until_cancelled() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let t = ticks.clone();
    let sub = TokioScheduler.schedule_periodic(
      Duration::from_millis(10),
      Box::new(move || {
        t.fetch_add(1, Ordering::SeqCst);
      }),
    );
    std::thread::sleep(Duration::from_millis(100));
    sub.unsubscribe();
    let settled = ticks.load(Ordering::SeqCst);
    assert!(settled >= 3, "expected several ticks, got {settled}");
    std::thread::sleep(Duration::from_millis(50));
    assert!(ticks.load(Ordering::SeqCst) <= settled + 1);
  }
}

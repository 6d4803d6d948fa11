use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::Mutex;

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
  subscription::{SerialSubscription, Subscription},
};

pub struct RetryOp<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  /// `None` retries forever.
  pub(crate) budget: Option<usize>,
}

impl<Item, Err> Producer for RetryOp<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let serial = SerialSubscription::new();
    sink.add_upstream(Subscription::new(serial.clone()));
    let shared = Arc::new(RetryShared {
      source: self.source.clone(),
      sink,
      budget: Mutex::new(self.budget),
      serial,
      pending: AtomicBool::new(true),
      pumping: AtomicBool::new(false),
    });
    shared.pump();
  }
}

struct RetryShared<Item, Err> {
  source: Observable<Item, Err>,
  sink: Sink<Item, Err>,
  budget: Mutex<Option<usize>>,
  serial: SerialSubscription,
  pending: AtomicBool,
  pumping: AtomicBool,
}

impl<Item, Err> RetryShared<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Drive (re)subscriptions from a flat loop. A source that fails
  /// synchronously marks `pending` from inside `attach` and returns; the
  /// loop picks it up, so a thousand immediate failures never deepen the
  /// stack.
  fn pump(self: &Arc<Self>) {
    if self.pumping.swap(true, Ordering::AcqRel) {
      return;
    }
    loop {
      if !self.pending.swap(false, Ordering::AcqRel) {
        break;
      }
      if self.sink.is_disposed() {
        break;
      }
      let observer = RetryObserver { shared: self.clone() };
      let handle = self.source.attach(observer, &self.sink);
      self.serial.set(handle);
    }
    self.pumping.store(false, Ordering::Release);
    // A request that slipped in between the last check and the release.
    if self.pending.load(Ordering::Acquire) && !self.sink.is_disposed() {
      self.pump();
    }
  }

  fn request_resubscribe(self: &Arc<Self>) {
    self.pending.store(true, Ordering::Release);
    self.pump();
  }
}

struct RetryObserver<Item, Err> {
  shared: Arc<RetryShared<Item, Err>>,
}

impl<Item, Err> Observer<Item, Err> for RetryObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.shared.sink.next(value) }

  fn error(&mut self, err: Err) {
    let allowed = {
      let mut budget = self.shared.budget.lock();
      match budget.as_mut() {
        None => true,
        Some(0) => false,
        Some(n) => {
          *n -= 1;
          true
        }
      }
    };
    if allowed {
      self.shared.request_resubscribe();
    } else {
      self.shared.sink.error(err);
    }
  }

  fn complete(&mut self) { self.shared.sink.complete() }

  fn is_closed(&self) -> bool { self.shared.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Resubscribe to the source every time it errors, forever. Values from
  /// every attempt flow through; completion passes straight through.
  pub fn retry(&self) -> Observable<Item, Err> {
    Observable::from_producer(RetryOp { source: self.clone(), budget: None })
  }

  /// Resubscribe at most `retries` times after failures; the error that
  /// exhausts the budget is forwarded.
  pub fn retry_times(&self, retries: usize) -> Observable<Item, Err> {
    Observable::from_producer(RetryOp { source: self.clone(), budget: Some(retries) })
  }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex as StdMutex,
  };

  use crate::observable::create;

  use super::*;

  fn failing_twice(attempts: Arc<AtomicUsize>) -> Observable<usize, &'static str> {
    create(move |sink: Sink<usize, &'static str>| {
      let attempt = attempts.fetch_add(1, Ordering::SeqCst);
      sink.next(attempt);
      if attempt < 2 {
        sink.error("flaky");
      } else {
        sink.complete();
      }
      Subscription::empty()
    })
  }

  #[test]
  fn resubscribes_until_success() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let log = Arc::new(StdMutex::new(Vec::new()));
    let (l, l2) = (log.clone(), log.clone());
    failing_twice(attempts.clone()).retry().subscribe_complete(
      move |v| l.lock().unwrap().push(format!("n{v}")),
      move || l2.lock().unwrap().push("c".into()),
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(*log.lock().unwrap(), vec!["n0", "n1", "n2", "c"]);
  }

  #[test]
  fn a_spent_budget_forwards_the_error() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let caught = Arc::new(StdMutex::new(None));
    let c = caught.clone();
    failing_twice(attempts.clone())
      .retry_times(1)
      .subscribe_err(|_| {}, move |e| *c.lock().unwrap() = Some(e));
    // Initial attempt plus one retry.
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(*caught.lock().unwrap(), Some("flaky"));
  }

  #[test]
  fn many_synchronous_failures_stay_stack_flat() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let a = attempts.clone();
    let source = create(move |sink: Sink<usize, &'static str>| {
      a.fetch_add(1, Ordering::SeqCst);
      sink.error("always");
      Subscription::empty()
    });
    let caught = Arc::new(StdMutex::new(None));
    let c = caught.clone();
    source
      .retry_times(50_000)
      .subscribe_err(|_| {}, move |e| *c.lock().unwrap() = Some(e));
    assert_eq!(attempts.load(Ordering::SeqCst), 50_001);
    assert_eq!(*caught.lock().unwrap(), Some("always"));
  }
}

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
  subscription::{SerialSubscription, Subscription},
};

pub struct RetryWhenOp<Item, Err, F> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) handler: F,
}

impl<Item, Err, Signal, F> Producer for RetryWhenOp<Item, Err, F>
where
  F: Fn(Err) -> Observable<Signal, Err> + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Signal: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let serial = SerialSubscription::new();
    sink.add_upstream(Subscription::new(serial.clone()));
    let shared = Arc::new(RetryWhenShared {
      source: self.source.clone(),
      sink,
      handler: self.handler.clone(),
      serial,
      pending: AtomicBool::new(true),
      pumping: AtomicBool::new(false),
    });
    shared.pump();
  }
}

struct RetryWhenShared<Item, Err, F> {
  source: Observable<Item, Err>,
  sink: Sink<Item, Err>,
  handler: F,
  serial: SerialSubscription,
  pending: AtomicBool,
  pumping: AtomicBool,
}

impl<Item, Err, Signal, F> RetryWhenShared<Item, Err, F>
where
  F: Fn(Err) -> Observable<Signal, Err> + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Signal: Send + 'static,
{
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
      let observer = SourceObserver { shared: self.clone() };
      let handle = self.source.attach(observer, &self.sink);
      self.serial.set(handle);
    }
    self.pumping.store(false, Ordering::Release);
    if self.pending.load(Ordering::Acquire) && !self.sink.is_disposed() {
      self.pump();
    }
  }

  fn request_resubscribe(self: &Arc<Self>) {
    self.pending.store(true, Ordering::Release);
    self.pump();
  }
}

struct SourceObserver<Item, Err, F> {
  shared: Arc<RetryWhenShared<Item, Err, F>>,
}

impl<Item, Err, Signal, F> Observer<Item, Err> for SourceObserver<Item, Err, F>
where
  F: Fn(Err) -> Observable<Signal, Err> + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Signal: Send + 'static,
{
  fn next(&mut self, value: Item) { self.shared.sink.next(value) }

  fn error(&mut self, err: Err) {
    // Ask the notifier what to do with this failure: a value retries, a
    // completion gives up quietly, an error gives up loudly.
    let notifier = (self.shared.handler)(err);
    let observer = NotifierObserver { shared: self.shared.clone(), signalled: false };
    notifier.attach(observer, &self.shared.sink);
  }

  fn complete(&mut self) { self.shared.sink.complete() }

  fn is_closed(&self) -> bool { self.shared.sink.is_disposed() }
}

struct NotifierObserver<Item, Err, F> {
  shared: Arc<RetryWhenShared<Item, Err, F>>,
  signalled: bool,
}

impl<Item, Err, Signal, F> Observer<Signal, Err> for NotifierObserver<Item, Err, F>
where
  F: Fn(Err) -> Observable<Signal, Err> + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Signal: Send + 'static,
{
  fn next(&mut self, _signal: Signal) {
    if self.signalled {
      return;
    }
    self.signalled = true;
    self.shared.request_resubscribe();
  }

  fn error(&mut self, err: Err) { self.shared.sink.error(err) }

  fn complete(&mut self) {
    if !self.signalled {
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
  /// Resubscribe on failure only when the per-error notifier built by
  /// `handler` emits a value; the notifier completing ends the stream
  /// without an error, and a notifier error is forwarded.
  pub fn retry_when<Signal, F>(&self, handler: F) -> Observable<Item, Err>
  where
    F: Fn(Err) -> Observable<Signal, Err> + Clone + Send + Sync + 'static,
    Signal: Send + 'static,
  {
    Observable::from_producer(RetryWhenOp { source: self.clone(), handler })
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
    observable::{create, empty, throw, timer},
    scheduler,
  };

  use super::*;

  #[test]
  fn retries_after_each_notifier_signal() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let a = attempts.clone();
    let source = create(move |sink: Sink<usize, &'static str>| {
      let attempt = a.fetch_add(1, Ordering::SeqCst);
      if attempt < 2 {
        sink.error("flaky");
      } else {
        sink.next(attempt);
        sink.complete();
      }
      Subscription::empty()
    });
    let log = Arc::new(StdMutex::new(Vec::new()));
    let (l, l2) = (log.clone(), log.clone());
    let (tx, rx) = std::sync::mpsc::channel();
    source
      .retry_when(|_| timer::<&'static str>(Duration::from_millis(10), scheduler::shared()))
      .subscribe_complete(
        move |v| l.lock().unwrap().push(v),
        move || {
          l2.lock().unwrap().push(99);
          let _ = tx.send(());
        },
      );
    rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(*log.lock().unwrap(), vec![2, 99]);
  }

  #[test]
  fn a_completing_notifier_ends_quietly() {
    let log = Arc::new(StdMutex::new(Vec::new()));
    let (l, l2, l3) = (log.clone(), log.clone(), log.clone());
    throw::<i32, &'static str>("fatal")
      .retry_when(|_| empty::<(), &'static str>())
      .subscribe_all(
        move |v| l.lock().unwrap().push(format!("n{v}")),
        move |e| l2.lock().unwrap().push(format!("e{e}")),
        move || l3.lock().unwrap().push("c".into()),
      );
    assert_eq!(*log.lock().unwrap(), vec!["c"]);
  }

  #[test]
  fn a_failing_notifier_forwards_its_error() {
    let caught = Arc::new(StdMutex::new(None));
    let c = caught.clone();
    throw::<i32, &'static str>("fatal")
      .retry_when(|e| throw::<(), &'static str>(e))
      .subscribe_err(|_| {}, move |e| *c.lock().unwrap() = Some(e));
    assert_eq!(*caught.lock().unwrap(), Some("fatal"));
  }
}

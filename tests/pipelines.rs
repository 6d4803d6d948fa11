//! Larger operator pipelines, including the timed ones, run against the real
//! schedulers with generous margins.

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc, Mutex,
};
use std::time::Duration;

use rxcore::prelude::*;

#[test]
fn a_query_pipeline_debounces_and_switches() {
  let queries = PublishSubject::<&'static str, ()>::new();
  let seen = Arc::new(Mutex::new(Vec::new()));
  let s = seen.clone();
  let sub = queries
    .observable()
    .debounce(Duration::from_millis(30), scheduler::shared())
    .switch_map(|q| {
      timer::<()>(Duration::from_millis(10), scheduler::shared()).map(move |_| format!("results:{q}"))
    })
    .subscribe(move |v| s.lock().unwrap().push(v));

  queries.next("r");
  queries.next("ru");
  queries.next("rust");
  std::thread::sleep(Duration::from_millis(120));
  sub.unsubscribe();
  assert_eq!(*seen.lock().unwrap(), vec!["results:rust"]);
}

#[test]
fn merge_then_scan_counts_events_from_both_sources() {
  let a = PublishSubject::<i32, ()>::new();
  let b = PublishSubject::<i32, ()>::new();
  let seen = Arc::new(Mutex::new(Vec::new()));
  let s = seen.clone();
  a.observable()
    .merge(&b.observable())
    .scan(0, |acc, _| acc + 1)
    .subscribe(move |count| s.lock().unwrap().push(count));
  a.next(10);
  b.next(20);
  a.next(30);
  assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn combine_latest_over_two_tickers() {
  let fast = interval::<()>(Duration::from_millis(10), scheduler::shared());
  let slow = interval::<()>(Duration::from_millis(35), scheduler::shared());
  let seen = Arc::new(Mutex::new(Vec::new()));
  let s = seen.clone();
  let sub = fast
    .combine_latest(&slow, |f, sl| (*f, *sl))
    .subscribe(move |pair| s.lock().unwrap().push(pair));
  std::thread::sleep(Duration::from_millis(150));
  sub.unsubscribe();

  let seen = seen.lock().unwrap().clone();
  assert!(!seen.is_empty(), "nothing combined");
  // Both components must be monotonically non-decreasing.
  assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0 && w[0].1 <= w[1].1), "{seen:?}");
  assert!(seen.iter().any(|(_, slow_tick)| *slow_tick >= 1), "slow side never advanced: {seen:?}");
}

#[test]
fn retry_recovers_a_flaky_async_source() {
  let attempts = Arc::new(AtomicUsize::new(0));
  let a = attempts.clone();
  let flaky = create(move |sink: Sink<&'static str, &'static str>| {
    let attempt = a.fetch_add(1, Ordering::SeqCst);
    if attempt < 2 {
      sink.error("connection reset");
    } else {
      sink.next("payload");
      sink.complete();
    }
    Subscription::empty()
  });
  let log = Arc::new(Mutex::new(Vec::new()));
  let (l, l2) = (log.clone(), log.clone());
  flaky
    .retry_times(5)
    .subscribe_complete(
      move |v| l.lock().unwrap().push(v.to_string()),
      move || l2.lock().unwrap().push("done".into()),
    );
  assert_eq!(attempts.load(Ordering::SeqCst), 3);
  assert_eq!(*log.lock().unwrap(), vec!["payload", "done"]);
}

#[test]
fn share_runs_one_upstream_for_many_downstreams() {
  let runs = Arc::new(AtomicUsize::new(0));
  let r = runs.clone();
  let ticks = create(move |sink: Sink<usize, ()>| {
    r.fetch_add(1, Ordering::SeqCst);
    let emitter = sink.clone();
    scheduler::shared().schedule_periodic(
      Duration::from_millis(15),
      Box::new({
        let mut n = 0;
        move || {
          emitter.next(n);
          n += 1;
        }
      }),
    )
  })
  .share();

  let a = Arc::new(Mutex::new(Vec::new()));
  let b = Arc::new(Mutex::new(Vec::new()));
  let (ca, cb) = (a.clone(), b.clone());
  let sub_a = ticks.subscribe(move |v| ca.lock().unwrap().push(v));
  let sub_b = ticks.subscribe(move |v| cb.lock().unwrap().push(v));
  std::thread::sleep(Duration::from_millis(100));
  sub_a.unsubscribe();
  sub_b.unsubscribe();

  assert_eq!(runs.load(Ordering::SeqCst), 1);
  assert!(!a.lock().unwrap().is_empty());
  assert!(!b.lock().unwrap().is_empty());
}

#[test]
fn observe_on_moves_a_synchronous_burst_off_thread_in_order() {
  let caller = std::thread::current().id();
  let seen = Arc::new(Mutex::new(Vec::new()));
  let s = seen.clone();
  let (tx, rx) = std::sync::mpsc::channel();
  from_iter::<_, ()>(0..500)
    .map(|v| v * 2)
    .observe_on(scheduler::shared())
    .subscribe_complete(
      move |v| {
        assert_ne!(std::thread::current().id(), caller);
        s.lock().unwrap().push(v);
      },
      move || {
        let _ = tx.send(());
      },
    );
  rx.recv_timeout(Duration::from_secs(2)).unwrap();
  assert_eq!(*seen.lock().unwrap(), (0..500).map(|v| v * 2).collect::<Vec<_>>());
}

#[test]
fn buffers_feed_batch_consumers() {
  let seen = Arc::new(Mutex::new(Vec::new()));
  let s = seen.clone();
  from_iter::<_, ()>(1..=10)
    .buffer_count(4)
    .map(|batch| batch.iter().sum::<i32>())
    .subscribe(move |total| s.lock().unwrap().push(total));
  assert_eq!(*seen.lock().unwrap(), vec![10, 26, 19]);
}

#[test]
fn errors_fall_back_and_the_fallback_can_time_out() {
  let log = Arc::new(Mutex::new(Vec::new()));
  let (l, l2) = (log.clone(), log.clone());
  throw::<i32, SequenceError>(SequenceError::NoElements)
    .catch_error(|_| never::<i32, SequenceError>())
    .timeout(Duration::from_millis(30), scheduler::shared())
    .subscribe_err(
      move |v| l.lock().unwrap().push(format!("n{v}")),
      move |e| l2.lock().unwrap().push(format!("e{e}")),
    );
  std::thread::sleep(Duration::from_millis(120));
  assert_eq!(*log.lock().unwrap(), vec!["esequence timed out"]);
}

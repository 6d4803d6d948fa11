use crate::sink::Sink;

use super::{Observable, Producer};

/// Defer building the observable until subscription time.
///
/// The factory runs once per subscriber, so each subscription observes a
/// stream built from the state of the world at that moment.
pub fn defer<Item, Err, F>(factory: F) -> Observable<Item, Err>
where
  F: Fn() -> Observable<Item, Err> + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  Observable::from_producer(DeferProducer { factory })
}

struct DeferProducer<F> {
  factory: F,
}

impl<Item, Err, F> Producer for DeferProducer<F>
where
  F: Fn() -> Observable<Item, Err> + Send + Sync,
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    let source = (self.factory)();
    source.attach(sink.clone(), &sink);
  }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  };

  use crate::observable::of;

  use super::*;

  #[test]
  fn factory_runs_per_subscription() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let source = defer(move || {
      let n = c.fetch_add(1, Ordering::SeqCst);
      of::<_, ()>(n)
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let seen = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..2 {
      let s = seen.clone();
      source.subscribe(move |v| s.lock().unwrap().push(v));
    }
    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
  }
}

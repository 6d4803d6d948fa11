use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
};

pub struct ScanOp<Item, Err, Acc, F> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) seed: Acc,
  pub(crate) accumulate: F,
}

impl<Item, Err, Acc, F> Producer for ScanOp<Item, Err, Acc, F>
where
  F: Fn(Acc, Item) -> Acc + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Acc: Clone + Send + Sync + 'static,
{
  type Item = Acc;
  type Err = Err;

  fn run(&self, sink: Sink<Acc, Err>) {
    let observer = ScanObserver {
      sink: sink.clone(),
      acc: self.seed.clone(),
      accumulate: self.accumulate.clone(),
    };
    self.source.attach(observer, &sink);
  }
}

struct ScanObserver<Acc, Err, F> {
  sink: Sink<Acc, Err>,
  acc: Acc,
  accumulate: F,
}

impl<Item, Err, Acc, F> Observer<Item, Err> for ScanObserver<Acc, Err, F>
where
  F: Fn(Acc, Item) -> Acc,
  Acc: Clone,
{
  fn next(&mut self, value: Item) {
    self.acc = (self.accumulate)(self.acc.clone(), value);
    self.sink.next(self.acc.clone());
  }

  fn error(&mut self, err: Err) { self.sink.error(err) }

  fn complete(&mut self) { self.sink.complete() }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emit a running accumulation: each value folds into the accumulator and
  /// the updated accumulator is emitted. The seed itself is not emitted.
  pub fn scan<Acc, F>(&self, seed: Acc, accumulate: F) -> Observable<Acc, Err>
  where
    F: Fn(Acc, Item) -> Acc + Clone + Send + Sync + 'static,
    Acc: Clone + Send + Sync + 'static,
  {
    Observable::from_producer(ScanOp { source: self.clone(), seed, accumulate })
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::observable::from_iter;

  #[test]
  fn emits_the_running_total() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, ()>(1..=4).scan(0, |acc, v| acc + v).subscribe(move |v| s.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![1, 3, 6, 10]);
  }

  #[test]
  fn state_restarts_per_subscription() {
    let source = from_iter::<_, ()>(1..=2).scan(0, |acc, v| acc + v);
    for _ in 0..2 {
      let seen = Arc::new(Mutex::new(Vec::new()));
      let s = seen.clone();
      source.subscribe(move |v| s.lock().unwrap().push(v));
      assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }
  }
}

use crate::{
  observable::{Observable, Producer},
  observer::Observer,
  sink::Sink,
};

pub struct CatchErrorOp<Item, Err, F> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) handler: F,
}

impl<Item, Err, Err2, F> Producer for CatchErrorOp<Item, Err, F>
where
  F: Fn(Err) -> Observable<Item, Err2> + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Err2: Send + 'static,
{
  type Item = Item;
  type Err = Err2;

  fn run(&self, sink: Sink<Item, Err2>) {
    let observer = CatchObserver { sink: sink.clone(), handler: self.handler.clone() };
    self.source.attach(observer, &sink);
  }
}

struct CatchObserver<Item, Err2, F> {
  sink: Sink<Item, Err2>,
  handler: F,
}

impl<Item, Err, Err2, F> Observer<Item, Err> for CatchObserver<Item, Err2, F>
where
  F: Fn(Err) -> Observable<Item, Err2>,
  Item: Send + 'static,
  Err2: Send + 'static,
{
  fn next(&mut self, value: Item) { self.sink.next(value) }

  fn error(&mut self, err: Err) {
    // The failed upstream is already terminated; hand the downstream over
    // to the fallback stream.
    let fallback = (self.handler)(err);
    fallback.attach(self.sink.clone(), &self.sink);
  }

  fn complete(&mut self) { self.sink.complete() }

  fn is_closed(&self) -> bool { self.sink.is_disposed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Swap a failing stream for the fallback the handler builds from the
  /// error; values emitted before the failure are unaffected.
  pub fn catch_error<Err2, F>(&self, handler: F) -> Observable<Item, Err2>
  where
    F: Fn(Err) -> Observable<Item, Err2> + Clone + Send + Sync + 'static,
    Err2: Send + 'static,
  {
    Observable::from_producer(CatchErrorOp { source: self.clone(), handler })
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::{
    observable::{create, from_iter, throw},
    subscription::Subscription,
  };

  use super::*;

  #[test]
  fn the_fallback_continues_the_stream() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l, l2) = (log.clone(), log.clone());
    create(|sink: Sink<i32, &'static str>| {
      sink.next(1);
      sink.error("boom");
      Subscription::empty()
    })
    .catch_error(|_| from_iter::<_, ()>(vec![8, 9]))
    .subscribe_complete(
      move |v| l.lock().unwrap().push(format!("n{v}")),
      move || l2.lock().unwrap().push("c".into()),
    );
    assert_eq!(*log.lock().unwrap(), vec!["n1", "n8", "n9", "c"]);
  }

  #[test]
  fn the_handler_sees_the_error() {
    let caught = Arc::new(Mutex::new(None));
    let c = caught.clone();
    throw::<i32, &'static str>("original")
      .catch_error(move |e| {
        *c.lock().unwrap() = Some(e);
        throw::<i32, &'static str>("replacement")
      })
      .subscribe_err(|_| {}, |_| {});
    assert_eq!(*caught.lock().unwrap(), Some("original"));
  }

  #[test]
  fn a_clean_stream_never_calls_the_handler() {
    let called = Arc::new(Mutex::new(false));
    let flag = called.clone();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    from_iter::<_, &'static str>(1..=3)
      .catch_error(move |_| {
        *flag.lock().unwrap() = true;
        from_iter::<_, ()>(Vec::new())
      })
      .subscribe(move |v| s.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    assert!(!*called.lock().unwrap());
  }
}

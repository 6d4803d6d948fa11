use crate::{
  observable::{Observable, Producer},
  sink::Sink,
  subscription::Subscription,
};

pub struct FinalizeOp<Item, Err, F> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) action: F,
}

impl<Item, Err, F> Producer for FinalizeOp<Item, Err, F>
where
  F: Fn() + Clone + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run(&self, sink: Sink<Item, Err>) {
    // The action rides the sink's upstream set, so both terminal events and
    // explicit unsubscription release it, exactly once.
    sink.add_upstream(Subscription::from_fn(self.action.clone()));
    self.source.attach(sink.clone(), &sink);
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Run `action` once when the stream ends for any reason, terminal or
  /// unsubscription.
  pub fn finalize<F>(&self, action: F) -> Observable<Item, Err>
  where
    F: Fn() + Clone + Send + Sync + 'static,
  {
    Observable::from_producer(FinalizeOp { source: self.clone(), action })
  }
}

#[cfg(test)]
mod test {
  use crate::subscription::SubscriptionLike;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use crate::observable::{from_iter, never, throw};

  #[test]
  fn runs_once_on_completion() {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    from_iter::<_, ()>(1..=3)
      .finalize(move || {
        c.fetch_add(1, Ordering::SeqCst);
      })
      .subscribe(|_| {});
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn runs_once_on_error() {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    throw::<i32, _>("boom")
      .finalize(move || {
        c.fetch_add(1, Ordering::SeqCst);
      })
      .subscribe_err(|_| {}, |_| {});
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn runs_once_on_unsubscribe() {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let sub = never::<i32, ()>()
      .finalize(move || {
        c.fetch_add(1, Ordering::SeqCst);
      })
      .subscribe(|_| {});
    assert_eq!(count.load(Ordering::SeqCst), 0);
    sub.unsubscribe();
    sub.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }
}

use std::marker::PhantomData;

use crate::sink::Sink;

use super::{Observable, Producer};

/// Emit every element of a clonable iterable in order, then complete.
///
/// Disposal is checked between elements, so an unsubscribing (or
/// short-circuiting, e.g. `take`) downstream stops the iteration instead of
/// draining it into a dead sink.
pub fn from_iter<I, Err>(iter: I) -> Observable<I::Item, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  Observable::from_producer(IterProducer { iter, _hint: PhantomData })
}

struct IterProducer<I, Err> {
  iter: I,
  _hint: PhantomData<fn() -> Err>,
}

impl<I, Err> Producer for IterProducer<I, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = I::Item;
  type Err = Err;

  fn run(&self, sink: Sink<I::Item, Err>) {
    for value in self.iter.clone() {
      if sink.is_disposed() {
        return;
      }
      sink.next(value);
    }
    sink.complete();
  }
}

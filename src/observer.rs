//! Observer trait and adapters.
//!
//! The Observer is the consumer side of the push protocol: `next` for
//! values, `error`/`complete` for the terminal events. Observers must
//! tolerate a source that misbehaves, but when *forwarding* they must never
//! themselves violate the `Next* (Error|Completed)?` grammar; the sink
//! enforces that for every stage.

use crate::event::Event;

pub trait Observer<Item, Err> {
  /// Receive the next value.
  fn next(&mut self, value: Item);

  /// Receive the failure terminal event.
  fn error(&mut self, err: Err);

  /// Receive the completion terminal event.
  fn complete(&mut self);

  /// `true` once this observer will not accept further events. Sources such
  /// as `from_iter` use it to stop emitting early.
  fn is_closed(&self) -> bool { false }

  /// Dispatch a whole [`Event`].
  fn on(&mut self, event: Event<Item, Err>) {
    match event {
      Event::Next(value) => self.next(value),
      Event::Error(err) => self.error(err),
      Event::Completed => self.complete(),
    }
  }
}

/// The type-erased observer every producer runs against.
pub type BoxObserver<Item, Err> = Box<dyn Observer<Item, Err> + Send>;

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

/// Adapts the three subscribe closures into an [`Observer`].
///
/// This is what backs `subscribe`, `subscribe_err`, `subscribe_complete` and
/// `subscribe_all`; handlers the caller did not supply are no-ops.
pub struct CallbackObserver<N, E, C> {
  pub(crate) next: N,
  pub(crate) error: E,
  pub(crate) complete: C,
  pub(crate) stopped: bool,
}

impl<N, E, C> CallbackObserver<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self {
    Self { next, error, complete, stopped: false }
  }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for CallbackObserver<N, E, C>
where
  N: FnMut(Item),
  E: FnMut(Err),
  C: FnMut(),
{
  fn next(&mut self, value: Item) {
    if !self.stopped {
      (self.next)(value);
    }
  }

  fn error(&mut self, err: Err) {
    if !self.stopped {
      self.stopped = true;
      (self.error)(err);
    }
  }

  fn complete(&mut self) {
    if !self.stopped {
      self.stopped = true;
      (self.complete)();
    }
  }

  fn is_closed(&self) -> bool { self.stopped }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn callback_observer_stops_after_terminal() {
    let mut values = Vec::new();
    let mut completed = 0;
    {
      let mut observer = CallbackObserver::new(|v: i32| values.push(v), |_: ()| {}, || completed += 1);
      observer.next(1);
      observer.complete();
      observer.next(2);
      observer.complete();
      assert!(observer.is_closed());
    }
    assert_eq!(values, vec![1]);
    assert_eq!(completed, 1);
  }

  #[test]
  fn event_dispatch() {
    let log = std::cell::RefCell::new(Vec::new());
    {
      let mut observer = CallbackObserver::new(
        |v: i32| log.borrow_mut().push(format!("n{v}")),
        |e: i32| log.borrow_mut().push(format!("e{e}")),
        || {},
      );
      observer.on(Event::Next(1));
      observer.on(Event::Error(9));
    }
    assert_eq!(log.into_inner(), vec!["n1", "e9"]);
  }
}

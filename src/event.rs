//! The event model of a stream.
//!
//! A well-formed stream delivers zero or more `Next` events followed by at
//! most one terminal event (`Error` or `Completed`), and nothing after that.

/// A single notification pushed from a source to an [`Observer`].
///
/// [`Observer`]: crate::observer::Observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<Item, Err> {
  /// A value of the sequence.
  Next(Item),
  /// The sequence failed. Terminal.
  Error(Err),
  /// The sequence finished successfully. Terminal.
  Completed,
}

impl<Item, Err> Event<Item, Err> {
  /// `true` for `Error` and `Completed`, the events that end a sequence.
  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Event::Next(_)) }

  /// Map the value carried by a `Next` event, leaving terminals untouched.
  pub fn map<B, F>(self, f: F) -> Event<B, Err>
  where
    F: FnOnce(Item) -> B,
  {
    match self {
      Event::Next(v) => Event::Next(f(v)),
      Event::Error(e) => Event::Error(e),
      Event::Completed => Event::Completed,
    }
  }
}

//! Multicast pivots.
//!
//! A subject is an observer and an observable at once: events pushed into it
//! fan out to every current subscriber. Delivery is serialized through one
//! reentrant lock per subject, so concurrent producers never interleave
//! events, and a terminal event is remembered: subscribers arriving after it
//! receive exactly that terminal event and nothing else.

use smallvec::SmallVec;

use crate::{sink::Sink, sync::ReentrantLock};

mod behavior_subject;
mod publish_subject;
mod replay_subject;
pub use behavior_subject::BehaviorSubject;
pub use publish_subject::PublishSubject;
pub use replay_subject::ReplaySubject;

pub(crate) enum Terminal<Err> {
  Completed,
  Error(Err),
}

impl<Err: Clone> Clone for Terminal<Err> {
  fn clone(&self) -> Self {
    match self {
      Terminal::Completed => Terminal::Completed,
      Terminal::Error(e) => Terminal::Error(e.clone()),
    }
  }
}

pub(crate) struct SubjectCore<Item, Err> {
  state: ReentrantLock<CoreState<Item, Err>>,
}

struct CoreState<Item, Err> {
  sinks: SmallVec<[Sink<Item, Err>; 2]>,
  terminal: Option<Terminal<Err>>,
}

impl<Item, Err> Default for SubjectCore<Item, Err> {
  fn default() -> Self {
    Self { state: ReentrantLock::new(CoreState { sinks: SmallVec::new(), terminal: None }) }
  }
}

impl<Item, Err> SubjectCore<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  /// Broadcast a value. `stash` runs under the subject lock before the
  /// fan-out; Behavior and Replay use it to record the value for future
  /// subscribers without a window where a new subscriber could miss it.
  pub(crate) fn next_and(&self, value: Item, stash: impl FnOnce(&Item)) {
    let guard = self.state.lock();
    let snapshot = guard.with(|s| {
      if s.terminal.is_some() {
        return None;
      }
      stash(&value);
      s.sinks.retain(|sink| !sink.is_disposed());
      Some(s.sinks.clone())
    });
    let Some(snapshot) = snapshot else { return };
    for sink in &snapshot {
      sink.next(value.clone());
    }
  }

  pub(crate) fn next(&self, value: Item) { self.next_and(value, |_| {}) }

  /// Deliver the terminal event to every subscriber and memoize it. Only the
  /// first terminal wins.
  pub(crate) fn terminate(&self, terminal: Terminal<Err>) {
    let snapshot = {
      let guard = self.state.lock();
      guard.with(|s| {
        if s.terminal.is_some() {
          return None;
        }
        s.terminal = Some(terminal.clone());
        Some(std::mem::take(&mut s.sinks))
      })
    };
    let Some(snapshot) = snapshot else { return };
    for sink in snapshot {
      match &terminal {
        Terminal::Completed => sink.complete(),
        Terminal::Error(e) => sink.error(e.clone()),
      }
    }
  }

  /// Register a subscriber. `replay` runs under the subject lock before the
  /// sink joins the broadcast list, so replayed history cannot interleave
  /// with live values. After a terminal event the sink receives only that
  /// event.
  pub(crate) fn insert(&self, sink: Sink<Item, Err>, replay: impl FnOnce(&Sink<Item, Err>)) {
    self.insert_inner(sink, replay, false)
  }

  /// Like [`insert`](Self::insert), but still runs `replay` for subscribers
  /// arriving after the terminal event, which then follows the replayed
  /// history. Replay subjects keep their buffer meaningful after the stream
  /// has ended.
  pub(crate) fn insert_replaying(&self, sink: Sink<Item, Err>, replay: impl FnOnce(&Sink<Item, Err>)) {
    self.insert_inner(sink, replay, true)
  }

  fn insert_inner(
    &self, sink: Sink<Item, Err>, replay: impl FnOnce(&Sink<Item, Err>), replay_after_terminal: bool,
  ) {
    let terminal = {
      let guard = self.state.lock();
      let terminal = guard.with(|s| s.terminal.clone());
      if terminal.is_none() {
        replay(&sink);
        guard.with(|s| s.sinks.push(sink.clone()));
      } else if replay_after_terminal {
        replay(&sink);
      }
      terminal
    };
    match terminal {
      Some(Terminal::Completed) => sink.complete(),
      Some(Terminal::Error(e)) => sink.error(e),
      None => {}
    }
  }

  pub(crate) fn is_terminated(&self) -> bool { self.state.with(|s| s.terminal.is_some()) }

  pub(crate) fn subscriber_count(&self) -> usize {
    self.state.with(|s| {
      s.sinks.retain(|sink| !sink.is_disposed());
      s.sinks.len()
    })
  }
}

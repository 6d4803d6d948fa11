//! One-stop import for the common surface.
//!
//! ```
//! use rxcore::prelude::*;
//! ```

pub use crate::{
  diagnostics::Diagnostics,
  error::SequenceError,
  event::Event,
  observable::{
    create, defer, empty, from_iter, interval, never, of, throw, timer, ConnectableObservable,
    Observable, Producer,
  },
  observer::{BoxObserver, CallbackObserver, Observer},
  ops::ThrottleEdge,
  scheduler::{self, EventLoopScheduler, ImmediateScheduler, Scheduler, TokioScheduler},
  sink::Sink,
  subject::{BehaviorSubject, PublishSubject, ReplaySubject},
  subscription::{
    CompositeSubscription, RefCountSubscription, SerialSubscription, SingleAssignmentSubscription,
    Subscription, SubscriptionLike,
  },
};

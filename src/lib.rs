//! Push-based composable event streams.
//!
//! An [`Observable`](observable::Observable) describes how to produce a
//! stream of values ending in at most one terminal event; subscribing runs
//! that description against an [`Observer`](observer::Observer) and returns a
//! [`Subscription`](subscription::Subscription) that cancels it. Operators
//! wrap observables into new ones, subjects multicast, and
//! [`Scheduler`](scheduler::Scheduler)s move work across threads and time.
//!
//! ```
//! use rxcore::prelude::*;
//!
//! let squares_of_evens = from_iter::<_, ()>(1..=10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * v);
//! squares_of_evens.subscribe(|v| println!("{v}"));
//! ```

pub mod diagnostics;
pub mod error;
pub mod event;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod sink;
pub mod subject;
pub mod subscription;
pub mod sync;

//! The operator library.
//!
//! Every operator is a producer wrapping its upstream observable plus an
//! observer stage that rewrites events on the way down. Operators chain
//! through [`Observable::attach`], which registers the upstream stage with
//! the downstream sink before the upstream runs, so a synchronous terminal
//! (e.g. `take` completing mid-emission) still cancels the source.
//!
//! [`Observable::attach`]: crate::observable::Observable

mod buffer;
mod catch_error;
mod combine_latest;
mod debounce;
mod delay;
mod element;
mod filter;
mod finalize;
mod flat_map;
mod map;
mod merge;
mod observe_on;
mod retry;
mod retry_when;
mod scan;
mod skip;
mod subscribe_on;
mod switch_map;
mod take;
mod throttle_time;
mod timeout;
mod try_map;
mod window_count;
mod zip;

pub use throttle_time::ThrottleEdge;

//! Injectable diagnostic context.
//!
//! Instead of ambient thread-local counters, every sink carries an
//! `Arc<Diagnostics>` (a crate-global one by default). Tests that need
//! isolated counters inject their own instance through
//! [`Observable::subscribe_observer_with`].
//!
//! [`Observable::subscribe_observer_with`]:
//!   crate::observable::Observable::subscribe_observer_with

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use once_cell::sync::Lazy;

static GLOBAL: Lazy<Arc<Diagnostics>> = Lazy::new(|| Arc::new(Diagnostics::default()));

/// Counters tracking resource lifetimes and contract anomalies.
#[derive(Debug, Default)]
pub struct Diagnostics {
  sinks_created: AtomicUsize,
  sinks_disposed: AtomicUsize,
  reentrancy_anomalies: AtomicUsize,
}

impl Diagnostics {
  /// The process-wide default context.
  pub fn global() -> Arc<Diagnostics> { GLOBAL.clone() }

  pub(crate) fn record_sink_created(&self) {
    self.sinks_created.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn record_sink_disposed(&self) {
    self.sinks_disposed.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn record_reentrancy_anomaly(&self) {
    self.reentrancy_anomalies.fetch_add(1, Ordering::Relaxed);
    log::warn!("reentrant delivery into an in-flight observer was dropped");
  }

  /// Sinks created through this context so far.
  pub fn sinks_created(&self) -> usize { self.sinks_created.load(Ordering::Relaxed) }

  /// Sinks created but not yet disposed. A non-zero value after every
  /// subscription has terminated indicates a leak.
  pub fn live_sinks(&self) -> usize {
    self
      .sinks_created
      .load(Ordering::Relaxed)
      .saturating_sub(self.sinks_disposed.load(Ordering::Relaxed))
  }

  /// Events dropped because they re-entered an observer that was already on
  /// the call stack of the same thread.
  pub fn reentrancy_anomalies(&self) -> usize {
    self.reentrancy_anomalies.load(Ordering::Relaxed)
  }
}

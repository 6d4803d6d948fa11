//! Synchronization primitives shared by stateful operators.
//!
//! Stateful operators must serialize both their state mutation and the
//! forward to the downstream observer, and the critical section must be
//! re-enterable by the same thread: a synchronous resubscription (retry
//! erroring straight back on the subscribing thread) re-enters the same
//! logical section. `ReentrantLock` packages the discipline: a
//! `parking_lot::ReentrantMutex` provides same-thread re-entry, a `RefCell`
//! provides `&mut` access to the state, and the guard keeps the mutex held
//! while emissions happen *between* `with` calls, never inside one.

use std::cell::RefCell;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

pub struct ReentrantLock<T> {
  inner: ReentrantMutex<RefCell<T>>,
}

impl<T> ReentrantLock<T> {
  pub fn new(value: T) -> Self { Self { inner: ReentrantMutex::new(RefCell::new(value)) } }

  /// Acquire the lock. Re-acquiring on the same thread succeeds.
  pub fn lock(&self) -> ReentrantGuard<'_, T> { ReentrantGuard { guard: self.inner.lock() } }

  /// One-shot state access; equivalent to `self.lock().with(f)`.
  pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R { self.lock().with(f) }
}

impl<T: Default> Default for ReentrantLock<T> {
  fn default() -> Self { Self::new(T::default()) }
}

pub struct ReentrantGuard<'a, T> {
  guard: ReentrantMutexGuard<'a, RefCell<T>>,
}

impl<T> ReentrantGuard<'_, T> {
  /// Mutate the guarded state. The borrow lasts only for the closure, so
  /// callers can forward events downstream afterwards while still holding
  /// the lock, and a reentrant call on the same thread finds the state
  /// unborrowed.
  ///
  /// Do not call user code or forward events from inside `f`.
  pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R { f(&mut self.guard.borrow_mut()) }

  /// Like [`with`](Self::with), but returns `None` instead of panicking when
  /// the state is already borrowed by an in-flight call further down the
  /// same thread's stack. The sink uses this to detect reentrant delivery.
  pub fn try_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
    match self.guard.try_borrow_mut() {
      Ok(mut borrow) => Some(f(&mut borrow)),
      Err(_) => None,
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn same_thread_reentry() {
    let lock = ReentrantLock::new(0);
    let guard = lock.lock();
    guard.with(|v| *v += 1);
    // A second acquisition on the same thread must not deadlock.
    lock.with(|v| *v += 1);
    drop(guard);
    assert_eq!(lock.with(|v| *v), 2);
  }

  #[test]
  fn guards_across_threads() {
    let lock = std::sync::Arc::new(ReentrantLock::new(Vec::new()));
    let mut handles = Vec::new();
    for i in 0..8 {
      let lock = lock.clone();
      handles.push(std::thread::spawn(move || {
        for j in 0..100 {
          lock.with(|v: &mut Vec<usize>| v.push(i * 100 + j));
        }
      }));
    }
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(lock.with(|v| v.len()), 800);
  }
}

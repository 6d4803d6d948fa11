//! Sentinel errors raised by operators that enforce cardinality or timing
//! guarantees.
//!
//! These flow through the ordinary `Error` terminal channel; operators that
//! can raise them require `Err: From<SequenceError>` so any user error type
//! can absorb them.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequenceError {
  /// An operator that requires at least one element observed an empty
  /// sequence.
  #[error("sequence contains no elements")]
  NoElements,
  /// An operator that requires exactly one element observed a second one.
  #[error("sequence contains more than one element")]
  MoreThanOne,
  /// The sequence completed before reaching the requested index.
  #[error("index out of range")]
  IndexOutOfRange,
  /// No element arrived within the operator's due time.
  #[error("sequence timed out")]
  Timeout,
}

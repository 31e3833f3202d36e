//! Error types for the arena/heap lifecycle manager.
//!
//! Two classes matter here. [`StackError`] covers internal-consistency
//! failures: the tracker and the engine's arena have diverged, or a
//! caller broke a contract. These are surfaced as hard errors and never
//! retried. [`HeapExhausted`] is the allocation failure of the engine's
//! clone primitive; bulk promotion absorbs it, everything else reports it.

use std::error::Error;
use std::fmt;

use crate::value::{Addr, RawValue};

/// Internal-consistency failures of the tracker/arena pair.
///
/// Every variant indicates a bug in the surrounding binding or prior
/// corruption, not a condition the lifecycle manager can repair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackError {
    /// A wrapper was pushed whose address is above its predecessor's —
    /// stack order no longer mirrors allocation order.
    OrderViolation {
        /// Arena pointer recorded for the new wrapper.
        newer: Addr,
        /// Arena pointer recorded for the wrapper it links to.
        older: Addr,
    },
    /// On removal, the live arena pointer sits inside a tracked value:
    /// the engine reclaimed memory the tracker still considers live.
    PointerCorrupted {
        /// The removed wrapper's recorded arena pointer.
        expected: Addr,
        /// The live arena pointer found.
        found: Addr,
    },
    /// A value that is neither on the arena, a known heap value, nor a
    /// universal constant was handed to the wrapper factory.
    ForeignValue {
        /// The unclassifiable value.
        value: RawValue,
    },
    /// Detach was called on a wrapper with more than one outstanding
    /// reference; detaching it would leave dangling references.
    DetachShared {
        /// The reference count found at the time of the call.
        refs: u32,
    },
    /// A wrapper id that does not name a live wrapper (stale handle or
    /// double release).
    UnknownWrapper {
        /// The offending id.
        id: u32,
    },
    /// An on-arena wrapper that should be in the tracker chain was not
    /// found there.
    NotTracked {
        /// The offending id.
        id: u32,
    },
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderViolation { newer, older } => {
                write!(
                    f,
                    "stack order violated: new wrapper at {newer} above predecessor at {older}"
                )
            }
            Self::PointerCorrupted { expected, found } => {
                write!(
                    f,
                    "arena pointer {found} inside tracked value at {expected}: \
                     engine reclaimed live memory"
                )
            }
            Self::ForeignValue { value } => {
                write!(f, "{value} is neither on-arena, heap, nor constant")
            }
            Self::DetachShared { refs } => {
                write!(f, "detach requires a unique reference, found {refs}")
            }
            Self::UnknownWrapper { id } => write!(f, "unknown wrapper id {id}"),
            Self::NotTracked { id } => write!(f, "wrapper {id} missing from the tracker chain"),
        }
    }
}

impl Error for StackError {}

/// The engine failed to allocate heap storage for a clone.
///
/// Non-fatal: bulk promotion aborts its pass and a later call retries;
/// state stays consistent either way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapExhausted;

impl fmt::Display for HeapExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine heap exhausted during clone")
    }
}

impl Error for HeapExhausted {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_addresses() {
        let e = StackError::OrderViolation {
            newer: Addr(0x200),
            older: Addr(0x100),
        };
        let msg = e.to_string();
        assert!(msg.contains("0x200"));
        assert!(msg.contains("0x100"));
    }

    #[test]
    fn detach_shared_reports_count() {
        let e = StackError::DetachShared { refs: 3 };
        assert!(e.to_string().contains('3'));
    }
}

//! Tether: arena/heap value lifecycle management for engine bindings.
//!
//! This is the top-level facade crate that re-exports the public API
//! from the Tether sub-crates. For most users, adding `tether` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tether::prelude::*;
//! use tether_test_utils::MockEngine;
//!
//! // Track two results of an engine computation.
//! let mut stack = ValueStack::new(MockEngine::new(4096), StackConfig::default());
//! let v = stack.engine_mut().eval(&[1, 2, 3]);
//! let a = stack.produce_wrapper(v).unwrap().unwrap();
//! let v = stack.engine_mut().eval(&[4, 5]);
//! let b = stack.produce_wrapper(v).unwrap().unwrap();
//!
//! // The host may release in any order; the arena is reclaimed in
//! // reverse allocation order regardless.
//! stack.release(a).unwrap();
//! stack.release(b).unwrap();
//! assert_eq!(stack.arena_pointer(), stack.arena_top());
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tether-core` | Addresses, values, errors, the [`types::Engine`] trait |
//! | [`stack`] | `tether-stack` | The [`stack::ValueStack`] lifecycle manager |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Addresses, raw values, heap cells, errors, and the engine seam
/// (`tether-core`).
pub use tether_core as types;

/// The lifecycle manager: wrapper objects, the stack tracker, the
/// wrapper factory, and the promotion engine (`tether-stack`).
pub use tether_stack as stack;

/// Common imports for typical Tether usage.
///
/// ```rust
/// use tether::prelude::*;
/// ```
pub mod prelude {
    // The engine seam and value types
    pub use tether_core::{Addr, Engine, HeapValue, RawValue, ValueClass};

    // Errors
    pub use tether_core::{HeapExhausted, StackError};

    // The lifecycle manager
    pub use tether_stack::{StackConfig, ValueStack, WrapperId, WrapperKind};
}

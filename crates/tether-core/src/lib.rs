//! Core types and the engine trait for the Tether arena bridge.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the address and value newtypes, the reference-counted heap cell, the
//! [`Engine`] trait modelling the foreign computation engine, and the
//! error taxonomy shared by the rest of the workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod value;

pub use engine::{Engine, ValueClass};
pub use error::{HeapExhausted, StackError};
pub use value::{Addr, HeapCell, HeapValue, RawValue, Word, WORD_BYTES};

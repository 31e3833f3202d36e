//! Arena/heap value lifecycle management for Tether bindings.
//!
//! A numerical engine evaluates expressions on a stack-disciplined
//! arena: results are only valid until the arena pointer is reset, and
//! the arena can only be reclaimed in reverse allocation order. The
//! host object system, on the other hand, is reference-counted and
//! releases objects in arbitrary order. This crate bridges the two.
//!
//! # Architecture
//!
//! ```text
//! ValueStack (lifecycle manager)
//! ├── wrapper   WrapperId / Slot — host-visible handles, by residence
//! ├── tracker   intrusive LIFO chain of on-arena wrappers + slab
//! ├── cursor    arena pointer view: occupancy, reset
//! ├── factory   produce_wrapper: classify a result, build its wrapper
//! └── promote   promote_to_heap / detach: moving values off the arena
//! ```
//!
//! # Lifecycle
//!
//! Arena results are registered with the tracker, newest at the head,
//! each wrapper holding an owning reference on its next-older neighbor.
//! Host releases in any order therefore degrade into top-down cascade
//! teardown, which is the only order the arena supports. When arena
//! occupancy grows past half of capacity the factory bulk-promotes
//! tracked values into independently reference-counted heap clones,
//! freeing the whole arena at once.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod cursor;
pub mod factory;
pub mod promote;
pub mod tracker;
pub mod wrapper;

pub use config::StackConfig;
pub use tracker::ValueStack;
pub use wrapper::{Link, WrapperId, WrapperKind};

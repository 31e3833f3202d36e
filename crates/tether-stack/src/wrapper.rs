//! Wrapper objects: host-visible handles over engine values.
//!
//! A [`WrapperId`] names one wrapper node inside the [`ValueStack`]'s
//! slab. The node's value is a tagged variant — on-arena, on-heap, or
//! universal constant — so that invalid states (a stack link on a heap
//! value, a reference count on a constant) are unrepresentable.
//!
//! [`ValueStack`]: crate::tracker::ValueStack

use std::fmt;

use tether_core::{Addr, HeapValue, RawValue};

/// Handle to a live wrapper object.
///
/// Ids index the tracker's slab and are host-facing: the surrounding
/// binding stores them inside its own objects and calls
/// [`retain`](crate::tracker::ValueStack::retain) /
/// [`release`](crate::tracker::ValueStack::release) as the host object
/// system adds and drops references.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct WrapperId(pub(crate) u32);

impl WrapperId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WrapperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wrapper#{}", self.0)
    }
}

/// Link to the next-older tracked wrapper, or the bottom sentinel.
///
/// [`Link::Bottom`] is the "empty tracked list" marker: distinct from
/// any wrapper, it is what the tracker head points at when no on-arena
/// wrapper is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Link {
    /// Bottom-of-stack sentinel.
    Bottom,
    /// The next-older on-arena wrapper. This link owns a reference
    /// count on its target.
    Node(WrapperId),
}

/// Which variant a wrapper's value currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapperKind {
    /// Aliasing live arena memory, registered with the tracker.
    OnArena,
    /// An independently reference-counted heap clone.
    OnHeap,
    /// A statically-allocated universal constant.
    Constant,
}

/// A wrapper's value, by residence.
#[derive(Clone, Debug)]
pub(crate) enum Slot {
    /// On the arena: the raw value, the arena pointer recorded at
    /// creation (`sp`, the low end of the value), and the stack link.
    OnArena {
        value: RawValue,
        sp: Addr,
        link: Link,
    },
    /// Cloned onto the independently-counted heap.
    OnHeap(HeapValue),
    /// A universal constant; no owned memory.
    Constant(RawValue),
}

impl Slot {
    pub(crate) fn kind(&self) -> WrapperKind {
        match self {
            Self::OnArena { .. } => WrapperKind::OnArena,
            Self::OnHeap(_) => WrapperKind::OnHeap,
            Self::Constant(_) => WrapperKind::Constant,
        }
    }
}

/// One slab entry: the host reference count plus the value slot.
///
/// `refs` counts host references *and* the owning link held by the
/// next-newer tracked wrapper, so teardown happens exactly when neither
/// the host nor the stack needs the node.
#[derive(Clone, Debug)]
pub(crate) struct WrapperNode {
    pub(crate) refs: u32,
    pub(crate) slot: Slot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_id_display() {
        assert_eq!(WrapperId(7).to_string(), "wrapper#7");
    }

    #[test]
    fn slot_kind_matches_variant() {
        let s = Slot::Constant(RawValue(Addr(0x42)));
        assert_eq!(s.kind(), WrapperKind::Constant);
        let s = Slot::OnArena {
            value: RawValue(Addr(0x100)),
            sp: Addr(0x100),
            link: Link::Bottom,
        };
        assert_eq!(s.kind(), WrapperKind::OnArena);
    }
}

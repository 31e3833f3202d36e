//! The [`Engine`] trait: everything the lifecycle manager consumes from
//! the foreign computation engine.
//!
//! The trait is the seam that keeps the tracker testable: production
//! code binds it to the real engine's FFI surface, tests bind it to
//! `MockEngine` from `tether-test-utils`.

use crate::error::HeapExhausted;
use crate::value::{Addr, HeapValue, RawValue};

/// Classification of a raw engine value by residence.
///
/// Folds the engine's individual predicates (empty-result sentinel,
/// arena bounds check, known-heap lookup, constant lookup) into one
/// total classification. For a known heap value the returned handle is
/// already retained — cloning the shared handle is the increment.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueClass {
    /// The designated empty-result sentinel: the operation legitimately
    /// produced nothing.
    Nil,
    /// The value lives on the arena, between the arena pointer and the
    /// arena top.
    OnArena,
    /// The value is an independently reference-counted heap clone.
    OnHeap(HeapValue),
    /// The value is a statically-allocated universal constant, never
    /// freed and never promoted.
    Constant,
    /// None of the above — a contract violation by the caller.
    Foreign,
}

/// The foreign computation engine, as seen by the lifecycle manager.
///
/// The arena is a single contiguous region growing **downward** from
/// `arena_top`: the arena pointer decreases as values are pushed and
/// moves back toward the top as they are reclaimed. Bounds are fixed
/// for the computation's lifetime; the pointer is the only mutable
/// piece of arena state.
pub trait Engine {
    /// Fixed high bound of the arena.
    fn arena_top(&self) -> Addr;

    /// Fixed total capacity of the arena in bytes.
    fn arena_size(&self) -> usize;

    /// Current arena pointer (low-water mark of live usage).
    fn arena_pointer(&self) -> Addr;

    /// Move the arena pointer.
    ///
    /// Callers must keep it within `[arena_top - arena_size, arena_top]`.
    fn set_arena_pointer(&mut self, p: Addr);

    /// Classify a raw value by residence.
    fn classify(&self, value: RawValue) -> ValueClass;

    /// Copy an arena value into a fresh independently-counted heap cell.
    ///
    /// The copy must not be interrupted mid-way; callers bracket it with
    /// [`mask_interrupts`](Engine::mask_interrupts) /
    /// [`unmask_interrupts`](Engine::unmask_interrupts).
    fn clone_to_heap(&mut self, value: RawValue) -> Result<HeapValue, HeapExhausted>;

    /// Copy a heap value onto the arena, advancing the arena pointer.
    ///
    /// Returns the fresh on-arena value.
    fn copy_to_arena(&mut self, value: &HeapValue) -> RawValue;

    /// Whether a nested engine call is currently suspended or in flight.
    ///
    /// Opportunistic bulk promotion is skipped — not deferred — while
    /// this holds.
    fn nested_call_in_flight(&self) -> bool;

    /// Enter a critical section deferring asynchronous cancellation.
    ///
    /// Calls nest; each must be balanced by
    /// [`unmask_interrupts`](Engine::unmask_interrupts).
    fn mask_interrupts(&mut self);

    /// Leave the critical section entered by
    /// [`mask_interrupts`](Engine::mask_interrupts).
    fn unmask_interrupts(&mut self);
}

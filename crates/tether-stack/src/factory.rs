//! The wrapper factory: entry points the rest of the binding uses to
//! obtain a wrapper for a computed engine value.
//!
//! A raw result is classified by residence and turned into the matching
//! wrapper variant. Only arena values touch the tracker; every other
//! class first resets the arena pointer, since the computation left
//! nothing live behind. After an arena push the factory opportunistically
//! bulk-promotes once occupancy crosses half the arena's capacity.

use tether_core::{Engine, RawValue, StackError, ValueClass};

use crate::tracker::ValueStack;
use crate::wrapper::{Slot, WrapperId, WrapperNode};

impl<E: Engine> ValueStack<E> {
    /// Wrap a computation result, or return `None` for the engine's
    /// designated empty-result sentinel.
    ///
    /// The nil case is not an error — some operations legitimately
    /// produce nothing — but it still resets the arena pointer, because
    /// the call may have consumed arena scratch space.
    pub fn produce_wrapper(&mut self, value: RawValue) -> Result<Option<WrapperId>, StackError> {
        match self.engine.classify(value) {
            ValueClass::Nil => {
                self.reset_arena_pointer();
                Ok(None)
            }
            class => self.wrap_classified(value, class).map(Some),
        }
    }

    /// Wrap a computation result known not to be the empty-result
    /// sentinel.
    ///
    /// A nil value reaching this entry point is a contract violation
    /// and reported as [`StackError::ForeignValue`].
    pub fn produce_wrapper_non_nil(&mut self, value: RawValue) -> Result<WrapperId, StackError> {
        let class = self.engine.classify(value);
        self.wrap_classified(value, class)
    }

    fn wrap_classified(
        &mut self,
        value: RawValue,
        class: ValueClass,
    ) -> Result<WrapperId, StackError> {
        match class {
            ValueClass::OnArena => {
                let id = self.push_on_arena(value)?;
                self.maybe_promote()?;
                Ok(id)
            }
            ValueClass::OnHeap(cell) => {
                self.reset_arena_pointer();
                Ok(self.alloc_node(WrapperNode {
                    refs: 1,
                    slot: Slot::OnHeap(cell),
                }))
            }
            ValueClass::Constant => {
                self.reset_arena_pointer();
                Ok(self.alloc_node(WrapperNode {
                    refs: 1,
                    slot: Slot::Constant(value),
                }))
            }
            ValueClass::Nil | ValueClass::Foreign => {
                self.reset_arena_pointer();
                Err(StackError::ForeignValue { value })
            }
        }
    }

    /// Bulk-promote everything once arena occupancy reaches half of
    /// capacity, unless a nested engine call is in flight — in which
    /// case promotion is skipped outright; the next push re-evaluates.
    ///
    /// Heap exhaustion inside the promotion pass is absorbed there;
    /// only internal-consistency failures surface here.
    fn maybe_promote(&mut self) -> Result<(), StackError> {
        if !self.config.auto_promote {
            return Ok(());
        }
        if self.arena_used() * 2 < self.engine.arena_size() {
            return Ok(());
        }
        if self.engine.nested_call_in_flight() {
            return Ok(());
        }
        self.promote_to_heap(None)?;
        Ok(())
    }
}

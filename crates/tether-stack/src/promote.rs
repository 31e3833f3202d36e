//! The promotion engine: moving values off the arena, and detaching
//! values out of wrappers.
//!
//! Promotion clones a tracked wrapper's arena value into an
//! independently-counted heap cell and rebinds the wrapper in place —
//! same host-visible identity, new residence. Bulk promotion walks the
//! tracker head-down, so every removal is a clean LIFO removal that
//! steps the arena pointer back toward the top.

use tracing::debug;

use tether_core::{Addr, Engine, RawValue, StackError};

use crate::tracker::ValueStack;
use crate::wrapper::{Link, Slot, WrapperId};

impl<E: Engine> ValueStack<E> {
    /// Promote tracked wrappers to the heap while the arena pointer is
    /// at or below `limit` (`None`: promote everything).
    ///
    /// Each clone is bracketed in an interrupt-masked critical section;
    /// a half-completed copy would corrupt the clone's reference-count
    /// bookkeeping. Heap exhaustion aborts the pass, leaving
    /// already-promoted wrappers promoted and the rest on the arena —
    /// promotion is compaction, not a correctness requirement, and a
    /// later call retries. Returns the number of wrappers promoted.
    pub fn promote_to_heap(&mut self, limit: Option<Addr>) -> Result<usize, StackError> {
        let mut promoted = 0;
        loop {
            if let Some(l) = limit {
                if self.engine.arena_pointer() > l {
                    break;
                }
            }
            let Link::Node(id) = self.head else { break };
            let (value, sp, link) = match self.node(id)?.slot {
                Slot::OnArena { value, sp, link } => (value, sp, link),
                _ => return Err(StackError::NotTracked { id: id.0 }),
            };

            self.engine.mask_interrupts();
            let cloned = self.engine.clone_to_heap(value);
            self.engine.unmask_interrupts();
            let cell = match cloned {
                Ok(cell) => cell,
                Err(_) => {
                    debug!(promoted, "heap exhausted; aborting promotion pass");
                    break;
                }
            };

            // Clean head removal: validates the pointer and resets it.
            self.unlink(id, sp, link)?;
            self.node_mut(id)?.slot = Slot::OnHeap(cell);
            // The wrapper no longer links to its successor; drop the
            // owning reference it held. This can tear the successor
            // down if the host already released it.
            if let Link::Node(next) = link {
                self.release(next)?;
            }
            promoted += 1;
        }
        Ok(promoted)
    }

    /// Extract a wrapper's underlying value for transfer to a new
    /// owner, destroying the wrapper.
    ///
    /// The caller must hold the only outstanding reference; a shared
    /// wrapper fails with [`StackError::DetachShared`] (the count
    /// includes the owning link from a newer tracked wrapper, so a
    /// mid-stack wrapper can never be detached). An on-arena or
    /// constant value is returned as-is; a heap value is first copied
    /// onto the arena. Whenever the returned value lives on the arena,
    /// the arena pointer is saved across the wrapper's teardown and
    /// restored afterward, so the value is not considered reclaimed —
    /// the caller owns it until it is folded into a larger structure or
    /// the pointer is next reset.
    pub fn detach(&mut self, id: WrapperId) -> Result<RawValue, StackError> {
        let node = self.node(id)?;
        if node.refs != 1 {
            return Err(StackError::DetachShared { refs: node.refs });
        }
        match node.slot.clone() {
            Slot::OnArena { value, .. } => {
                let saved = self.engine.arena_pointer();
                self.release(id)?;
                self.engine.set_arena_pointer(saved);
                Ok(value)
            }
            Slot::Constant(value) => {
                self.release(id)?;
                Ok(value)
            }
            Slot::OnHeap(cell) => {
                let value = self.engine.copy_to_arena(&cell);
                let saved = self.engine.arena_pointer();
                self.release(id)?;
                self.engine.set_arena_pointer(saved);
                Ok(value)
            }
        }
    }
}

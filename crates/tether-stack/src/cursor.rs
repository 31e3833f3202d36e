//! Arena pointer state: the cursor over the engine's arena.
//!
//! The pointer itself lives in the engine; this module is the tracker's
//! view of it — pass-through accessors, occupancy, and the reset that
//! recomputes the pointer from tracker state.

use tether_core::{Addr, Engine};

use crate::tracker::ValueStack;
use crate::wrapper::Link;

impl<E: Engine> ValueStack<E> {
    /// Current arena pointer.
    pub fn arena_pointer(&self) -> Addr {
        self.engine.arena_pointer()
    }

    /// Fixed high bound of the arena.
    pub fn arena_top(&self) -> Addr {
        self.engine.arena_top()
    }

    /// Fixed arena capacity in bytes.
    pub fn arena_size(&self) -> usize {
        self.engine.arena_size()
    }

    /// Bytes of arena currently in use.
    pub fn arena_used(&self) -> usize {
        self.engine.arena_top().0 - self.engine.arena_pointer().0
    }

    /// Recompute the arena pointer from tracker state.
    ///
    /// The pointer comes to rest at the newest tracked wrapper's
    /// recorded position, or at the arena top when nothing is tracked —
    /// no live wrappers means the arena is fully reclaimed.
    ///
    /// Safe to call at any time, including mid-unwind: it only reads
    /// tracker state and writes the pointer, and can neither allocate
    /// nor fail.
    pub fn reset_arena_pointer(&mut self) {
        let p = match self.head {
            Link::Node(id) => self
                .arena_sp(id)
                .expect("tracker head is always a live on-arena wrapper"),
            Link::Bottom => self.engine.arena_top(),
        };
        self.engine.set_arena_pointer(p);
    }
}

//! The stack tracker: the linked record of wrapper objects aliasing
//! live arena memory.
//!
//! [`ValueStack`] owns the engine handle and a slab of wrapper nodes.
//! On-arena nodes form an intrusive singly-linked list from the tracker
//! head (newest) down to the [`Link::Bottom`] sentinel (oldest), in
//! strict allocation order. Because the arena can only be reclaimed in
//! reverse allocation order, each link carries an owning reference
//! count on its target: a host release of a mid-stack wrapper merely
//! drops its count, and actual teardown cascades top-down as the newer
//! wrappers above it die.
//!
//! Teardown of a node that is *not* the tracker head is still handled —
//! defensively, with a diagnostic — because it indicates a reference
//! counting bug in the surrounding binding, not something this module
//! can prevent.

use smallvec::SmallVec;
use tracing::warn;

use tether_core::{Addr, Engine, HeapValue, RawValue, StackError};

use crate::config::StackConfig;
use crate::wrapper::{Link, Slot, WrapperId, WrapperKind, WrapperNode};

/// Outcome of removing a node from the tracker chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Unlinked {
    /// The node was the head; its link is the new head and the node's
    /// owning reference on it must now be released.
    Head,
    /// The node was unlinked mid-chain; its owning reference was
    /// transferred to its predecessor.
    MidChain,
}

/// The arena/heap lifecycle manager.
///
/// Owns the engine handle, the wrapper slab, and the tracker head. All
/// operations of the lifecycle manager — the wrapper factory, the
/// promotion engine, detach — live on this type; see the
/// [`factory`](crate::factory) and [`promote`](crate::promote) modules.
pub struct ValueStack<E: Engine> {
    pub(crate) engine: E,
    pub(crate) config: StackConfig,
    nodes: Vec<Option<WrapperNode>>,
    free: Vec<u32>,
    pub(crate) head: Link,
}

impl<E: Engine> ValueStack<E> {
    /// Create a lifecycle manager over an engine.
    ///
    /// The engine's arena pointer is reset to the arena top: no wrapper
    /// is tracked yet, so no arena memory is considered live.
    pub fn new(engine: E, config: StackConfig) -> Self {
        let mut stack = Self {
            engine,
            config,
            nodes: Vec::new(),
            free: Vec::new(),
            head: Link::Bottom,
        };
        stack.reset_arena_pointer();
        stack
    }

    /// Shared access to the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The active configuration.
    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    // ── slab ─────────────────────────────────────────────────────────

    pub(crate) fn node(&self, id: WrapperId) -> Result<&WrapperNode, StackError> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(StackError::UnknownWrapper { id: id.0 })
    }

    pub(crate) fn node_mut(&mut self, id: WrapperId) -> Result<&mut WrapperNode, StackError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(StackError::UnknownWrapper { id: id.0 })
    }

    pub(crate) fn alloc_node(&mut self, node: WrapperNode) -> WrapperId {
        match self.free.pop() {
            Some(i) => {
                self.nodes[i as usize] = Some(node);
                WrapperId(i)
            }
            None => {
                self.nodes.push(Some(node));
                WrapperId((self.nodes.len() - 1) as u32)
            }
        }
    }

    fn free_node(&mut self, id: WrapperId) {
        self.nodes[id.index()] = None;
        self.free.push(id.0);
    }

    // ── inspection ───────────────────────────────────────────────────

    /// Which variant a wrapper's value currently is, or `None` for a
    /// stale id.
    pub fn kind(&self, id: WrapperId) -> Option<WrapperKind> {
        self.node(id).ok().map(|n| n.slot.kind())
    }

    /// A wrapper's current reference count, or `None` for a stale id.
    pub fn refs(&self, id: WrapperId) -> Option<u32> {
        self.node(id).ok().map(|n| n.refs)
    }

    /// The raw value of an on-arena or constant wrapper.
    pub fn raw_value(&self, id: WrapperId) -> Option<RawValue> {
        match &self.node(id).ok()?.slot {
            Slot::OnArena { value, .. } | Slot::Constant(value) => Some(*value),
            Slot::OnHeap(_) => None,
        }
    }

    /// The heap cell of an on-heap wrapper.
    pub fn heap_value(&self, id: WrapperId) -> Option<HeapValue> {
        match &self.node(id).ok()?.slot {
            Slot::OnHeap(cell) => Some(cell.clone()),
            _ => None,
        }
    }

    /// All tracked wrappers, newest first.
    pub fn tracked(&self) -> SmallVec<[WrapperId; 8]> {
        let mut out = SmallVec::new();
        let mut cur = self.head;
        while let Link::Node(id) = cur {
            out.push(id);
            cur = self.arena_link(id).unwrap_or(Link::Bottom);
        }
        out
    }

    /// Number of wrappers currently aliasing live arena memory.
    pub fn tracked_len(&self) -> usize {
        self.tracked().len()
    }

    pub(crate) fn arena_sp(&self, id: WrapperId) -> Option<Addr> {
        match self.node(id).ok()?.slot {
            Slot::OnArena { sp, .. } => Some(sp),
            _ => None,
        }
    }

    fn arena_link(&self, id: WrapperId) -> Option<Link> {
        match self.node(id).ok()?.slot {
            Slot::OnArena { link, .. } => Some(link),
            _ => None,
        }
    }

    fn set_arena_link(&mut self, id: WrapperId, new_link: Link) -> Result<(), StackError> {
        match &mut self.node_mut(id)?.slot {
            Slot::OnArena { link, .. } => {
                *link = new_link;
                Ok(())
            }
            _ => Err(StackError::NotTracked { id: id.0 }),
        }
    }

    // ── push ─────────────────────────────────────────────────────────

    /// Register a freshly computed arena value with the tracker.
    ///
    /// The previous head is retained *before* the new node is built:
    /// wrapper construction in the host can trigger a collection sweep,
    /// and the link must already own its successor when that happens.
    /// The new wrapper records the current arena pointer and becomes
    /// the tracker head.
    ///
    /// Returns [`StackError::OrderViolation`] if the new wrapper's
    /// recorded pointer sits above its predecessor's — the arena and
    /// the tracker have diverged, which is fatal.
    pub(crate) fn push_on_arena(&mut self, value: RawValue) -> Result<WrapperId, StackError> {
        let link = self.head;
        if let Link::Node(h) = link {
            self.node_mut(h)?.refs += 1;
        }

        let sp = self.engine.arena_pointer();
        let id = self.alloc_node(WrapperNode {
            refs: 1,
            slot: Slot::OnArena { value, sp, link },
        });
        self.head = Link::Node(id);

        if let Link::Node(older) = link {
            let older_sp = self
                .arena_sp(older)
                .ok_or(StackError::NotTracked { id: older.0 })?;
            if sp > older_sp {
                return Err(StackError::OrderViolation {
                    newer: sp,
                    older: older_sp,
                });
            }
        }
        Ok(id)
    }

    // ── host reference counting ──────────────────────────────────────

    /// Add a host reference to a wrapper.
    pub fn retain(&mut self, id: WrapperId) -> Result<(), StackError> {
        self.node_mut(id)?.refs += 1;
        Ok(())
    }

    /// Drop a reference to a wrapper, tearing it down at zero.
    ///
    /// Teardown of an on-arena wrapper removes it from the tracker
    /// (validating LIFO discipline), resets the arena pointer, and
    /// releases the owning reference the wrapper held on its successor
    /// — which can cascade into further teardowns when the host had
    /// already released the older wrappers.
    pub fn release(&mut self, id: WrapperId) -> Result<(), StackError> {
        let mut cur = id;
        loop {
            let node = self.node_mut(cur)?;
            node.refs -= 1;
            if node.refs > 0 {
                return Ok(());
            }

            let slot = self.node(cur)?.slot.clone();
            match slot {
                Slot::OnArena { sp, link, .. } => {
                    let unlinked = self.unlink(cur, sp, link)?;
                    self.free_node(cur);
                    match (unlinked, link) {
                        (Unlinked::Head, Link::Node(next)) => {
                            // Release the strong reference the dead
                            // wrapper held on its successor.
                            cur = next;
                        }
                        _ => return Ok(()),
                    }
                }
                Slot::OnHeap(_) | Slot::Constant(_) => {
                    // Dropping the node drops the heap handle, which is
                    // the reference-count decrement on the clone.
                    self.free_node(cur);
                    return Ok(());
                }
            }
        }
    }

    // ── removal ──────────────────────────────────────────────────────

    /// Remove a node from the tracker chain, validating LIFO discipline
    /// and the arena pointer, then reset the pointer.
    ///
    /// The head path is the contract; the mid-chain path is best-effort
    /// recovery from an out-of-order teardown and is reported as a
    /// diagnostic, since the binding's reference counting — not this
    /// allocator — is at fault.
    pub(crate) fn unlink(
        &mut self,
        id: WrapperId,
        sp: Addr,
        link: Link,
    ) -> Result<Unlinked, StackError> {
        if self.head == Link::Node(id) {
            let found = self.engine.arena_pointer();
            if found > sp {
                // The engine reclaimed into a value the tracker still
                // considers live. Nothing can be salvaged here.
                return Err(StackError::PointerCorrupted {
                    expected: sp,
                    found,
                });
            }
            if found < sp {
                warn!(
                    expected = %sp,
                    found = %found,
                    leaked_bytes = sp.0 - found.0,
                    "arena pointer below tracked head at removal; \
                     untracked bytes leak until the next reset"
                );
            }
            self.head = link;
            self.reset_arena_pointer();
            return Ok(Unlinked::Head);
        }

        warn!(wrapper = id.0, "wrapper torn down out of stack order; unlinking mid-chain");
        let mut cur = self.head;
        while let Link::Node(pred) = cur {
            let pred_link = self
                .arena_link(pred)
                .ok_or(StackError::NotTracked { id: pred.0 })?;
            if pred_link == Link::Node(id) {
                // The predecessor takes over the dead node's owning
                // reference on its successor; counts are unchanged.
                self.set_arena_link(pred, link)?;
                self.reset_arena_pointer();
                return Ok(Unlinked::MidChain);
            }
            cur = pred_link;
        }
        Err(StackError::NotTracked { id: id.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::WORD_BYTES;
    use tether_test_utils::MockEngine;

    fn stack(size: usize) -> ValueStack<MockEngine> {
        ValueStack::new(MockEngine::new(size), StackConfig { auto_promote: false })
    }

    fn push(stack: &mut ValueStack<MockEngine>, words: usize) -> WrapperId {
        let value = stack.engine_mut().eval(&vec![1; words]);
        stack
            .produce_wrapper(value)
            .expect("push")
            .expect("non-nil")
    }

    #[test]
    fn empty_tracker_points_at_top() {
        let s = stack(1024);
        assert_eq!(s.head, Link::Bottom);
        assert_eq!(s.arena_pointer(), s.arena_top());
        assert_eq!(s.tracked_len(), 0);
    }

    #[test]
    fn push_registers_newest_first() {
        let mut s = stack(1024);
        let a = push(&mut s, 4);
        let b = push(&mut s, 4);
        assert_eq!(s.tracked().as_slice(), &[b, a]);
        assert_eq!(s.kind(a), Some(WrapperKind::OnArena));
    }

    #[test]
    fn addresses_decrease_toward_head() {
        let mut s = stack(1024);
        push(&mut s, 4);
        push(&mut s, 8);
        push(&mut s, 2);
        let ids = s.tracked();
        for pair in ids.windows(2) {
            let newer = s.arena_sp(pair[0]).unwrap();
            let older = s.arena_sp(pair[1]).unwrap();
            assert!(newer <= older);
        }
    }

    #[test]
    fn lifo_release_returns_pointer_to_top() {
        let mut s = stack(1024);
        let a = push(&mut s, 4);
        let b = push(&mut s, 4);
        s.release(b).unwrap();
        assert_eq!(s.tracked().as_slice(), &[a]);
        assert_eq!(s.arena_pointer(), s.arena_sp(a).unwrap());
        s.release(a).unwrap();
        assert_eq!(s.tracked_len(), 0);
        assert_eq!(s.arena_pointer(), s.arena_top());
    }

    #[test]
    fn out_of_order_host_release_defers_teardown() {
        let mut s = stack(1024);
        let a = push(&mut s, 4);
        let b = push(&mut s, 4);
        let c = push(&mut s, 4);
        // Host drops the middle wrapper; the link from c keeps it alive.
        s.release(b).unwrap();
        assert_eq!(s.refs(b), Some(1));
        assert_eq!(s.tracked().as_slice(), &[c, b, a]);
        // Tearing down c cascades into b; a becomes the head.
        s.release(c).unwrap();
        assert_eq!(s.tracked().as_slice(), &[a]);
        assert_eq!(s.arena_pointer(), s.arena_sp(a).unwrap());
        s.release(a).unwrap();
        assert_eq!(s.arena_pointer(), s.arena_top());
    }

    #[test]
    fn forced_mid_chain_teardown_recovers() {
        let mut s = stack(1024);
        let a = push(&mut s, 4);
        let b = push(&mut s, 4);
        let c = push(&mut s, 4);
        // A double release (a binding bug) forces b down to zero while
        // it is not the head: diagnostic path, best-effort unlink.
        s.release(b).unwrap();
        s.release(b).unwrap();
        assert_eq!(s.tracked().as_slice(), &[c, a]);
        // Head unchanged, so the pointer is unchanged too.
        assert_eq!(s.arena_pointer(), s.arena_sp(c).unwrap());
        s.release(c).unwrap();
        s.release(a).unwrap();
        assert_eq!(s.arena_pointer(), s.arena_top());
        assert_eq!(s.tracked_len(), 0);
    }

    #[test]
    fn untracked_usage_is_reported_not_fatal() {
        let mut s = stack(1024);
        let a = push(&mut s, 4);
        // Simulate the engine holding untracked allocations below the head.
        let sp = s.arena_sp(a).unwrap();
        s.engine_mut().set_arena_pointer(Addr(sp.0 - 2 * WORD_BYTES));
        // Leak diagnostic, then normal removal.
        s.release(a).unwrap();
        assert_eq!(s.arena_pointer(), s.arena_top());
    }

    #[test]
    fn pointer_inside_tracked_value_is_fatal() {
        let mut s = stack(1024);
        let a = push(&mut s, 4);
        let sp = s.arena_sp(a).unwrap();
        s.engine_mut().set_arena_pointer(Addr(sp.0 + WORD_BYTES));
        let err = s.release(a).unwrap_err();
        assert!(matches!(err, StackError::PointerCorrupted { .. }));
    }

    #[test]
    fn release_of_stale_id_errors() {
        let mut s = stack(1024);
        let a = push(&mut s, 4);
        s.release(a).unwrap();
        assert_eq!(s.release(a), Err(StackError::UnknownWrapper { id: a.0 }));
    }

    #[test]
    fn retain_delays_teardown() {
        let mut s = stack(1024);
        let a = push(&mut s, 4);
        s.retain(a).unwrap();
        s.release(a).unwrap();
        assert_eq!(s.tracked().as_slice(), &[a]);
        s.release(a).unwrap();
        assert_eq!(s.tracked_len(), 0);
    }

    #[test]
    fn slab_reuses_freed_slots() {
        let mut s = stack(1024);
        let a = push(&mut s, 4);
        s.release(a).unwrap();
        let b = push(&mut s, 4);
        assert_eq!(a, b); // same slot, new wrapper
        assert_eq!(s.tracked().as_slice(), &[b]);
    }
}

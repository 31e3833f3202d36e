//! Test utilities and mock types for Tether development.
//!
//! Provides [`MockEngine`], an in-process stand-in for the numerical
//! engine: a word-addressed downward-growing arena, a registry of
//! reference-counted heap values, and knobs for the failure modes the
//! lifecycle manager has to survive (heap exhaustion, nested calls,
//! interrupt masking).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::rc::Rc;

use indexmap::IndexMap;

use tether_core::{
    Addr, Engine, HeapCell, HeapExhausted, HeapValue, RawValue, ValueClass, Word, WORD_BYTES,
};

/// High bound of the mock arena. Values at lower addresses within
/// `arena_size` bytes classify as on-arena.
pub const ARENA_TOP: usize = 0x100_0000;
/// Base address for universal constants.
pub const CONST_BASE: usize = 0x200_0000;
/// Base address for registered heap values.
pub const HEAP_BASE: usize = 0x300_0000;

/// Mock implementation of [`Engine`].
///
/// `eval` plays the role of an engine computation: it bump-allocates
/// the given words downward from the arena pointer and returns the
/// resulting value's address. Heap and constant values are registered
/// through [`heap_value`](MockEngine::heap_value) and
/// [`constant`](MockEngine::constant) and classified by address range.
pub struct MockEngine {
    size: usize,
    pointer: usize,
    arena_values: IndexMap<usize, Vec<Word>>,
    heap_values: IndexMap<usize, HeapValue>,
    constants: Vec<usize>,
    next_heap: usize,
    next_const: usize,
    nested_call: bool,
    mask_depth: usize,
    unmasked_clones: usize,
    clone_budget: Option<usize>,
}

impl MockEngine {
    /// A fresh engine with an empty arena of `size` bytes.
    pub fn new(size: usize) -> Self {
        assert!(size <= ARENA_TOP, "arena larger than its address range");
        Self {
            size,
            pointer: ARENA_TOP,
            arena_values: IndexMap::new(),
            heap_values: IndexMap::new(),
            constants: Vec::new(),
            next_heap: 0,
            next_const: 0,
            nested_call: false,
            mask_depth: 0,
            unmasked_clones: 0,
            clone_budget: None,
        }
    }

    /// Simulate an engine computation producing `words` on the arena.
    pub fn eval(&mut self, words: &[Word]) -> RawValue {
        let bytes = words.len() * WORD_BYTES;
        assert!(
            self.pointer - bytes >= ARENA_TOP - self.size,
            "mock arena overflow"
        );
        self.pointer -= bytes;
        self.arena_values.insert(self.pointer, words.to_vec());
        RawValue(Addr(self.pointer))
    }

    /// The engine's empty-result sentinel.
    pub fn nil(&self) -> RawValue {
        RawValue(Addr(0))
    }

    /// Register a fresh universal constant.
    pub fn constant(&mut self) -> RawValue {
        let addr = CONST_BASE + self.next_const * WORD_BYTES;
        self.next_const += 1;
        self.constants.push(addr);
        RawValue(Addr(addr))
    }

    /// Register a reference-counted heap value holding `words`.
    pub fn heap_value(&mut self, words: Vec<Word>) -> RawValue {
        let addr = HEAP_BASE + self.next_heap * WORD_BYTES;
        self.next_heap += 1;
        self.heap_values.insert(addr, Rc::new(HeapCell::new(words)));
        RawValue(Addr(addr))
    }

    /// Outstanding reference count of a registered heap value, or zero
    /// for anything else.
    pub fn heap_refs(&self, value: RawValue) -> usize {
        self.heap_values
            .get(&value.addr().0)
            .map(Rc::strong_count)
            .unwrap_or(0)
    }

    /// The words a value points at, wherever it lives.
    pub fn value_words(&self, value: RawValue) -> Option<&[Word]> {
        let addr = value.addr().0;
        self.arena_values
            .get(&addr)
            .map(Vec::as_slice)
            .or_else(|| self.heap_values.get(&addr).map(|c| c.words()))
    }

    /// Mark a nested engine call as in flight (or not).
    pub fn set_nested_call(&mut self, nested: bool) {
        self.nested_call = nested;
    }

    /// Let the next `n` heap clones succeed, then fail one with
    /// [`HeapExhausted`]; clones after the failure succeed again.
    pub fn fail_clones_after(&mut self, n: usize) {
        self.clone_budget = Some(n);
    }

    /// How many heap clones ran outside an interrupt-masked section.
    pub fn unmasked_clones(&self) -> usize {
        self.unmasked_clones
    }

    /// Current interrupt mask nesting depth.
    pub fn mask_depth(&self) -> usize {
        self.mask_depth
    }
}

impl Engine for MockEngine {
    fn arena_top(&self) -> Addr {
        Addr(ARENA_TOP)
    }

    fn arena_size(&self) -> usize {
        self.size
    }

    fn arena_pointer(&self) -> Addr {
        Addr(self.pointer)
    }

    fn set_arena_pointer(&mut self, pointer: Addr) {
        self.pointer = pointer.0;
    }

    fn classify(&self, value: RawValue) -> ValueClass {
        let addr = value.addr().0;
        if addr == 0 {
            ValueClass::Nil
        } else if (ARENA_TOP - self.size..ARENA_TOP).contains(&addr) {
            ValueClass::OnArena
        } else if let Some(cell) = self.heap_values.get(&addr) {
            ValueClass::OnHeap(Rc::clone(cell))
        } else if self.constants.contains(&addr) {
            ValueClass::Constant
        } else {
            ValueClass::Foreign
        }
    }

    fn clone_to_heap(&mut self, value: RawValue) -> Result<HeapValue, HeapExhausted> {
        if self.mask_depth == 0 {
            self.unmasked_clones += 1;
        }
        if let Some(budget) = self.clone_budget {
            if budget == 0 {
                self.clone_budget = None;
                return Err(HeapExhausted);
            }
            self.clone_budget = Some(budget - 1);
        }
        let words = self
            .arena_values
            .get(&value.addr().0)
            .cloned()
            .unwrap_or_default();
        Ok(Rc::new(HeapCell::new(words)))
    }

    fn copy_to_arena(&mut self, cell: &HeapValue) -> RawValue {
        self.eval(&cell.words().to_vec())
    }

    fn nested_call_in_flight(&self) -> bool {
        self.nested_call
    }

    fn mask_interrupts(&mut self) {
        self.mask_depth += 1;
    }

    fn unmask_interrupts(&mut self) {
        assert!(self.mask_depth > 0, "unbalanced interrupt unmask");
        self.mask_depth -= 1;
    }
}

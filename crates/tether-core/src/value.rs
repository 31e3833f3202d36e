//! Address and value newtypes, and the reference-counted heap cell.

use std::fmt;
use std::rc::Rc;

/// Smallest unit of engine storage. Arena sizes and value lengths are
/// expressed in bytes but engine values are always word-aligned.
pub type Word = u64;

/// Size of one [`Word`] in bytes.
pub const WORD_BYTES: usize = std::mem::size_of::<Word>();

/// A byte address in the engine's address space.
///
/// Addresses inside `[arena_top - arena_size, arena_top]` belong to the
/// arena; the engine places heap values and universal constants outside
/// that range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(pub usize);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<usize> for Addr {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// A raw engine value: the address of its first word.
///
/// The engine alone knows the value's layout. The lifecycle manager only
/// ever compares addresses and passes raw values back to engine
/// primitives; it never dereferences them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawValue(pub Addr);

impl RawValue {
    /// The address of the value's first word.
    pub fn addr(&self) -> Addr {
        self.0
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value@{}", self.0)
    }
}

/// An engine value copied off the arena into independently-counted
/// heap storage.
///
/// The clone owns its words outright; nothing on the arena backs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapCell {
    words: Vec<Word>,
}

impl HeapCell {
    /// Build a heap cell from the value's words.
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    /// The value's words.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Length of the value in bytes.
    pub fn byte_len(&self) -> usize {
        self.words.len() * WORD_BYTES
    }
}

/// Shared-ownership handle to a [`HeapCell`].
///
/// Cloning the handle is the retain, dropping it is the release, and
/// the cell is freed when the last handle goes away. The engine and its
/// arena are single-threaded, hence `Rc` rather than `Arc`.
pub type HeapValue = Rc<HeapCell>;

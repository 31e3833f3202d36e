//! Lifecycle manager configuration.

/// Configuration for a [`ValueStack`](crate::tracker::ValueStack).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackConfig {
    /// Attempt a full bulk promotion whenever an arena push leaves
    /// occupancy at or above half of the arena's capacity (and no
    /// nested engine call is in flight).
    ///
    /// Disabling this never affects correctness, only peak arena usage:
    /// promotion is a best-effort compaction, and explicit
    /// [`promote_to_heap`](crate::tracker::ValueStack::promote_to_heap)
    /// calls remain available.
    pub auto_promote: bool,
}

impl StackConfig {
    /// Configuration with opportunistic promotion enabled.
    pub fn new() -> Self {
        Self { auto_promote: true }
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::new()
    }
}

//! ID types for simulated bodies.
//!
//! IDs are allocated per simulation by an [`IdAllocator`] rather than a global
//! counter so that two simulations with the same seed hand out the same IDs.

use serde::{Deserialize, Serialize};

/// Unique identifier for a traffic agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u64);

impl AgentId {
    /// Null/invalid agent ID.
    pub const NULL: Self = Self(0);

    /// Creates an agent ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks if this is a valid (non-null) agent ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Unique identifier for a placed decoration (tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecorationId(u64);

impl DecorationId {
    /// Creates a decoration ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Monotonic ID source owned by a single simulation.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Creates a new allocator. The first ID handed out is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    fn bump(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Allocates the next agent ID.
    pub fn next_agent(&mut self) -> AgentId {
        AgentId(self.bump())
    }

    /// Allocates the next decoration ID.
    pub fn next_decoration(&mut self) -> DecorationId {
        DecorationId(self.bump())
    }

    /// Returns the number of IDs handed out so far.
    #[must_use]
    pub const fn allocated(&self) -> u64 {
        self.next - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_agent_id() {
        assert!(!AgentId::NULL.is_valid());
        assert_eq!(AgentId::from_raw(7).raw(), 7);
    }

    #[test]
    fn test_allocator_counts() {
        let mut ids = IdAllocator::new();
        let _ = ids.next_agent();
        let d = ids.next_decoration();
        assert_eq!(d.raw(), 2);
        assert_eq!(ids.allocated(), 2);
    }
}

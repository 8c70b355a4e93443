//! # Throttle Common
//!
//! Common types, utilities, and shared abstractions for Throttle.
//!
//! This crate provides foundational types used across all Throttle subsystems:
//! - Coordinate helpers for the travel axis (travel is toward negative Z)
//! - Bounding sizes and vehicle kinds
//! - ID types (AgentId, DecorationId)
//! - The shared lane table
//! - The content resolver interface used for placeholder/visual sizing
//! - Common error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod content;
pub mod coords;
pub mod error;
pub mod ids;
pub mod lanes;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::content::*;
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::lanes::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_key_floor() {
        assert_eq!(ZoneKey::from_z(-1.0, 100.0), ZoneKey::new(-1));
        assert_eq!(ZoneKey::from_z(-100.0, 100.0), ZoneKey::new(-1));
        assert_eq!(ZoneKey::from_z(-100.5, 100.0), ZoneKey::new(-2));
        assert_eq!(ZoneKey::from_z(0.0, 100.0), ZoneKey::new(0));
    }

    #[test]
    fn test_agent_id_sequence() {
        let mut ids = IdAllocator::new();
        let id1: AgentId = ids.next_agent();
        let id2: AgentId = ids.next_agent();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
    }

    #[test]
    fn test_default_lane_table() {
        let lanes = LaneTable::default();
        assert_eq!(lanes.len(), 3);
        assert_eq!(lanes.x_clamped(1), 0.0);
    }
}

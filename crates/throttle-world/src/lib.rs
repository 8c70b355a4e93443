//! # Throttle World
//!
//! World management for Throttle.
//!
//! This crate handles:
//! - Road and land chunk streaming ahead of the player
//! - Streetlight placement along road segments
//! - Procedural tree placement with populated-zone tracking
//! - The distance-traveled counter

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod generation;
pub mod streaming;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::generation::*;
    pub use crate::streaming::*;
    pub use crate::world::*;
}

pub use prelude::*;

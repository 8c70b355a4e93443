//! Coordinate types for the travel axis, zones, and bounding sizes.
//!
//! Travel runs toward negative Z: "ahead" of the player means a smaller Z,
//! "behind" means a larger Z.

use serde::{Deserialize, Serialize};

pub use glam::Vec3;

/// Returns the Z coordinate `distance` units ahead of `z`.
#[must_use]
pub fn ahead_of(z: f32, distance: f32) -> f32 {
    z - distance
}

/// Returns whether `z` lies more than `distance` units behind `reference_z`.
#[must_use]
pub fn is_behind(z: f32, reference_z: f32, distance: f32) -> bool {
    z > reference_z + distance
}

/// Axis-aligned box dimensions of a simulated body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSize {
    /// Lateral extent (X)
    pub width: f32,
    /// Vertical extent (Y)
    pub height: f32,
    /// Longitudinal extent (Z)
    pub length: f32,
}

impl BoundingSize {
    /// Creates a new bounding size.
    #[must_use]
    pub const fn new(width: f32, height: f32, length: f32) -> Self {
        Self {
            width,
            height,
            length,
        }
    }

    /// Half of the lateral extent.
    #[must_use]
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    /// Half of the longitudinal extent.
    #[must_use]
    pub fn half_length(&self) -> f32 {
        self.length / 2.0
    }

    /// Returns whether every extent is finite and positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.width, self.height, self.length]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

impl Default for BoundingSize {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// Key of a longitudinal band used for idempotent decoration placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneKey(i64);

impl ZoneKey {
    /// Creates a zone key from a raw band index.
    #[must_use]
    pub const fn new(index: i64) -> Self {
        Self(index)
    }

    /// Computes the key of the band containing `start_z`, i.e. `floor(start_z / zone_length)`.
    #[must_use]
    pub fn from_z(start_z: f32, zone_length: f32) -> Self {
        Self((start_z / zone_length).floor() as i64)
    }

    /// Returns the raw band index.
    #[must_use]
    pub const fn index(self) -> i64 {
        self.0
    }

    /// Returns the Z coordinate where this band starts.
    #[must_use]
    pub fn start_z(self, zone_length: f32) -> f32 {
        self.0 as f32 * zone_length
    }
}

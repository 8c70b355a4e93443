//! Chunk data structures: road and land segments.
//!
//! A chunk covers the band `(position - length, position]` along Z, so it
//! extends ahead of its position in the travel direction.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use throttle_common::require_positive;
use throttle_common::ConfigError;

/// Builds the content of a chunk when the streamer creates it.
pub trait SegmentBuilder {
    /// Segment payload stored inside the chunk.
    type Segment;

    /// Builds the segment for the chunk with the given grid index and length.
    fn build(&mut self, index: i64, length: f32) -> Self::Segment;
}

/// A fixed-length longitudinal slice of the world.
#[derive(Debug, Clone)]
pub struct WorldChunk<S> {
    /// Grid index; position is `index * length`
    index: i64,
    /// Chunk length
    length: f32,
    /// Segment content
    segment: S,
}

impl<S> WorldChunk<S> {
    /// Creates a new chunk.
    #[must_use]
    pub const fn new(index: i64, length: f32, segment: S) -> Self {
        Self {
            index,
            length,
            segment,
        }
    }

    /// Returns the grid index.
    #[must_use]
    pub const fn index(&self) -> i64 {
        self.index
    }

    /// Returns the signed position along the travel axis.
    #[must_use]
    pub fn position(&self) -> f32 {
        self.index as f32 * self.length
    }

    /// Returns the chunk length.
    #[must_use]
    pub const fn length(&self) -> f32 {
        self.length
    }

    /// Returns whether `z` lies inside this chunk's band.
    #[must_use]
    pub fn contains_z(&self, z: f32) -> bool {
        let position = self.position();
        z <= position && z > position - self.length
    }

    /// Returns the segment content.
    #[must_use]
    pub const fn segment(&self) -> &S {
        &self.segment
    }
}

/// Side of the road.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Negative X
    Left,
    /// Positive X
    Right,
}

impl Side {
    /// Sign of X on this side.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

/// A streetlight placed along a road segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Streetlight {
    /// Base position of the pole
    pub position: Vec3,
    /// Side of the road the pole stands on
    pub side: Side,
}

/// Streetlight placement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreetlightConfig {
    /// Whether streetlights are placed at all
    pub enabled: bool,
    /// Longitudinal distance between consecutive poles
    pub spacing: f32,
    /// Distance of the pole outward from the road edge
    pub edge_offset: f32,
}

impl Default for StreetlightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spacing: 50.0,
            edge_offset: 1.0,
        }
    }
}

impl StreetlightConfig {
    /// Validates the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("streetlights.spacing", self.spacing)?;
        if !self.edge_offset.is_finite() {
            return Err(ConfigError::invalid("streetlights.edge_offset", "must be finite"));
        }
        Ok(())
    }
}

/// Road surface for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    /// Position of the chunk
    pub position: f32,
    /// Length of the chunk
    pub length: f32,
    /// Drivable width
    pub width: f32,
    /// Shoulder width on each side
    pub shoulder_width: f32,
    /// Streetlights standing along this segment
    pub streetlights: Vec<Streetlight>,
}

/// Builds road segments with alternating streetlights.
#[derive(Debug, Clone)]
pub struct RoadBuilder {
    road_width: f32,
    shoulder_width: f32,
    lights: StreetlightConfig,
}

impl RoadBuilder {
    /// Creates a road builder.
    #[must_use]
    pub fn new(road_width: f32, lights: StreetlightConfig) -> Self {
        Self {
            road_width,
            shoulder_width: 1.0,
            lights,
        }
    }
}

impl SegmentBuilder for RoadBuilder {
    type Segment = RoadSegment;

    fn build(&mut self, index: i64, length: f32) -> RoadSegment {
        let position = index as f32 * length;
        let mut streetlights = Vec::new();

        if self.lights.enabled {
            let per_chunk = (length / self.lights.spacing).floor().max(1.0) as i64;
            let x = self.road_width / 2.0 + self.shoulder_width + self.lights.edge_offset;
            for slot in 0..per_chunk {
                // Global slot parity keeps the left/right alternation stable across chunks.
                let global = index * per_chunk - slot;
                let side = if global.rem_euclid(2) == 0 {
                    Side::Left
                } else {
                    Side::Right
                };
                streetlights.push(Streetlight {
                    position: Vec3::new(side.sign() * x, 0.0, position - slot as f32 * self.lights.spacing),
                    side,
                });
            }
        }

        RoadSegment {
            position,
            length,
            width: self.road_width,
            shoulder_width: self.shoulder_width,
            streetlights,
        }
    }
}

/// A flat ground tile beside the road.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileRect {
    /// Center of the tile
    pub center: Vec3,
    /// Extent along X
    pub width: f32,
    /// Extent along Z
    pub length: f32,
}

/// Land on both sides of the road for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandSegment {
    /// Tile left of the road
    pub left: TileRect,
    /// Tile right of the road
    pub right: TileRect,
}

impl LandSegment {
    /// Returns the band `[start_z, end_z)` this land covers.
    #[must_use]
    pub fn band(&self) -> (f32, f32) {
        let half = self.left.length / 2.0;
        (self.left.center.z - half, self.left.center.z + half)
    }
}

/// Builds land tiles flanking the road.
#[derive(Debug, Clone)]
pub struct LandBuilder {
    road_width: f32,
    land_width: f32,
}

impl LandBuilder {
    /// Ground sits just below the road surface.
    const GROUND_Y: f32 = -0.01;

    /// Creates a land builder.
    #[must_use]
    pub const fn new(road_width: f32, land_width: f32) -> Self {
        Self {
            road_width,
            land_width,
        }
    }
}

impl SegmentBuilder for LandBuilder {
    type Segment = LandSegment;

    fn build(&mut self, index: i64, length: f32) -> LandSegment {
        let center_z = index as f32 * length - length / 2.0;
        let offset_x = self.road_width / 2.0 + self.land_width / 2.0;
        let tile = |sign: f32| TileRect {
            center: Vec3::new(sign * offset_x, Self::GROUND_Y, center_z),
            width: self.land_width,
            length,
        };
        LandSegment {
            left: tile(-1.0),
            right: tile(1.0),
        }
    }
}

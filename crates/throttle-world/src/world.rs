//! The world facade: road, land, scenery and distance bookkeeping.

use serde::{Deserialize, Serialize};
use throttle_common::{require_positive, ConfigError};
use tracing::{debug, info};

use crate::chunk::{LandBuilder, RoadBuilder, StreetlightConfig};
use crate::generation::{CleanupReport, DecorationConfig, DecorationField};
use crate::streaming::{ChunkStreamer, StreamDelta, StreamerConfig};

/// Seed salt for the decoration random stream.
const DECORATION_SALT: u64 = 0x7e11_7ee5;

/// World configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Road chunk streaming
    pub road: StreamerConfig,
    /// Land chunk streaming
    pub land: StreamerConfig,
    /// Drivable road width
    pub road_width: f32,
    /// Width of each land tile beside the road
    pub land_width: f32,
    /// Streetlight placement
    pub streetlights: StreetlightConfig,
    /// Tree placement
    pub decorations: DecorationConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            road: StreamerConfig::default(),
            land: StreamerConfig {
                target_chunks: 12,
                trigger_distance_factor: 4.0,
                ..StreamerConfig::default()
            },
            road_width: 14.0,
            land_width: 100.0,
            streetlights: StreetlightConfig::default(),
            decorations: DecorationConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.road.validate()?;
        self.land.validate()?;
        self.streetlights.validate()?;
        self.decorations.validate()?;
        require_positive("road_width", self.road_width)?;
        require_positive("land_width", self.land_width)?;
        if (self.decorations.zone_length - self.land.chunk_length).abs() > f32::EPSILON {
            return Err(ConfigError::invalid(
                "decorations.zone_length",
                format!(
                    "must equal land.chunk_length ({}), got {}",
                    self.land.chunk_length, self.decorations.zone_length
                ),
            ));
        }
        Ok(())
    }
}

/// Everything that changed during one [`World::advance`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldDelta {
    /// Road chunk changes
    pub road: StreamDelta,
    /// Land chunk changes
    pub land: StreamDelta,
    /// Trees placed for new land bands
    pub trees_placed: usize,
    /// Trees and zones retired behind the player
    pub cleanup: CleanupReport,
}

/// Owns the streamed road and land and the scenery on it.
#[derive(Debug)]
pub struct World {
    /// Configuration
    config: WorldConfig,
    /// Road window
    road: ChunkStreamer<RoadBuilder>,
    /// Land window
    land: ChunkStreamer<LandBuilder>,
    /// Trees and populated zones
    decorations: DecorationField,
    /// Z where the player started
    origin_z: f32,
    /// Furthest Z the player has reached
    furthest_z: f32,
}

impl World {
    /// Creates the world and populates trees for the initial land window.
    pub fn new(config: WorldConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let road = ChunkStreamer::new(
            config.road.clone(),
            RoadBuilder::new(config.road_width, config.streetlights.clone()),
        )?;
        let land = ChunkStreamer::new(
            config.land.clone(),
            LandBuilder::new(config.road_width, config.land_width),
        )?;
        let decorations = DecorationField::new(
            config.decorations.clone(),
            config.road_width,
            seed ^ DECORATION_SALT,
        )?;

        let mut world = Self {
            config,
            road,
            land,
            decorations,
            origin_z: 0.0,
            furthest_z: 0.0,
        };
        let placed = world.populate_initial();
        info!(
            "World created: {} road chunks, {} land chunks, {placed} trees",
            world.road.len(),
            world.land.len()
        );
        Ok(world)
    }

    /// Advances streaming and scenery for a player at `player_z`.
    pub fn advance(&mut self, player_z: f32) -> WorldDelta {
        let road = self.road.advance(player_z);
        let land = self.land.advance(player_z);

        let length = self.config.land.chunk_length;
        let trees_placed = land
            .created
            .iter()
            .map(|&position| self.decorations.generate_zone(player_z, position - length, position))
            .sum();
        let cleanup = self.decorations.cleanup(player_z);

        if player_z < self.furthest_z {
            self.furthest_z = player_z;
        }

        if !land.created.is_empty() {
            debug!(
                "Land advanced: {} new bands, {trees_placed} trees, {} trees live",
                land.created.len(),
                self.decorations.trees().len()
            );
        }

        WorldDelta {
            road,
            land,
            trees_placed,
            cleanup,
        }
    }

    /// Restores the initial windows and scenery and zeroes the distance counter.
    pub fn reset(&mut self) {
        self.road.reset();
        self.land.reset();
        self.decorations.reset();
        self.furthest_z = self.origin_z;
        let placed = self.populate_initial();
        debug!("World reset, {placed} trees placed");
    }

    /// Distance traveled from the origin; never negative and never decreasing.
    #[must_use]
    pub fn distance_traveled(&self) -> f32 {
        (self.origin_z - self.furthest_z).max(0.0)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Road window.
    #[must_use]
    pub const fn road(&self) -> &ChunkStreamer<RoadBuilder> {
        &self.road
    }

    /// Land window.
    #[must_use]
    pub const fn land(&self) -> &ChunkStreamer<LandBuilder> {
        &self.land
    }

    /// Trees and populated zones.
    #[must_use]
    pub const fn decorations(&self) -> &DecorationField {
        &self.decorations
    }

    /// Mutable access for model weight updates.
    pub fn decorations_mut(&mut self) -> &mut DecorationField {
        &mut self.decorations
    }

    /// Drops every chunk of both windows, as if cleared externally.
    pub fn clear_chunks(&mut self) {
        self.road.clear();
        self.land.clear();
    }

    fn populate_initial(&mut self) -> usize {
        let length = self.config.land.chunk_length;
        let origin = self.origin_z;
        let positions = self.land.positions();
        positions
            .into_iter()
            .map(|position| self.decorations.generate_zone(origin, position - length, position))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(WorldConfig::default(), 42).expect("valid config")
    }

    #[test]
    fn test_initial_world() {
        let w = world();
        assert_eq!(w.road().len(), 10);
        assert_eq!(w.land().len(), 12);
        assert!(!w.decorations().trees().is_empty());
        assert_eq!(w.decorations().populated_count(), 12);
        assert_eq!(w.distance_traveled(), 0.0);
    }

    #[test]
    fn test_advance_populates_new_land() {
        let mut w = world();
        // Land front is at -1100; factor 4 triggers once the player passes -700.
        let delta = w.advance(-750.0);
        assert_eq!(delta.land.created.len(), 3);
        assert!(delta.trees_placed > 0);
        assert!(w.decorations().is_populated(-1_300.0));
    }

    #[test]
    fn test_distance_counter_is_monotonic() {
        let mut w = world();
        w.advance(-120.0);
        assert_eq!(w.distance_traveled(), 120.0);
        w.advance(-60.0);
        assert_eq!(w.distance_traveled(), 120.0);
        w.advance(30.0);
        assert_eq!(w.distance_traveled(), 120.0);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut w = world();
        let initial_trees = w.decorations().trees().len();
        for step in 1..=40 {
            w.advance(step as f32 * -100.0);
        }
        assert!(w.distance_traveled() > 3_000.0);

        w.reset();
        assert_eq!(w.distance_traveled(), 0.0);
        assert_eq!(w.road().frontmost().map(|c| c.position()), Some(-900.0));
        assert_eq!(w.decorations().trees().len(), initial_trees);
        assert_eq!(w.decorations().populated_count(), 12);
    }

    #[test]
    fn test_self_heal_after_clear() {
        let mut w = world();
        w.clear_chunks();
        let delta = w.advance(-2_050.0);
        assert!(delta.road.rebuilt);
        assert!(delta.land.rebuilt);
        assert!(w.road().chunk_at(-2_050.0).is_some());
        assert!(w.land().chunk_at(-2_050.0).is_some());
    }

    #[test]
    fn test_zone_length_must_match_land() {
        let mut config = WorldConfig::default();
        config.decorations.zone_length = 50.0;
        assert!(World::new(config, 1).is_err());
    }
}

//! Procedural scenery generation.
//!
//! Trees are placed per longitudinal zone. A zone is populated at most once
//! until it falls far enough behind the player to be forgotten, which lets it
//! regenerate if the player ever returns.

use ahash::AHashSet;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use throttle_common::{
    require_non_negative, require_positive, require_probability, ConfigError, DecorationId,
    IdAllocator, ZoneKey,
};
use tracing::{debug, warn};

/// Decoration placement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationConfig {
    /// Length of a population zone (matches the land chunk length)
    pub zone_length: f32,
    /// Grid spacing between tree slots, both along Z and across rows
    pub spacing: f32,
    /// Number of tree rows on each side of the road
    pub tree_rows: u32,
    /// Chance that a slot receives a tree
    pub tree_density: f32,
    /// Gap between the road edge and the first row
    pub road_buffer: f32,
    /// Cap on trees placed in a single zone
    pub max_per_zone: usize,
    /// Zones farther than this from the player are not populated
    pub max_generation_distance: f32,
    /// Trees farther than this behind the player are removed
    pub cleanup_distance: f32,
    /// Zones are forgotten beyond `cleanup_distance * zone_retention_factor`
    pub zone_retention_factor: f32,
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            zone_length: 100.0,
            spacing: 20.0,
            tree_rows: 4,
            tree_density: 0.6,
            road_buffer: 6.0,
            max_per_zone: 100,
            max_generation_distance: 12_000.0,
            cleanup_distance: 1_000.0,
            zone_retention_factor: 3.0,
        }
    }
}

impl DecorationConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("decorations.zone_length", self.zone_length)?;
        require_positive("decorations.spacing", self.spacing)?;
        require_probability("decorations.tree_density", self.tree_density)?;
        require_non_negative("decorations.road_buffer", self.road_buffer)?;
        require_non_negative("decorations.max_generation_distance", self.max_generation_distance)?;
        require_non_negative("decorations.cleanup_distance", self.cleanup_distance)?;
        require_positive("decorations.zone_retention_factor", self.zone_retention_factor)?;
        Ok(())
    }
}

/// A tree model entry in the weighted selection table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeModel {
    /// Model file name
    pub name: String,
    /// Relative selection weight
    pub probability: f32,
    /// Whether the model may be selected
    pub enabled: bool,
    /// Uniform base scale
    pub base_scale: f32,
    /// Height of the tree origin above ground
    pub vertical_offset: f32,
}

impl TreeModel {
    fn new(name: &str, probability: f32, base_scale: f32, vertical_offset: f32) -> Self {
        Self {
            name: name.to_owned(),
            probability,
            enabled: true,
            base_scale,
            vertical_offset,
        }
    }
}

/// Weighted table of tree models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeModelTable {
    models: Vec<TreeModel>,
}

impl Default for TreeModelTable {
    fn default() -> Self {
        Self {
            models: vec![
                TreeModel::new("tree1.glb", 0.25, 5.0, 3.0),
                TreeModel::new("tree2.glb", 0.25, 0.03, -0.5),
                TreeModel::new("tree3.glb", 0.25, 4.0, 4.0),
                TreeModel::new("tree4.glb", 0.25, 1.5, 4.0),
                TreeModel::new("tree_trunk1.glb", 0.1, 1.5, -1.0),
                TreeModel::new("tree_trunk2.glb", 0.1, 2.0, -1.0),
            ],
        }
    }
}

impl TreeModelTable {
    /// Creates a table from explicit entries.
    #[must_use]
    pub fn new(models: Vec<TreeModel>) -> Self {
        Self { models }
    }

    /// Returns all entries.
    #[must_use]
    pub fn models(&self) -> &[TreeModel] {
        &self.models
    }

    /// Updates the weight and enabled flag of a model. Returns false for unknown names.
    pub fn set_weight(&mut self, name: &str, probability: f32, enabled: bool) -> bool {
        match self.models.iter_mut().find(|m| m.name == name) {
            Some(model) => {
                model.probability = probability.clamp(0.0, 1.0);
                model.enabled = enabled;
                debug!("Tree model {name}: probability={}, enabled={enabled}", model.probability);
                true
            },
            None => {
                warn!("Tree model {name} not found in table");
                false
            },
        }
    }

    /// Picks a model by weight among enabled entries.
    pub fn pick(&self, rng: &mut fastrand::Rng) -> Option<&TreeModel> {
        let enabled = || self.models.iter().filter(|m| m.enabled && m.probability > 0.0);
        let total: f32 = enabled().map(|m| m.probability).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = rng.f32() * total;
        for model in enabled() {
            roll -= model.probability;
            if roll <= 0.0 {
                return Some(model);
            }
        }
        enabled().next()
    }
}

/// A placed tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Unique ID
    pub id: DecorationId,
    /// Model name resolved at placement
    pub model: String,
    /// Base position
    pub position: Vec3,
    /// Yaw in radians
    pub rotation_y: f32,
    /// Uniform scale
    pub scale: f32,
    /// Zone that produced this tree
    pub zone: ZoneKey,
}

/// Result of a cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Trees removed
    pub trees_removed: usize,
    /// Populated-zone markers cleared
    pub zones_cleared: usize,
}

/// Places and retires trees along the road.
#[derive(Debug)]
pub struct DecorationField {
    /// Configuration
    config: DecorationConfig,
    /// Drivable road width
    road_width: f32,
    /// Weighted model table
    models: TreeModelTable,
    /// Live trees
    trees: Vec<Tree>,
    /// Zones already populated
    populated: AHashSet<ZoneKey>,
    /// Random source
    rng: fastrand::Rng,
    /// Seed for resets
    seed: u64,
    /// ID source
    ids: IdAllocator,
}

impl DecorationField {
    /// Creates an empty field.
    pub fn new(config: DecorationConfig, road_width: f32, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        require_positive("road_width", road_width)?;
        Ok(Self {
            config,
            road_width,
            models: TreeModelTable::default(),
            trees: Vec::new(),
            populated: AHashSet::new(),
            rng: fastrand::Rng::with_seed(seed),
            seed,
            ids: IdAllocator::new(),
        })
    }

    /// Replaces the model table.
    #[must_use]
    pub fn with_models(mut self, models: TreeModelTable) -> Self {
        self.models = models;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DecorationConfig {
        &self.config
    }

    /// Returns the model table.
    #[must_use]
    pub const fn models(&self) -> &TreeModelTable {
        &self.models
    }

    /// Updates a model's weight. See [`TreeModelTable::set_weight`].
    pub fn set_model_weight(&mut self, name: &str, probability: f32, enabled: bool) -> bool {
        self.models.set_weight(name, probability, enabled)
    }

    /// Live trees.
    #[must_use]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Returns whether the zone keyed by `start_z` was already populated.
    #[must_use]
    pub fn is_populated(&self, start_z: f32) -> bool {
        self.populated
            .contains(&ZoneKey::from_z(start_z, self.config.zone_length))
    }

    /// Number of populated zone markers.
    #[must_use]
    pub fn populated_count(&self) -> usize {
        self.populated.len()
    }

    /// Populates the band `[start_z, end_z)` with trees.
    ///
    /// Returns the number of trees placed; zero when the band is too far from
    /// the player or was already populated.
    pub fn generate_zone(&mut self, player_z: f32, start_z: f32, end_z: f32) -> usize {
        let max_distance = self.config.max_generation_distance;
        if (player_z - start_z).abs() > max_distance && (player_z - end_z).abs() > max_distance {
            return 0;
        }

        let key = ZoneKey::from_z(start_z, self.config.zone_length);
        if self.populated.contains(&key) {
            return 0;
        }

        let spacing = self.config.spacing;
        let inner_edge = self.road_width / 2.0 + self.config.road_buffer;
        let cap = self.config.max_per_zone;
        let mut placed = 0;

        let mut z = start_z;
        while z < end_z && placed < cap {
            let slot_z = z + (self.rng.f32() - 0.5) * spacing * 0.5;
            for sign in [-1.0_f32, 1.0] {
                for row in 0..self.config.tree_rows {
                    if placed >= cap {
                        break;
                    }
                    let row_x =
                        sign * (inner_edge + row as f32 * spacing + self.rng.f32() * spacing * 0.5);
                    if self.rng.f32() < self.config.tree_density && self.place_tree(row_x, slot_z, key) {
                        placed += 1;
                    }
                }
            }
            z += spacing;
        }

        self.populated.insert(key);
        debug!("Placed {placed} trees in zone {} ({start_z:.1}..{end_z:.1})", key.index());
        placed
    }

    /// Removes trees and zone markers left behind the player.
    pub fn cleanup(&mut self, player_z: f32) -> CleanupReport {
        let tree_limit = player_z + self.config.cleanup_distance;
        let before = self.trees.len();
        self.trees.retain(|tree| tree.position.z <= tree_limit);
        let trees_removed = before - self.trees.len();

        let zone_limit = player_z + self.config.cleanup_distance * self.config.zone_retention_factor;
        let zone_length = self.config.zone_length;
        let zones_before = self.populated.len();
        self.populated.retain(|key| key.start_z(zone_length) <= zone_limit);
        let zones_cleared = zones_before - self.populated.len();

        if trees_removed > 0 || zones_cleared > 0 {
            debug!(
                "Cleanup behind z={player_z:.1}: {trees_removed} trees, {zones_cleared} zones; {} trees remain",
                self.trees.len()
            );
        }

        CleanupReport {
            trees_removed,
            zones_cleared,
        }
    }

    /// Drops all trees and zone markers and reseeds the random source.
    pub fn reset(&mut self) {
        self.trees.clear();
        self.populated.clear();
        self.rng = fastrand::Rng::with_seed(self.seed);
        self.ids = IdAllocator::new();
    }

    fn place_tree(&mut self, x: f32, z: f32, zone: ZoneKey) -> bool {
        let Some(model) = self.models.pick(&mut self.rng) else {
            return false;
        };
        let name = model.name.clone();
        let base_scale = model.base_scale;
        let vertical_offset = model.vertical_offset;

        let scale = base_scale * (0.9 + self.rng.f32() * 0.2);
        let rotation_y = self.rng.f32() * std::f32::consts::FRAC_PI_2;
        self.trees.push(Tree {
            id: self.ids.next_decoration(),
            model: name,
            position: Vec3::new(x, vertical_offset, z),
            rotation_y,
            scale,
            zone,
        });
        true
    }
}

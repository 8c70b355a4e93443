//! Traffic simulation.
//!
//! Owns every live traffic agent. Agents spawn ahead of the player in a random
//! lane when that lane is clear at the spawn point, drive with following and
//! lane-change rules, and are retired once they fall far enough behind.

use std::sync::Arc;

use ahash::AHashMap;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use throttle_common::{
    ahead_of, is_behind, AgentId, BoundingSize, ConfigError, ContentResolver, IdAllocator, LaneTable,
    VehicleKind,
};
use tracing::{debug, trace, warn};

use crate::config::TrafficConfig;
use crate::vehicle::{AgentSnapshot, TrafficAgent, VehicleModelTable};

/// Seed salt for the traffic random stream.
const TRAFFIC_SALT: u64 = 0x0007_4aff_1c00;

/// Running traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficStats {
    /// Agents spawned
    pub spawned: u64,
    /// Agents retired behind the player
    pub despawned: u64,
    /// Spawn attempts rejected because the lane was occupied
    pub failed_spawns: u64,
}

/// What changed during one [`TrafficSimulator::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficUpdate {
    /// Agent spawned this tick
    pub spawned: Option<AgentId>,
    /// Agents retired this tick
    pub despawned: Vec<AgentId>,
    /// Agents stepped this tick
    pub stepped: usize,
}

/// Owns and advances the traffic population.
#[derive(Debug)]
pub struct TrafficSimulator {
    /// Configuration
    config: TrafficConfig,
    /// Shared lane centers
    lanes: Arc<LaneTable>,
    /// Weighted vehicle models
    models: VehicleModelTable,
    /// Live agents
    agents: Vec<TrafficAgent>,
    /// Bounding sizes reported once visuals resolved, per model
    refined_sizes: AHashMap<String, BoundingSize>,
    /// Seconds until the next spawn attempt
    spawn_timer: f32,
    /// Random source
    rng: fastrand::Rng,
    /// Seed for resets
    seed: u64,
    /// ID source
    ids: IdAllocator,
    /// Counters
    stats: TrafficStats,
}

impl TrafficSimulator {
    /// Creates an empty simulator.
    pub fn new(config: TrafficConfig, lanes: Arc<LaneTable>, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            lanes,
            models: VehicleModelTable::default(),
            agents: Vec::new(),
            refined_sizes: AHashMap::new(),
            spawn_timer: 0.0,
            rng: fastrand::Rng::with_seed(seed ^ TRAFFIC_SALT),
            seed,
            ids: IdAllocator::new(),
            stats: TrafficStats::default(),
        })
    }

    /// Replaces the model table.
    #[must_use]
    pub fn with_models(mut self, models: VehicleModelTable) -> Self {
        self.models = models;
        self
    }

    /// Advances traffic by `dt` seconds around a player at `player_pos`.
    pub fn update(&mut self, dt: f32, player_pos: Vec3, content: &dyn ContentResolver) -> TrafficUpdate {
        let mut result = TrafficUpdate::default();
        let despawn_distance = self.config.despawn_distance;
        let update_radius = self.config.update_radius;

        let snapshot: Vec<AgentSnapshot> = self.agents.iter().map(TrafficAgent::snapshot).collect();
        for agent in &mut self.agents {
            if is_behind(agent.position.z, player_pos.z, despawn_distance) {
                result.despawned.push(agent.id);
                continue;
            }
            if (agent.position.z - player_pos.z).abs() <= update_radius {
                agent.step(dt, &snapshot, &self.lanes, &self.config, &mut self.rng);
                result.stepped += 1;
            }
        }

        if !result.despawned.is_empty() {
            let despawned = &result.despawned;
            self.agents.retain(|agent| !despawned.contains(&agent.id));
            self.stats.despawned += despawned.len() as u64;
            debug!(
                "Despawned {} agents behind z={:.1}, {} remain",
                despawned.len(),
                player_pos.z,
                self.agents.len()
            );
        }

        self.spawn_timer -= dt;
        if self.spawn_timer <= 0.0 {
            if self.agents.len() < self.config.max_active_vehicles {
                result.spawned = self.try_spawn_vehicle(player_pos, content);
            }
            self.spawn_timer = self.config.spawn_cooldown;
        }

        result
    }

    /// Attempts one spawn ahead of the player. Returns `None` if the chosen lane is occupied.
    pub fn try_spawn_vehicle(&mut self, player_pos: Vec3, content: &dyn ContentResolver) -> Option<AgentId> {
        let spawn_z = ahead_of(player_pos.z, self.config.spawn_distance_ahead);
        let lane = self.rng.usize(..self.lanes.len());
        let lane_x = self.lanes.x_clamped(lane);

        let occupied = self.agents.iter().any(|agent| {
            (agent.position.x - lane_x).abs() < self.config.lane_width_threshold
                && (agent.position.z - spawn_z).abs() < self.config.required_distance
        });
        if occupied {
            self.stats.failed_spawns += 1;
            trace!("Spawn in lane {lane} at z={spawn_z:.1} rejected, lane occupied");
            return None;
        }

        let kind = if self.rng.f32() < self.config.truck_probability {
            VehicleKind::Truck
        } else {
            VehicleKind::Car
        };
        let speed = self.config.speed_range(kind).sample(&mut self.rng);
        Some(self.place_vehicle(kind, lane, spawn_z, speed, content))
    }

    /// Places a vehicle without any clearance check.
    pub fn place_vehicle(
        &mut self,
        kind: VehicleKind,
        lane: usize,
        z: f32,
        speed: f32,
        content: &dyn ContentResolver,
    ) -> AgentId {
        let lane = self.lanes.clamp_index(lane);
        let max_speed = self.config.speed_range(kind).max;
        let speed = speed.clamp(0.0, max_speed);
        let model = self.models.pick(kind, &mut self.rng).map(|m| m.name.clone());
        let size = self.spawn_size(kind, model.as_deref(), content);
        let id = self.ids.next_agent();

        self.agents.push(TrafficAgent {
            id,
            kind,
            model,
            position: Vec3::new(self.lanes.x_clamped(lane), self.config.vehicle_y, z),
            speed,
            original_speed: speed,
            max_speed,
            lane,
            braking: false,
            braking_time: 0.0,
            changing_lane: false,
            target_lane: None,
            lane_changes_made: 0,
            size,
        });
        self.stats.spawned += 1;
        debug!("Spawned {kind} {} in lane {lane} at z={z:.1}, speed={speed:.2}", id.raw());
        id
    }

    /// Applies a resolved bounding size to live agents drawn with `model` and to
    /// future spawns of it. Other models of the same kind are left alone.
    pub fn refine_size(&mut self, model: &str, size: BoundingSize) {
        if !size.is_valid() {
            warn!("Ignoring invalid bounding size {size:?} for {model}");
            return;
        }
        self.refined_sizes.insert(model.to_owned(), size);
        let mut updated = 0;
        for agent in self
            .agents
            .iter_mut()
            .filter(|a| a.model.as_deref() == Some(model))
        {
            agent.size = size;
            updated += 1;
        }
        debug!("Refined {model} size to {size:?}, {updated} live agents updated");
    }

    /// Size learned for `model`, if its visual has resolved.
    #[must_use]
    pub fn refined_size(&self, model: &str) -> Option<BoundingSize> {
        self.refined_sizes.get(model).copied()
    }

    /// Removes every agent and restarts the spawn timer.
    pub fn clear(&mut self) {
        self.agents.clear();
        self.spawn_timer = 0.0;
    }

    /// Clears agents and rewinds the random stream, IDs and counters.
    pub fn reset(&mut self) {
        self.clear();
        self.rng = fastrand::Rng::with_seed(self.seed ^ TRAFFIC_SALT);
        self.ids = IdAllocator::new();
        self.stats = TrafficStats::default();
    }

    /// Updates a vehicle model's weight. See [`VehicleModelTable::set_weight`].
    pub fn set_model_weight(&mut self, name: &str, probability: f32, enabled: bool) -> bool {
        self.models.set_weight(name, probability, enabled)
    }

    /// Live agents.
    #[must_use]
    pub fn agents(&self) -> &[TrafficAgent] {
        &self.agents
    }

    /// Looks up a live agent.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&TrafficAgent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Number of live agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns whether no agent is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Running counters.
    #[must_use]
    pub const fn stats(&self) -> TrafficStats {
        self.stats
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TrafficConfig {
        &self.config
    }

    /// Returns the lane table.
    #[must_use]
    pub fn lanes(&self) -> &LaneTable {
        &self.lanes
    }

    /// Returns the model table.
    #[must_use]
    pub const fn models(&self) -> &VehicleModelTable {
        &self.models
    }

    fn spawn_size(
        &self,
        kind: VehicleKind,
        model: Option<&str>,
        content: &dyn ContentResolver,
    ) -> BoundingSize {
        if let Some(size) = model.and_then(|name| self.refined_size(name)) {
            return size;
        }
        let size = content.resolve_bounding_size(kind, model);
        if size.is_valid() {
            size
        } else {
            kind.placeholder_size()
        }
    }
}

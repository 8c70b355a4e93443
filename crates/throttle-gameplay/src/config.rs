//! Simulation configuration.
//!
//! Every tuning constant of the simulation is a named field here so hosts can
//! override it from their config file.

use serde::{Deserialize, Serialize};
use throttle_common::{
    require_non_negative, require_positive, require_probability, ConfigError, LaneTable,
    VehicleKind,
};
use throttle_world::WorldConfig;

use crate::collision::CollisionConfig;
use crate::player::PlayerConfig;

/// Inclusive speed range for a vehicle kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    /// Slowest spawn speed
    pub min: f32,
    /// Fastest spawn speed, also the kind's speed cap
    pub max: f32,
}

impl SpeedRange {
    /// Creates a new range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Draws a speed uniformly from the range.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> f32 {
        self.min + rng.f32() * (self.max - self.min)
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        require_non_negative(field, self.min)?;
        require_positive(field, self.max)?;
        if self.min > self.max {
            return Err(ConfigError::invalid(
                field,
                format!("min ({}) exceeds max ({})", self.min, self.max),
            ));
        }
        Ok(())
    }
}

/// Traffic spawning and driving configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Spawn point distance ahead of the player
    pub spawn_distance_ahead: f32,
    /// Agents this far behind the player are removed
    pub despawn_distance: f32,
    /// Population cap
    pub max_active_vehicles: usize,
    /// Seconds between spawn attempts
    pub spawn_cooldown: f32,
    /// Minimum gap to any same-lane agent at the spawn point
    pub required_distance: f32,
    /// Lateral distance under which two bodies share a lane
    pub lane_width_threshold: f32,
    /// Chance that a spawn is a truck
    pub truck_probability: f32,
    /// Car spawn speed range
    pub car_speed: SpeedRange,
    /// Truck spawn speed range
    pub truck_speed: SpeedRange,
    /// Height of agents above the road
    pub vehicle_y: f32,
    /// Safe following distance per unit of speed
    pub following_time: f32,
    /// Constant part of the safe following distance
    pub following_margin: f32,
    /// Gap under which agents brake hard
    pub hard_brake_distance: f32,
    /// Hard braking deceleration
    pub hard_brake_rate: f32,
    /// Soft braking rate toward the leader's lagged speed
    pub soft_brake_rate: f32,
    /// Fraction of the leader's speed a following agent settles at
    pub lagging_factor: f32,
    /// Acceleration back to the original speed
    pub recovery_rate: f32,
    /// Seconds of braking before a lane change is attempted
    pub max_braking_time: f32,
    /// Per-tick chance of a spontaneous lane change attempt
    pub lane_change_probability: f32,
    /// Voluntary lane changes allowed per agent lifetime
    pub max_lane_changes: u32,
    /// Target-lane clearance window per unit of speed
    pub lane_change_window_factor: f32,
    /// Constant part of the target-lane clearance window
    pub lane_change_window_margin: f32,
    /// Lateral speed during a lane change
    pub lane_change_rate: f32,
    /// Distance from the lane center at which a lane change snaps
    pub lane_snap_epsilon: f32,
    /// Agents farther than this from the player are not stepped
    pub update_radius: f32,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            spawn_distance_ahead: 120.0,
            despawn_distance: 70.0,
            max_active_vehicles: 10,
            spawn_cooldown: 0.5,
            required_distance: 40.0,
            lane_width_threshold: 1.5,
            truck_probability: 0.3,
            car_speed: SpeedRange::new(5.0, 10.0),
            truck_speed: SpeedRange::new(3.0, 6.0),
            vehicle_y: 0.5,
            following_time: 1.5,
            following_margin: 3.0,
            hard_brake_distance: 3.0,
            hard_brake_rate: 8.0,
            soft_brake_rate: 3.0,
            lagging_factor: 0.9,
            recovery_rate: 2.0,
            max_braking_time: 2.0,
            lane_change_probability: 0.002,
            max_lane_changes: 1,
            lane_change_window_factor: 2.0,
            lane_change_window_margin: 5.0,
            lane_change_rate: 2.0,
            lane_snap_epsilon: 0.1,
            update_radius: 300.0,
        }
    }
}

impl TrafficConfig {
    /// Spawn speed range for `kind`; its upper bound is the kind's speed cap.
    #[must_use]
    pub const fn speed_range(&self, kind: VehicleKind) -> SpeedRange {
        match kind {
            VehicleKind::Car => self.car_speed,
            VehicleKind::Truck => self.truck_speed,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("traffic.spawn_distance_ahead", self.spawn_distance_ahead)?;
        require_positive("traffic.despawn_distance", self.despawn_distance)?;
        require_non_negative("traffic.spawn_cooldown", self.spawn_cooldown)?;
        require_non_negative("traffic.required_distance", self.required_distance)?;
        require_positive("traffic.lane_width_threshold", self.lane_width_threshold)?;
        require_probability("traffic.truck_probability", self.truck_probability)?;
        self.car_speed.validate("traffic.car_speed")?;
        self.truck_speed.validate("traffic.truck_speed")?;
        require_non_negative("traffic.following_time", self.following_time)?;
        require_non_negative("traffic.following_margin", self.following_margin)?;
        require_non_negative("traffic.hard_brake_distance", self.hard_brake_distance)?;
        require_non_negative("traffic.hard_brake_rate", self.hard_brake_rate)?;
        require_non_negative("traffic.soft_brake_rate", self.soft_brake_rate)?;
        require_probability("traffic.lagging_factor", self.lagging_factor)?;
        require_non_negative("traffic.recovery_rate", self.recovery_rate)?;
        require_non_negative("traffic.max_braking_time", self.max_braking_time)?;
        require_probability("traffic.lane_change_probability", self.lane_change_probability)?;
        require_positive("traffic.lane_change_rate", self.lane_change_rate)?;
        require_positive("traffic.lane_snap_epsilon", self.lane_snap_epsilon)?;
        require_positive("traffic.update_radius", self.update_radius)?;
        if !self.vehicle_y.is_finite() {
            return Err(ConfigError::invalid("traffic.vehicle_y", "must be finite"));
        }
        Ok(())
    }
}

/// Game loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Largest frame delta the simulation accepts, in seconds
    pub max_frame_dt: f32,
    /// Distance between milestone events
    pub milestone_interval: f32,
    /// Capacity of the event queue
    pub event_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_frame_dt: 0.25,
            milestone_interval: 1_000.0,
            event_capacity: 1024,
        }
    }
}

impl LoopConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("game.max_frame_dt", self.max_frame_dt)?;
        require_positive("game.milestone_interval", self.milestone_interval)?;
        if self.event_capacity == 0 {
            return Err(ConfigError::invalid("game.event_capacity", "must be at least 1"));
        }
        Ok(())
    }
}

/// Complete simulation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for every random stream
    pub seed: u64,
    /// Lane centers shared by traffic and the player
    pub lanes: LaneTable,
    /// Player handling
    pub player: PlayerConfig,
    /// Traffic behavior
    pub traffic: TrafficConfig,
    /// Road, land and scenery
    pub world: WorldConfig,
    /// Collision outcomes
    pub collision: CollisionConfig,
    /// Game loop settings
    pub game: LoopConfig,
}

impl SimulationConfig {
    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.player.validate()?;
        self.traffic.validate()?;
        self.world.validate()?;
        self.collision.validate()?;
        self.game.validate()?;

        let half_road = self.world.road_width / 2.0;
        if self.lanes.min_x() < -half_road || self.lanes.max_x() > half_road {
            return Err(ConfigError::invalid(
                "lanes",
                format!("lane centers must lie within the road (±{half_road})"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_speed_range_bounds() {
        let config = TrafficConfig::default();
        assert_eq!(config.speed_range(VehicleKind::Truck).max, 6.0);

        let mut rng = fastrand::Rng::with_seed(4);
        for _ in 0..100 {
            let speed = config.car_speed.sample(&mut rng);
            assert!((5.0..=10.0).contains(&speed));
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = TrafficConfig {
            truck_probability: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "traffic.truck_probability", .. })
        ));

        let config = TrafficConfig {
            car_speed: SpeedRange::new(10.0, 5.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lanes_must_fit_road() {
        let config = SimulationConfig {
            lanes: LaneTable::new(vec![-9.0, 0.0, 9.0]).expect("ordered lanes"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{ "seed": 7, "lanes": [-2.0, 2.0], "traffic": { "max_active_vehicles": 4 } }"#)
                .expect("parse partial config");
        assert_eq!(config.seed, 7);
        assert_eq!(config.lanes.len(), 2);
        assert_eq!(config.traffic.max_active_vehicles, 4);
        assert_eq!(config.traffic.despawn_distance, 70.0);
        assert_eq!(config.player.max_speed, 40.0);
    }
}

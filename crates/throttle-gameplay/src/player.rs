//! Player vehicle controller.
//!
//! Integrates the frame's controls into speed, position and banking tilt.
//! Positive tilt leans left, negative tilt leans right.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use throttle_common::{require_non_negative, require_positive, BoundingSize, ConfigError};

use crate::input::Controls;

/// Lateral clamp for the player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadBounds {
    /// Leftmost X
    pub min: f32,
    /// Rightmost X
    pub max: f32,
}

impl RoadBounds {
    /// Creates new bounds.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamps `x` into the bounds.
    #[must_use]
    pub fn clamp(&self, x: f32) -> f32 {
        x.clamp(self.min, self.max)
    }

    /// Returns whether `x` is inside the bounds.
    #[must_use]
    pub fn contains(&self, x: f32) -> bool {
        x >= self.min && x <= self.max
    }
}

impl Default for RoadBounds {
    fn default() -> Self {
        Self::new(-6.0, 6.0)
    }
}

/// Player handling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Top speed
    pub max_speed: f32,
    /// Acceleration while forward is held
    pub acceleration: f32,
    /// Deceleration while backward is held
    pub deceleration: f32,
    /// Deceleration while brake is held
    pub brake_deceleration: f32,
    /// Deceleration with no longitudinal input
    pub friction: f32,
    /// Lateral steering speed
    pub lateral_speed: f32,
    /// Bank angle at full steer, in radians
    pub max_tilt: f32,
    /// Rate the bank angle moves toward its target, in radians per second
    pub tilt_rate: f32,
    /// Lateral clamp
    pub road_bounds: RoadBounds,
    /// Collision box
    pub size: BoundingSize,
    /// Speed at start and after restart
    pub start_speed: f32,
    /// Position at start and after restart
    pub start_position: Vec3,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_speed: 40.0,
            acceleration: 10.0,
            deceleration: 15.0,
            brake_deceleration: 30.0,
            friction: 15.0,
            lateral_speed: 5.0,
            max_tilt: 0.3,
            tilt_rate: 2.0,
            road_bounds: RoadBounds::default(),
            size: BoundingSize::new(1.2, 1.0, 2.0),
            start_speed: 0.0,
            start_position: Vec3::ZERO,
        }
    }
}

impl PlayerConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("player.max_speed", self.max_speed)?;
        require_non_negative("player.acceleration", self.acceleration)?;
        require_non_negative("player.deceleration", self.deceleration)?;
        require_non_negative("player.brake_deceleration", self.brake_deceleration)?;
        require_non_negative("player.friction", self.friction)?;
        require_non_negative("player.lateral_speed", self.lateral_speed)?;
        require_non_negative("player.max_tilt", self.max_tilt)?;
        require_non_negative("player.tilt_rate", self.tilt_rate)?;
        if !(self.road_bounds.min.is_finite()
            && self.road_bounds.max.is_finite()
            && self.road_bounds.min <= self.road_bounds.max)
        {
            return Err(ConfigError::invalid(
                "player.road_bounds",
                format!(
                    "min ({}) must not exceed max ({})",
                    self.road_bounds.min, self.road_bounds.max
                ),
            ));
        }
        if !self.size.is_valid() {
            return Err(ConfigError::invalid("player.size", "extents must be positive"));
        }
        if !(0.0..=self.max_speed).contains(&self.start_speed) {
            return Err(ConfigError::invalid(
                "player.start_speed",
                format!("must be within [0, {}]", self.max_speed),
            ));
        }
        if !self.road_bounds.contains(self.start_position.x) {
            return Err(ConfigError::invalid(
                "player.start_position",
                "x must lie within road bounds",
            ));
        }
        Ok(())
    }
}

/// The player's vehicle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAgent {
    /// Position (X lateral, Z longitudinal)
    pub position: Vec3,
    /// Forward speed, never negative
    pub speed: f32,
    /// Current bank angle
    pub tilt: f32,
    /// Lateral clamp
    pub road_bounds: RoadBounds,
    /// Collision box
    pub size: BoundingSize,
}

impl PlayerAgent {
    /// Creates a player at the configured start.
    #[must_use]
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            position: config.start_position,
            speed: config.start_speed,
            tilt: 0.0,
            road_bounds: config.road_bounds,
            size: config.size,
        }
    }

    /// Returns the player to the configured start.
    pub fn reset(&mut self, config: &PlayerConfig) {
        *self = Self::new(config);
    }

    /// Read-only view for the camera and renderer.
    #[must_use]
    pub fn view(&self) -> PlayerView {
        PlayerView {
            speed: self.speed,
            position: self.position,
            tilt: self.tilt,
        }
    }
}

/// Player output for each frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Forward speed
    pub speed: f32,
    /// Position
    pub position: Vec3,
    /// Bank angle
    pub tilt: f32,
}

/// Drives the player agent from per-frame controls.
#[derive(Debug, Clone)]
pub struct PlayerVehicleController {
    config: PlayerConfig,
    agent: PlayerAgent,
}

impl PlayerVehicleController {
    /// Creates a controller with the player at its start pose.
    pub fn new(config: PlayerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let agent = PlayerAgent::new(&config);
        Ok(Self { config, agent })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Returns the player agent.
    #[must_use]
    pub const fn agent(&self) -> &PlayerAgent {
        &self.agent
    }

    /// Advances the player by `dt` seconds.
    ///
    /// When left and right are both held, both lateral moves apply and the
    /// right-bank tilt target wins because right is evaluated last.
    pub fn step(&mut self, dt: f32, controls: &Controls) -> PlayerView {
        let config = &self.config;
        let agent = &mut self.agent;

        if controls.forward {
            agent.speed = (agent.speed + config.acceleration * dt).min(config.max_speed);
        } else if controls.is_slowing() {
            let rate = if controls.brake {
                config.brake_deceleration
            } else {
                config.deceleration
            };
            agent.speed = (agent.speed - rate * dt).max(0.0);
        } else {
            agent.speed = (agent.speed - config.friction * dt).max(0.0);
        }

        agent.position.z -= agent.speed * dt;

        let mut tilt_target = 0.0;
        if controls.left {
            agent.position.x = (agent.position.x - config.lateral_speed * dt).max(agent.road_bounds.min);
            tilt_target = config.max_tilt;
        }
        if controls.right {
            agent.position.x = (agent.position.x + config.lateral_speed * dt).min(agent.road_bounds.max);
            tilt_target = -config.max_tilt;
        }

        let max_step = config.tilt_rate * dt;
        let remaining = tilt_target - agent.tilt;
        if remaining.abs() <= max_step {
            agent.tilt = tilt_target;
        } else {
            agent.tilt += max_step.copysign(remaining);
        }

        agent.view()
    }

    /// Caps the player's speed at `limit`.
    pub fn cap_speed(&mut self, limit: f32) {
        self.agent.speed = self.agent.speed.min(limit.max(0.0));
    }

    /// Brings the player to a dead stop.
    pub fn stop(&mut self) {
        self.agent.speed = 0.0;
    }

    /// Returns the player to the configured start.
    pub fn reset(&mut self) {
        self.agent.reset(&self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ControlKey;

    const DT: f32 = 1.0 / 60.0;

    fn controller() -> PlayerVehicleController {
        PlayerVehicleController::new(PlayerConfig::default()).expect("valid config")
    }

    #[test]
    fn test_acceleration_plateaus_at_max_speed() {
        let config = PlayerConfig {
            acceleration: 25.0,
            max_speed: 40.0,
            ..Default::default()
        };
        let mut player = PlayerVehicleController::new(config).expect("valid config");

        let mut view = player.agent().view();
        for _ in 0..120 {
            view = player.step(DT, &Controls::forward());
        }
        assert!((view.speed - 40.0).abs() < 1e-3);
        assert!(view.position.z < 0.0);

        // Analytic distance: 1.6 s ramp (32 units) then 0.4 s at 40 (16 units).
        assert!((view.position.z + 48.0).abs() < 1.5);

        let view = player.step(DT, &Controls::forward());
        assert_eq!(view.speed, 40.0);
    }

    #[test]
    fn test_friction_stops_player() {
        let config = PlayerConfig {
            start_speed: 10.0,
            ..Default::default()
        };
        let mut player = PlayerVehicleController::new(config).expect("valid config");
        for _ in 0..60 {
            player.step(DT, &Controls::NONE);
        }
        assert_eq!(player.agent().speed, 0.0);
    }

    #[test]
    fn test_brake_is_harder_than_backward() {
        let config = PlayerConfig {
            start_speed: 30.0,
            ..Default::default()
        };
        let mut soft = PlayerVehicleController::new(config.clone()).expect("valid config");
        let mut hard = PlayerVehicleController::new(config).expect("valid config");

        let backward = Controls::NONE.with(ControlKey::ArrowDown, true);
        let brake = Controls::NONE.with(ControlKey::Space, true);
        soft.step(0.1, &backward);
        hard.step(0.1, &brake);

        assert!((soft.agent().speed - 28.5).abs() < 1e-4);
        assert!((hard.agent().speed - 27.0).abs() < 1e-4);
    }

    #[test]
    fn test_steer_right_stops_at_bound() {
        let mut player = controller();
        let right = Controls::NONE.with(ControlKey::ArrowRight, true);
        for _ in 0..600 {
            player.step(DT, &right);
        }
        assert_eq!(player.agent().position.x, 6.0);
        player.step(DT, &right);
        assert_eq!(player.agent().position.x, 6.0);
    }

    #[test]
    fn test_tilt_banks_and_recovers_without_overshoot() {
        let mut player = controller();
        let left = Controls::NONE.with(ControlKey::ArrowLeft, true);

        player.step(0.05, &left);
        assert!((player.agent().tilt - 0.1).abs() < 1e-5);

        for _ in 0..10 {
            player.step(0.05, &left);
        }
        assert_eq!(player.agent().tilt, 0.3);

        for _ in 0..20 {
            player.step(0.05, &Controls::NONE);
        }
        assert_eq!(player.agent().tilt, 0.0);
    }

    #[test]
    fn test_left_and_right_right_wins_tilt() {
        let mut player = controller();
        let both = Controls::NONE
            .with(ControlKey::ArrowLeft, true)
            .with(ControlKey::ArrowRight, true);
        for _ in 0..30 {
            player.step(DT, &both);
        }
        assert!(player.agent().position.x.abs() < 1e-4);
        assert!(player.agent().tilt < 0.0);
    }

    #[test]
    fn test_cap_and_reset() {
        let config = PlayerConfig {
            start_speed: 30.0,
            ..Default::default()
        };
        let mut player = PlayerVehicleController::new(config).expect("valid config");
        player.cap_speed(5.0);
        assert_eq!(player.agent().speed, 5.0);
        player.step(1.0, &Controls::forward());
        player.reset();
        assert_eq!(player.agent().speed, 30.0);
        assert_eq!(player.agent().position, Vec3::ZERO);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let config = PlayerConfig {
            road_bounds: RoadBounds::new(3.0, -3.0),
            ..Default::default()
        };
        assert!(PlayerVehicleController::new(config).is_err());
    }
}

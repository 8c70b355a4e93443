//! Traffic vehicles and their per-tick driving behavior.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use throttle_common::{AgentId, BoundingSize, LaneTable, VehicleKind};
use tracing::{debug, trace};

use crate::config::TrafficConfig;

/// A vehicle model entry in the weighted selection table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleModel {
    /// Model file name
    pub name: String,
    /// Kind this model renders
    pub kind: VehicleKind,
    /// Relative selection weight among models of the same kind
    pub probability: f32,
    /// Whether the model may be selected
    pub enabled: bool,
}

impl VehicleModel {
    /// Creates an enabled model entry.
    #[must_use]
    pub fn new(name: &str, kind: VehicleKind, probability: f32) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            probability,
            enabled: true,
        }
    }
}

/// Weighted table of vehicle models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleModelTable {
    models: Vec<VehicleModel>,
}

impl Default for VehicleModelTable {
    fn default() -> Self {
        use VehicleKind::{Car, Truck};
        Self {
            models: vec![
                VehicleModel::new("truck1.glb", Truck, 0.7),
                VehicleModel::new("truck2.glb", Truck, 0.3),
                VehicleModel::new("bus1.glb", Truck, 0.1),
                VehicleModel::new("bus2.glb", Truck, 0.1),
                VehicleModel::new("car1_grey.glb", Car, 0.2),
                VehicleModel::new("car2_blue.glb", Car, 0.2),
                VehicleModel::new("car3_red.glb", Car, 0.2),
                VehicleModel::new("car4_white.glb", Car, 0.2),
                VehicleModel::new("police_car1.glb", Car, 0.1),
            ],
        }
    }
}

impl VehicleModelTable {
    /// Creates a table from explicit entries.
    #[must_use]
    pub fn new(models: Vec<VehicleModel>) -> Self {
        Self { models }
    }

    /// Returns all entries.
    #[must_use]
    pub fn models(&self) -> &[VehicleModel] {
        &self.models
    }

    /// Updates the weight and enabled flag of a model. Returns false for unknown names.
    pub fn set_weight(&mut self, name: &str, probability: f32, enabled: bool) -> bool {
        let Some(model) = self.models.iter_mut().find(|m| m.name == name) else {
            return false;
        };
        model.probability = probability.clamp(0.0, 1.0);
        model.enabled = enabled;
        debug!("Vehicle model {name}: probability={}, enabled={enabled}", model.probability);
        true
    }

    /// Picks a model of `kind` by weight. `None` means the placeholder is used.
    pub fn pick(&self, kind: VehicleKind, rng: &mut fastrand::Rng) -> Option<&VehicleModel> {
        let candidates = || {
            self.models
                .iter()
                .filter(move |m| m.kind == kind && m.enabled && m.probability > 0.0)
        };
        let total: f32 = candidates().map(|m| m.probability).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = rng.f32() * total;
        for model in candidates() {
            roll -= model.probability;
            if roll <= 0.0 {
                return Some(model);
            }
        }
        candidates().last()
    }
}

/// Positions and speeds of all agents at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshot {
    /// Agent ID
    pub id: AgentId,
    /// Lateral position
    pub x: f32,
    /// Longitudinal position
    pub z: f32,
    /// Speed
    pub speed: f32,
}

/// A simulated traffic vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficAgent {
    /// Stable ID
    pub id: AgentId,
    /// Car or truck
    pub kind: VehicleKind,
    /// Selected model, if any
    pub model: Option<String>,
    /// Position (X lane-relative, Y fixed, Z longitudinal)
    pub position: Vec3,
    /// Current speed
    pub speed: f32,
    /// Speed the agent recovers to when unobstructed
    pub original_speed: f32,
    /// Upper speed bound for the kind
    pub max_speed: f32,
    /// Current lane; stays the origin lane until a lane change completes
    pub lane: usize,
    /// Whether the agent is braking for a leader
    pub braking: bool,
    /// Seconds spent braking without interruption
    pub braking_time: f32,
    /// Whether a lane change is in progress
    pub changing_lane: bool,
    /// Destination of the lane change in progress
    pub target_lane: Option<usize>,
    /// Voluntary lane changes started so far
    pub lane_changes_made: u32,
    /// Collision box
    pub size: BoundingSize,
}

impl TrafficAgent {
    /// Returns this agent's snapshot.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            x: self.position.x,
            z: self.position.z,
            speed: self.speed,
        }
    }

    /// Advances this agent by `dt` seconds against a snapshot of every agent.
    pub fn step(
        &mut self,
        dt: f32,
        others: &[AgentSnapshot],
        lanes: &LaneTable,
        config: &TrafficConfig,
        rng: &mut fastrand::Rng,
    ) {
        self.lane = lanes.clamp_index(self.lane);

        match self.leader(others, config) {
            Some((distance, leader_speed))
                if distance < self.speed * config.following_time + config.following_margin =>
            {
                if distance < config.hard_brake_distance {
                    self.speed -= config.hard_brake_rate * dt;
                } else {
                    let target = self.original_speed.min(leader_speed * config.lagging_factor);
                    self.speed = approach(self.speed, target, config.soft_brake_rate * dt);
                }
                self.braking = true;
                self.braking_time += dt;
            },
            _ => {
                self.speed = approach(self.speed, self.original_speed, config.recovery_rate * dt);
                self.braking = false;
                self.braking_time = 0.0;
            },
        }
        self.speed = self.speed.clamp(0.0, self.max_speed);

        if !self.changing_lane && self.lane_changes_made < config.max_lane_changes {
            let wants_change = self.braking_time > config.max_braking_time
                || rng.f32() < config.lane_change_probability;
            if wants_change {
                self.try_begin_lane_change(others, lanes, config, rng);
            }
        }

        if self.changing_lane {
            self.integrate_lane_change(dt, lanes, config);
        }

        self.position.z -= self.speed * dt;
    }

    /// Nearest agent ahead in the same lane, as `(distance, speed)`.
    fn leader(&self, others: &[AgentSnapshot], config: &TrafficConfig) -> Option<(f32, f32)> {
        others
            .iter()
            .filter(|o| o.id != self.id)
            .filter(|o| o.z < self.position.z)
            .filter(|o| (o.x - self.position.x).abs() < config.lane_width_threshold)
            .map(|o| (self.position.z - o.z, o.speed))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn try_begin_lane_change(
        &mut self,
        others: &[AgentSnapshot],
        lanes: &LaneTable,
        config: &TrafficConfig,
        rng: &mut fastrand::Rng,
    ) {
        let candidates = lanes.adjacent(self.lane);
        if candidates.is_empty() {
            return;
        }
        let target = candidates[rng.usize(..candidates.len())];
        let target_x = lanes.x_clamped(target);
        let window = self.speed * config.lane_change_window_factor + config.lane_change_window_margin;

        let blocked = others.iter().any(|o| {
            o.id != self.id
                && (o.x - target_x).abs() < config.lane_width_threshold
                && (o.z - self.position.z).abs() < window
        });
        if blocked {
            trace!("Agent {} lane change to {target} blocked", self.id.raw());
            return;
        }

        self.changing_lane = true;
        self.target_lane = Some(target);
        self.lane_changes_made += 1;
        self.braking_time = 0.0;
        debug!("Agent {} changing lane {} -> {target}", self.id.raw(), self.lane);
    }

    fn integrate_lane_change(&mut self, dt: f32, lanes: &LaneTable, config: &TrafficConfig) {
        let Some(target) = self.target_lane else {
            self.changing_lane = false;
            return;
        };
        let target = lanes.clamp_index(target);
        let target_x = lanes.x_clamped(target);
        self.position.x = approach(self.position.x, target_x, config.lane_change_rate * dt);

        if (self.position.x - target_x).abs() < config.lane_snap_epsilon {
            self.position.x = target_x;
            self.lane = target;
            self.changing_lane = false;
            self.target_lane = None;
        }
    }
}

/// Moves `value` toward `target` by at most `max_step` without overshooting.
fn approach(value: f32, target: f32, max_step: f32) -> f32 {
    if (target - value).abs() <= max_step {
        target
    } else if target > value {
        value + max_step
    } else {
        value - max_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: u64, lane: usize, z: f32, speed: f32) -> TrafficAgent {
        let lanes = LaneTable::default();
        TrafficAgent {
            id: AgentId::from_raw(id),
            kind: VehicleKind::Car,
            model: None,
            position: Vec3::new(lanes.x_clamped(lane), 0.5, z),
            speed,
            original_speed: speed,
            max_speed: 10.0,
            lane,
            braking: false,
            braking_time: 0.0,
            changing_lane: false,
            target_lane: None,
            lane_changes_made: 0,
            size: VehicleKind::Car.placeholder_size(),
        }
    }

    fn quiet_config() -> TrafficConfig {
        TrafficConfig {
            lane_change_probability: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_hard_brake_when_too_close() {
        let lanes = LaneTable::default();
        let config = quiet_config();
        let mut rng = fastrand::Rng::with_seed(1);
        let leader = agent(1, 1, -102.0, 5.0);
        let mut trailing = agent(2, 1, -100.0, 10.0);
        let snapshot = [leader.snapshot(), trailing.snapshot()];

        trailing.step(0.1, &snapshot, &lanes, &config, &mut rng);
        assert!(trailing.speed < 10.0);
        assert!((trailing.speed - 9.2).abs() < 1e-4);
        assert!(trailing.braking);
    }

    #[test]
    fn test_soft_brake_converges_toward_lagging_leader() {
        let lanes = LaneTable::default();
        let config = TrafficConfig {
            max_lane_changes: 0,
            ..quiet_config()
        };
        let mut rng = fastrand::Rng::with_seed(1);
        let leader = agent(1, 1, -108.0, 5.0);
        let mut trailing = agent(2, 1, -100.0, 10.0);

        for _ in 0..100 {
            let snapshot = [leader.snapshot(), trailing.snapshot()];
            trailing.step(0.05, &snapshot, &lanes, &config, &mut rng);
            // Keep the gap fixed so the agent stays in the soft branch.
            trailing.position.z = -100.0;
        }
        assert!((trailing.speed - 4.5).abs() < 1e-3);
        assert!(trailing.braking_time > 4.0);
    }

    #[test]
    fn test_free_flow_recovers_original_speed() {
        let lanes = LaneTable::default();
        let config = quiet_config();
        let mut rng = fastrand::Rng::with_seed(1);
        let mut car = agent(1, 0, -50.0, 8.0);
        car.speed = 2.0;
        let neighbor = agent(2, 2, -52.0, 3.0);

        for _ in 0..40 {
            let snapshot = [car.snapshot(), neighbor.snapshot()];
            car.step(0.1, &snapshot, &lanes, &config, &mut rng);
        }
        assert_eq!(car.speed, 8.0);
        assert!(!car.braking);
    }

    #[test]
    fn test_leader_behind_is_ignored() {
        let lanes = LaneTable::default();
        let config = quiet_config();
        let mut rng = fastrand::Rng::with_seed(1);
        let behind = agent(1, 1, -99.0, 1.0);
        let mut car = agent(2, 1, -100.0, 10.0);
        let snapshot = [behind.snapshot(), car.snapshot()];
        car.step(0.1, &snapshot, &lanes, &config, &mut rng);
        assert_eq!(car.speed, 10.0);
    }

    #[test]
    fn test_long_braking_triggers_lane_change() {
        let lanes = LaneTable::default();
        let config = quiet_config();
        let mut rng = fastrand::Rng::with_seed(3);
        let leader = agent(1, 1, -105.0, 2.0);
        let mut car = agent(2, 1, -100.0, 10.0);

        let mut started = false;
        for _ in 0..60 {
            let snapshot = [leader.snapshot(), car.snapshot()];
            car.step(0.05, &snapshot, &lanes, &config, &mut rng);
            car.position.z = -100.0;
            if car.changing_lane {
                started = true;
                break;
            }
        }
        assert!(started);
        assert_eq!(car.lane, 1);
        assert_eq!(car.lane_changes_made, 1);
        assert!(matches!(car.target_lane, Some(0 | 2)));
    }

    #[test]
    fn test_lane_change_blocked_by_occupied_lanes() {
        let lanes = LaneTable::default();
        let config = TrafficConfig {
            lane_change_probability: 1.0,
            ..Default::default()
        };
        let mut rng = fastrand::Rng::with_seed(5);
        let left = agent(1, 0, -101.0, 6.0);
        let right = agent(2, 2, -99.0, 6.0);
        let mut car = agent(3, 1, -100.0, 6.0);
        let snapshot = [left.snapshot(), right.snapshot(), car.snapshot()];

        car.step(0.1, &snapshot, &lanes, &config, &mut rng);
        assert!(!car.changing_lane);
        assert_eq!(car.lane_changes_made, 0);
    }

    #[test]
    fn test_lane_change_completes_and_snaps() {
        let lanes = LaneTable::default();
        let config = quiet_config();
        let mut rng = fastrand::Rng::with_seed(1);
        let mut car = agent(1, 1, -100.0, 6.0);
        car.changing_lane = true;
        car.target_lane = Some(2);
        car.lane_changes_made = 1;

        for _ in 0..25 {
            let snapshot = [car.snapshot()];
            car.step(0.1, &snapshot, &lanes, &config, &mut rng);
            if car.changing_lane {
                assert_eq!(car.lane, 1);
            }
        }
        assert!(!car.changing_lane);
        assert_eq!(car.lane, 2);
        assert_eq!(car.position.x, 4.0);
        assert_eq!(car.target_lane, None);
    }

    #[test]
    fn test_lane_change_limit() {
        let lanes = LaneTable::default();
        let config = TrafficConfig {
            lane_change_probability: 1.0,
            ..Default::default()
        };
        let mut rng = fastrand::Rng::with_seed(9);
        let mut car = agent(1, 1, -100.0, 6.0);
        car.lane_changes_made = 1;
        let snapshot = [car.snapshot()];
        car.step(0.1, &snapshot, &lanes, &config, &mut rng);
        assert!(!car.changing_lane);
    }

    #[test]
    fn test_model_table_pick_by_kind() {
        let table = VehicleModelTable::default();
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..50 {
            let model = table.pick(VehicleKind::Truck, &mut rng).expect("truck models exist");
            assert_eq!(model.kind, VehicleKind::Truck);
        }
    }

    #[test]
    fn test_model_table_disabled_kind_uses_placeholder() {
        let mut table = VehicleModelTable::default();
        for name in ["car1_grey.glb", "car2_blue.glb", "car3_red.glb", "car4_white.glb", "police_car1.glb"] {
            assert!(table.set_weight(name, 0.2, false));
        }
        let mut rng = fastrand::Rng::with_seed(11);
        assert!(table.pick(VehicleKind::Car, &mut rng).is_none());
        assert!(!table.set_weight("spaceship.glb", 1.0, true));
    }
}

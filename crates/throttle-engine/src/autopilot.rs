//! Scripted driver used when no input device is attached.
//!
//! Holds forward, steers toward the neighbouring lane with the longest clear
//! gap ahead and brakes when its own lane closes up.

use serde::{Deserialize, Serialize};
use throttle_common::{is_behind, LaneTable};
use throttle_gameplay::{Controls, PlayerView, TrafficAgent};

/// Autopilot tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Drive with the autopilot; when false the host only holds forward
    pub enabled: bool,
    /// How far ahead lanes are scanned
    pub lookahead: f32,
    /// Brake when the gap in the current lane is shorter than this
    pub brake_gap: f32,
    /// A lane must beat the current one by this much to be worth a change
    pub switch_margin: f32,
    /// Lateral error tolerated before steering
    pub steer_deadband: f32,
    /// Agents within this lateral distance of a lane center occupy it
    pub lane_half_width: f32,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookahead: 120.0,
            brake_gap: 25.0,
            switch_margin: 10.0,
            steer_deadband: 0.15,
            lane_half_width: 2.0,
        }
    }
}

impl AutopilotConfig {
    /// Clamps values to usable ranges.
    pub fn validate(&mut self) {
        self.lookahead = self.lookahead.clamp(10.0, 1000.0);
        self.brake_gap = self.brake_gap.clamp(0.0, self.lookahead);
        self.switch_margin = self.switch_margin.max(0.0);
        self.steer_deadband = self.steer_deadband.clamp(0.01, 2.0);
        self.lane_half_width = self.lane_half_width.clamp(0.1, 10.0);
    }
}

/// Lane-picking driver.
#[derive(Debug, Clone)]
pub struct Autopilot {
    config: AutopilotConfig,
    target_lane: Option<usize>,
}

impl Autopilot {
    /// Creates an autopilot.
    #[must_use]
    pub fn new(config: AutopilotConfig) -> Self {
        Self {
            config,
            target_lane: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    /// Lane currently steered toward.
    #[must_use]
    pub const fn target_lane(&self) -> Option<usize> {
        self.target_lane
    }

    /// Forgets the current target, e.g. after a restart.
    pub fn reset(&mut self) {
        self.target_lane = None;
    }

    /// Clear distance ahead of `z` in `lane`, capped at the lookahead.
    #[must_use]
    pub fn gap_ahead(&self, lane_x: f32, z: f32, agents: &[TrafficAgent]) -> f32 {
        agents
            .iter()
            .filter(|agent| (agent.position.x - lane_x).abs() < self.config.lane_half_width)
            .filter(|agent| !is_behind(agent.position.z, z, 0.0))
            .map(|agent| z - agent.position.z - agent.size.half_length())
            .fold(self.config.lookahead, f32::min)
            .max(0.0)
    }

    /// Chooses this frame's controls.
    pub fn controls(
        &mut self,
        player: &PlayerView,
        agents: &[TrafficAgent],
        lanes: &LaneTable,
    ) -> Controls {
        if !self.config.enabled {
            return Controls::forward();
        }

        let z = player.position.z;
        let current = lanes.nearest(player.position.x);
        let current_gap = self.gap_ahead(lanes.x_clamped(current), z, agents);

        let target = match self.target_lane {
            // Finish a change already under way.
            Some(lane)
                if (lanes.x_clamped(lane) - player.position.x).abs()
                    > self.config.steer_deadband =>
            {
                lane
            },
            _ => {
                let mut best = (current, current_gap);
                for lane in lanes.adjacent(current) {
                    let gap = self.gap_ahead(lanes.x_clamped(lane), z, agents);
                    if gap > best.1 + self.config.switch_margin {
                        best = (lane, gap);
                    }
                }
                best.0
            },
        };
        self.target_lane = Some(target);

        let mut controls = Controls::NONE;
        if current_gap < self.config.brake_gap {
            controls.brake = true;
        } else {
            controls.forward = true;
        }

        let error = lanes.x_clamped(target) - player.position.x;
        if error > self.config.steer_deadband {
            controls.right = true;
        } else if error < -self.config.steer_deadband {
            controls.left = true;
        }
        controls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use throttle_common::{AgentId, BoundingSize, VehicleKind};

    fn agent(x: f32, z: f32) -> TrafficAgent {
        TrafficAgent {
            id: AgentId::from_raw(1),
            kind: VehicleKind::Car,
            model: None,
            position: Vec3::new(x, 0.5, z),
            speed: 5.0,
            original_speed: 5.0,
            max_speed: 10.0,
            lane: 1,
            braking: false,
            braking_time: 0.0,
            changing_lane: false,
            target_lane: None,
            lane_changes_made: 0,
            size: BoundingSize::new(1.8, 1.5, 4.0),
        }
    }

    fn view(x: f32) -> PlayerView {
        PlayerView {
            speed: 20.0,
            position: Vec3::new(x, 0.0, 0.0),
            tilt: 0.0,
        }
    }

    #[test]
    fn test_open_road_holds_forward() {
        let mut pilot = Autopilot::new(AutopilotConfig::default());
        let controls = pilot.controls(&view(0.0), &[], &LaneTable::default());
        assert!(controls.forward);
        assert!(!controls.left && !controls.right && !controls.brake);
        assert_eq!(pilot.target_lane(), Some(1));
    }

    #[test]
    fn test_steers_around_blocked_lane() {
        let mut pilot = Autopilot::new(AutopilotConfig::default());
        let agents = [agent(0.0, -40.0), agent(-4.0, -60.0)];
        let controls = pilot.controls(&view(0.0), &agents, &LaneTable::default());
        assert!(controls.right);
        assert_eq!(pilot.target_lane(), Some(2));
    }

    #[test]
    fn test_brakes_when_close() {
        let mut pilot = Autopilot::new(AutopilotConfig::default());
        let agents = [agent(0.0, -10.0), agent(-4.0, -10.0), agent(4.0, -10.0)];
        let controls = pilot.controls(&view(0.0), &agents, &LaneTable::default());
        assert!(controls.brake);
        assert!(!controls.forward);
    }

    #[test]
    fn test_agents_behind_are_ignored() {
        let pilot = Autopilot::new(AutopilotConfig::default());
        let gap = pilot.gap_ahead(0.0, 0.0, &[agent(0.0, 30.0)]);
        assert_eq!(gap, pilot.config().lookahead);
    }

    #[test]
    fn test_disabled_autopilot_only_accelerates() {
        let mut pilot = Autopilot::new(AutopilotConfig {
            enabled: false,
            ..Default::default()
        });
        let agents = [agent(0.0, -5.0)];
        assert_eq!(
            pilot.controls(&view(0.0), &agents, &LaneTable::default()),
            Controls::forward()
        );
    }
}

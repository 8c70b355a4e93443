//! Player versus traffic collision detection.
//!
//! Bodies are compared as axis-aligned boxes on the road plane; rotation is not
//! taken into account.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use throttle_common::{require_non_negative, AgentId, BoundingSize, ConfigError, VehicleKind};

use crate::vehicle::TrafficAgent;

/// Collision outcome settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Player speeds strictly above this crash the game
    pub major_speed_threshold: f32,
    /// Speed the player is capped at after a minor collision
    pub minor_speed_cap: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            major_speed_threshold: 20.0,
            minor_speed_cap: 5.0,
        }
    }
}

impl CollisionConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_negative("collision.major_speed_threshold", self.major_speed_threshold)?;
        require_non_negative("collision.minor_speed_cap", self.minor_speed_cap)?;
        Ok(())
    }
}

/// How bad a collision was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionSeverity {
    /// Speed penalty only
    Minor,
    /// Crash
    Major,
}

impl CollisionSeverity {
    /// Classifies a collision by the player's speed at impact.
    #[must_use]
    pub fn classify(player_speed: f32, major_threshold: f32) -> Self {
        if player_speed > major_threshold {
            Self::Major
        } else {
            Self::Minor
        }
    }
}

/// An overlap between the player and one agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionHit {
    /// Agent hit
    pub agent: AgentId,
    /// Kind of the agent hit
    pub kind: VehicleKind,
    /// Absolute lateral distance between centers
    pub dx: f32,
    /// Absolute longitudinal distance between centers
    pub dz: f32,
}

/// Detects player/traffic overlaps and reports each contact once.
#[derive(Debug, Clone, Default)]
pub struct CollisionResolver {
    /// Agents overlapping the player on the previous check
    in_contact: Vec<AgentId>,
}

impl CollisionResolver {
    /// Creates a resolver with no contacts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the overlapping agent nearest the player along Z, if any.
    ///
    /// Pure query; call it after both the player and traffic moved this frame.
    #[must_use]
    pub fn check(
        player_pos: Vec3,
        player_size: BoundingSize,
        agents: &[TrafficAgent],
    ) -> Option<CollisionHit> {
        overlaps(player_pos, player_size, agents).min_by(|a, b| a.dz.total_cmp(&b.dz))
    }

    /// Like [`Self::check`], but only reports agents that were not already in
    /// contact on the previous call.
    pub fn detect(
        &mut self,
        player_pos: Vec3,
        player_size: BoundingSize,
        agents: &[TrafficAgent],
    ) -> Option<CollisionHit> {
        let hits: Vec<CollisionHit> = overlaps(player_pos, player_size, agents).collect();
        let fresh = hits
            .iter()
            .filter(|hit| !self.in_contact.contains(&hit.agent))
            .min_by(|a, b| a.dz.total_cmp(&b.dz))
            .copied();
        self.in_contact = hits.iter().map(|hit| hit.agent).collect();
        fresh
    }

    /// Agents currently in contact with the player.
    #[must_use]
    pub fn contacts(&self) -> &[AgentId] {
        &self.in_contact
    }

    /// Forgets all contacts.
    pub fn reset(&mut self) {
        self.in_contact.clear();
    }
}

fn overlaps<'a>(
    player_pos: Vec3,
    player_size: BoundingSize,
    agents: &'a [TrafficAgent],
) -> impl Iterator<Item = CollisionHit> + 'a {
    agents.iter().filter_map(move |agent| {
        let dx = (player_pos.x - agent.position.x).abs();
        let dz = (player_pos.z - agent.position.z).abs();
        let touching = dx < player_size.half_width() + agent.size.half_width()
            && dz < player_size.half_length() + agent.size.half_length();
        touching.then_some(CollisionHit {
            agent: agent.id,
            kind: agent.kind,
            dx,
            dz,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: u64, x: f32, z: f32) -> TrafficAgent {
        TrafficAgent {
            id: AgentId::from_raw(id),
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

    fn player_size() -> BoundingSize {
        BoundingSize::new(1.2, 1.0, 2.0)
    }

    #[test]
    fn test_full_overlap_collides() {
        let agents = [agent(1, 0.0, 0.0)];
        let hit = CollisionResolver::check(Vec3::ZERO, player_size(), &agents).expect("overlap");
        assert_eq!(hit.agent, AgentId::from_raw(1));
    }

    #[test]
    fn test_separated_boxes_do_not_collide() {
        // Half widths 0.6 + 0.9 = 1.5; half lengths 1 + 2 = 3.
        let agents = [agent(1, 1.55, 0.0), agent(2, 0.0, -3.05)];
        assert!(CollisionResolver::check(Vec3::ZERO, player_size(), &agents).is_none());

        let agents = [agent(1, 1.49, 0.0)];
        assert!(CollisionResolver::check(Vec3::ZERO, player_size(), &agents).is_some());
    }

    #[test]
    fn test_adjacent_lane_is_clear() {
        let agents = [agent(1, 4.0, 0.0)];
        assert!(CollisionResolver::check(Vec3::ZERO, player_size(), &agents).is_none());
    }

    #[test]
    fn test_nearest_hit_wins() {
        let agents = [agent(1, 0.0, -2.5), agent(2, 0.0, 1.0)];
        let hit = CollisionResolver::check(Vec3::ZERO, player_size(), &agents).expect("overlap");
        assert_eq!(hit.agent, AgentId::from_raw(2));
    }

    #[test]
    fn test_detect_is_edge_triggered() {
        let mut resolver = CollisionResolver::new();
        let agents = [agent(1, 0.0, -1.0)];

        assert!(resolver.detect(Vec3::ZERO, player_size(), &agents).is_some());
        assert!(resolver.detect(Vec3::ZERO, player_size(), &agents).is_none());
        assert_eq!(resolver.contacts(), &[AgentId::from_raw(1)]);

        // Separate, then touch again.
        assert!(resolver.detect(Vec3::new(0.0, 0.0, 20.0), player_size(), &agents).is_none());
        assert!(resolver.detect(Vec3::ZERO, player_size(), &agents).is_some());
    }

    #[test]
    fn test_severity_threshold_is_strict() {
        assert_eq!(CollisionSeverity::classify(20.0, 20.0), CollisionSeverity::Minor);
        assert_eq!(CollisionSeverity::classify(20.1, 20.0), CollisionSeverity::Major);
        assert_eq!(CollisionSeverity::classify(0.0, 20.0), CollisionSeverity::Minor);
    }
}

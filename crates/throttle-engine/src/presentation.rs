//! Presentation mirror of the simulation.
//!
//! Copies what a renderer would draw out of [`GameState`] each frame. Debug
//! toggles live here only; the simulation itself never checks them.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use throttle_common::{AgentId, BoundingSize, VehicleKind};
use throttle_gameplay::{GameState, PlayerView, RunState};

/// Debug drawing toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOptions {
    /// Draw collision boxes around vehicles
    pub show_bounding_boxes: bool,
    /// Draw lane center lines
    pub show_lane_guides: bool,
    /// Light up brake lights on braking traffic
    pub show_brake_lights: bool,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            show_bounding_boxes: false,
            show_lane_guides: false,
            show_brake_lights: true,
        }
    }
}

/// One traffic vehicle as drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSprite {
    /// Agent ID
    pub id: AgentId,
    /// Vehicle kind
    pub kind: VehicleKind,
    /// Model name, if any
    pub model: Option<String>,
    /// Position
    pub position: Vec3,
    /// Brake lights lit
    pub brake_lights: bool,
    /// Collision box, when box drawing is on
    pub bounding_box: Option<BoundingSize>,
}

/// Render-side copy of the game state.
#[derive(Debug, Clone, Default)]
pub struct SceneMirror {
    options: DebugOptions,
    state: RunState,
    player: Option<PlayerView>,
    player_box: Option<BoundingSize>,
    vehicles: Vec<VehicleSprite>,
    lane_guides: Vec<f32>,
    road_chunks: Vec<f32>,
    streetlights: usize,
    trees: usize,
    distance: f32,
    syncs: u64,
}

impl SceneMirror {
    /// Creates an empty mirror.
    #[must_use]
    pub fn new(options: DebugOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Current debug toggles.
    #[must_use]
    pub const fn options(&self) -> &DebugOptions {
        &self.options
    }

    /// Replaces the debug toggles; applied on the next sync.
    pub fn set_options(&mut self, options: DebugOptions) {
        self.options = options;
    }

    /// Flips bounding box drawing.
    pub fn toggle_bounding_boxes(&mut self) {
        self.options.show_bounding_boxes = !self.options.show_bounding_boxes;
    }

    /// Flips lane guide drawing.
    pub fn toggle_lane_guides(&mut self) {
        self.options.show_lane_guides = !self.options.show_lane_guides;
    }

    /// Copies the drawable state out of `game`.
    pub fn sync(&mut self, game: &GameState) {
        let boxes = self.options.show_bounding_boxes;
        let brake_lights = self.options.show_brake_lights;

        self.state = game.state();
        self.player = Some(game.player_view());
        self.player_box = boxes.then(|| game.player().size);
        self.distance = game.distance_traveled();

        self.vehicles.clear();
        self.vehicles.extend(game.agents().iter().map(|agent| VehicleSprite {
            id: agent.id,
            kind: agent.kind,
            model: agent.model.clone(),
            position: agent.position,
            brake_lights: brake_lights && agent.braking,
            bounding_box: boxes.then_some(agent.size),
        }));

        self.lane_guides.clear();
        if self.options.show_lane_guides {
            self.lane_guides.extend_from_slice(game.lanes().centers());
        }

        let road = game.world().road();
        self.road_chunks = road.positions();
        self.streetlights = road.chunks().map(|chunk| chunk.segment().streetlights.len()).sum();
        self.trees = game.world().decorations().trees().len();
        self.syncs += 1;
    }

    /// Run state at the last sync.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Player pose at the last sync.
    #[must_use]
    pub const fn player(&self) -> Option<&PlayerView> {
        self.player.as_ref()
    }

    /// Player collision box, when box drawing is on.
    #[must_use]
    pub const fn player_box(&self) -> Option<BoundingSize> {
        self.player_box
    }

    /// Traffic as drawn.
    #[must_use]
    pub fn vehicles(&self) -> &[VehicleSprite] {
        &self.vehicles
    }

    /// Lane center lines, when guide drawing is on.
    #[must_use]
    pub fn lane_guides(&self) -> &[f32] {
        &self.lane_guides
    }

    /// Positions of the visible road chunks.
    #[must_use]
    pub fn road_chunks(&self) -> &[f32] {
        &self.road_chunks
    }

    /// Streetlights standing on visible road.
    #[must_use]
    pub const fn streetlights(&self) -> usize {
        self.streetlights
    }

    /// Live trees.
    #[must_use]
    pub const fn trees(&self) -> usize {
        self.trees
    }

    /// Number of syncs so far.
    #[must_use]
    pub const fn syncs(&self) -> u64 {
        self.syncs
    }

    /// One-line heads-up display text.
    #[must_use]
    pub fn hud_line(&self) -> String {
        let speed = self.player.map_or(0.0, |player| player.speed);
        let braking = self.vehicles.iter().filter(|v| v.brake_lights).count();
        format!(
            "{:?} | speed {speed:5.1} | distance {:7.1} | traffic {} ({braking} braking) | trees {}",
            self.state,
            self.distance,
            self.vehicles.len(),
            self.trees,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use throttle_gameplay::{Controls, SimulationConfig};

    fn game() -> GameState {
        let mut game = GameState::new(SimulationConfig::default()).expect("valid config");
        for _ in 0..30 {
            game.update(1.0 / 60.0, &Controls::forward());
        }
        game
    }

    #[test]
    fn test_sync_copies_state() {
        let game = game();
        let mut mirror = SceneMirror::new(DebugOptions::default());
        mirror.sync(&game);

        assert_eq!(mirror.state(), RunState::Running);
        assert_eq!(mirror.vehicles().len(), game.agents().len());
        assert_eq!(mirror.road_chunks().len(), game.world().road().len());
        assert!(mirror.streetlights() > 0);
        assert!(mirror.trees() > 0);
        assert_eq!(mirror.syncs(), 1);
    }

    #[test]
    fn test_debug_toggles_only_affect_mirror() {
        let game = game();
        let mut mirror = SceneMirror::new(DebugOptions::default());
        mirror.sync(&game);
        assert!(mirror.lane_guides().is_empty());
        assert!(mirror.player_box().is_none());
        assert!(mirror.vehicles().iter().all(|v| v.bounding_box.is_none()));

        mirror.toggle_bounding_boxes();
        mirror.toggle_lane_guides();
        mirror.sync(&game);
        assert_eq!(mirror.lane_guides(), game.lanes().centers());
        assert_eq!(mirror.player_box(), Some(game.player().size));
        assert!(mirror.vehicles().iter().all(|v| v.bounding_box.is_some()));
    }

    #[test]
    fn test_hud_line() {
        let mut mirror = SceneMirror::new(DebugOptions::default());
        mirror.sync(&game());
        let hud = mirror.hud_line();
        assert!(hud.starts_with("Running"));
        assert!(hud.contains("distance"));
    }
}

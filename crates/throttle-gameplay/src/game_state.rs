//! Central game loop.
//!
//! [`GameState`] is the single source of truth for a run. Each frame it steps
//! the player, streams the world around the new pose, advances traffic and only
//! then checks for collisions, so every check sees this frame's positions.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use throttle_common::{
    AgentId, ConfigError, ContentResolver, LaneTable, PlaceholderContent, VisualHandle,
    VisualState,
};
use throttle_world::World;
use tracing::{debug, info, warn};

use crate::collision::{CollisionHit, CollisionResolver, CollisionSeverity};
use crate::config::SimulationConfig;
use crate::events::{EventBus, GameEvent};
use crate::input::Controls;
use crate::player::{PlayerAgent, PlayerVehicleController, PlayerView};
use crate::traffic::{TrafficSimulator, TrafficStats};
use crate::vehicle::TrafficAgent;

/// Run state of the game loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Simulation advances every frame
    #[default]
    Running,
    /// A major collision ended the run; waiting for restart
    Crashed,
    /// Frames are ignored until resumed
    Paused,
}

/// A collision together with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionReport {
    /// The overlap
    pub hit: CollisionHit,
    /// Severity at impact
    pub severity: CollisionSeverity,
}

/// Summary of one [`GameState::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Frame delta actually simulated
    pub dt: f32,
    /// Run state after the frame
    pub state: RunState,
    /// Player pose after the frame
    pub player: PlayerView,
    /// Road and land chunks created this frame
    pub chunks_created: usize,
    /// Trees placed this frame
    pub trees_placed: usize,
    /// Whether a vehicle spawned this frame
    pub spawned: bool,
    /// Vehicles retired this frame
    pub despawned: usize,
    /// Collision reported this frame
    pub collision: Option<CollisionReport>,
    /// Distance traveled so far
    pub distance: f32,
}

/// Serializable summary of the game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    /// Run state
    pub state: RunState,
    /// Simulated seconds since the last restart
    pub game_time: f64,
    /// Frames simulated since the last restart
    pub frame: u64,
    /// Player pose
    pub player: PlayerView,
    /// Distance traveled
    pub distance: f32,
    /// Live traffic agents
    pub agents: usize,
    /// Traffic counters
    pub traffic: TrafficStats,
    /// Active road chunks
    pub road_chunks: usize,
    /// Active land chunks
    pub land_chunks: usize,
    /// Live trees
    pub trees: usize,
    /// Collisions since the last restart
    pub collisions: u32,
}

/// Seed salt for the world random stream.
const WORLD_SALT: u64 = 0x0000_0000_00ec_0de5;

/// Central game state: player, world, traffic and the rules that join them.
pub struct GameState {
    /// Configuration
    config: SimulationConfig,
    /// Player controller
    player: PlayerVehicleController,
    /// Road, land and scenery
    world: World,
    /// Traffic population
    traffic: TrafficSimulator,
    /// Edge-triggered collision detection
    collisions: CollisionResolver,
    /// Sizes and visuals for vehicle kinds
    content: Arc<dyn ContentResolver>,
    /// Visuals requested but not yet resolved
    pending_visuals: Vec<VisualHandle>,
    /// Outgoing events
    events: EventBus,
    /// Run state
    state: RunState,
    /// Simulated seconds since the last restart
    game_time: f64,
    /// Frames simulated since the last restart
    frame: u64,
    /// Distance at which the next milestone fires
    next_milestone: f32,
    /// Collisions since the last restart
    collision_count: u32,
    /// Events dropped because the queue was full
    dropped_events: u64,
}

impl fmt::Debug for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameState")
            .field("state", &self.state)
            .field("frame", &self.frame)
            .field("player", self.player.agent())
            .field("agents", &self.traffic.len())
            .field("distance", &self.world.distance_traveled())
            .finish_non_exhaustive()
    }
}

impl GameState {
    /// Creates a game that only ever uses placeholder content.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        Self::with_content(config, Arc::new(PlaceholderContent))
    }

    /// Creates a game with an explicit content resolver.
    pub fn with_content(
        config: SimulationConfig,
        content: Arc<dyn ContentResolver>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let lanes = Arc::new(config.lanes.clone());
        let player = PlayerVehicleController::new(config.player.clone())?;
        let world = World::new(config.world.clone(), config.seed ^ WORLD_SALT)?;
        let traffic = TrafficSimulator::new(config.traffic.clone(), lanes, config.seed)?;
        let events = EventBus::new(config.game.event_capacity);
        let next_milestone = config.game.milestone_interval;

        info!(
            "Game created: seed={}, {} lanes, {} road chunks",
            config.seed,
            config.lanes.len(),
            world.road().len()
        );

        Ok(Self {
            config,
            player,
            world,
            traffic,
            collisions: CollisionResolver::new(),
            content,
            pending_visuals: Vec::new(),
            events,
            state: RunState::Running,
            game_time: 0.0,
            frame: 0,
            next_milestone,
            collision_count: 0,
            dropped_events: 0,
        })
    }

    /// Advances the game by one frame.
    pub fn update(&mut self, dt: f32, controls: &Controls) -> FrameReport {
        let mut report = FrameReport {
            dt: 0.0,
            state: self.state,
            player: self.player.agent().view(),
            chunks_created: 0,
            trees_placed: 0,
            spawned: false,
            despawned: 0,
            collision: None,
            distance: self.world.distance_traveled(),
        };
        if self.state != RunState::Running {
            return report;
        }
        let dt = self.sanitize_dt(dt);

        self.poll_visuals();

        let view = self.player.step(dt, controls);

        let world = self.world.advance(view.position.z);
        report.chunks_created = world.road.created.len() + world.land.created.len();
        report.trees_placed = world.trees_placed;

        let traffic = self.traffic.update(dt, view.position, self.content.as_ref());
        if let Some(id) = traffic.spawned {
            self.on_spawned(id);
            report.spawned = true;
        }
        for &agent in &traffic.despawned {
            self.publish(GameEvent::VehicleDespawned { agent });
        }
        report.despawned = traffic.despawned.len();

        report.collision = self.resolve_collision();

        self.game_time += f64::from(dt);
        self.frame += 1;
        self.emit_milestones();

        report.dt = dt;
        report.state = self.state;
        report.player = self.player.agent().view();
        report.distance = self.world.distance_traveled();
        report
    }

    /// Atomically returns player, traffic, world and run state to their initial configuration.
    pub fn restart(&mut self) {
        self.player.reset();
        self.traffic.reset();
        self.world.reset();
        self.collisions.reset();
        self.state = RunState::Running;
        self.game_time = 0.0;
        self.frame = 0;
        self.next_milestone = self.config.game.milestone_interval;
        self.collision_count = 0;
        self.publish(GameEvent::Restarted);
        info!("Game restarted");
    }

    /// Pauses or resumes. Has no effect after a crash.
    pub fn set_paused(&mut self, paused: bool) {
        self.state = match (self.state, paused) {
            (RunState::Running, true) => RunState::Paused,
            (RunState::Paused, false) => RunState::Running,
            (state, _) => state,
        };
    }

    /// Toggles the pause state.
    pub fn toggle_pause(&mut self) {
        self.set_paused(self.state == RunState::Running);
    }

    /// Current run state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Player agent.
    #[must_use]
    pub const fn player(&self) -> &PlayerAgent {
        self.player.agent()
    }

    /// Player pose for the camera and renderer.
    #[must_use]
    pub fn player_view(&self) -> PlayerView {
        self.player.agent().view()
    }

    /// Live traffic agents.
    #[must_use]
    pub fn agents(&self) -> &[TrafficAgent] {
        self.traffic.agents()
    }

    /// Distance traveled since the last restart.
    #[must_use]
    pub fn distance_traveled(&self) -> f32 {
        self.world.distance_traveled()
    }

    /// The world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The traffic simulator.
    #[must_use]
    pub const fn traffic(&self) -> &TrafficSimulator {
        &self.traffic
    }

    /// Mutable traffic access for hosts that script vehicles.
    pub fn traffic_mut(&mut self) -> &mut TrafficSimulator {
        &mut self.traffic
    }

    /// Lane table shared by traffic and the player.
    #[must_use]
    pub fn lanes(&self) -> &LaneTable {
        self.traffic.lanes()
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The content resolver in use.
    #[must_use]
    pub fn content(&self) -> &dyn ContentResolver {
        self.content.as_ref()
    }

    /// Updates a vehicle model's selection weight.
    pub fn set_vehicle_model_weight(&mut self, name: &str, probability: f32, enabled: bool) -> bool {
        self.traffic.set_model_weight(name, probability, enabled)
    }

    /// Updates a tree model's selection weight.
    pub fn set_tree_model_weight(&mut self, name: &str, probability: f32, enabled: bool) -> bool {
        self.world.decorations_mut().set_model_weight(name, probability, enabled)
    }

    /// Drains pending events.
    pub fn drain_events(&self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// The event queue.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Events dropped so far because the queue was full.
    #[must_use]
    pub const fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    /// Simulated seconds since the last restart.
    #[must_use]
    pub const fn game_time(&self) -> f64 {
        self.game_time
    }

    /// Serializable summary.
    #[must_use]
    pub fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            state: self.state,
            game_time: self.game_time,
            frame: self.frame,
            player: self.player.agent().view(),
            distance: self.world.distance_traveled(),
            agents: self.traffic.len(),
            traffic: self.traffic.stats(),
            road_chunks: self.world.road().len(),
            land_chunks: self.world.land().len(),
            trees: self.world.decorations().trees().len(),
            collisions: self.collision_count,
        }
    }

    fn publish(&mut self, event: GameEvent) {
        if !self.events.publish(event.clone()) {
            self.dropped_events += 1;
            debug!("Event queue full, dropped {event:?}");
        }
    }

    fn sanitize_dt(&self, dt: f32) -> f32 {
        if !dt.is_finite() || dt < 0.0 {
            warn!("Invalid frame delta {dt}, simulating 0");
            return 0.0;
        }
        let max = self.config.game.max_frame_dt;
        if dt > max {
            debug!("Frame delta {dt:.3}s capped at {max:.3}s");
            return max;
        }
        dt
    }

    fn on_spawned(&mut self, id: AgentId) {
        let Some(agent) = self.traffic.agent(id) else {
            return;
        };
        let kind = agent.kind;
        let model = agent.model.clone();
        self.pending_visuals
            .push(self.content.load_visual(kind, model.as_deref()));
        self.publish(GameEvent::VehicleSpawned {
            agent: id,
            kind,
            model,
        });
    }

    fn poll_visuals(&mut self) {
        let traffic = &mut self.traffic;
        self.pending_visuals.retain(|handle| match handle.state() {
            VisualState::Pending => true,
            VisualState::Ready(size) => {
                if let Some(model) = handle.model() {
                    traffic.refine_size(model, size);
                }
                false
            },
            VisualState::Failed => {
                debug!(
                    "Visual {} for {} failed, keeping placeholder",
                    handle.model().unwrap_or("<none>"),
                    handle.kind()
                );
                false
            },
        });
    }

    fn resolve_collision(&mut self) -> Option<CollisionReport> {
        let agent = self.player.agent();
        let (position, size, speed) = (agent.position, agent.size, agent.speed);
        let agents = self.traffic.agents();
        let fresh = self.collisions.detect(position, size, agents);
        let hit = fresh.or_else(|| CollisionResolver::check(position, size, agents))?;

        let severity =
            CollisionSeverity::classify(speed, self.config.collision.major_speed_threshold);
        if fresh.is_some() {
            self.collision_count += 1;
            info!(
                "Collision with {} {} at speed {speed:.1}: {severity:?}",
                hit.kind,
                hit.agent.raw()
            );
            self.publish(GameEvent::Collision {
                agent: hit.agent,
                kind: hit.kind,
                severity,
                player_speed: speed,
            });
        }

        // Outcome applies on every frame of overlap, not only the first.
        match severity {
            CollisionSeverity::Major => {
                self.player.stop();
                self.state = RunState::Crashed;
                let distance = self.world.distance_traveled();
                info!("Crashed after {distance:.0} units");
                self.publish(GameEvent::Crashed { distance });
            },
            CollisionSeverity::Minor => {
                let cap = self.config.collision.minor_speed_cap;
                self.player.cap_speed(cap);
            },
        }

        fresh.map(|hit| CollisionReport { hit, severity })
    }

    fn emit_milestones(&mut self) {
        let distance = self.world.distance_traveled();
        let interval = self.config.game.milestone_interval;
        while distance >= self.next_milestone {
            debug!("Milestone {:.0} reached", self.next_milestone);
            self.publish(GameEvent::Milestone {
                distance: self.next_milestone,
            });
            self.next_milestone += interval;
        }
    }
}

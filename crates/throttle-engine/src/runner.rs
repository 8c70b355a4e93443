//! Headless host loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use throttle_common::ContentResolver;
use throttle_gameplay::{CollisionSeverity, Controls, GameEvent, GameState, GameStateSnapshot};
use tracing::{debug, info, warn};

use crate::autopilot::Autopilot;
use crate::config::EngineConfig;
use crate::content::{LoadOutcome, ThreadedContentLoader};
use crate::presentation::SceneMirror;
use crate::timing::FrameTiming;

/// What happened over a whole run, printed as JSON at exit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Seed the world was built from
    pub seed: u64,
    /// Host frames run
    pub frames: u32,
    /// Simulation steps taken
    pub steps: u64,
    /// Simulated seconds across all runs
    pub simulated_seconds: f64,
    /// Restarts after crashes
    pub restarts: u32,
    /// Runs that ended in a crash
    pub crashes: u32,
    /// Minor collisions
    pub minor_collisions: u32,
    /// Longest distance reached in any run
    pub best_distance: f32,
    /// Milestones passed
    pub milestones: u32,
    /// Vehicles spawned
    pub vehicles_spawned: u64,
    /// Vehicles retired
    pub vehicles_despawned: u64,
    /// Visuals loaded in the background
    pub visuals_loaded: u32,
    /// Visuals that fell back to placeholders
    pub visuals_failed: u32,
    /// Average frames per second (realtime runs only)
    pub average_fps: Option<f32>,
    /// Final game state
    pub final_state: Option<GameStateSnapshot>,
}

impl RunSummary {
    fn record_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::VehicleSpawned { .. } => self.vehicles_spawned += 1,
            GameEvent::VehicleDespawned { .. } => self.vehicles_despawned += 1,
            GameEvent::Collision { severity, .. } => {
                if *severity == CollisionSeverity::Minor {
                    self.minor_collisions += 1;
                }
            },
            GameEvent::Crashed { distance } => {
                self.crashes += 1;
                self.best_distance = self.best_distance.max(*distance);
            },
            GameEvent::Milestone { .. } => self.milestones += 1,
            GameEvent::Restarted => {},
        }
    }

    fn record_load(&mut self, outcome: &LoadOutcome) {
        match &outcome.result {
            Ok(_) => self.visuals_loaded += 1,
            Err(err) => {
                debug!("Visual {} for {} unavailable: {err}", outcome.model, outcome.kind);
                self.visuals_failed += 1;
            },
        }
    }
}

/// Owns the simulation and everything around it for one session.
#[derive(Debug)]
pub struct Runner {
    config: EngineConfig,
    content: Arc<ThreadedContentLoader>,
    game: GameState,
    autopilot: Autopilot,
    mirror: SceneMirror,
    timing: FrameTiming,
    summary: RunSummary,
}

impl Runner {
    /// Builds the session from a validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let simulation = config.simulation_config();
        let seed = simulation.seed;

        let content = Arc::new(
            ThreadedContentLoader::spawn(config.content.clone())
                .context("failed to start content worker")?,
        );
        let resolver: Arc<dyn ContentResolver> = content.clone();
        let game = GameState::with_content(simulation, resolver)
            .context("invalid simulation configuration")?;

        let timing = FrameTiming::new(config.target_fps).with_max_dt(config.max_frame_dt);
        info!(
            "Session ready: seed {seed}, {} lanes, {} Hz",
            game.lanes().len(),
            timing.target_fps()
        );

        Ok(Self {
            autopilot: Autopilot::new(config.autopilot.clone()),
            mirror: SceneMirror::new(config.debug.clone()),
            summary: RunSummary {
                seed,
                ..Default::default()
            },
            config,
            content,
            game,
            timing,
        })
    }

    /// Runs one host frame: simulation steps, content polling, events, mirror.
    pub fn frame(&mut self) {
        let dt = if self.config.realtime {
            self.timing.delta_time()
        } else {
            self.timing.record(self.timing.fixed_dt())
        };

        let step = self.timing.fixed_dt();
        for _ in 0..self.timing.accumulate(dt) {
            let controls = self.controls();
            let report = self.game.update(step, &controls);
            self.summary.steps += 1;
            self.summary.simulated_seconds += f64::from(report.dt);
        }

        for outcome in self.content.poll() {
            self.summary.record_load(&outcome);
        }

        let mut crashed = false;
        for event in self.game.drain_events() {
            crashed |= matches!(event, GameEvent::Crashed { .. });
            self.summary.record_event(&event);
        }
        if crashed {
            self.handle_crash();
        }

        self.mirror.sync(&self.game);
        self.summary.frames += 1;

        let hud_interval = self.config.hud_interval;
        if hud_interval > 0 && self.summary.frames % hud_interval == 0 {
            info!("{}", self.mirror.hud_line());
        }

        if self.config.realtime {
            self.timing.sleep_remainder();
        }
    }

    /// Runs the configured number of frames and returns the summary.
    pub fn run(mut self) -> RunSummary {
        info!("Running {} frames", self.config.frames);
        for _ in 0..self.config.frames {
            self.frame();
        }
        self.finish()
    }

    /// Closes the session and returns the summary.
    pub fn finish(mut self) -> RunSummary {
        self.summary.best_distance = self.summary.best_distance.max(self.game.distance_traveled());
        if self.config.realtime {
            self.summary.average_fps = Some(self.timing.current_fps());
        }
        self.summary.final_state = Some(self.game.snapshot());
        info!(
            "Session over: {} frames, {} crashes, best distance {:.1}",
            self.summary.frames, self.summary.crashes, self.summary.best_distance
        );
        self.summary
    }

    /// The simulation.
    #[must_use]
    pub const fn game(&self) -> &GameState {
        &self.game
    }

    /// The presentation mirror.
    #[must_use]
    pub const fn mirror(&self) -> &SceneMirror {
        &self.mirror
    }

    /// Mutable access to the presentation mirror, e.g. to toggle debug drawing.
    pub fn mirror_mut(&mut self) -> &mut SceneMirror {
        &mut self.mirror
    }

    /// Summary so far.
    #[must_use]
    pub const fn summary(&self) -> &RunSummary {
        &self.summary
    }

    fn controls(&mut self) -> Controls {
        let player = self.game.player_view();
        self.autopilot
            .controls(&player, self.game.agents(), self.game.lanes())
    }

    fn handle_crash(&mut self) {
        if !self.config.auto_restart {
            return;
        }
        if self.summary.restarts >= self.config.max_restarts {
            warn!("Restart limit of {} reached", self.config.max_restarts);
            return;
        }
        self.summary.restarts += 1;
        self.game.restart();
        self.autopilot.reset();
        self.timing.reset();
        info!("Restarted run {}", self.summary.restarts + 1);
    }
}

//! Host configuration.
//!
//! Loaded from `throttle.toml`; every field has a default so partial files work.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use throttle_gameplay::SimulationConfig;
use tracing::{info, warn};

use crate::autopilot::AutopilotConfig;
use crate::content::ContentConfig;
use crate::presentation::DebugOptions;

/// Configuration file name.
pub const CONFIG_FILE: &str = "throttle.toml";

/// Host configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Loop Settings ===
    /// Frames to run before exiting
    pub frames: u32,
    /// Simulation steps per second
    pub target_fps: u32,
    /// Largest frame delta fed to the accumulator
    pub max_frame_dt: f32,
    /// Pace frames against the wall clock instead of running flat out
    pub realtime: bool,
    /// Print the HUD line every this many frames (0 = never)
    pub hud_interval: u32,

    // === Run Settings ===
    /// World seed (None = random)
    pub world_seed: Option<u64>,
    /// Restart automatically after a crash
    pub auto_restart: bool,
    /// Give up after this many restarts
    pub max_restarts: u32,

    // === Subsystems ===
    /// Scripted driver
    pub autopilot: AutopilotConfig,
    /// Background visual loading
    pub content: ContentConfig,
    /// Debug drawing toggles
    pub debug: DebugOptions,
    /// Game rules
    pub simulation: SimulationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frames: 3_600,
            target_fps: 60,
            max_frame_dt: 0.25,
            realtime: false,
            hud_interval: 600,

            world_seed: None,
            auto_restart: true,
            max_restarts: 3,

            autopilot: AutopilotConfig::default(),
            content: ContentConfig::default(),
            debug: DebugOptions::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from `throttle.toml` in the working directory.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Loads configuration from a specific path.
    /// Returns the defaults if the file is missing or invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Saves configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamps host values to sensible ranges.
    ///
    /// Game rules are checked separately when the simulation is built.
    pub fn validate(&mut self) {
        self.target_fps = self.target_fps.clamp(10, 240);
        if !self.max_frame_dt.is_finite() {
            self.max_frame_dt = 0.25;
        }
        self.max_frame_dt = self.max_frame_dt.clamp(0.01, 1.0);
        self.max_restarts = self.max_restarts.min(1_000);

        self.autopilot.validate();
        self.content.validate();
    }

    /// Simulation settings with the world seed applied.
    ///
    /// Without a configured seed a random one is drawn.
    #[must_use]
    pub fn simulation_config(&self) -> SimulationConfig {
        let mut simulation = self.simulation.clone();
        simulation.seed = self.world_seed.unwrap_or_else(|| fastrand::u64(..));
        simulation.game.max_frame_dt = simulation.game.max_frame_dt.min(self.max_frame_dt);
        simulation
    }
}

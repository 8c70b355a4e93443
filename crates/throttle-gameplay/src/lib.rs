//! # Throttle Gameplay
//!
//! Gameplay systems for Throttle.
//!
//! This crate provides the simulation core:
//! - Player vehicle controller with banking tilt and road clamping
//! - Per-frame control snapshot
//! - Traffic simulator with spawning, following, braking and lane changes
//! - Player versus traffic collision detection
//! - Simulation configuration
//! - Event queue to the host
//! - The game loop that ties them together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod collision;
pub mod config;
pub mod events;
pub mod game_state;
pub mod input;
pub mod player;
pub mod traffic;
pub mod vehicle;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::collision::*;
    pub use crate::config::*;
    pub use crate::events::*;
    pub use crate::game_state::*;
    pub use crate::input::*;
    pub use crate::player::*;
    pub use crate::traffic::*;
    pub use crate::vehicle::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_simulation_runs() {
        let mut game = GameState::new(SimulationConfig::default()).expect("valid config");
        for _ in 0..120 {
            game.update(1.0 / 60.0, &Controls::forward());
        }
        assert!(game.player().speed > 0.0);
        assert!(game.distance_traveled() > 0.0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = || {
            let config = SimulationConfig {
                seed: 99,
                ..Default::default()
            };
            let mut game = GameState::new(config).expect("valid config");
            for _ in 0..600 {
                game.update(1.0 / 60.0, &Controls::forward());
            }
            game.snapshot()
        };
        assert_eq!(run(), run());
    }
}

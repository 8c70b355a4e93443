//! # Throttle Engine
//!
//! Headless host for Throttle.
//!
//! Drives the simulation frame by frame:
//! - Configuration file loading and validation
//! - Fixed timestep frame pacing
//! - Scripted autopilot input
//! - Background content loading on a worker thread
//! - Presentation mirror with debug drawing toggles
//! - JSON run summary

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod autopilot;
pub mod config;
pub mod content;
pub mod presentation;
pub mod runner;
pub mod timing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::autopilot::*;
    pub use crate::config::*;
    pub use crate::content::*;
    pub use crate::presentation::*;
    pub use crate::runner::*;
    pub use crate::timing::*;
}

pub use prelude::*;

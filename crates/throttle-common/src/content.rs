//! Content resolver interface.
//!
//! The simulation never touches a global asset cache. The orchestrator owns a
//! [`ContentResolver`] and passes it in; until a visual has resolved, the
//! placeholder size of its [`VehicleKind`] is authoritative for collision.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::coords::BoundingSize;

/// Kind of traffic vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    /// Passenger car
    Car,
    /// Semi truck
    Truck,
}

impl VehicleKind {
    /// All vehicle kinds.
    pub const ALL: [Self; 2] = [Self::Car, Self::Truck];

    /// Placeholder bounding size used until a visual model resolves.
    #[must_use]
    pub const fn placeholder_size(self) -> BoundingSize {
        match self {
            Self::Car => BoundingSize::new(1.8, 1.5, 4.0),
            Self::Truck => BoundingSize::new(2.2, 2.8, 8.0),
        }
    }

    /// Short lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Truck => "truck",
        }
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Loading state of a visual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VisualState {
    /// Still loading; the placeholder is shown
    Pending,
    /// Loaded, with the model's measured bounds
    Ready(BoundingSize),
    /// Failed to load; the placeholder stays indefinitely
    Failed,
}

/// Shared handle to an asynchronously loading visual.
#[derive(Debug, Clone)]
pub struct VisualHandle {
    kind: VehicleKind,
    model: Option<String>,
    state: Arc<RwLock<VisualState>>,
}

impl VisualHandle {
    /// Creates a pending handle.
    #[must_use]
    pub fn pending(kind: VehicleKind, model: Option<String>) -> Self {
        Self {
            kind,
            model,
            state: Arc::new(RwLock::new(VisualState::Pending)),
        }
    }

    /// Creates a handle that is already resolved to the placeholder.
    #[must_use]
    pub fn placeholder(kind: VehicleKind) -> Self {
        Self {
            kind,
            model: None,
            state: Arc::new(RwLock::new(VisualState::Ready(kind.placeholder_size()))),
        }
    }

    /// Vehicle kind this visual belongs to.
    #[must_use]
    pub const fn kind(&self) -> VehicleKind {
        self.kind
    }

    /// Model name, if a model was requested.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Current loading state.
    #[must_use]
    pub fn state(&self) -> VisualState {
        *self.state.read()
    }

    /// Completes the handle. Later completions overwrite earlier ones.
    pub fn complete(&self, state: VisualState) {
        *self.state.write() = state;
    }

    /// Size to use for collision: the resolved size if ready, else the placeholder.
    #[must_use]
    pub fn effective_size(&self) -> BoundingSize {
        match self.state() {
            VisualState::Ready(size) if size.is_valid() => size,
            _ => self.kind.placeholder_size(),
        }
    }
}

/// Resolves sizes and visuals for vehicle kinds.
pub trait ContentResolver: Send + Sync {
    /// Bounding size to use for a newly spawned vehicle of `kind` drawn with `model`.
    ///
    /// Falls back to the kind's placeholder when the model has no known size.
    fn resolve_bounding_size(&self, kind: VehicleKind, model: Option<&str>) -> BoundingSize;

    /// Starts loading the visual for `kind`/`model` without blocking.
    fn load_visual(&self, kind: VehicleKind, model: Option<&str>) -> VisualHandle;
}

/// Resolver that only ever hands out placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderContent;

impl ContentResolver for PlaceholderContent {
    fn resolve_bounding_size(&self, kind: VehicleKind, _model: Option<&str>) -> BoundingSize {
        kind.placeholder_size()
    }

    fn load_visual(&self, kind: VehicleKind, _model: Option<&str>) -> VisualHandle {
        VisualHandle::placeholder(kind)
    }
}

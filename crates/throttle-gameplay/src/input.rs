//! Per-frame control state.
//!
//! Input capture itself lives outside the simulation; the host translates its
//! key events into [`ControlKey`] presses and hands a [`Controls`] snapshot to
//! the game loop each frame.

use serde::{Deserialize, Serialize};

/// Discrete control flags for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    /// Accelerate
    pub forward: bool,
    /// Decelerate
    pub backward: bool,
    /// Steer left
    pub left: bool,
    /// Steer right
    pub right: bool,
    /// Hard brake
    pub brake: bool,
}

impl Controls {
    /// No control held.
    pub const NONE: Self = Self {
        forward: false,
        backward: false,
        left: false,
        right: false,
        brake: false,
    };

    /// Only forward held.
    #[must_use]
    pub const fn forward() -> Self {
        Self {
            forward: true,
            ..Self::NONE
        }
    }

    /// Returns a copy with the given key pressed or released.
    #[must_use]
    pub fn with(mut self, key: ControlKey, pressed: bool) -> Self {
        self.set(key, pressed);
        self
    }

    /// Records a key press or release.
    pub fn set(&mut self, key: ControlKey, pressed: bool) {
        match key {
            ControlKey::ArrowUp => self.forward = pressed,
            ControlKey::ArrowDown => self.backward = pressed,
            ControlKey::ArrowLeft => self.left = pressed,
            ControlKey::ArrowRight => self.right = pressed,
            ControlKey::Space => self.brake = pressed,
        }
    }

    /// Returns whether any longitudinal slowing input is held.
    #[must_use]
    pub const fn is_slowing(&self) -> bool {
        self.backward || self.brake
    }

    /// Returns whether any control is held.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right || self.brake
    }
}

/// Keys the game responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKey {
    /// Accelerate
    ArrowUp,
    /// Decelerate
    ArrowDown,
    /// Steer left
    ArrowLeft,
    /// Steer right
    ArrowRight,
    /// Brake
    Space,
}

impl ControlKey {
    /// All bound keys.
    pub const ALL: [Self; 5] = [
        Self::ArrowUp,
        Self::ArrowDown,
        Self::ArrowLeft,
        Self::ArrowRight,
        Self::Space,
    ];

    /// Maps a DOM-style key name to a control key.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ArrowUp" => Some(Self::ArrowUp),
            "ArrowDown" => Some(Self::ArrowDown),
            "ArrowLeft" => Some(Self::ArrowLeft),
            "ArrowRight" => Some(Self::ArrowRight),
            " " | "Space" => Some(Self::Space),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        let controls = Controls::NONE
            .with(ControlKey::ArrowUp, true)
            .with(ControlKey::Space, true);
        assert!(controls.forward);
        assert!(controls.brake);
        assert!(controls.is_slowing());
        assert!(!controls.left);
    }

    #[test]
    fn test_release_clears_flag() {
        let mut controls = Controls::forward();
        controls.set(ControlKey::ArrowUp, false);
        assert!(!controls.any());
    }

    #[test]
    fn test_key_names() {
        assert_eq!(ControlKey::from_name("ArrowLeft"), Some(ControlKey::ArrowLeft));
        assert_eq!(ControlKey::from_name(" "), Some(ControlKey::Space));
        assert_eq!(ControlKey::from_name("w"), None);
        for key in ControlKey::ALL {
            assert!(Controls::NONE.with(key, true).any());
        }
    }
}

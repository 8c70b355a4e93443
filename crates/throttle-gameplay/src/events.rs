//! Event queue from the simulation to its host.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use throttle_common::{AgentId, VehicleKind};

use crate::collision::CollisionSeverity;

/// Events the game loop reports to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Traffic vehicle spawned
    VehicleSpawned {
        /// Agent ID
        agent: AgentId,
        /// Vehicle kind
        kind: VehicleKind,
        /// Selected model, if any
        model: Option<String>,
    },
    /// Traffic vehicle retired behind the player
    VehicleDespawned {
        /// Agent ID
        agent: AgentId,
    },
    /// Player hit a traffic vehicle
    Collision {
        /// Agent hit
        agent: AgentId,
        /// Kind of the agent hit
        kind: VehicleKind,
        /// Severity at impact
        severity: CollisionSeverity,
        /// Player speed at impact
        player_speed: f32,
    },
    /// The run ended in a crash
    Crashed {
        /// Distance traveled when the crash happened
        distance: f32,
    },
    /// The run was restarted
    Restarted,
    /// Distance milestone passed
    Milestone {
        /// Milestone distance
        distance: f32,
    },
}

/// Bounded event queue.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for publishing events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Returns false if the queue was full and the event was dropped.
    pub fn publish(&self, event: GameEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}

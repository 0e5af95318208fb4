//! Domain event system — decoupled observation of the bridge lifecycle.
//!
//! Events are published when a peer comes or goes, a goal arrives, or the
//! control loop resets/steps. Subscribers (logging, tests) react without
//! coupling to the publishers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::exchange::ConnectionId;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A peer connection was registered
    PeerConnected {
        connection: ConnectionId,
        live_peers: usize,
        timestamp: DateTime<Utc>,
    },

    /// A peer connection was removed from the registry
    PeerDisconnected {
        connection: ConnectionId,
        live_peers: usize,
        timestamp: DateTime<Utc>,
    },

    /// A goal was stored by the goal listener
    GoalReceived {
        replaced_pending: bool,
        timestamp: DateTime<Utc>,
    },

    /// The control loop issued a reset command
    ResetIssued {
        /// Whether a goal triggered this reset
        goal_triggered: bool,
        timestamp: DateTime<Utc>,
    },

    /// The control loop completed one step
    StepCompleted {
        tick: u32,
        reward: f64,
        done: bool,
        timestamp: DateTime<Utc>,
    },

    /// An exchange with a peer failed
    ExchangeFailed {
        error_message: String,
        recoverable: bool,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Short snake_case name, used as a log field.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::PeerConnected { .. } => "peer_connected",
            DomainEvent::PeerDisconnected { .. } => "peer_disconnected",
            DomainEvent::GoalReceived { .. } => "goal_received",
            DomainEvent::ResetIssued { .. } => "reset_issued",
            DomainEvent::StepCompleted { .. } => "step_completed",
            DomainEvent::ExchangeFailed { .. } => "exchange_failed",
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Components can subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

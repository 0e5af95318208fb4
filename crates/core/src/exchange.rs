//! Exchange trait — one command out, one observation back.
//!
//! The control loop talks to peers only through this trait, so it can be
//! driven by the real connection bridge or by a scripted stand-in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::Command;
use crate::error::Result;
use crate::observation::Observation;

/// Unique identifier for a peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sends a command to a connected peer and waits for its single reply.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Send `command` to one live peer and return the parsed reply.
    ///
    /// Exchange failures surface as [`crate::Error::Exchange`]; they are
    /// never retried by the implementation.
    async fn send_and_await(&self, command: &Command) -> Result<Observation>;

    /// Number of peers currently able to take a command.
    fn peer_count(&self) -> usize;
}

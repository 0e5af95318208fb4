//! Connection registry — the set of live peer connections.
//!
//! Connection handling tasks add themselves on accept and remove themselves
//! on close. The exchange bridge picks a connection from here.

use std::sync::{Arc, Mutex};

use armbridge_core::event::{DomainEvent, EventBus};
use armbridge_core::exchange::ConnectionId;
use chrono::Utc;
use tracing::info;

use crate::connection::PeerConnection;

/// Central registry holding all live peer connections.
///
/// Kept in connect order; [`any`](Self::any) hands out the oldest live
/// connection. With more than one peer connected, which peer receives a
/// command therefore depends on connect order alone.
pub struct ConnectionRegistry {
    connections: Mutex<Vec<Arc<PeerConnection>>>,
    events: Option<Arc<EventBus>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            events: None,
        }
    }

    /// Publish membership changes to `events`.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Register a newly accepted connection.
    pub fn on_connect(&self, conn: Arc<PeerConnection>) {
        let id = conn.id();
        let live_peers = {
            let mut connections = self.lock();
            if connections.iter().any(|c| c.id() == id) {
                return;
            }
            connections.push(conn);
            connections.len()
        };

        info!(connection = %id, live_peers, "Peer connected");
        self.publish(DomainEvent::PeerConnected {
            connection: id,
            live_peers,
            timestamp: Utc::now(),
        });
    }

    /// Remove a connection. Removing an unknown id is a no-op.
    ///
    /// Returns whether the connection was present.
    pub fn on_disconnect(&self, id: ConnectionId) -> bool {
        let (removed, live_peers) = {
            let mut connections = self.lock();
            let before = connections.len();
            connections.retain(|c| c.id() != id);
            (connections.len() != before, connections.len())
        };

        if removed {
            info!(connection = %id, live_peers, "Peer disconnected");
            self.publish(DomainEvent::PeerDisconnected {
                connection: id,
                live_peers,
                timestamp: Utc::now(),
            });
        }
        removed
    }

    /// An arbitrary live connection (the oldest), or `None` if there is none.
    ///
    /// Connections whose transport already closed are dropped first, so a
    /// closed connection is never handed out.
    pub fn any(&self) -> Option<Arc<PeerConnection>> {
        self.prune_closed();
        self.lock().first().cloned()
    }

    /// Look up a connection by id.
    pub fn get(&self, id: ConnectionId) -> Option<Arc<PeerConnection>> {
        self.lock().iter().find(|c| c.id() == id).cloned()
    }

    /// Ids of all registered connections, oldest first.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.lock().iter().map(|c| c.id()).collect()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn prune_closed(&self) {
        let closed: Vec<ConnectionId> = self
            .lock()
            .iter()
            .filter(|c| c.is_closed())
            .map(|c| c.id())
            .collect();
        for id in closed {
            self.on_disconnect(id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<PeerConnection>>> {
        self.connections.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

//! Exchange bridge — one command out to a live peer, one observation back.

use std::sync::Arc;
use std::time::Duration;

use armbridge_config::BridgeConfig;
use armbridge_core::codec;
use armbridge_core::command::Command;
use armbridge_core::error::{ExchangeError, Result};
use armbridge_core::exchange::Exchange;
use armbridge_core::observation::Observation;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::registry::ConnectionRegistry;

/// Sends commands through the connection registry.
///
/// Each call selects the registry's oldest live connection; there is no
/// fan-out. Failures are returned as-is, retry policy belongs to the caller.
pub struct ExchangeBridge {
    registry: Arc<ConnectionRegistry>,
    reply_timeout: Duration,
}

impl ExchangeBridge {
    pub fn new(registry: Arc<ConnectionRegistry>, reply_timeout: Duration) -> Self {
        Self {
            registry,
            reply_timeout,
        }
    }

    pub fn from_config(config: &BridgeConfig, registry: Arc<ConnectionRegistry>) -> Self {
        Self::new(registry, config.reply_timeout())
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }
}

#[async_trait]
impl Exchange for ExchangeBridge {
    async fn send_and_await(&self, command: &Command) -> Result<Observation> {
        let conn = self.registry.any().ok_or(ExchangeError::NoPeerAvailable)?;
        let frame = codec::encode(command)?;
        debug!(connection = %conn.id(), frame = %frame, "Sending command");

        let reply = match conn.exchange(frame, self.reply_timeout).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(connection = %conn.id(), error = %e, "Exchange failed");
                // A timed-out connection is as lost as a closed one: dropping
                // the last handle ends its transport.
                if matches!(
                    e,
                    ExchangeError::PeerDisconnected { .. } | ExchangeError::ReplyTimeout { .. }
                ) {
                    self.registry.on_disconnect(conn.id());
                }
                return Err(e.into());
            }
        };

        debug!(connection = %conn.id(), reply = %reply, "Received observation");
        Ok(codec::decode(reply.as_bytes())?)
    }

    fn peer_count(&self) -> usize {
        self.registry.len()
    }
}

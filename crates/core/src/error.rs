//! Error types for the armbridge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! The exchange path has its own error enum so the control loop can
//! decide retry vs. abort on a precise classification.

use thiserror::Error;

use crate::exchange::ConnectionId;

/// The top-level error type for all armbridge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Exchange errors ---
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    // --- Command construction ---
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// The exchange failure behind this error, if any.
    pub fn as_exchange(&self) -> Option<&ExchangeError> {
        match self {
            Error::Exchange(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a single command/observation exchange with a peer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    #[error("No peer connection available")]
    NoPeerAvailable,

    #[error("Peer {connection} disconnected before replying")]
    PeerDisconnected { connection: ConnectionId },

    #[error("Peer {connection} did not reply within {timeout_ms}ms")]
    ReplyTimeout {
        connection: ConnectionId,
        timeout_ms: u64,
    },

    #[error("Malformed observation payload: {0}")]
    MalformedPayload(String),
}

impl ExchangeError {
    /// Whether the failure means "no usable peer right now".
    ///
    /// These are recoverable by waiting for a (new) peer and starting a
    /// fresh exchange cycle. A malformed payload is not: the peer is
    /// connected but speaking the wrong protocol.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            ExchangeError::NoPeerAvailable
                | ExchangeError::PeerDisconnected { .. }
                | ExchangeError::ReplyTimeout { .. }
        )
    }

    /// The connection the failure happened on, if one was selected.
    pub fn connection(&self) -> Option<ConnectionId> {
        match self {
            ExchangeError::PeerDisconnected { connection }
            | ExchangeError::ReplyTimeout { connection, .. } => Some(*connection),
            _ => None,
        }
    }
}

//! JSON wire codec for commands and observations.
//!
//! Outgoing: `{"type":1,"axes":[..7],"gripper":false,"speed":1.5}`.
//! Incoming: `{"Obj":[..],"EndEffector":[..],"Axes":[..]}`.

use crate::command::Command;
use crate::error::{ExchangeError, Result};
use crate::observation::Observation;

/// Serialize a command into one text frame.
///
/// Field order is fixed by the `Command` definition, so equal commands
/// always produce identical frames.
pub fn encode(command: &Command) -> Result<String> {
    Ok(serde_json::to_string(command)?)
}

/// Parse one reply frame into an observation.
///
/// Missing, null, or mistyped fields are reported as
/// [`ExchangeError::MalformedPayload`]; nothing is defaulted.
pub fn decode(payload: &[u8]) -> std::result::Result<Observation, ExchangeError> {
    serde_json::from_slice(payload).map_err(|e| ExchangeError::MalformedPayload(e.to_string()))
}

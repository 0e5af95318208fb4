//! Motion commands sent to the peer.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of joint axes on the commanded arm.
pub const AXIS_COUNT: usize = 7;

/// One target value per joint, in degrees.
pub type JointVector = [f64; AXIS_COUNT];

/// Default speed for reset and step commands.
pub const DEFAULT_SPEED: f64 = 1.5;

/// The joint targets a reset drives the arm to.
pub const DEFAULT_RESET_AXES: JointVector = [-180.0, -50.0, 10.0, 5.0, 3.0, 2.0, 1.0];

/// Integer tag identifying the command variant on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CommandKind {
    /// Drive all joints to the given targets.
    Move,
}

impl From<CommandKind> for u8 {
    fn from(kind: CommandKind) -> Self {
        match kind {
            CommandKind::Move => 1,
        }
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = String;

    fn try_from(tag: u8) -> std::result::Result<Self, Self::Error> {
        match tag {
            1 => Ok(CommandKind::Move),
            other => Err(format!("unknown command type {other}")),
        }
    }
}

/// A single motion command.
///
/// Immutable once built; the control loop creates a fresh one per tick.
/// Field order matches the wire order: `type`, `axes`, `gripper`, `speed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    kind: CommandKind,
    axes: JointVector,
    gripper: bool,
    speed: f64,
}

impl Command {
    /// Build a move command, rejecting non-finite axes and non-positive speed.
    pub fn move_to(axes: JointVector, gripper: bool, speed: f64) -> Result<Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::InvalidCommand(format!(
                "speed must be a positive finite number, got {speed}"
            )));
        }
        if let Some(i) = axes.iter().position(|a| !a.is_finite()) {
            return Err(Error::InvalidCommand(format!(
                "axis {i} is not finite: {}",
                axes[i]
            )));
        }
        Ok(Self {
            kind: CommandKind::Move,
            axes,
            gripper,
            speed,
        })
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn axes(&self) -> &JointVector {
        &self.axes
    }

    /// Whether the gripper should be engaged.
    pub fn gripper(&self) -> bool {
        self.gripper
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

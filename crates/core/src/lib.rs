//! # armbridge core
//!
//! Domain types, the wire codec, traits, and error definitions for the
//! armbridge control bridge. Every other crate depends inward on this one.
//!
//! ## Design Philosophy
//!
//! The seams are traits defined here ([`Exchange`], [`Environment`],
//! [`RewardFn`], [`TerminationFn`]). Implementations live in their
//! respective crates. This enables:
//! - Driving the control loop against a scripted peer in tests
//! - Plugging in reward/termination logic without touching the loop
//! - Clean dependency graph (all crates depend inward on core)

pub mod codec;
pub mod command;
pub mod env;
pub mod error;
pub mod event;
pub mod exchange;
pub mod goal;
pub mod observation;

// Re-export key types at crate root for ergonomics
pub use command::{AXIS_COUNT, Command, CommandKind, JointVector};
pub use env::{Bounds, Environment, NeverTerminate, RewardFn, StepResult, TerminationFn, ZeroReward};
pub use error::{Error, ExchangeError, Result};
pub use event::{DomainEvent, EventBus};
pub use exchange::{ConnectionId, Exchange};
pub use goal::{Goal, GoalSlot};
pub use observation::Observation;

//! The control side of armbridge.
//!
//! The loop follows a **Reset → Step → Observe** cycle:
//!
//! 1. **Wait** until a peer is connected
//! 2. **Reset** the arm to its home pose
//! 3. **Step** with the action source's vector for the current tick
//! 4. **Observe** the reply, score it with the reward and termination hooks
//! 5. **Goal arrived?** reset and start again from tick 0
//!
//! Once the horizon is reached (or the episode is flagged done), the
//! configured horizon policy decides what happens next.

pub mod env;
pub mod loop_runner;
pub mod policy;

#[cfg(test)]
pub(crate) mod testing;

pub use env::RobotEnv;
pub use loop_runner::{ControlLoop, LoopState, LoopStats, TickOutcome};
pub use policy::{ActionSource, FixedAction, RampPolicy};

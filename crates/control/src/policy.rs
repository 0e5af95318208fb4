//! Action sources — where the per-tick joint targets come from.

use armbridge_core::command::{AXIS_COUNT, JointVector};

/// Produces the action for a given tick of the current episode.
pub trait ActionSource: Send {
    fn next_action(&mut self, tick: u32) -> JointVector;
}

/// Placeholder ramp: every joint target equals the tick counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RampPolicy;

impl ActionSource for RampPolicy {
    fn next_action(&mut self, tick: u32) -> JointVector {
        [f64::from(tick); AXIS_COUNT]
    }
}

/// Repeats the same action every tick.
#[derive(Debug, Clone, Copy)]
pub struct FixedAction(pub JointVector);

impl ActionSource for FixedAction {
    fn next_action(&mut self, _tick: u32) -> JointVector {
        self.0
    }
}

impl<F> ActionSource for F
where
    F: FnMut(u32) -> JointVector + Send,
{
    fn next_action(&mut self, tick: u32) -> JointVector {
        self(tick)
    }
}

//! `RobotEnv` — the reset/step environment backed by a peer exchange.

use std::sync::Arc;

use armbridge_config::ControlConfig;
use armbridge_core::command::{AXIS_COUNT, Command, DEFAULT_RESET_AXES, DEFAULT_SPEED, JointVector};
use armbridge_core::env::{
    Bounds, Environment, NeverTerminate, RewardFn, StepResult, TerminationFn, ZeroReward,
};
use armbridge_core::error::Result;
use armbridge_core::exchange::Exchange;
use armbridge_core::observation::Observation;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Joint targets are degrees in `[-180, 180]`.
pub const ACTION_BOUNDS: Bounds = Bounds::new(-180.0, 180.0, AXIS_COUNT);

/// Width of the flattened observation space.
pub const OBSERVATION_DIMS: usize = 18;

/// Environment that turns every reset/step into one command exchange.
pub struct RobotEnv {
    exchange: Arc<dyn Exchange>,
    reset_axes: JointVector,
    speed: f64,
    reward: Box<dyn RewardFn>,
    termination: Box<dyn TerminationFn>,
}

impl RobotEnv {
    pub fn new(exchange: Arc<dyn Exchange>) -> Self {
        Self {
            exchange,
            reset_axes: DEFAULT_RESET_AXES,
            speed: DEFAULT_SPEED,
            reward: Box::new(ZeroReward),
            termination: Box::new(NeverTerminate),
        }
    }

    pub fn from_config(exchange: Arc<dyn Exchange>, config: &ControlConfig) -> Self {
        Self::new(exchange)
            .with_reset_axes(config.reset_axes)
            .with_speed(config.speed)
    }

    pub fn with_reset_axes(mut self, axes: JointVector) -> Self {
        self.reset_axes = axes;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_reward(mut self, reward: impl RewardFn + 'static) -> Self {
        self.reward = Box::new(reward);
        self
    }

    pub fn with_termination(mut self, termination: impl TerminationFn + 'static) -> Self {
        self.termination = Box::new(termination);
        self
    }

    /// Live peers behind the exchange.
    pub fn peer_count(&self) -> usize {
        self.exchange.peer_count()
    }

    /// The command sent on every reset.
    pub fn reset_command(&self) -> Result<Command> {
        Command::move_to(self.reset_axes, false, self.speed)
    }
}

#[async_trait]
impl Environment for RobotEnv {
    async fn reset(&mut self) -> Result<Observation> {
        let command = self.reset_command()?;
        debug!(axes = ?command.axes(), "Sending reset command");
        self.exchange.send_and_await(&command).await
    }

    async fn step(&mut self, action: &JointVector) -> Result<StepResult> {
        if !ACTION_BOUNDS.contains(action) {
            warn!(?action, "Action outside joint bounds, sending as-is");
        }
        let command = Command::move_to(*action, false, self.speed)?;
        let observation = self.exchange.send_and_await(&command).await?;
        if !self.observation_bounds().contains(&observation.flatten()) {
            debug!(width = observation.len(), "Observation width differs from the declared space");
        }
        let reward = self.reward.reward(&observation);
        let done = self.termination.is_done(&observation);
        Ok(StepResult {
            observation,
            reward,
            done,
            info: serde_json::Map::new(),
        })
    }

    fn action_bounds(&self) -> Bounds {
        ACTION_BOUNDS
    }

    fn observation_bounds(&self) -> Bounds {
        Bounds::unbounded(OBSERVATION_DIMS)
    }
}

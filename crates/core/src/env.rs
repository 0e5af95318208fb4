//! Environment contract exposed to training harnesses.
//!
//! A uniform reset/step interface plus plain numeric bounds for the action
//! and observation spaces. Reward and termination are pluggable hooks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::JointVector;
use crate::error::Result;
use crate::observation::Observation;

/// A box-shaped space: `dims` values, each within `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
    pub dims: usize,
}

impl Bounds {
    pub const fn new(low: f64, high: f64, dims: usize) -> Self {
        Self { low, high, dims }
    }

    /// Unbounded in every dimension.
    pub const fn unbounded(dims: usize) -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY, dims)
    }

    /// Whether `values` has the right length and every value is in range.
    pub fn contains(&self, values: &[f64]) -> bool {
        values.len() == self.dims && values.iter().all(|v| *v >= self.low && *v <= self.high)
    }
}

/// Outcome of one environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub info: serde_json::Map<String, serde_json::Value>,
}

/// The reset/step capability set.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Drive the system to its start pose and return the first observation.
    async fn reset(&mut self) -> Result<Observation>;

    /// Apply one action and report the outcome.
    async fn step(&mut self, action: &JointVector) -> Result<StepResult>;

    fn action_bounds(&self) -> Bounds;

    fn observation_bounds(&self) -> Bounds;
}

/// Scores an observation.
pub trait RewardFn: Send + Sync {
    fn reward(&self, observation: &Observation) -> f64;
}

/// Decides whether an observation ends the episode.
pub trait TerminationFn: Send + Sync {
    fn is_done(&self, observation: &Observation) -> bool;
}

impl<F> RewardFn for F
where
    F: Fn(&Observation) -> f64 + Send + Sync,
{
    fn reward(&self, observation: &Observation) -> f64 {
        self(observation)
    }
}

impl<F> TerminationFn for F
where
    F: Fn(&Observation) -> bool + Send + Sync,
{
    fn is_done(&self, observation: &Observation) -> bool {
        self(observation)
    }
}

/// Default reward: always zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroReward;

impl RewardFn for ZeroReward {
    fn reward(&self, _observation: &Observation) -> f64 {
        0.0
    }
}

/// Default termination: never done.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverTerminate;

impl TerminationFn for NeverTerminate {
    fn is_done(&self, _observation: &Observation) -> bool {
        false
    }
}

//! The control loop: wait for a peer, reset, step to the horizon, react to goals.

use std::sync::Arc;

use armbridge_config::{ControlConfig, HorizonPolicy, PeerLossPolicy};
use armbridge_core::env::Environment;
use armbridge_core::error::{Error, Result};
use armbridge_core::event::{DomainEvent, EventBus};
use armbridge_core::goal::{Goal, GoalSlot};
use armbridge_core::observation::Observation;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::env::RobotEnv;
use crate::policy::{ActionSource, RampPolicy};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingConnection,
    Idle,
    Stepping,
    Resetting,
    /// Episode over, waiting on the goal slot
    Holding,
}

/// What a single [`ControlLoop::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A reset was issued; `goal` is the goal that triggered it, if any
    Reset { goal: Option<Goal> },
    /// One step was taken with the action for `tick`
    Stepped { tick: u32, reward: f64, done: bool },
    /// Nothing was sent; the episode is over and no goal is pending
    Holding,
}

/// Running counters for observers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopStats {
    pub resets: u64,
    pub steps: u64,
    pub goals_consumed: u64,
    pub connection_losses: u64,
    pub last_reward: Option<f64>,
}

/// Drives a [`RobotEnv`] through reset/step episodes.
pub struct ControlLoop {
    /// The environment commands go through
    env: RobotEnv,

    /// Goal mailbox filled by the goal listener
    goals: Arc<GoalSlot>,

    /// Per-tick action source
    actions: Box<dyn ActionSource>,

    /// Event bus for domain events
    events: Arc<EventBus>,

    config: ControlConfig,
    state: LoopState,
    tick: u32,
    episode_done: bool,
    last_observation: Option<Observation>,
    stats: LoopStats,
}

impl ControlLoop {
    pub fn new(env: RobotEnv, goals: Arc<GoalSlot>, config: ControlConfig) -> Self {
        Self {
            env,
            goals,
            actions: Box::new(RampPolicy),
            events: Arc::new(EventBus::default()),
            config,
            state: LoopState::AwaitingConnection,
            tick: 0,
            episode_done: false,
            last_observation: None,
            stats: LoopStats::default(),
        }
    }

    /// Replace the default ramp with another action source.
    pub fn with_actions(mut self, actions: impl ActionSource + 'static) -> Self {
        self.actions = Box::new(actions);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Steps taken in the current episode.
    pub fn tick_count(&self) -> u32 {
        self.tick
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn last_observation(&self) -> Option<&Observation> {
        self.last_observation.as_ref()
    }

    /// Suspend until at least one peer is live.
    pub async fn wait_for_connection(&mut self) {
        self.state = LoopState::AwaitingConnection;
        let backoff = self.config.connection_poll_interval();
        while self.env.peer_count() == 0 {
            info!(
                retry_ms = backoff.as_millis() as u64,
                "No peer connected, waiting"
            );
            tokio::time::sleep(backoff).await;
        }
        self.state = LoopState::Idle;
    }

    /// Wait for a peer, issue the initial reset and (optionally) wait for a
    /// first goal. The loop is ready to step afterwards.
    pub async fn start(&mut self) -> Result<Observation> {
        self.wait_for_connection().await;
        let observation = self.issue_reset(false).await?;
        if self.config.wait_for_first_goal {
            info!("Waiting for a first goal before stepping");
            self.state = LoopState::Holding;
            self.goals.wait(self.config.goal_poll_interval()).await;
            self.state = LoopState::Stepping;
        }
        Ok(observation)
    }

    /// Advance the loop by one iteration.
    ///
    /// A pending goal always wins: reset, clear the goal, tick back to 0.
    /// Errors are returned as-is; [`run`](Self::run) decides what to do
    /// with them.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        if self.goals.is_pending() {
            self.issue_reset(true).await?;
            let goal = self.goals.clear();
            if goal.is_some() {
                self.stats.goals_consumed += 1;
            }
            info!("Goal consumed, episode restarted");
            return Ok(TickOutcome::Reset { goal });
        }

        if self.episode_done || self.tick >= self.config.horizon {
            match self.config.on_horizon {
                HorizonPolicy::Hold => {
                    if self.state != LoopState::Holding {
                        info!(
                            tick = self.tick,
                            done = self.episode_done,
                            "Episode finished, holding until the next goal"
                        );
                        self.state = LoopState::Holding;
                    }
                    let poll = self.config.goal_poll_interval();
                    self.goals.wait_for(poll, poll).await;
                    return Ok(TickOutcome::Holding);
                }
                HorizonPolicy::Reset => {
                    self.issue_reset(false).await?;
                    return Ok(TickOutcome::Reset { goal: None });
                }
                HorizonPolicy::Continue => {}
            }
        }

        let tick = self.tick;
        let action = self.actions.next_action(tick);
        let result = self.env.step(&action).await?;

        self.tick += 1;
        self.episode_done |= result.done;
        self.stats.steps += 1;
        self.stats.last_reward = Some(result.reward);
        debug!(tick, reward = result.reward, done = result.done, "Step completed");
        self.events.publish(DomainEvent::StepCompleted {
            tick,
            reward: result.reward,
            done: result.done,
            timestamp: Utc::now(),
        });
        self.last_observation = Some(result.observation);

        Ok(TickOutcome::Stepped {
            tick,
            reward: result.reward,
            done: result.done,
        })
    }

    /// Run until a fatal error.
    ///
    /// Connection losses are handled according to `on_peer_loss`; every
    /// other error ends the run.
    pub async fn run(&mut self) -> Result<()> {
        self.start_resilient().await?;
        loop {
            if let Err(e) = self.tick().await {
                self.handle_failure(e)?;
                self.start_resilient().await?;
            }
        }
    }

    async fn start_resilient(&mut self) -> Result<()> {
        loop {
            match self.start().await {
                Ok(_) => return Ok(()),
                Err(e) => self.handle_failure(e)?,
            }
        }
    }

    /// Publish the failure and return it unless the loop should reawait a peer.
    fn handle_failure(&mut self, e: Error) -> Result<()> {
        let recoverable = self.config.on_peer_loss == PeerLossPolicy::Reawait
            && e.as_exchange().is_some_and(|x| x.is_connection_loss());

        self.events.publish(DomainEvent::ExchangeFailed {
            error_message: e.to_string(),
            recoverable,
            timestamp: Utc::now(),
        });

        if recoverable {
            self.stats.connection_losses += 1;
            let connection = e.as_exchange().and_then(|x| x.connection());
            warn!(error = %e, ?connection, "Peer lost, waiting for a new connection");
            self.state = LoopState::AwaitingConnection;
            Ok(())
        } else {
            error!(error = %e, "Control loop stopped");
            Err(e)
        }
    }

    async fn issue_reset(&mut self, goal_triggered: bool) -> Result<Observation> {
        self.state = LoopState::Resetting;
        let observation = self.env.reset().await?;
        self.tick = 0;
        self.episode_done = false;
        self.stats.resets += 1;
        self.events.publish(DomainEvent::ResetIssued {
            goal_triggered,
            timestamp: Utc::now(),
        });
        self.last_observation = Some(observation.clone());
        self.state = LoopState::Stepping;
        Ok(observation)
    }
}

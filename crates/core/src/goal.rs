//! One-slot goal mailbox shared between the goal listener and the control loop.
//!
//! The listener writes, the control loop polls and clears. At most one goal
//! is pending; a newer write replaces an unread one.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// An externally supplied goal and when it arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Opaque payload as posted by the caller.
    pub payload: serde_json::Value,

    pub received_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            received_at: Utc::now(),
        }
    }
}

/// The pending-goal slot.
///
/// Guarded by a `std::sync::Mutex` that is never held across an await;
/// `Notify` wakes a waiter as soon as a goal is stored.
#[derive(Debug, Default)]
pub struct GoalSlot {
    slot: Mutex<Option<Goal>>,
    notify: Notify,
}

impl GoalSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a goal, returning the unread one it replaced (if any).
    pub fn set(&self, payload: serde_json::Value) -> Option<Goal> {
        let previous = self
            .slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(Goal::new(payload));
        self.notify.notify_waiters();
        previous
    }

    /// Whether a goal is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// A copy of the pending goal without consuming it.
    pub fn peek(&self) -> Option<Goal> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Consume the pending goal. Returns `None` if it was already cleared.
    pub fn clear(&self) -> Option<Goal> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Suspend until a goal is pending and return a copy of it.
    ///
    /// Rechecks at least every `poll_interval` so a missed wakeup costs at
    /// most one interval.
    pub async fn wait(&self, poll_interval: Duration) -> Goal {
        loop {
            let notified = self.notify.notified();
            if let Some(goal) = self.peek() {
                return goal;
            }
            tracing::debug!("Waiting for goal");
            let _ = tokio::time::timeout(poll_interval, notified).await;
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `limit`.
    pub async fn wait_for(&self, poll_interval: Duration, limit: Duration) -> Option<Goal> {
        tokio::time::timeout(limit, self.wait(poll_interval)).await.ok()
    }
}

//! Goal listener — HTTP endpoint that fills the goal slot.
//!
//! Endpoints:
//!
//! - `POST /`        — Store a JSON goal (last write wins); `null` withdraws it
//! - `GET  /goal`    — The pending goal, if any
//! - `GET  /health`  — Liveness plus whether a goal is pending

use std::sync::Arc;

use armbridge_core::event::{DomainEvent, EventBus};
use armbridge_core::goal::{Goal, GoalSlot};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Shared state for the goal router.
#[derive(Clone)]
pub struct GoalState {
    pub slot: Arc<GoalSlot>,
    pub events: Arc<EventBus>,
}

impl GoalState {
    pub fn new(slot: Arc<GoalSlot>, events: Arc<EventBus>) -> Self {
        Self { slot, events }
    }
}

/// Build the goal router.
pub fn goal_router(state: GoalState) -> Router {
    Router::new()
        .route("/", post(post_goal_handler))
        .route("/goal", get(get_goal_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn post_goal_handler(
    State(state): State<GoalState>,
    Json(payload): Json<serde_json::Value>,
) -> String {
    let ack = format!("Data received: {payload}\n");
    if payload.is_null() {
        let withdrawn = state.slot.clear().is_some();
        info!(withdrawn, "Null goal received, slot cleared");
        return ack;
    }
    let replaced_pending = state.slot.set(payload).is_some();
    info!(replaced_pending, "Goal received");
    state.events.publish(DomainEvent::GoalReceived {
        replaced_pending,
        timestamp: Utc::now(),
    });
    ack
}

async fn get_goal_handler(State(state): State<GoalState>) -> Result<Json<Goal>, StatusCode> {
    state.slot.peek().map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    goal_pending: bool,
}

async fn health_handler(State(state): State<GoalState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        goal_pending: state.slot.is_pending(),
    })
}

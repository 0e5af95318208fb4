//! End-to-end integration tests for armbridge.
//!
//! Real listeners on loopback: the peer WebSocket server and the goal HTTP
//! listener, a tokio-tungstenite client playing the robot, and the
//! control loop driving it through the exchange bridge.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use armbridge_channels::{ConnectionRegistry, ExchangeBridge};
use armbridge_config::{ControlConfig, PeerLossPolicy};
use armbridge_control::{ControlLoop, RobotEnv, TickOutcome};
use armbridge_core::command::{AXIS_COUNT, DEFAULT_RESET_AXES};
use armbridge_core::error::ExchangeError;
use armbridge_core::event::{DomainEvent, EventBus};
use armbridge_core::goal::GoalSlot;
use armbridge_gateway::{GoalState, goal_router, peer_router, serve};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

const WAIT: Duration = Duration::from_secs(5);

// ── WebSocket peer ───────────────────────────────────────────────────────

type Peer = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect_peer(addr: SocketAddr) -> Peer {
    let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
        .await
        .unwrap();
    socket
}

/// Next text frame, or `None` once the server closes the socket.
async fn recv_text(peer: &mut Peer) -> Option<String> {
    loop {
        match peer.next().await? {
            Ok(Message::Text(text)) => return Some(text.as_str().to_owned()),
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(_) | Err(_) => return None,
        }
    }
}

/// Reply to a command the way the simulator does: echo the commanded axes.
fn reply_for(command: &Value) -> String {
    serde_json::json!({
        "Obj": [0.0, 0.0, 0.0],
        "EndEffector": [1.0, 1.0, 1.0],
        "Axes": command["axes"],
    })
    .to_string()
}

/// Forward every received command to the test. Reply to the first
/// `answer` commands (all of them if `None`), then hang up.
fn spawn_peer(mut peer: Peer, answer: Option<usize>) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut answered = 0;
        while let Some(frame) = recv_text(&mut peer).await {
            let command: Value = serde_json::from_str(&frame).unwrap();
            let _ = tx.send(command.clone());
            if answer.is_some_and(|n| answered >= n) {
                return;
            }
            if peer.send(Message::text(reply_for(&command))).await.is_err() {
                return;
            }
            answered += 1;
        }
    });
    rx
}

async fn next_command(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("peer received no command")
        .expect("peer task ended")
}

fn axes_of(command: &Value) -> Vec<f64> {
    command["axes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

fn assert_reset(command: &Value) {
    assert_eq!(command["type"], 1);
    assert_eq!(axes_of(command), DEFAULT_RESET_AXES.to_vec());
    assert_eq!(command["gripper"], false);
    assert_eq!(command["speed"], 1.5);
}

fn assert_step(command: &Value, tick: u32) {
    assert_eq!(axes_of(command), vec![f64::from(tick); AXIS_COUNT]);
    assert_eq!(command["gripper"], false);
    assert_eq!(command["speed"], 1.5);
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    peer_addr: SocketAddr,
    goal_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    goals: Arc<GoalSlot>,
    events: Arc<EventBus>,
}

impl Harness {
    async fn start() -> Self {
        let events = Arc::new(EventBus::new(1024));
        let registry = Arc::new(ConnectionRegistry::new().with_events(events.clone()));
        let goals = Arc::new(GoalSlot::new());

        let peer_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer_listener.local_addr().unwrap();
        tokio::spawn(serve(peer_listener, peer_router(registry.clone())));

        let goal_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let goal_addr = goal_listener.local_addr().unwrap();
        let state = GoalState::new(goals.clone(), events.clone());
        tokio::spawn(serve(goal_listener, goal_router(state)));

        Self {
            peer_addr,
            goal_addr,
            registry,
            goals,
            events,
        }
    }

    fn control(&self, config: ControlConfig) -> ControlLoop {
        self.control_with_reply_timeout(config, WAIT)
    }

    fn control_with_reply_timeout(&self, config: ControlConfig, timeout: Duration) -> ControlLoop {
        let bridge = Arc::new(ExchangeBridge::new(self.registry.clone(), timeout));
        let env = RobotEnv::from_config(bridge, &config);
        ControlLoop::new(env, self.goals.clone(), config).with_events(self.events.clone())
    }

    /// POST a goal to the goal listener over a plain TCP connection.
    async fn post_goal(&self, body: &str) -> String {
        let request = format!(
            "POST / HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            self.goal_addr,
            body.len()
        );
        let mut stream = TcpStream::connect(self.goal_addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        tokio::time::timeout(WAIT, stream.read_to_string(&mut response))
            .await
            .unwrap()
            .unwrap();
        response
    }
}

fn fast_config() -> ControlConfig {
    ControlConfig {
        connection_poll_ms: 10,
        goal_poll_ms: 10,
        ..Default::default()
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_episode_then_hold_until_goal() {
    let h = Harness::start().await;
    let mut commands = spawn_peer(connect_peer(h.peer_addr).await, None);

    let mut control = h.control(fast_config());
    tokio::spawn(async move { control.run().await });

    assert_reset(&next_command(&mut commands).await);
    for c in 0..120 {
        assert_step(&next_command(&mut commands).await, c);
    }

    // horizon reached: nothing more is sent while no goal is pending
    let idle = tokio::time::timeout(Duration::from_millis(200), commands.recv()).await;
    assert!(idle.is_err(), "no command expected after the horizon");

    let response = h.post_goal(r#"{"target":[0.1,0.2,0.3]}"#).await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("Data received"));

    assert_reset(&next_command(&mut commands).await);
    assert_step(&next_command(&mut commands).await, 0);
    assert_step(&next_command(&mut commands).await, 1);
    assert!(!h.goals.is_pending());
}

#[tokio::test]
async fn goal_at_tick_47_resets_immediately() {
    let h = Harness::start().await;
    let mut commands = spawn_peer(connect_peer(h.peer_addr).await, None);
    let mut events = h.events.subscribe();

    let mut control = h.control(fast_config());
    control.start().await.unwrap();
    assert_reset(&next_command(&mut commands).await);

    for c in 0..47 {
        control.tick().await.unwrap();
        assert_step(&next_command(&mut commands).await, c);
    }
    assert_eq!(control.tick_count(), 47);

    h.post_goal(r#"{"object":"cube"}"#).await;

    match control.tick().await.unwrap() {
        TickOutcome::Reset { goal: Some(goal) } => assert_eq!(goal.payload["object"], "cube"),
        other => panic!("expected a goal-triggered reset, got {other:?}"),
    }
    assert_reset(&next_command(&mut commands).await);
    assert_eq!(control.tick_count(), 0);

    control.tick().await.unwrap();
    assert_step(&next_command(&mut commands).await, 0);

    assert!(!h.goals.is_pending());
    assert_eq!(control.stats().goals_consumed, 1);

    let mut goal_resets = 0;
    while let Ok(event) = events.try_recv() {
        if let DomainEvent::ResetIssued {
            goal_triggered: true,
            ..
        } = event.as_ref()
        {
            goal_resets += 1;
        }
    }
    assert_eq!(goal_resets, 1);
}

#[tokio::test]
async fn peer_loss_reawaits_and_restarts_with_reset() {
    let h = Harness::start().await;
    // answers the reset and three steps, then hangs up on step 3
    let mut first = spawn_peer(connect_peer(h.peer_addr).await, Some(4));

    let mut control = h.control(fast_config());
    let handle = tokio::spawn(async move { control.run().await });

    assert_reset(&next_command(&mut first).await);
    for c in 0..4 {
        assert_step(&next_command(&mut first).await, c);
    }

    // wait for the registry to drop the dead peer before reconnecting
    tokio::time::timeout(WAIT, async {
        while !h.registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let mut second = spawn_peer(connect_peer(h.peer_addr).await, None);
    assert_reset(&next_command(&mut second).await);
    assert_step(&next_command(&mut second).await, 0);
    assert_step(&next_command(&mut second).await, 1);

    assert!(!handle.is_finished());
    handle.abort();
}

#[tokio::test]
async fn silent_peer_is_dropped_and_loop_moves_to_next_peer() {
    let h = Harness::start().await;
    let mut silent = connect_peer(h.peer_addr).await;

    let mut control = h.control_with_reply_timeout(fast_config(), Duration::from_millis(100));
    let handle = tokio::spawn(async move { control.run().await });

    // Swallow the reset without answering; the server must then hang up.
    let reset = tokio::time::timeout(WAIT, recv_text(&mut silent))
        .await
        .unwrap()
        .unwrap();
    let reset: Value = serde_json::from_str(&reset).unwrap();
    assert_reset(&reset);
    let closed = tokio::time::timeout(WAIT, recv_text(&mut silent))
        .await
        .expect("silent peer must be disconnected");
    assert_eq!(closed, None);

    // The reply to the timed-out reset reaches nobody; a new peer starts over.
    let mut commands = spawn_peer(connect_peer(h.peer_addr).await, None);
    assert_reset(&next_command(&mut commands).await);
    assert_step(&next_command(&mut commands).await, 0);

    assert!(!handle.is_finished());
    handle.abort();
}

#[tokio::test]
async fn peer_loss_with_abort_policy_ends_run() {
    let h = Harness::start().await;
    let mut commands = spawn_peer(connect_peer(h.peer_addr).await, Some(2));

    let config = ControlConfig {
        on_peer_loss: PeerLossPolicy::Abort,
        ..fast_config()
    };
    let mut control = h.control(config);
    let handle = tokio::spawn(async move { control.run().await });

    assert_reset(&next_command(&mut commands).await);

    let err = tokio::time::timeout(WAIT, handle)
        .await
        .expect("run must end after the peer hangs up")
        .unwrap()
        .unwrap_err();
    assert!(matches!(
        err.as_exchange(),
        Some(ExchangeError::PeerDisconnected { .. })
    ));
}

#[tokio::test]
async fn loop_waits_for_first_peer() {
    let h = Harness::start().await;
    let mut control = h.control(fast_config());
    let handle = tokio::spawn(async move { control.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());

    let mut commands = spawn_peer(connect_peer(h.peer_addr).await, None);
    assert_reset(&next_command(&mut commands).await);
    assert_step(&next_command(&mut commands).await, 0);
    handle.abort();
}

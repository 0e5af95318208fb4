//! Peer connection handle.
//!
//! A [`PeerConnection`] is the exchange-side half of one peer channel. The
//! transport side ([`PeerEndpoint`]) is owned by whatever task pumps the
//! actual socket: it receives the frames to deliver and pushes back the
//! frames the peer sent. Dropping the endpoint closes the connection, which
//! resolves any in-flight exchange with `PeerDisconnected`. A connection
//! whose reply timed out is abandoned: its reply stream can no longer be
//! paired with commands, so every later exchange fails fast.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use armbridge_core::error::ExchangeError;
use armbridge_core::exchange::ConnectionId;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

/// Frames buffered per direction.
const FRAME_BUFFER: usize = 16;

/// Exchange-side handle to one connected peer.
pub struct PeerConnection {
    id: ConnectionId,
    connected_at: DateTime<Utc>,
    /// Frames to the peer.
    outbound: mpsc::Sender<String>,
    /// Frames from the peer. Locked for a whole send→reply cycle so only
    /// one command is ever outstanding on this connection.
    inbound: Mutex<mpsc::Receiver<String>>,
    exchanges_sent: AtomicU64,
    /// Set once a reply wait times out.
    abandoned: AtomicBool,
}

/// Transport-side half of a peer connection.
pub struct PeerEndpoint {
    pub id: ConnectionId,
    /// Frames the transport must deliver to the peer.
    pub commands: mpsc::Receiver<String>,
    /// Frames the transport received from the peer.
    pub replies: mpsc::Sender<String>,
}

impl PeerConnection {
    /// Open a new connection, returning both halves.
    pub fn open() -> (Arc<Self>, PeerEndpoint) {
        let id = ConnectionId::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(FRAME_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(FRAME_BUFFER);

        let conn = Arc::new(Self {
            id,
            connected_at: Utc::now(),
            outbound: outbound_tx,
            inbound: Mutex::new(inbound_rx),
            exchanges_sent: AtomicU64::new(0),
            abandoned: AtomicBool::new(false),
        });
        let endpoint = PeerEndpoint {
            id,
            commands: outbound_rx,
            replies: inbound_tx,
        };
        (conn, endpoint)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Number of command frames sent on this connection.
    pub fn exchanges_sent(&self) -> u64 {
        self.exchanges_sent.load(Ordering::SeqCst)
    }

    /// Whether the transport side has gone away or a reply timed out.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed() || self.is_abandoned()
    }

    /// Whether a reply wait on this connection timed out.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Send one frame and wait for exactly one reply frame.
    ///
    /// Unsolicited frames queued while no exchange was outstanding are
    /// discarded before sending. A timed-out wait abandons the connection,
    /// so a late reply is never matched to a later command.
    pub async fn exchange(&self, frame: String, timeout: Duration) -> Result<String, ExchangeError> {
        let mut inbound = self.inbound.lock().await;
        if self.is_abandoned() {
            return Err(ExchangeError::PeerDisconnected {
                connection: self.id,
            });
        }

        loop {
            match inbound.try_recv() {
                Ok(stale) => {
                    warn!(connection = %self.id, bytes = stale.len(), "Discarding unsolicited frame");
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(ExchangeError::PeerDisconnected {
                        connection: self.id,
                    });
                }
            }
        }

        self.outbound
            .send(frame)
            .await
            .map_err(|_| ExchangeError::PeerDisconnected {
                connection: self.id,
            })?;
        let sent = self.exchanges_sent.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(connection = %self.id, exchange = sent, "Command sent, awaiting reply");

        match tokio::time::timeout(timeout, inbound.recv()).await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(ExchangeError::PeerDisconnected {
                connection: self.id,
            }),
            Err(_) => {
                self.abandoned.store(true, Ordering::SeqCst);
                warn!(connection = %self.id, "Reply timed out, abandoning connection");
                Err(ExchangeError::ReplyTimeout {
                    connection: self.id,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}

impl std::fmt::Debug for PeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerConnection")
            .field("id", &self.id)
            .field("connected_at", &self.connected_at)
            .field("exchanges_sent", &self.exchanges_sent())
            .field("closed", &self.is_closed())
            .finish()
    }
}

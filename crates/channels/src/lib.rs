//! Peer channel plumbing for armbridge.
//!
//! - **Connection** — exchange-side handle to one peer plus the transport
//!   endpoint a socket task pumps
//! - **Registry** — the set of live connections, safe under concurrent
//!   connect/disconnect
//! - **Bridge** — [`Exchange`](armbridge_core::Exchange) implementation that
//!   sends one command to a live peer and awaits its single reply

pub mod bridge;
pub mod connection;
pub mod registry;

pub use bridge::ExchangeBridge;
pub use connection::{PeerConnection, PeerEndpoint};
pub use registry::ConnectionRegistry;

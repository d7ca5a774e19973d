//! Transport abstraction layer for Cardhub.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the physical connection a player talks to the broker through. The broker
//! only needs ordered, reliable, framed delivery plus a liveness signal and
//! a close signal; anything that offers those can implement these traits.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One unit received from the remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Application data (a text or binary message).
    Data(Vec<u8>),

    /// A liveness frame (ping or pong). Carries no data, but proves the
    /// peer is still there.
    Heartbeat,
}

/// Accepts new incoming connections.
///
/// Accepting is split in two: [`accept`](Self::accept) only takes the next
/// raw connection off the listener, and [`Incoming::establish`] runs
/// whatever handshake the transport needs. A peer that stalls its
/// handshake then holds up only its own task, never the accept loop.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted connection that has not finished its handshake.
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;
}

/// A freshly accepted connection, before its handshake.
pub trait Incoming: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// Completes the handshake.
    fn establish(
        self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A single connection that can send and receive frames.
///
/// Every method returns a `Send` future so a connection can be driven from
/// spawned tasks. Reads and writes must be usable concurrently: one task
/// sits in [`recv`](Self::recv) while another calls [`send`](Self::send).
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one text frame to the remote peer.
    fn send(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Sends a keepalive ping.
    fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Frame>, Self::Error>> + Send;

    /// Closes the connection.
    ///
    /// Idempotent: only the first call sends a close frame, later calls
    /// return `Ok(())` immediately.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

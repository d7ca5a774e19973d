//! Unified error type for Cardhub.

use cardhub_protocol::ProtocolError;
use cardhub_room::RoomError;
use cardhub_session::SessionError;
use cardhub_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Every variant is transparent, so the display text is exactly the inner
/// error's. The hub relies on that: it sends `to_string()` to clients, and
/// engine messages must arrive unchanged.
#[derive(Debug, thiserror::Error)]
pub enum CardhubError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (decode, unknown action, bad card index).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (not identified, not in a game).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (unknown code, engine refusal).
    #[error(transparent)]
    Room(#[from] RoomError),
}

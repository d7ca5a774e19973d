//! Error types for the session layer.

use cardhub_protocol::{PlayerId, RoomCode};

/// Errors that can occur during session management.
///
/// Every variant is reported back to the client that caused it; none of
/// them closes the connection.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection has not sent `identify` yet, so there is no session
    /// to act on.
    #[error("identify first")]
    Unidentified,

    /// No session exists for the given player.
    #[error("no session for player {0}")]
    NotFound(PlayerId),

    /// The player is not seated in any room.
    #[error("player {0} is not in a game")]
    NotInGame(PlayerId),

    /// The player already sits in a room and may only be in one.
    #[error("player {0} is already in room {1}")]
    AlreadyInGame(PlayerId, RoomCode),
}

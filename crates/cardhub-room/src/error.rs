//! Error types for the room layer.

use cardhub_protocol::{RoomCode, SeatIndex};

use crate::EngineError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room is registered under this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Every code drawn for a new room was already in use.
    #[error("no free room code ({rooms} rooms, {code_len}-letter codes)")]
    NoFreeCode { code_len: usize, rooms: usize },

    /// The engine handed out a seat that is already occupied.
    #[error("seat {1} in room {0} is already taken")]
    SeatTaken(RoomCode, SeatIndex),

    /// The engine rejected the operation. Displays the engine's message
    /// unchanged.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The table or a hand could not be serialized.
    #[error("failed to render game state: {0}")]
    Render(#[source] serde_json::Error),
}

//! The `GameEngine` trait: the boundary between the broker and game rules.
//!
//! The broker never deals, scores or checks turn order itself. It seats
//! players through the engine, forwards `begin`/`play`/`fetch` to it, and
//! delivers whatever the engine asks to have delivered.

use cardhub_protocol::{Recipient, SeatIndex};
use serde::Serialize;

/// What an engine wants delivered after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The shared table state, sent as a `table` envelope.
    Table,

    /// Each recipient's own hand, sent as a `cards` envelope.
    Hand,
}

/// Deliveries requested by an engine operation.
pub type Outcome = Vec<(Recipient, Notice)>;

/// A rule violation reported by the engine.
///
/// The message is shown to the player as-is, so it should read like
/// something a player can act on ("not your turn", "room is full").
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    /// Creates an engine error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The message shown to the player.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// The rules of a card game, one instance per room.
///
/// Players are addressed by seat. The engine owns every piece of per-seat
/// game state (hand, score) so that a player who reconnects under the same
/// identifier finds it intact behind their old seat.
///
/// Methods are synchronous and expected to be quick: they run while the
/// broker's registry lock is held.
pub trait GameEngine: Send + 'static {
    /// Game-specific settings, shared by every room.
    type Config: Clone + Default + Send + Sync + 'static;

    /// A single card, as shown in a hand.
    type Card: Serialize;

    /// The shared, visible table state.
    type Table: Serialize;

    /// Creates the engine for a fresh room.
    fn new(config: &Self::Config) -> Self;

    /// Assigns a seat to a joining player.
    ///
    /// Reject here when the room is full or the game has already begun.
    /// The returned seat must not be one handed out before; the room
    /// refuses a reused seat with [`RoomError::SeatTaken`](crate::RoomError::SeatTaken).
    fn add_player(&mut self) -> Result<SeatIndex, EngineError>;

    /// Starts the game on behalf of `seat`.
    ///
    /// The engine decides whether enough seats are filled.
    fn start(&mut self, seat: SeatIndex) -> Result<Outcome, EngineError>;

    /// Plays the card at `card` in `seat`'s hand.
    fn play(&mut self, seat: SeatIndex, card: usize) -> Result<Outcome, EngineError>;

    /// Asks for `seat`'s hand to be resent.
    ///
    /// Default: deliver the hand to that seat only.
    fn fetch_hand(&mut self, seat: SeatIndex) -> Result<Outcome, EngineError> {
        Ok(vec![(Recipient::Seat(seat), Notice::Hand)])
    }

    /// A snapshot of the table.
    fn table(&self) -> Self::Table;

    /// A snapshot of `seat`'s hand. Empty for an unknown seat.
    fn hand(&self, seat: SeatIndex) -> Vec<Self::Card>;

    /// `seat`'s score. Default: 0.
    ///
    /// Read through [`Room::scores`](crate::Room::scores) and logged when
    /// the game finishes.
    fn score(&self, _seat: SeatIndex) -> u32 {
        0
    }

    /// Returns `true` once the game is over.
    ///
    /// Checked after every operation. Default: never.
    fn is_finished(&self) -> bool {
        false
    }
}

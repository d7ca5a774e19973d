//! Core protocol types for Cardhub's wire format.
//!
//! Every message on the wire is an [`Envelope`]: an action tag plus a
//! string payload. Clients send a handful of request actions; the broker
//! answers with a handful of reply actions. [`Action`] names all of them,
//! and [`Request`] is the typed form of an inbound envelope.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The client-chosen identifier of a player.
///
/// Identifiers are not validated or authenticated: whoever presents an
/// identifier in an `identify` request owns the matching session from then
/// on. Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Creates a `PlayerId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The short code that names a room.
///
/// Codes are handed to the room creator and typed in by friends who want
/// to join, so they are short letter strings rather than numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Creates a `RoomCode` from anything string-like.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of a seat inside a room, as assigned by the game engine.
pub type SeatIndex = usize;

// ---------------------------------------------------------------------------
// Recipient — who should receive an engine update?
// ---------------------------------------------------------------------------

/// Specifies which seats of a room should receive an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every occupied seat.
    All,

    /// One specific seat.
    Seat(SeatIndex),

    /// Every occupied seat except this one.
    AllExcept(SeatIndex),
}

impl Recipient {
    /// Returns `true` if `seat` is addressed by this recipient.
    pub fn includes(&self, seat: SeatIndex) -> bool {
        match *self {
            Self::All => true,
            Self::Seat(s) => s == seat,
            Self::AllExcept(s) => s != seat,
        }
    }
}

// ---------------------------------------------------------------------------
// Action — every tag that can appear on the wire
// ---------------------------------------------------------------------------

/// An envelope's action tag.
///
/// `start` and `join` travel in both directions: a client asks to start or
/// join, and the broker answers with the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Client → broker: bind this connection to a player identifier.
    Identify,
    /// Client → broker: create a room. Broker → client: the room code.
    Start,
    /// Client → broker: join a room. Broker → client: `wait` or an error.
    Join,
    /// Client → broker: begin the game in the current room.
    Begin,
    /// Client → broker: play the card at an index of the hand.
    Play,
    /// Client → broker: resend my hand.
    Fetch,
    /// Broker → client: serialized table state.
    Table,
    /// Broker → client: serialized hand.
    Cards,
    /// Broker → client: an error message.
    Error,
}

impl Action {
    /// Returns the wire tag for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identify => "identify",
            Self::Start => "start",
            Self::Join => "join",
            Self::Begin => "begin",
            Self::Play => "play",
            Self::Fetch => "fetch",
            Self::Table => "table",
            Self::Cards => "cards",
            Self::Error => "error",
        }
    }

    /// Parses a wire tag. Returns `None` for anything unrecognized.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "identify" => Self::Identify,
            "start" => Self::Start,
            "join" => Self::Join,
            "begin" => Self::Begin,
            "play" => Self::Play,
            "fetch" => Self::Fetch,
            "table" => Self::Table,
            "cards" => Self::Cards,
            "error" => Self::Error,
            _ => return None,
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Envelope — the top-level wire format
// ---------------------------------------------------------------------------

/// The payload of a successful `join` reply.
pub const JOIN_WAIT: &str = "wait";

/// The top-level message wrapper. Every message on the wire is an Envelope.
///
/// ```text
/// {"action": "play", "data": "2"}
/// {"action": "table", "data": "{\"played\":[...]}"}
/// ```
///
/// `data` is always a string: a bare scalar (room code, card index, error
/// text) or a serialized structure (table, hand), depending on `action`.
/// It may be omitted by clients, in which case it is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// The action tag, kept as a raw string so unknown tags survive
    /// decoding and can be answered with an error.
    pub action: String,

    /// The action's payload.
    #[serde(default)]
    pub data: String,
}

impl Envelope {
    /// Builds an envelope for a known action.
    pub fn new(action: Action, data: impl Into<String>) -> Self {
        Self {
            action: action.as_str().to_string(),
            data: data.into(),
        }
    }

    /// `start` reply carrying the room code.
    pub fn start(code: &RoomCode) -> Self {
        Self::new(Action::Start, code.as_str())
    }

    /// `join` reply for a successful join.
    pub fn join_wait() -> Self {
        Self::new(Action::Join, JOIN_WAIT)
    }

    /// `join` reply carrying the reason a join failed.
    pub fn join_failed(reason: impl Into<String>) -> Self {
        Self::new(Action::Join, reason)
    }

    /// `table` update carrying the serialized table.
    pub fn table(json: impl Into<String>) -> Self {
        Self::new(Action::Table, json)
    }

    /// `cards` update carrying the serialized hand.
    pub fn cards(json: impl Into<String>) -> Self {
        Self::new(Action::Cards, json)
    }

    /// `error` reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Action::Error, message)
    }

    /// Returns the parsed action tag, if it is a known one.
    pub fn action(&self) -> Option<Action> {
        Action::from_tag(&self.action)
    }
}

// ---------------------------------------------------------------------------
// Request — the typed form of an inbound envelope
// ---------------------------------------------------------------------------

/// A request a client can make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Bind this connection to a player, resuming their session if known.
    Identify(PlayerId),
    /// Create a room and sit in it.
    Start,
    /// Join an existing room by code.
    Join(RoomCode),
    /// Begin the game in the current room.
    Begin,
    /// Play the card at `card` in the player's hand.
    Play { card: usize },
    /// Resend the player's hand.
    Fetch,
}

impl TryFrom<Envelope> for Request {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let Some(action) = envelope.action() else {
            return Err(ProtocolError::UnknownAction(envelope.action));
        };

        match action {
            // The identifier is opaque: kept byte for byte, only refused
            // when there is nothing but whitespace.
            Action::Identify => {
                if envelope.data.trim().is_empty() {
                    return Err(ProtocolError::InvalidMessage(
                        "identify requires an identifier".into(),
                    ));
                }
                Ok(Self::Identify(PlayerId::new(envelope.data)))
            }
            Action::Start => Ok(Self::Start),
            Action::Join => Ok(Self::Join(RoomCode::new(envelope.data.trim()))),
            Action::Begin => Ok(Self::Begin),
            Action::Play => envelope
                .data
                .trim()
                .parse::<usize>()
                .map(|card| Self::Play { card })
                .map_err(|_| ProtocolError::InvalidCardIndex(envelope.data)),
            Action::Fetch => Ok(Self::Fetch),
            // Reply-only tags are not something a client may send.
            Action::Table | Action::Cards | Action::Error => {
                Err(ProtocolError::UnknownAction(envelope.action))
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

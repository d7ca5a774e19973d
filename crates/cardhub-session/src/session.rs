//! Session types: the data structures that represent one player.
//!
//! A "session" is the broker's record of a player. It outlives any single
//! connection and tracks:
//! - WHO the player is (`PlayerId`)
//! - WHERE their messages currently go (an [`Outbox`], if connected)
//! - WHICH room and seat they occupy
//!
//! The player's hand and score live in the room's engine under their seat,
//! so keeping `room` and `seat` is all it takes to resume after a drop.

use std::time::{Duration, Instant};

use cardhub_protocol::{Envelope, PlayerId, RoomCode, SeatIndex};
use cardhub_transport::ConnectionId;

use crate::{Delivery, Outbox};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session retention.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a disconnected player (and a room whose players are all
    /// disconnected) is kept before being reaped.
    ///
    /// Default: 30 minutes.
    pub retention: Duration,

    /// How often the server runs the reaper.
    ///
    /// Default: 60 seconds.
    pub reap_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(30 * 60),
            reap_interval: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Whether a session currently has a live connection.
///
/// ```text
///   Connected ──(connection lost)──→ Disconnected
///       ↑                                 │
///       └───────────(identify)────────────┘
/// ```
///
/// Nothing else changes on disconnect: room, seat, hand and score stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A connection is bound to this session.
    Connected,

    /// The last connection went away at `since`.
    Disconnected { since: Instant },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single player's session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which player this session belongs to.
    pub player: PlayerId,

    /// Whether a connection is currently bound.
    pub state: SessionState,

    /// The room the player sits in, if any.
    pub room: Option<RoomCode>,

    /// The player's seat inside `room`.
    pub seat: Option<SeatIndex>,

    /// Where envelopes for this player go. `None` while disconnected.
    pub(crate) outbox: Option<Outbox>,
}

impl Session {
    pub(crate) fn new(player: PlayerId, outbox: Outbox) -> Self {
        Self {
            player,
            state: SessionState::Connected,
            room: None,
            seat: None,
            outbox: Some(outbox),
        }
    }

    /// The connection currently bound to this session.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.outbox.as_ref().map(Outbox::id)
    }

    /// The bound connection's outbox.
    pub fn outbox(&self) -> Option<&Outbox> {
        self.outbox.as_ref()
    }

    /// Queues an envelope for the player.
    ///
    /// While disconnected the envelope is discarded; the resync sent on
    /// reconnect covers whatever was missed.
    pub fn send(&self, envelope: Envelope) -> Delivery {
        match &self.outbox {
            Some(outbox) => outbox.deliver(envelope),
            None => {
                tracing::debug!(
                    player = %self.player,
                    action = %envelope.action,
                    "player offline, envelope discarded"
                );
                Delivery::Closed
            }
        }
    }

    /// The room and seat the player occupies.
    pub fn seating(&self) -> Option<(&RoomCode, SeatIndex)> {
        match (&self.room, self.seat) {
            (Some(room), Some(seat)) => Some((room, seat)),
            _ => None,
        }
    }

    /// Returns `true` if the session has been disconnected for at least
    /// `retention` as of `now`.
    pub fn idle_for(&self, retention: Duration, now: Instant) -> bool {
        match self.state {
            SessionState::Connected => false,
            SessionState::Disconnected { since } => {
                now.saturating_duration_since(since) >= retention
            }
        }
    }

    pub(crate) fn detach(&mut self) {
        self.outbox = None;
        self.state = SessionState::Disconnected {
            since: Instant::now(),
        };
    }
}

//! The session manager: maps player identifiers to sessions.
//!
//! Responsibilities:
//! - Creating a session the first time an identifier is seen
//! - Re-binding an existing session to a new connection (reconnection)
//! - Knowing which player each live connection speaks for
//! - Recording room/seat assignments
//! - Forgetting players who have been gone too long
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself. It lives inside the hub,
//! which sits behind the server's single registry lock.

use std::collections::HashMap;
use std::time::Instant;

use cardhub_protocol::{PlayerId, RoomCode, SeatIndex};
use cardhub_transport::ConnectionId;

use crate::{Outbox, Session, SessionConfig, SessionError, SessionState};

/// What [`SessionManager::identify`] did.
#[derive(Debug)]
pub enum Identified {
    /// The identifier was new; a fresh session now exists.
    Created,

    /// The identifier already had a session, which is now bound to the
    /// new connection. `superseded` is the outbox of a different
    /// connection that was still bound to it, if any; the caller should
    /// close it.
    Resumed { superseded: Option<Outbox> },
}

/// Manages all player sessions.
///
/// ```text
/// identify() ──→ [Connected] ──disconnect()──→ [Disconnected]
///                     ↑                             │   │
///                     └──────── identify() ─────────┘   │
///                                                       ▼
///                                     expire_idle() (after retention)
/// ```
pub struct SessionManager {
    /// All sessions, keyed by player identifier.
    sessions: HashMap<PlayerId, Session>,

    /// Which player each live connection is bound to.
    ///
    /// Kept in sync with the `outbox` of every session: a connection is in
    /// here exactly when some session's outbox carries its id.
    bindings: HashMap<ConnectionId, PlayerId>,

    config: SessionConfig,
}

impl SessionManager {
    /// Creates a new, empty session manager with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            bindings: HashMap::new(),
            config,
        }
    }

    /// Binds `outbox`'s connection to `player`.
    ///
    /// Unknown identifiers get a new session. Known ones are resumed: the
    /// session keeps its room and seat and only its outbox changes. If the
    /// connection was bound to a different player before, that player is
    /// released first.
    pub fn identify(&mut self, player: PlayerId, outbox: Outbox) -> Identified {
        let conn_id = outbox.id();

        if let Some(previous) = self.bindings.get(&conn_id).cloned() {
            if previous != player {
                self.release(conn_id, &previous);
            }
        }

        match self.sessions.get_mut(&player) {
            Some(session) => {
                let superseded =
                    session.outbox.take().filter(|old| old.id() != conn_id);
                if let Some(old) = &superseded {
                    self.bindings.remove(&old.id());
                }
                session.outbox = Some(outbox);
                session.state = SessionState::Connected;
                self.bindings.insert(conn_id, player.clone());

                tracing::info!(
                    %player,
                    %conn_id,
                    room = ?session.room,
                    takeover = superseded.is_some(),
                    "session resumed"
                );
                Identified::Resumed { superseded }
            }
            None => {
                self.bindings.insert(conn_id, player.clone());
                self.sessions
                    .insert(player.clone(), Session::new(player.clone(), outbox));
                tracing::info!(%player, %conn_id, "session created");
                Identified::Created
            }
        }
    }

    /// Returns the player a connection is bound to.
    pub fn bound(&self, conn_id: ConnectionId) -> Option<&PlayerId> {
        self.bindings.get(&conn_id)
    }

    /// Unbinds a connection that went away.
    ///
    /// The session stays, marked disconnected. Returns the player the
    /// connection was bound to, if any.
    pub fn disconnect(&mut self, conn_id: ConnectionId) -> Option<PlayerId> {
        let player = self.bindings.get(&conn_id).cloned()?;
        self.release(conn_id, &player);
        tracing::info!(%player, %conn_id, "player disconnected");
        Some(player)
    }

    fn release(&mut self, conn_id: ConnectionId, player: &PlayerId) {
        self.bindings.remove(&conn_id);
        if let Some(session) = self.sessions.get_mut(player) {
            if session.connection() == Some(conn_id) {
                session.detach();
            }
        }
    }

    /// Records that `player` sits in `room` at `seat`.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] — no such session
    /// - [`SessionError::AlreadyInGame`] — the player is seated elsewhere
    pub fn assign_seat(
        &mut self,
        player: &PlayerId,
        room: RoomCode,
        seat: SeatIndex,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(player)
            .ok_or_else(|| SessionError::NotFound(player.clone()))?;
        if let Some(current) = &session.room {
            return Err(SessionError::AlreadyInGame(
                player.clone(),
                current.clone(),
            ));
        }
        session.room = Some(room);
        session.seat = Some(seat);
        Ok(())
    }

    /// Clears the player's room and seat.
    pub fn vacate(&mut self, player: &PlayerId) {
        if let Some(session) = self.sessions.get_mut(player) {
            session.room = None;
            session.seat = None;
        }
    }

    /// Returns the room and seat of a player.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] — no such session
    /// - [`SessionError::NotInGame`] — the player is not seated
    pub fn seating(
        &self,
        player: &PlayerId,
    ) -> Result<(RoomCode, SeatIndex), SessionError> {
        let session = self
            .sessions
            .get(player)
            .ok_or_else(|| SessionError::NotFound(player.clone()))?;
        session
            .seating()
            .map(|(room, seat)| (room.clone(), seat))
            .ok_or_else(|| SessionError::NotInGame(player.clone()))
    }

    /// Returns `true` if the player has no live connection and has been
    /// gone for at least the retention period. Unknown players count as
    /// idle.
    pub fn is_idle(&self, player: &PlayerId, now: Instant) -> bool {
        self.sessions
            .get(player)
            .is_none_or(|s| s.idle_for(self.config.retention, now))
    }

    /// Returns `true` if the player has no live connection.
    pub fn is_offline(&self, player: &PlayerId) -> bool {
        self.sessions
            .get(player)
            .is_none_or(|s| s.connection().is_none())
    }

    /// Removes every roomless session that has been disconnected for at
    /// least the retention period.
    ///
    /// Seated sessions are left alone: they go once their room is reaped
    /// and they have been vacated.
    pub fn expire_idle(&mut self, now: Instant) -> Vec<PlayerId> {
        let retention = self.config.retention;
        let mut expired = Vec::new();

        self.sessions.retain(|player, session| {
            if session.room.is_none() && session.idle_for(retention, now) {
                expired.push(player.clone());
                false
            } else {
                true
            }
        });

        for player in &expired {
            tracing::info!(%player, "session expired");
        }
        expired
    }

    /// Looks up a session by player identifier.
    pub fn get(&self, player: &PlayerId) -> Option<&Session> {
        self.sessions.get(player)
    }

    /// Returns the session config.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the number of sessions (any state).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

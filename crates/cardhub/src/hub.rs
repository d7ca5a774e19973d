//! The hub: the registry of sessions and rooms, and the dispatcher that
//! turns inbound envelopes into state changes and replies.
//!
//! Every method runs with exclusive access to the hub (the server keeps it
//! behind one `tokio::sync::Mutex`) and never awaits. Replies are handed to
//! outboxes, which never block, so holding the lock for a whole dispatch
//! is cheap.

use std::time::Instant;

use cardhub_protocol::{Envelope, PlayerId, Request, RoomCode, SeatIndex};
use cardhub_room::{GameEngine, RoomConfig, RoomError, RoomManager, RoomState, SeatEnvelope};
use cardhub_session::{Identified, Outbox, SessionConfig, SessionError, SessionManager};
use cardhub_transport::ConnectionId;

use crate::CardhubError;

/// Where a player is in the game flow.
///
/// ```text
/// (unknown) ──identify──→ Identified ──start/join──→ Waiting ──begin──→ Playing
/// ```
///
/// Disconnecting does not change the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Known, but not seated in any room.
    Identified,
    /// Seated in a room whose game has not begun.
    Waiting,
    /// Seated in a room whose game has begun (or ended).
    Playing,
}

/// What one reaper pass removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapReport {
    pub rooms: Vec<RoomCode>,
    pub sessions: Vec<PlayerId>,
}

impl ReapReport {
    /// Returns `true` if nothing was removed.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty() && self.sessions.is_empty()
    }
}

/// Sessions and rooms, plus the rules that tie them together.
///
/// Invariant: every session seated in a room names a registered room.
pub struct Hub<E: GameEngine> {
    sessions: SessionManager,
    rooms: RoomManager<E>,
}

impl<E: GameEngine> Hub<E> {
    /// Creates an empty hub.
    pub fn new(
        session_config: SessionConfig,
        room_config: RoomConfig,
        engine_config: E::Config,
    ) -> Self {
        Self {
            sessions: SessionManager::new(session_config),
            rooms: RoomManager::new(room_config, engine_config),
        }
    }

    // -- Dispatch ---------------------------------------------------------

    /// Handles one inbound envelope from the connection behind `outbox`.
    ///
    /// Never fails: every problem is reported to the sender as an envelope.
    pub fn dispatch(&mut self, outbox: &Outbox, envelope: Envelope) {
        tracing::debug!(conn_id = %outbox.id(), action = %envelope.action, "dispatching");

        let request = match Request::try_from(envelope) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(conn_id = %outbox.id(), error = ?e, "rejected envelope");
                outbox.deliver(Envelope::error(e.to_string()));
                return;
            }
        };

        match request {
            Request::Identify(player) => self.identify(outbox, player),
            Request::Start => self.as_player(outbox, |hub, player| {
                hub.start_new_game(player).map(drop)
            }),
            Request::Join(code) => self.as_player(outbox, |hub, player| {
                if let Err(e) = hub.join_room(player, &code) {
                    tracing::debug!(%player, %code, error = %e, "join failed");
                    hub.reply(player, Envelope::join_failed(e.to_string()));
                }
                Ok(())
            }),
            Request::Begin => self.as_player(outbox, |hub, player| hub.begin_game(player)),
            Request::Play { card } => {
                self.as_player(outbox, |hub, player| hub.play_card(player, card))
            }
            Request::Fetch => self.as_player(outbox, |hub, player| hub.fetch_hand(player)),
        }
    }

    /// Runs `op` for the player bound to `outbox`, turning an error into an
    /// `error` envelope. Unbound connections are told to identify first.
    fn as_player(
        &mut self,
        outbox: &Outbox,
        op: impl FnOnce(&mut Self, &PlayerId) -> Result<(), CardhubError>,
    ) {
        let Some(player) = self.sessions.bound(outbox.id()).cloned() else {
            outbox.deliver(Envelope::error(SessionError::Unidentified.to_string()));
            return;
        };
        if let Err(e) = op(self, &player) {
            tracing::debug!(%player, error = %e, "request failed");
            self.reply(&player, Envelope::error(e.to_string()));
        }
    }

    // -- Operations -------------------------------------------------------

    /// Binds the connection behind `outbox` to `player`.
    ///
    /// A known player is resumed: a connection still bound to them is
    /// closed, and if they sit in a room the new connection gets the table
    /// and then their hand.
    pub fn identify(&mut self, outbox: &Outbox, player: PlayerId) {
        let identified = self.sessions.identify(player.clone(), outbox.clone());
        let Identified::Resumed { superseded } = identified else {
            return;
        };

        if let Some(old) = superseded {
            tracing::info!(
                %player,
                old = %old.id(),
                new = %outbox.id(),
                "closing superseded connection"
            );
            old.close();
        }

        let Ok((code, seat)) = self.sessions.seating(&player) else {
            return;
        };
        match self.rooms.get(&code).and_then(|room| room.resync(seat)) {
            Ok(envelopes) => {
                tracing::info!(%player, %code, seat, "resyncing reconnected player");
                for envelope in envelopes {
                    outbox.deliver(envelope);
                }
            }
            Err(e) => tracing::warn!(%player, %code, error = %e, "resync failed"),
        }
    }

    /// Creates a room, seats `player` in it and sends them its code.
    ///
    /// A player who is already seated gets their current room's code again
    /// and nothing else changes.
    pub fn start_new_game(&mut self, player: &PlayerId) -> Result<RoomCode, CardhubError> {
        if let Ok((code, _)) = self.sessions.seating(player) {
            tracing::debug!(%player, %code, "already seated, re-announcing room");
            self.reply(player, Envelope::start(&code));
            return Ok(code);
        }
        if self.sessions.get(player).is_none() {
            return Err(SessionError::NotFound(player.clone()).into());
        }

        let code = self.rooms.create_room()?;
        let seat = match self.rooms.get_mut(&code).and_then(|room| room.seat(player.clone())) {
            Ok(seat) => seat,
            Err(e) => {
                self.rooms.remove(&code);
                return Err(e.into());
            }
        };
        self.sessions.assign_seat(player, code.clone(), seat)?;

        tracing::info!(%player, %code, seat, "game started");
        self.reply(player, Envelope::start(&code));
        Ok(code)
    }

    /// Seats `player` in the room named `code` and tells them to wait.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] — no such room
    /// - [`SessionError::AlreadyInGame`] — the player is seated already
    /// - [`RoomError::Engine`] — the engine refused the seat
    ///
    /// On error nothing changes.
    pub fn join_room(
        &mut self,
        player: &PlayerId,
        code: &RoomCode,
    ) -> Result<SeatIndex, CardhubError> {
        if !self.rooms.contains(code) {
            return Err(RoomError::NotFound(code.clone()).into());
        }
        let session = self
            .sessions
            .get(player)
            .ok_or_else(|| SessionError::NotFound(player.clone()))?;
        if let Some(current) = &session.room {
            return Err(SessionError::AlreadyInGame(player.clone(), current.clone()).into());
        }

        let seat = self.rooms.get_mut(code)?.seat(player.clone())?;
        self.sessions.assign_seat(player, code.clone(), seat)?;

        tracing::info!(%player, %code, seat, "player joined room");
        self.reply(player, Envelope::join_wait());
        Ok(seat)
    }

    /// Asks the engine to begin the game in `player`'s room.
    pub fn begin_game(&mut self, player: &PlayerId) -> Result<(), CardhubError> {
        let (code, seat) = self.sessions.seating(player)?;
        let out = self.rooms.get_mut(&code)?.begin(seat)?;
        self.deliver(&code, out);
        Ok(())
    }

    /// Plays card `card` from `player`'s hand.
    pub fn play_card(&mut self, player: &PlayerId, card: usize) -> Result<(), CardhubError> {
        let (code, seat) = self.sessions.seating(player)?;
        let out = self.rooms.get_mut(&code)?.play(seat, card)?;
        self.deliver(&code, out);
        Ok(())
    }

    /// Resends `player`'s hand.
    pub fn fetch_hand(&mut self, player: &PlayerId) -> Result<(), CardhubError> {
        let (code, seat) = self.sessions.seating(player)?;
        let out = self.rooms.get_mut(&code)?.fetch_hand(seat)?;
        self.deliver(&code, out);
        Ok(())
    }

    /// Forgets a connection that went away. Its session, if any, stays.
    pub fn disconnect(&mut self, conn_id: ConnectionId) {
        self.sessions.disconnect(conn_id);
    }

    /// Removes abandoned rooms and sessions.
    ///
    /// A room goes when none of its players is connected and either its
    /// game is over or all of them have been gone for the retention
    /// period; its players are unseated. Then every roomless session gone
    /// for the retention period goes.
    pub fn reap(&mut self, now: Instant) -> ReapReport {
        let abandoned: Vec<RoomCode> = self
            .rooms
            .iter()
            .filter(|room| {
                let offline = room.players().all(|(_, p)| self.sessions.is_offline(p));
                offline
                    && (room.state().is_finished()
                        || room.players().all(|(_, p)| self.sessions.is_idle(p, now)))
            })
            .map(|room| room.code().clone())
            .collect();

        for code in &abandoned {
            if let Some(room) = self.rooms.remove(code) {
                for (_, player) in room.players() {
                    self.sessions.vacate(player);
                }
            }
        }

        let report = ReapReport {
            rooms: abandoned,
            sessions: self.sessions.expire_idle(now),
        };
        if !report.is_empty() {
            tracing::info!(
                rooms = report.rooms.len(),
                sessions = report.sessions.len(),
                "reaped abandoned state"
            );
        }
        report
    }

    // -- Queries ----------------------------------------------------------

    /// Where `player` is in the game flow. `None` for unknown players.
    pub fn session_phase(&self, player: &PlayerId) -> Option<SessionPhase> {
        let session = self.sessions.get(player)?;
        let Some((code, _)) = session.seating() else {
            return Some(SessionPhase::Identified);
        };
        Some(match self.rooms.get(code).map(|room| room.state()) {
            Ok(RoomState::WaitingForPlayers) | Err(_) => SessionPhase::Waiting,
            Ok(RoomState::InProgress | RoomState::Finished) => SessionPhase::Playing,
        })
    }

    /// The connection that currently receives messages for `seat` in room
    /// `code`.
    pub fn seat_connection(&self, code: &RoomCode, seat: SeatIndex) -> Option<ConnectionId> {
        let player = self.rooms.get(code).ok()?.occupant(seat)?;
        self.sessions.get(player)?.connection()
    }

    /// The session manager, for inspection.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The room manager, for inspection.
    pub fn rooms(&self) -> &RoomManager<E> {
        &self.rooms
    }

    /// Number of registered rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of sessions, connected or not.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // -- Delivery ---------------------------------------------------------

    fn reply(&self, player: &PlayerId, envelope: Envelope) {
        if let Some(session) = self.sessions.get(player) {
            session.send(envelope);
        }
    }

    /// Sends each envelope to whoever sits in its seat right now.
    fn deliver(&self, code: &RoomCode, out: Vec<SeatEnvelope>) {
        let Ok(room) = self.rooms.get(code) else {
            return;
        };
        for (seat, envelope) in out {
            if let Some(player) = room.occupant(seat) {
                self.reply(player, envelope);
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Hub tests drive `dispatch` with envelopes, exactly as a pump would,
    //! and read what lands in each connection's outbox.

    use std::time::Duration;

    use cardhub_protocol::Recipient;
    use cardhub_room::{EngineError, Notice, Outcome};
    use cardhub_session::{OutboxReceiver, outbox};
    use serde::Serialize;

    use super::*;

    // -- Mock engine ------------------------------------------------------

    /// Up to three seats, three numbered cards each. Playing a card moves
    /// it from the hand to the table; the game ends when all hands are
    /// empty.
    struct Stack {
        hands: Vec<Vec<u32>>,
        table: Vec<u32>,
        started: bool,
    }

    #[derive(Serialize)]
    struct StackTable {
        played: Vec<u32>,
    }

    impl GameEngine for Stack {
        type Config = ();
        type Card = u32;
        type Table = StackTable;

        fn new(_: &()) -> Self {
            Self {
                hands: Vec::new(),
                table: Vec::new(),
                started: false,
            }
        }

        fn add_player(&mut self) -> Result<SeatIndex, EngineError> {
            if self.started {
                return Err(EngineError::new("game already started"));
            }
            if self.hands.len() == 3 {
                return Err(EngineError::new("room is full"));
            }
            let seat = self.hands.len() as u32;
            self.hands.push(vec![seat * 10 + 1, seat * 10 + 2, seat * 10 + 3]);
            Ok(self.hands.len() - 1)
        }

        fn start(&mut self, _seat: SeatIndex) -> Result<Outcome, EngineError> {
            if self.hands.len() < 2 {
                return Err(EngineError::new("not enough players"));
            }
            self.started = true;
            Ok(vec![(Recipient::All, Notice::Table), (Recipient::All, Notice::Hand)])
        }

        fn play(&mut self, seat: SeatIndex, card: usize) -> Result<Outcome, EngineError> {
            if !self.started {
                return Err(EngineError::new("game has not started"));
            }
            let hand = &mut self.hands[seat];
            if card >= hand.len() {
                return Err(EngineError::new("no such card"));
            }
            self.table.push(hand.remove(card));
            Ok(vec![(Recipient::All, Notice::Table), (Recipient::Seat(seat), Notice::Hand)])
        }

        fn table(&self) -> StackTable {
            StackTable {
                played: self.table.clone(),
            }
        }

        fn hand(&self, seat: SeatIndex) -> Vec<u32> {
            self.hands.get(seat).cloned().unwrap_or_default()
        }

        fn is_finished(&self) -> bool {
            self.started && self.hands.iter().all(Vec::is_empty)
        }
    }

    // -- Helpers ----------------------------------------------------------

    const RETENTION: Duration = Duration::from_secs(60);

    fn hub() -> Hub<Stack> {
        Hub::new(
            SessionConfig {
                retention: RETENTION,
                ..SessionConfig::default()
            },
            RoomConfig::default(),
            (),
        )
    }

    struct Client {
        outbox: Outbox,
        rx: OutboxReceiver,
    }

    impl Client {
        fn new(id: u64) -> Self {
            let (outbox, rx) = outbox(ConnectionId::new(id), 64);
            Self { outbox, rx }
        }

        fn send(&self, hub: &mut Hub<Stack>, action: &str, data: &str) {
            hub.dispatch(
                &self.outbox,
                Envelope {
                    action: action.into(),
                    data: data.into(),
                },
            );
        }

        fn drain(&mut self) -> Vec<Envelope> {
            std::iter::from_fn(|| self.rx.try_recv()).collect()
        }

        fn id(&self) -> ConnectionId {
            self.outbox.id()
        }
    }

    fn identified(hub: &mut Hub<Stack>, id: u64, name: &str) -> Client {
        let mut client = Client::new(id);
        client.send(hub, "identify", name);
        assert!(client.drain().is_empty());
        client
    }

    /// Alice starts a room, Bob joins, Alice begins. Outboxes are drained.
    fn playing(hub: &mut Hub<Stack>) -> (RoomCode, Client, Client) {
        let mut alice = identified(hub, 1, "alice");
        let mut bob = identified(hub, 2, "bob");
        alice.send(hub, "start", "");
        let code = RoomCode::new(alice.drain()[0].data.clone());
        bob.send(hub, "join", code.as_str());
        alice.send(hub, "begin", "");
        alice.drain();
        bob.drain();
        (code, alice, bob)
    }

    fn later() -> Instant {
        Instant::now() + RETENTION * 2
    }

    // =====================================================================
    // dispatch()
    // =====================================================================

    #[test]
    fn test_dispatch_unknown_action_returns_one_invalid_command() {
        let mut hub = hub();
        let mut anon = Client::new(1);
        let mut alice = identified(&mut hub, 2, "alice");

        anon.send(&mut hub, "dance", "");
        alice.send(&mut hub, "dance", "x");

        assert_eq!(anon.drain(), vec![Envelope::error("invalid command")]);
        assert_eq!(alice.drain(), vec![Envelope::error("invalid command")]);
    }

    #[test]
    fn test_dispatch_reply_only_action_is_invalid_command() {
        let mut hub = hub();
        let mut alice = identified(&mut hub, 1, "alice");

        alice.send(&mut hub, "table", "{}");

        assert_eq!(alice.drain(), vec![Envelope::error("invalid command")]);
    }

    #[test]
    fn test_dispatch_before_identify_returns_identify_first() {
        let mut hub = hub();
        let mut anon = Client::new(1);

        anon.send(&mut hub, "start", "");

        assert_eq!(anon.drain(), vec![Envelope::error("identify first")]);
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn test_dispatch_empty_identify_is_rejected() {
        let mut hub = hub();
        let mut anon = Client::new(1);

        anon.send(&mut hub, "identify", "  ");

        let replies = anon.drain();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].action, "error");
        assert_eq!(hub.session_count(), 0);
    }

    // =====================================================================
    // identify()
    // =====================================================================

    #[test]
    fn test_identify_new_player_creates_roomless_session_without_resync() {
        let mut hub = hub();
        let mut alice = Client::new(1);

        alice.send(&mut hub, "identify", "alice");

        assert!(alice.drain().is_empty());
        assert_eq!(hub.session_phase(&PlayerId::new("alice")), Some(SessionPhase::Identified));
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn test_identify_treats_identifiers_as_opaque() {
        let mut hub = hub();
        let (_code, _alice, _bob) = playing(&mut hub);
        let mut padded = Client::new(3);

        padded.send(&mut hub, "identify", " alice");

        assert!(padded.drain().is_empty(), "no resync for a different player");
        assert_eq!(hub.session_count(), 3);
        assert_eq!(hub.session_phase(&PlayerId::new(" alice")), Some(SessionPhase::Identified));
    }

    #[test]
    fn test_identify_reconnect_resyncs_table_then_hand() {
        let mut hub = hub();
        let (code, alice, _bob) = playing(&mut hub);
        alice.send(&mut hub, "play", "0");
        hub.disconnect(alice.id());

        let mut again = Client::new(10);
        again.send(&mut hub, "identify", "alice");

        assert_eq!(
            again.drain(),
            vec![
                Envelope::table(r#"{"played":[1]}"#),
                Envelope::cards("[2,3]"),
            ]
        );
        assert_eq!(hub.seat_connection(&code, 0), Some(ConnectionId::new(10)));
        assert_eq!(hub.session_phase(&PlayerId::new("alice")), Some(SessionPhase::Playing));
    }

    #[test]
    fn test_identify_reconnect_before_begin_resyncs_waiting_room() {
        let mut hub = hub();
        let mut alice = identified(&mut hub, 1, "alice");
        alice.send(&mut hub, "start", "");
        alice.drain();
        hub.disconnect(alice.id());

        let mut again = Client::new(2);
        again.send(&mut hub, "identify", "alice");

        let replies = again.drain();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], Envelope::table(r#"{"played":[]}"#));
        assert_eq!(replies[1], Envelope::cards("[1,2,3]"));
    }

    #[tokio::test]
    async fn test_identify_takeover_closes_old_connection() {
        let mut hub = hub();
        let (code, alice, _bob) = playing(&mut hub);

        let mut again = Client::new(10);
        again.send(&mut hub, "identify", "alice");

        tokio::time::timeout(Duration::from_secs(1), alice.rx.closed())
            .await
            .expect("old connection should be told to close");
        assert_eq!(again.drain().len(), 2);
        assert_eq!(hub.seat_connection(&code, 0), Some(ConnectionId::new(10)));

        // The old pump's late disconnect must not unbind the new one.
        hub.disconnect(alice.id());
        assert_eq!(hub.seat_connection(&code, 0), Some(ConnectionId::new(10)));
    }

    #[test]
    fn test_identify_reconnected_player_receives_later_updates() {
        let mut hub = hub();
        let (_code, mut alice, mut bob) = playing(&mut hub);
        hub.disconnect(alice.id());
        let mut again = Client::new(10);
        again.send(&mut hub, "identify", "alice");
        again.drain();

        bob.send(&mut hub, "play", "2");

        assert!(alice.drain().is_empty());
        assert_eq!(again.drain(), vec![Envelope::table(r#"{"played":[13]}"#)]);
        assert_eq!(bob.drain().len(), 2);
    }

    // =====================================================================
    // start_new_game()
    // =====================================================================

    #[test]
    fn test_start_sends_seven_letter_code_and_seats_creator() {
        let mut hub = hub();
        let mut alice = identified(&mut hub, 1, "alice");

        alice.send(&mut hub, "start", "");

        let replies = alice.drain();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].action, "start");
        assert_eq!(replies[0].data.len(), 7);
        assert!(replies[0].data.chars().all(|c| c.is_ascii_alphabetic()));
        let code = RoomCode::new(replies[0].data.clone());
        assert_eq!(hub.seat_connection(&code, 0), Some(alice.id()));
        assert_eq!(hub.session_phase(&PlayerId::new("alice")), Some(SessionPhase::Waiting));
    }

    #[test]
    fn test_start_twice_reannounces_same_room() {
        let mut hub = hub();
        let mut alice = identified(&mut hub, 1, "alice");
        alice.send(&mut hub, "start", "");
        let first = alice.drain();

        alice.send(&mut hub, "start", "");

        assert_eq!(alice.drain(), first);
        assert_eq!(hub.room_count(), 1);
    }

    #[test]
    fn test_start_from_many_players_gives_distinct_joinable_codes() {
        let mut hub = hub();
        let mut codes = std::collections::HashSet::new();
        for i in 0..50 {
            let mut client = identified(&mut hub, i, &format!("p{i}"));
            client.send(&mut hub, "start", "");
            codes.insert(client.drain()[0].data.clone());
        }
        assert_eq!(codes.len(), 50);

        for (i, code) in codes.iter().enumerate() {
            let mut joiner = identified(&mut hub, 100 + i as u64, &format!("j{i}"));
            joiner.send(&mut hub, "join", code);
            assert_eq!(joiner.drain(), vec![Envelope::join_wait()]);
        }
    }

    #[test]
    fn test_start_without_free_code_returns_error_and_leaves_player_roomless() {
        let mut hub: Hub<Stack> =
            Hub::new(SessionConfig::default(), RoomConfig { code_len: 0 }, ());
        let mut alice = identified(&mut hub, 1, "alice");
        let mut bob = identified(&mut hub, 2, "bob");
        alice.send(&mut hub, "start", "");
        assert_eq!(alice.drain(), vec![Envelope::start(&RoomCode::new(""))]);

        bob.send(&mut hub, "start", "");

        let reply = bob.drain();
        assert_eq!(reply.len(), 1);
        assert_eq!(reply[0].action, "error");
        assert!(reply[0].data.starts_with("no free room code"));
        assert_eq!(hub.room_count(), 1);
        assert_eq!(hub.session_phase(&PlayerId::new("bob")), Some(SessionPhase::Identified));
    }

    // =====================================================================
    // join_room()
    // =====================================================================

    #[test]
    fn test_join_unknown_code_replies_join_error_and_changes_nothing() {
        let mut hub = hub();
        let mut alice = identified(&mut hub, 1, "alice");

        alice.send(&mut hub, "join", "nothere");

        let replies = alice.drain();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].action, "join");
        assert!(!replies[0].data.is_empty());
        assert_ne!(replies[0].data, "wait");
        assert_eq!(hub.room_count(), 0);
        assert_eq!(hub.session_phase(&PlayerId::new("alice")), Some(SessionPhase::Identified));
    }

    #[test]
    fn test_join_while_seated_replies_already_in_game() {
        let mut hub = hub();
        let (code, mut alice, _bob) = playing(&mut hub);
        let mut carol = identified(&mut hub, 3, "carol");
        carol.send(&mut hub, "start", "");
        let other = carol.drain()[0].data.clone();

        alice.send(&mut hub, "join", &other);

        let replies = alice.drain();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].action, "join");
        assert!(replies[0].data.contains("already in room"));
        assert_eq!(hub.seat_connection(&code, 0), Some(alice.id()));
    }

    #[test]
    fn test_join_engine_refusal_is_passed_through_verbatim() {
        let mut hub = hub();
        let (code, _alice, _bob) = playing(&mut hub);
        let mut carol = identified(&mut hub, 3, "carol");

        carol.send(&mut hub, "join", code.as_str());

        assert_eq!(carol.drain(), vec![Envelope::join_failed("game already started")]);
        assert_eq!(hub.session_phase(&PlayerId::new("carol")), Some(SessionPhase::Identified));
    }

    // =====================================================================
    // begin / play / fetch
    // =====================================================================

    #[test]
    fn test_begin_sends_table_and_each_players_own_hand() {
        let mut hub = hub();
        let mut alice = identified(&mut hub, 1, "alice");
        let mut bob = identified(&mut hub, 2, "bob");
        alice.send(&mut hub, "start", "");
        let code = alice.drain()[0].data.clone();
        bob.send(&mut hub, "join", &code);
        bob.drain();

        bob.send(&mut hub, "begin", "");

        let table = Envelope::table(r#"{"played":[]}"#);
        assert_eq!(alice.drain(), vec![table.clone(), Envelope::cards("[1,2,3]")]);
        assert_eq!(bob.drain(), vec![table, Envelope::cards("[11,12,13]")]);
        assert_eq!(hub.session_phase(&PlayerId::new("bob")), Some(SessionPhase::Playing));
    }

    #[test]
    fn test_begin_rejected_by_engine_returns_error_message() {
        let mut hub = hub();
        let mut alice = identified(&mut hub, 1, "alice");
        alice.send(&mut hub, "start", "");
        alice.drain();

        alice.send(&mut hub, "begin", "");

        assert_eq!(alice.drain(), vec![Envelope::error("not enough players")]);
        assert_eq!(hub.session_phase(&PlayerId::new("alice")), Some(SessionPhase::Waiting));
    }

    #[test]
    fn test_play_without_room_returns_not_in_game() {
        let mut hub = hub();
        let mut alice = identified(&mut hub, 1, "alice");

        alice.send(&mut hub, "play", "0");
        alice.send(&mut hub, "fetch", "");
        alice.send(&mut hub, "begin", "");

        let replies = alice.drain();
        assert_eq!(replies.len(), 3);
        for reply in replies {
            assert_eq!(reply.action, "error");
            assert!(reply.data.contains("not in a game"));
        }
    }

    #[test]
    fn test_play_bad_index_returns_one_error_and_keeps_state() {
        let mut hub = hub();
        let (_code, mut alice, mut bob) = playing(&mut hub);

        alice.send(&mut hub, "play", "notanumber");

        let replies = alice.drain();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].action, "error");
        assert!(replies[0].data.contains("invalid card index"));
        assert!(bob.drain().is_empty());
        assert_eq!(hub.session_phase(&PlayerId::new("alice")), Some(SessionPhase::Playing));
    }

    #[test]
    fn test_play_engine_error_is_distinct_from_parse_error() {
        let mut hub = hub();
        let (_code, mut alice, _bob) = playing(&mut hub);

        alice.send(&mut hub, "play", "9");

        assert_eq!(alice.drain(), vec![Envelope::error("no such card")]);
    }

    #[test]
    fn test_fetch_resends_only_own_hand() {
        let mut hub = hub();
        let (_code, mut alice, mut bob) = playing(&mut hub);

        bob.send(&mut hub, "fetch", "");

        assert_eq!(bob.drain(), vec![Envelope::cards("[11,12,13]")]);
        assert!(alice.drain().is_empty());
    }

    #[test]
    fn test_updates_to_disconnected_player_are_discarded() {
        let mut hub = hub();
        let (_code, alice, mut bob) = playing(&mut hub);
        hub.disconnect(alice.id());

        bob.send(&mut hub, "play", "0");

        assert_eq!(bob.drain().len(), 2);
    }

    // =====================================================================
    // reap()
    // =====================================================================

    #[test]
    fn test_reap_keeps_room_with_a_connected_player() {
        let mut hub = hub();
        let (_code, alice, _bob) = playing(&mut hub);
        hub.disconnect(alice.id());

        let report = hub.reap(later());

        assert!(report.is_empty());
        assert_eq!(hub.room_count(), 1);
    }

    #[test]
    fn test_reap_removes_room_abandoned_past_retention() {
        let mut hub = hub();
        let (code, alice, bob) = playing(&mut hub);
        hub.disconnect(alice.id());
        hub.disconnect(bob.id());

        assert!(hub.reap(Instant::now()).is_empty());
        let report = hub.reap(later());

        assert_eq!(report.rooms, vec![code]);
        assert_eq!(hub.room_count(), 0);
        // Vacated in the same pass, so both sessions expire too.
        assert_eq!(report.sessions.len(), 2);
        assert_eq!(hub.session_count(), 0);
    }

    #[test]
    fn test_reap_removes_finished_room_once_everyone_left() {
        let mut hub = hub();
        let (code, alice, bob) = playing(&mut hub);
        for _ in 0..3 {
            alice.send(&mut hub, "play", "0");
            bob.send(&mut hub, "play", "0");
        }
        assert_eq!(hub.rooms().get(&code).unwrap().state(), RoomState::Finished);
        hub.disconnect(alice.id());
        hub.disconnect(bob.id());

        let report = hub.reap(Instant::now());

        assert_eq!(report.rooms, vec![code]);
        assert!(report.sessions.is_empty(), "sessions wait for retention");
        assert_eq!(hub.session_phase(&PlayerId::new("alice")), Some(SessionPhase::Identified));
    }

    #[test]
    fn test_reap_keeps_registry_invariant() {
        let mut hub = hub();
        let (_code, alice, bob) = playing(&mut hub);
        let carol = identified(&mut hub, 3, "carol");
        hub.disconnect(alice.id());
        hub.disconnect(bob.id());
        hub.disconnect(carol.id());

        hub.reap(later());

        for name in ["alice", "bob", "carol"] {
            if let Some(session) = hub.sessions().get(&PlayerId::new(name)) {
                if let Some(code) = &session.room {
                    assert!(hub.rooms().contains(code));
                }
            }
        }
    }
}

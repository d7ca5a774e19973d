//! A single room: its seats, its engine and its lifecycle state.
//!
//! Rooms are plain data owned by the [`RoomManager`](crate::RoomManager).
//! They run no task of their own; every operation happens inline while
//! the caller holds the registry lock.

use cardhub_protocol::{Envelope, PlayerId, RoomCode, SeatIndex};

use crate::{GameEngine, Notice, Outcome, RoomError, RoomState};

/// An envelope addressed to one seat.
pub type SeatEnvelope = (SeatIndex, Envelope);

/// One game instance.
pub struct Room<E: GameEngine> {
    code: RoomCode,

    /// Who sits where, indexed by the seat the engine handed out.
    /// `None` for seats the engine skipped.
    seats: Vec<Option<PlayerId>>,

    engine: E,
    state: RoomState,
}

impl<E: GameEngine> Room<E> {
    /// Creates an empty room around a fresh engine.
    pub fn new(code: RoomCode, engine: E) -> Self {
        Self {
            code,
            seats: Vec::new(),
            engine,
            state: RoomState::WaitingForPlayers,
        }
    }

    /// The room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// The room's lifecycle state.
    pub fn state(&self) -> RoomState {
        self.state
    }

    /// Read access to the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The player sitting at `seat`.
    pub fn occupant(&self, seat: SeatIndex) -> Option<&PlayerId> {
        self.seats.get(seat).and_then(Option::as_ref)
    }

    /// Every occupied seat with its player, in seat order.
    pub fn players(&self) -> impl Iterator<Item = (SeatIndex, &PlayerId)> + '_ {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(seat, player)| player.as_ref().map(|p| (seat, p)))
    }

    /// Number of occupied seats.
    pub fn player_count(&self) -> usize {
        self.players().count()
    }

    /// Asks the engine for a seat and puts `player` in it.
    ///
    /// The seat is the engine's choice, so it can only be checked after
    /// `add_player` returns. An engine that hands out an occupied seat is
    /// broken: the room refuses the player and keeps the current occupant.
    ///
    /// # Errors
    /// - [`RoomError::Engine`] — the engine refused (full, already begun)
    /// - [`RoomError::SeatTaken`] — the engine handed out an occupied seat
    pub fn seat(&mut self, player: PlayerId) -> Result<SeatIndex, RoomError> {
        let seat = self.engine.add_player()?;
        if self.occupant(seat).is_some() {
            tracing::error!(code = %self.code, %player, seat, "engine reused an occupied seat");
            return Err(RoomError::SeatTaken(self.code.clone(), seat));
        }
        if self.seats.len() <= seat {
            self.seats.resize(seat + 1, None);
        }
        tracing::debug!(code = %self.code, %player, seat, "player seated");
        self.seats[seat] = Some(player);
        Ok(seat)
    }

    /// Starts the game on behalf of `seat`.
    pub fn begin(&mut self, seat: SeatIndex) -> Result<Vec<SeatEnvelope>, RoomError> {
        let outcome = self.engine.start(seat)?;
        if self.state == RoomState::WaitingForPlayers {
            self.advance(RoomState::InProgress);
        }
        self.settle();
        self.render(outcome)
    }

    /// Plays card `card` from `seat`'s hand.
    pub fn play(
        &mut self,
        seat: SeatIndex,
        card: usize,
    ) -> Result<Vec<SeatEnvelope>, RoomError> {
        let outcome = self.engine.play(seat, card)?;
        self.settle();
        self.render(outcome)
    }

    /// Resends `seat`'s hand, or whatever else the engine decides.
    pub fn fetch_hand(&mut self, seat: SeatIndex) -> Result<Vec<SeatEnvelope>, RoomError> {
        let outcome = self.engine.fetch_hand(seat)?;
        self.render(outcome)
    }

    /// Every seated player's score, in seat order.
    pub fn scores(&self) -> Vec<(PlayerId, u32)> {
        self.players()
            .map(|(seat, player)| (player.clone(), self.engine.score(seat)))
            .collect()
    }

    /// The two envelopes a reconnecting player needs: `table`, then
    /// `cards` with their own hand.
    pub fn resync(&self, seat: SeatIndex) -> Result<[Envelope; 2], RoomError> {
        Ok([self.table_envelope()?, self.hand_envelope(seat)?])
    }

    fn table_envelope(&self) -> Result<Envelope, RoomError> {
        serde_json::to_string(&self.engine.table())
            .map(Envelope::table)
            .map_err(RoomError::Render)
    }

    fn hand_envelope(&self, seat: SeatIndex) -> Result<Envelope, RoomError> {
        serde_json::to_string(&self.engine.hand(seat))
            .map(Envelope::cards)
            .map_err(RoomError::Render)
    }

    /// Turns engine notices into per-seat envelopes, in notice order and
    /// then seat order. Notices for empty seats are dropped.
    fn render(&self, outcome: Outcome) -> Result<Vec<SeatEnvelope>, RoomError> {
        let mut out = Vec::new();
        for (recipient, notice) in outcome {
            let seats: Vec<SeatIndex> = self
                .players()
                .map(|(seat, _)| seat)
                .filter(|seat| recipient.includes(*seat))
                .collect();
            if seats.is_empty() {
                continue;
            }
            match notice {
                Notice::Table => {
                    let table = self.table_envelope()?;
                    out.extend(seats.into_iter().map(|seat| (seat, table.clone())));
                }
                Notice::Hand => {
                    for seat in seats {
                        out.push((seat, self.hand_envelope(seat)?));
                    }
                }
            }
        }
        Ok(out)
    }

    fn settle(&mut self) {
        if self.engine.is_finished() && self.state == RoomState::InProgress {
            self.advance(RoomState::Finished);
            tracing::info!(code = %self.code, scores = ?self.scores(), "game finished");
        }
    }

    fn advance(&mut self, target: RoomState) {
        debug_assert!(self.state.can_transition_to(target));
        tracing::info!(code = %self.code, from = %self.state, to = %target, "room state changed");
        self.state = target;
    }
}

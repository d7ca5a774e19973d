use cardhub::prelude::*;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Game types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Card {
    rank: u8, // 2..=14, ace high
    suit: Suit,
}

#[derive(Clone, Debug, Serialize)]
struct Played {
    seat: SeatIndex,
    card: Card,
}

#[derive(Debug, Serialize)]
pub struct Table {
    players: usize,
    turn: Option<SeatIndex>,
    trick: Vec<Played>,
    scores: Vec<u32>,
    last_winner: Option<SeatIndex>,
    finished: bool,
}

#[derive(Clone, Debug)]
pub struct HighCardConfig {
    max_players: usize,
    hand_size: usize,
}

impl Default for HighCardConfig {
    fn default() -> Self {
        Self {
            max_players: 4,
            hand_size: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Game logic
// ---------------------------------------------------------------------------

/// Everyone plays one card per trick, in seat order starting with the
/// last trick's winner. The highest rank takes the trick; on a tie the
/// earlier card wins.
struct HighCard {
    config: HighCardConfig,
    hands: Vec<Vec<Card>>,
    scores: Vec<u32>,
    trick: Vec<Played>,
    turn: Option<SeatIndex>,
    last_winner: Option<SeatIndex>,
}

impl HighCard {
    fn deck() -> Vec<Card> {
        let suits = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
        suits
            .iter()
            .flat_map(|&suit| (2..=14).map(move |rank| Card { rank, suit }))
            .collect()
    }

    fn deal(&mut self, mut deck: Vec<Card>) {
        for hand in &mut self.hands {
            let at = deck.len().saturating_sub(self.config.hand_size);
            *hand = deck.split_off(at);
            hand.sort_by_key(|c| c.rank);
        }
    }

    fn finish_trick(&mut self) {
        let Some(best) = self
            .trick
            .iter()
            .reduce(|best, p| if p.card.rank > best.card.rank { p } else { best })
        else {
            return;
        };
        let winner = best.seat;
        self.scores[winner] += 1;
        self.last_winner = Some(winner);
        self.trick.clear();
        self.turn = if self.hands.iter().all(Vec::is_empty) {
            None
        } else {
            Some(winner)
        };
    }
}

impl GameEngine for HighCard {
    type Config = HighCardConfig;
    type Card = Card;
    type Table = Table;

    fn new(config: &HighCardConfig) -> Self {
        Self {
            config: config.clone(),
            hands: Vec::new(),
            scores: Vec::new(),
            trick: Vec::new(),
            turn: None,
            last_winner: None,
        }
    }

    fn add_player(&mut self) -> Result<SeatIndex, EngineError> {
        if self.turn.is_some() || self.last_winner.is_some() {
            return Err(EngineError::new("game already started"));
        }
        if self.hands.len() >= self.config.max_players {
            return Err(EngineError::new("room is full"));
        }
        self.hands.push(Vec::new());
        self.scores.push(0);
        Ok(self.hands.len() - 1)
    }

    fn start(&mut self, _seat: SeatIndex) -> Result<Outcome, EngineError> {
        if self.turn.is_some() || self.last_winner.is_some() {
            return Err(EngineError::new("game already started"));
        }
        if self.hands.len() < 2 {
            return Err(EngineError::new("need at least two players"));
        }
        let mut deck = Self::deck();
        deck.shuffle(&mut rand::rng());
        self.deal(deck);
        self.turn = Some(0);
        tracing::debug!(players = self.hands.len(), "cards dealt");
        Ok(vec![(Recipient::All, Notice::Table), (Recipient::All, Notice::Hand)])
    }

    fn play(&mut self, seat: SeatIndex, card: usize) -> Result<Outcome, EngineError> {
        match self.turn {
            None if self.last_winner.is_some() => return Err(EngineError::new("game is over")),
            None => return Err(EngineError::new("game has not started")),
            Some(turn) if turn != seat => return Err(EngineError::new("not your turn")),
            Some(_) => {}
        }
        let hand = &mut self.hands[seat];
        if card >= hand.len() {
            return Err(EngineError::new("no such card in your hand"));
        }
        let card = hand.remove(card);
        self.trick.push(Played { seat, card });

        if self.trick.len() == self.hands.len() {
            self.finish_trick();
        } else {
            self.turn = Some((seat + 1) % self.hands.len());
        }
        Ok(vec![(Recipient::All, Notice::Table), (Recipient::Seat(seat), Notice::Hand)])
    }

    fn table(&self) -> Table {
        Table {
            players: self.hands.len(),
            turn: self.turn,
            trick: self.trick.clone(),
            scores: self.scores.clone(),
            last_winner: self.last_winner,
            finished: self.is_finished(),
        }
    }

    fn hand(&self, seat: SeatIndex) -> Vec<Card> {
        self.hands.get(seat).cloned().unwrap_or_default()
    }

    fn score(&self, seat: SeatIndex) -> u32 {
        self.scores.get(seat).copied().unwrap_or(0)
    }

    fn is_finished(&self) -> bool {
        self.turn.is_none() && self.last_winner.is_some()
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("CARDHUB_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    tracing::info!(%addr, "starting high-card server");

    let server = CardhubServer::<HighCard>::builder()
        .bind(&addr)
        .build()
        .await?;

    server.run().await?;
    Ok(())
}

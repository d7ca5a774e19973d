//! Rooms and the game engine boundary for Cardhub.
//!
//! A room is one game: a code players share, the seats they occupy, and
//! the engine that runs the rules. Rooms are plain data held by the
//! [`RoomManager`]; the hub above mutates them under its lock.
//!
//! # Key types
//!
//! - [`GameEngine`] — the trait game developers implement
//! - [`RoomManager`] — creates rooms under unique codes, looks them up
//! - [`Room`] — seats, engine and state of one game
//! - [`RoomState`] — lifecycle state machine
//! - [`RoomConfig`] — room settings (code length)

mod config;
mod engine;
mod error;
mod manager;
mod room;

pub use config::{RoomConfig, RoomState};
pub use engine::{EngineError, GameEngine, Notice, Outcome};
pub use error::RoomError;
pub use manager::{RoomManager, generate_code};
pub use room::{Room, SeatEnvelope};

//! Room manager: creates, tracks and looks up rooms by code.

use std::collections::HashMap;

use cardhub_protocol::RoomCode;
use rand::Rng;

use crate::{GameEngine, Room, RoomConfig, RoomError};

/// Letters a room code is drawn from.
const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Draws before `create_room` gives up on finding a free code.
const MAX_CODE_DRAWS: usize = 1024;

/// Owns every registered room.
///
/// Codes are unique among registered rooms: a freshly generated code that
/// collides with a live room is thrown away and drawn again. Once a room is
/// removed its code may come up again.
pub struct RoomManager<E: GameEngine> {
    rooms: HashMap<RoomCode, Room<E>>,
    config: RoomConfig,
    engine_config: E::Config,
}

impl<E: GameEngine> RoomManager<E> {
    /// Creates a new, empty room manager.
    pub fn new(config: RoomConfig, engine_config: E::Config) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            engine_config,
        }
    }

    /// Creates an empty room under a fresh code and returns the code.
    ///
    /// # Errors
    /// [`RoomError::NoFreeCode`] if no unused code turned up within a
    /// bounded number of draws (code space too small or full).
    pub fn create_room(&mut self) -> Result<RoomCode, RoomError> {
        let code = (0..MAX_CODE_DRAWS)
            .map(|_| generate_code(self.config.code_len))
            .find(|code| !self.rooms.contains_key(code))
            .ok_or(RoomError::NoFreeCode {
                code_len: self.config.code_len,
                rooms: self.rooms.len(),
            })?;

        let room = Room::new(code.clone(), E::new(&self.engine_config));
        self.rooms.insert(code.clone(), room);
        tracing::info!(%code, rooms = self.rooms.len(), "room created");
        Ok(code)
    }

    /// Looks up a room.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no room has this code.
    pub fn get(&self, code: &RoomCode) -> Result<&Room<E>, RoomError> {
        self.rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Looks up a room for mutation.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no room has this code.
    pub fn get_mut(&mut self, code: &RoomCode) -> Result<&mut Room<E>, RoomError> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Returns `true` if a room is registered under `code`.
    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Unregisters a room and hands it back.
    pub fn remove(&mut self, code: &RoomCode) -> Option<Room<E>> {
        let room = self.rooms.remove(code)?;
        tracing::info!(%code, state = %room.state(), "room removed");
        Some(room)
    }

    /// Iterates over all rooms.
    pub fn iter(&self) -> impl Iterator<Item = &Room<E>> + '_ {
        self.rooms.values()
    }

    /// Lists all registered codes.
    pub fn codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().cloned().collect()
    }

    /// Returns the number of registered rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if no rooms are registered.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Draws a random code of `len` ASCII letters.
pub fn generate_code(len: usize) -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    RoomCode(code)
}

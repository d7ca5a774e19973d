//! Room configuration and state machine.

use std::fmt;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Number of letters in a generated room code.
    ///
    /// Default: 7.
    pub code_len: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self { code_len: 7 }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Transitions are strictly ordered, no skipping states:
///
/// ```text
/// WaitingForPlayers → InProgress → Finished
/// ```
///
/// - **WaitingForPlayers**: created, seats being filled.
/// - **InProgress**: the engine accepted `begin`.
/// - **Finished**: the engine reports the game over. The room is kept
///   until the reaper finds all its players gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    WaitingForPlayers,
    InProgress,
    Finished,
}

impl RoomState {
    /// Returns the state that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::WaitingForPlayers => Some(Self::InProgress),
            Self::InProgress => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Returns `true` once the game is over.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

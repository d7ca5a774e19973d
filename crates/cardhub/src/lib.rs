//! # Cardhub
//!
//! Real-time session broker for multiplayer card games.
//!
//! Cardhub accepts WebSocket connections, groups players into rooms named
//! by short codes, routes their actions to a per-room game engine, and
//! lets a player who drops resume their seat by identifying again from a
//! new connection. Game developers implement a single [`GameEngine`]
//! trait; the broker handles connections, sessions and rooms.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardhub::prelude::*;
//!
//! // Implement GameEngine for your game, then:
//! // let server = CardhubServer::<MyGame>::builder()
//! //     .bind("0.0.0.0:8080")
//! //     .build()
//! //     .await?;
//! // server.run().await
//! ```

mod config;
mod error;
mod handler;
mod hub;
mod server;

pub use config::PumpConfig;
pub use error::CardhubError;
pub use handler::{SharedHub, handle_connection};
pub use hub::{Hub, ReapReport, SessionPhase};
pub use server::{CardhubServer, CardhubServerBuilder};

pub use cardhub_room::GameEngine;

pub use cardhub_protocol as protocol;
pub use cardhub_room as room;
pub use cardhub_session as session;
pub use cardhub_transport as transport;

pub mod prelude {
    //! Everything needed to write an engine and run a server.

    pub use cardhub_protocol::{Envelope, PlayerId, Recipient, RoomCode, SeatIndex};
    pub use cardhub_room::{EngineError, GameEngine, Notice, Outcome, RoomConfig, RoomState};
    pub use cardhub_session::SessionConfig;

    pub use crate::{CardhubError, CardhubServer, PumpConfig};
}

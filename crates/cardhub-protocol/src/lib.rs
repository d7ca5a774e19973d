//! Wire protocol for Cardhub.
//!
//! This crate defines the "language" that clients and the broker speak:
//!
//! - **Types** ([`Envelope`], [`Action`], [`Request`], [`PlayerId`],
//!   [`RoomCode`]) — the messages that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`encode_lines`]) — how
//!   those messages are converted to/from text.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! ```text
//! Transport (frames) → Protocol (Envelope / Request) → Hub (sessions, rooms)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, encode_lines};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Action, Envelope, JOIN_WAIT, PlayerId, Recipient, Request, RoomCode,
    SeatIndex,
};

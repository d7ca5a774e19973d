//! Player session management for Cardhub.
//!
//! This crate handles everything that belongs to a player rather than to a
//! connection:
//!
//! 1. **Identity** — a client-chosen [`PlayerId`](cardhub_protocol::PlayerId)
//!    maps to exactly one [`Session`]
//! 2. **Connection binding** — which connection currently speaks for which
//!    player ([`SessionManager`])
//! 3. **Reconnection** — a new connection presenting a known identifier
//!    takes over the session, room and seat included
//! 4. **Outbound queues** — the [`Outbox`] handle through which envelopes
//!    reach a player's connection
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub (above)  ← combines sessions and rooms under one lock
//!     ↕
//! Session Layer (this crate)  ← player identity and connection binding
//!     ↕
//! Protocol / Transport (below)  ← PlayerId, Envelope, ConnectionId
//! ```

mod error;
mod manager;
mod outbox;
mod session;

pub use error::SessionError;
pub use manager::{Identified, SessionManager};
pub use outbox::{Delivery, Outbox, OutboxReceiver, outbox};
pub use session::{Session, SessionConfig, SessionState};

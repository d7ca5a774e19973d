//! Error types for the protocol layer.
//!
//! Each crate in Cardhub defines its own error enum. A `ProtocolError`
//! always means the problem is in the shape of a message, never in the
//! network or in room state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: the frame is not a well-formed envelope.
    ///
    /// The pump logs and drops these; the connection stays open.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope's action tag is not one a client may send.
    ///
    /// The display text is fixed because it is sent to the client as-is;
    /// the offending tag is kept for logging.
    #[error("invalid command")]
    UnknownAction(String),

    /// A `play` payload that is not a decimal card index.
    #[error("invalid card index: {0:?}")]
    InvalidCardIndex(String),

    /// The message is recognized but violates a protocol rule,
    /// e.g. an `identify` with an empty identifier.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The broker never looks at encoded bytes itself: it asks a [`Codec`]
//! to turn envelopes and game snapshots into text and back. [`JsonCodec`]
//! is the only implementation today; it is what browser clients speak.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Envelope, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a single codec is shared by every
/// connection task and by the registry.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Serializes a value into a string.
    ///
    /// Envelope payloads and text frames are strings, so text codecs
    /// should override this to skip the UTF-8 check.
    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        let bytes = self.encode(value)?;
        String::from_utf8(bytes).map_err(|_| {
            ProtocolError::InvalidMessage("codec produced non UTF-8 output".into())
        })
    }
}

/// Encodes several envelopes into one newline-delimited text frame.
///
/// Order is preserved: the first envelope is the first line.
pub fn encode_lines<C: Codec>(
    codec: &C,
    envelopes: &[Envelope],
) -> Result<String, ProtocolError> {
    let mut out = String::new();
    for (i, envelope) in envelopes.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&codec.encode_text(envelope)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use cardhub_protocol::{Codec, Envelope, JsonCodec, RoomCode};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::start(&RoomCode::new("abcdefg"));
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }
}

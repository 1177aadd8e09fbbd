//! Body encoding for issuer requests and replies.
//!
//! The HTTP client in `rollcall-client` is generic over [`Codec`];
//! [`JsonCodec`] is what the issuer speaks today.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Turns wire shapes into request bodies and response bodies back into
/// wire shapes.
pub trait Codec: Send + Sync + 'static {
    /// Sent as both `Content-Type` and `Accept`.
    fn content_type(&self) -> &'static str;

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// [`ProtocolError::Decode`] for malformed or truncated bodies and for
    /// bodies of the wrong shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// JSON bodies via `serde_json` (feature `json`, on by default).
///
/// ```rust
/// use rollcall_protocol::{Codec, JsonCodec, MarkRequest, SessionId};
///
/// let codec = JsonCodec;
/// let request = MarkRequest {
///     session_id: SessionId::new("3f2a9c"),
/// };
///
/// let bytes = codec.encode(&request).unwrap();
/// assert_eq!(bytes, br#"{"sessionId":"3f2a9c"}"#);
///
/// let decoded: MarkRequest = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, request);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

//! Protocol-level errors: bytes that do not become a valid shape.

use crate::SessionId;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[cfg(feature = "json")]
    #[error("could not encode body: {0}")]
    Encode(serde_json::Error),

    /// Malformed, truncated, or the wrong shape for the endpoint.
    #[cfg(feature = "json")]
    #[error("could not decode body: {0}")]
    Decode(serde_json::Error),

    /// `expires_at` is not after `issued_at`.
    #[error("session {0} expires before it is issued")]
    InvertedLifetime(SessionId),

    /// The QR payload would not scan back to the session's id.
    #[error("session {0} payload does not match its id")]
    PayloadMismatch(SessionId),
}

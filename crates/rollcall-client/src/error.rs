use rollcall_protocol::{ApiError, ErrorKind, ProtocolError};

/// Errors that can occur when talking to the session issuer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The issuer understood the request and refused it.
    #[error("rejected: {0}")]
    Rejected(ApiError),

    /// The request never got a usable answer (connection, timeout, bad status
    /// without an error body).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The reply body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The HTTP client itself failed.
    #[cfg(feature = "http")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// The issuer's refusal reason, if this was a refusal.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Rejected(api) => Some(api.kind),
            _ => None,
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        Self::Rejected(err)
    }
}

#[cfg(feature = "local")]
impl From<rollcall_registry::RegistryError> for ClientError {
    fn from(err: rollcall_registry::RegistryError) -> Self {
        Self::Rejected(err.to_api_error())
    }
}

//! Error types for the registry.

use rollcall_protocol::{ApiError, ClassId, ErrorKind, SessionId, UserId};

/// Errors the issuer and ledger can refuse a request with.
///
/// Each variant maps onto a wire [`ErrorKind`] via [`RegistryError::kind`],
/// which is what clients see.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Bad credential, wrong role, not enrolled, or not the class's teacher.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No class is registered under this id.
    #[error("class {0} not found")]
    ClassNotFound(ClassId),

    /// The requested session length is outside the configured bounds.
    #[error("duration of {minutes} minutes is outside {min}..={max}")]
    InvalidDuration { minutes: u32, min: u32, max: u32 },

    /// No session was ever issued under this id.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The session's expiry has passed, or a newer session replaced it.
    #[error("session {0} has expired")]
    SessionExpired(SessionId),

    /// The student already has a record for this session.
    #[error("attendance already marked for {student} in session {session}")]
    AlreadyMarked { student: UserId, session: SessionId },
}

impl RegistryError {
    /// The wire-level category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::ClassNotFound(_) | Self::InvalidDuration { .. } => ErrorKind::InvalidRequest,
            Self::SessionNotFound(_) => ErrorKind::SessionNotFound,
            Self::SessionExpired(_) => ErrorKind::SessionExpired,
            Self::AlreadyMarked { .. } => ErrorKind::AlreadyMarked,
        }
    }

    /// The error body a client receives.
    pub fn to_api_error(&self) -> ApiError {
        ApiError::new(self.kind(), self.to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        err.to_api_error()
    }
}

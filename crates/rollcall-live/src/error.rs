//! Error types for the live screens.

use rollcall_client::ClientError;
use rollcall_protocol::{ClassId, ErrorKind};

/// Why a mark did not go through.
///
/// Every variant is recoverable from the screen's point of view: the
/// student can scan again or use the manual path. None of them is retried
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkError {
    #[error("This session has expired. Ask your teacher for a new code.")]
    SessionExpired,

    #[error("Invalid QR code, try again.")]
    SessionNotFound,

    /// Informational: the student is already on the list.
    #[error("Attendance already marked for this session.")]
    AlreadyMarked,

    #[error("You are not allowed to mark attendance for this class.")]
    Unauthorized,

    /// The request did not reach the issuer or its reply was unreadable.
    #[error("Could not reach the server: {0}")]
    Transport(String),

    /// Another mark from the same marker is still pending.
    #[error("A mark is already in progress.")]
    InFlight,
}

impl From<ClientError> for MarkError {
    fn from(err: ClientError) -> Self {
        match &err {
            ClientError::Rejected(api) => match api.kind {
                ErrorKind::SessionExpired => Self::SessionExpired,
                ErrorKind::SessionNotFound => Self::SessionNotFound,
                ErrorKind::AlreadyMarked => Self::AlreadyMarked,
                ErrorKind::Unauthorized => Self::Unauthorized,
                ErrorKind::InvalidRequest | ErrorKind::Internal => {
                    Self::Transport(api.message.clone())
                }
            },
            _ => Self::Transport(err.to_string()),
        }
    }
}

/// Errors from acquiring or using the camera.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    /// Another capture loop holds the lease.
    #[error("camera is in use by another scanner")]
    Busy,

    #[error("camera permission denied")]
    PermissionDenied,

    /// No device, or the device refused to start.
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    /// A single frame could not be grabbed.
    #[error("frame capture failed: {0}")]
    Capture(String),
}

/// Errors returned by a [`CaptureHandle`](crate::CaptureHandle).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// `start()` could not get the camera.
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// The operation was refused because a mark is being submitted.
    #[error("a mark is being submitted")]
    InFlight,

    /// The submitted mark failed.
    #[error(transparent)]
    Mark(#[from] MarkError),

    /// The capture loop has stopped.
    #[error("capture loop is unavailable")]
    Unavailable,
}

/// Errors returned by a [`PresenterHandle`](crate::PresenterHandle).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenterError {
    /// The presenter's task has stopped.
    #[error("presenter for class {0} is unavailable")]
    Unavailable(ClassId),
}

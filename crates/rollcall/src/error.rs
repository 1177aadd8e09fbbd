//! Unified error type for Rollcall.

use rollcall_client::ClientError;
use rollcall_live::{CameraError, CaptureError, MarkError, PresenterError};
use rollcall_protocol::ProtocolError;
use rollcall_qr::QrError;
use rollcall_registry::RegistryError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `rollcall` crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]` attribute
/// on each variant lets `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RollcallError {
    /// Encode, decode, or a malformed message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The in-memory issuer refused a request.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Talking to the issuer failed or was refused.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Symbol encoding or frame handling failed.
    #[error(transparent)]
    Qr(#[from] QrError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Mark(#[from] MarkError),

    #[error(transparent)]
    Presenter(#[from] PresenterError),

    /// Configuration could not be loaded or is incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

//! Client interface to the session issuer.
//!
//! The live screens never talk to the issuer directly. They go through the
//! [`AttendanceApi`] trait, which has two implementations:
//!
//! - `LocalApi` (feature `local`): in-process, wraps a `rollcall_registry::SessionRegistry`
//! - [`HttpApi`]: remote, speaks JSON over HTTP via `reqwest`
//!
//! Every call takes an explicit [`Credential`]. There is no process-wide
//! auth header to forget to set or to leak between users.
//!
//! # Feature Flags
//!
//! - `http` (default): the [`HttpApi`] client via `reqwest`
//! - `local` (default): the in-process `LocalApi` over `rollcall-registry`

mod error;
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "local")]
mod local;

pub use error::ClientError;
#[cfg(feature = "http")]
pub use http::HttpApi;
#[cfg(feature = "local")]
pub use local::LocalApi;

use std::future::Future;

use rollcall_protocol::{
    AttendanceRecord, ClassId, Credential, GenerateSession, MarkReceipt, Session, SessionId,
};

/// The operations the attendance screens need from the issuer.
///
/// Returned futures are `Send` so that actors can run calls inside spawned
/// tasks.
pub trait AttendanceApi: Send + Sync + 'static {
    /// Opens a new session for a class (teacher only). Supersedes the
    /// class's current session.
    fn generate_session(
        &self,
        credential: &Credential,
        request: &GenerateSession,
    ) -> impl Future<Output = Result<Session, ClientError>> + Send;

    /// The class's current session, or `None` when there is no live lecture.
    fn active_session(
        &self,
        credential: &Credential,
        class_id: ClassId,
    ) -> impl Future<Output = Result<Option<Session>, ClientError>> + Send;

    /// Marks the caller present for a session (student only).
    fn mark_attendance(
        &self,
        credential: &Credential,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<MarkReceipt, ClientError>> + Send;

    /// The caller's attendance records for a class.
    fn attendance_history(
        &self,
        credential: &Credential,
        class_id: ClassId,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, ClientError>> + Send;
}

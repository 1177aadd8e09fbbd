//! The live attendance screens.
//!
//! Two screens share this crate:
//!
//! - **Teacher**: a [`Presenter`] polls the issuer for the class's active
//!   session, counts it down locally, and renders the QR symbol to project.
//! - **Student**: the same presenter answers "is there a live lecture?",
//!   and a [`CaptureLoop`] samples the camera until a symbol decodes, then
//!   hands the session id to the [`AttendanceMarker`] exactly once.
//!
//! # Architecture
//!
//! ```text
//! Presenter actor
//!   poll timer ──→ JoinSet<active_session> ──→ SessionMachine ──→ watch<PresenterView>
//!   countdown timer ─────────────────────────↗
//!
//! CaptureLoop actor
//!   sampling timer ──→ CameraLease::capture ──→ SymbolCodec::decode_frame
//!                                                  │ payload
//!                                                  ▼
//!                      release camera ──→ AttendanceMarker::mark ──→ AttendanceApi
//! ```
//!
//! Each actor is one Tokio task with an `mpsc` command channel and
//! `oneshot` replies. Dropping the last handle stops the task and releases
//! everything it holds (timers, pending requests, the camera lease).

mod camera;
mod capture;
mod config;
mod error;
mod machine;
mod marker;
mod presenter;

pub use camera::{Camera, CameraLease, SharedCamera};
pub use capture::{CaptureHandle, CaptureLoop, CaptureState, CaptureStatus};
pub use config::LiveConfig;
pub use error::{CameraError, CaptureError, MarkError, PresenterError};
pub use machine::{Phase, PollOutcome, SessionMachine, SessionView, Snapshot};
pub use marker::{AttendanceMarker, Notice, Severity};
pub use presenter::{Presenter, PresenterHandle, PresenterView};

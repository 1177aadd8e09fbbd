//! # Rollcall
//!
//! QR-code classroom attendance.
//!
//! A teacher opens a short-lived session for a class; the session id is
//! projected as a QR symbol; students scan it and are marked present.
//! Rollcall is the client-side core of that flow plus an in-memory issuer:
//!
//! - [`protocol`]: ids, sessions, records, wire codec
//! - [`registry`]: the session issuer and attendance ledger
//! - [`client`]: [`AttendanceApi`](client::AttendanceApi), in-process or HTTP
//! - [`qr`]: symbol encoding and frame decoding
//! - [`live`]: presenter, capture loop, marker, camera lease
//! - [`tick`]: timers and clocks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rollcall::prelude::*;
//!
//! # async fn run() -> Result<(), RollcallError> {
//! rollcall::telemetry::init();
//!
//! let config = RollcallConfig::from_file("rollcall.toml".as_ref())?.with_env_overrides();
//! let api = Arc::new(config.http_api()?);
//! let credential = config.credential()?;
//!
//! let presenter = Presenter::new(api, credential, ClassId(7))
//!     .config(config.live_config())
//!     .render_with(Arc::new(QrCodec::new()))
//!     .spawn();
//! let view = presenter.view().await?;
//! println!("{:?}", view.snapshot.seconds_left);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
pub mod telemetry;

pub use config::{ApiSection, ConfigError, LiveSection, RegistrySection, RollcallConfig};
pub use error::RollcallError;

pub use rollcall_client as client;
pub use rollcall_live as live;
pub use rollcall_protocol as protocol;
pub use rollcall_qr as qr;
pub use rollcall_registry as registry;
pub use rollcall_tick as tick;

/// Everything a screen needs in one import.
pub mod prelude {
    pub use crate::{RollcallConfig, RollcallError};
    #[cfg(feature = "http")]
    pub use rollcall_client::HttpApi;
    pub use rollcall_client::{AttendanceApi, ClientError, LocalApi};
    pub use rollcall_live::{
        AttendanceMarker, Camera, CaptureHandle, CaptureLoop, CaptureState, LiveConfig, Notice,
        Phase, Presenter, PresenterHandle, SessionView, Severity, SharedCamera,
    };
    pub use rollcall_protocol::{
        ClassId, Credential, GenerateSession, Identity, JsonCodec, Role, Session, SessionId,
        UserId,
    };
    pub use rollcall_qr::{Frame, QrCodec, SymbolCodec};
    pub use rollcall_registry::{RegistryConfig, SessionRegistry, StaticAuthenticator};
    pub use rollcall_tick::{Clock, SharedClock, SystemClock, TokioClock};
}

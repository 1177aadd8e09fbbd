//! Session issuer and attendance ledger for Rollcall.
//!
//! The attendance screens treat the issuer as an external collaborator.
//! This crate is an in-memory implementation of that collaborator, used by
//! the in-process client, the demo, and the tests. It owns the invariants
//! the screens rely on but cannot enforce themselves:
//!
//! 1. **One active session per class**: generating a new one supersedes
//!    the old ([`SessionRegistry::generate`]).
//! 2. **Server-side expiry**: marks are checked against the registry's
//!    clock, never the client's ([`SessionRegistry::mark`]).
//! 3. **At most one record per (student, session)**: the second mark is
//!    refused with [`RegistryError::AlreadyMarked`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Live screens (presenter, capture loop, marker)
//!     ↕  AttendanceApi (rollcall-client)
//! Registry (this crate)  ← sessions, enrollment, records
//!     ↕
//! Protocol  ← ids, Session, AttendanceRecord
//! ```

mod auth;
mod error;
mod registry;
mod session;

pub use auth::{Authenticator, StaticAuthenticator};
pub use error::RegistryError;
pub use registry::SessionRegistry;
pub use session::{RegistryConfig, SessionEntry, SessionState};

//! Wire protocol for Rollcall.
//!
//! This crate defines the shapes that both sides of the attendance flow
//! agree on:
//!
//! - **Identity** ([`ClassId`], [`UserId`], [`SessionId`], [`Credential`]):
//!   who and what a request is about.
//! - **Sessions and records** ([`Session`], [`AttendanceRecord`]): the
//!   time-boxed credential a teacher opens and the proof a student was there.
//! - **Requests and replies** ([`GenerateSession`], [`MarkRequest`],
//!   [`MarkReceipt`], [`ApiError`]): what travels to and from the issuer.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those shapes become
//!   bytes.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about timers, cameras, or HTTP. It only
//! describes data and how to serialize it.
//!
//! ```text
//! Registry (issuer) ← Client (transport) ← Protocol (shapes) → Live (state machines)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ApiError, AttendanceRecord, AttendanceStatus, ClassId, Credential,
    ErrorKind, GenerateSession, Identity, MarkReceipt, MarkRequest,
    MarkStatus, Role, Session, SessionId, UserId,
};

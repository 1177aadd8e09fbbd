//! QR symbols for Rollcall.
//!
//! The presenter turns a session payload into a [`Symbol`] to show on the
//! projector. The capture loop feeds camera [`Frame`]s back through
//! [`SymbolCodec::decode_frame`] until one of them yields the payload.
//!
//! ```text
//! payload ──encode──→ Symbol ──(screen, camera)──→ Frame ──decode_frame──→ Decoded
//! ```
//!
//! Encoding uses the `qrcode` crate, decoding uses `rqrr`. Both sit behind
//! the [`SymbolCodec`] trait so the live screens can be tested with scripted
//! decoders instead of real pixels.

mod codec;
mod error;
mod frame;

pub use codec::{Decoded, QrCodec, SymbolCodec};
pub use error::QrError;
pub use frame::{Frame, Symbol};

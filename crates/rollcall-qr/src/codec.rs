//! The symbol codec: payload → picture → payload.

use image::Luma;
use qrcode::QrCode;

use crate::{Frame, QrError, Symbol};

/// What a single frame yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A readable symbol with UTF-8 content.
    Payload(String),
    /// No symbol, an unreadable symbol, or non-text content. The caller
    /// simply tries the next frame.
    NotFound,
}

/// Encodes payloads into symbols and reads them back out of frames.
///
/// Implementations must be pure: no retries, no backoff, no state carried
/// between frames. Sampling cadence belongs to the capture loop.
pub trait SymbolCodec: Send + Sync + 'static {
    /// Renders `payload` as a symbol. Same input, same output.
    ///
    /// # Errors
    /// [`QrError::EmptyPayload`] or [`QrError::Encode`] when it does not fit.
    fn encode(&self, payload: &str) -> Result<Symbol, QrError>;

    /// Looks for a symbol in one frame.
    fn decode_frame(&self, frame: &Frame) -> Decoded;
}

/// [`SymbolCodec`] backed by `qrcode` (encode) and `rqrr` (decode).
#[derive(Debug, Clone)]
pub struct QrCodec {
    /// Minimum rendered edge, in pixels.
    min_size: u32,
}

impl Default for QrCodec {
    fn default() -> Self {
        Self { min_size: 256 }
    }
}

impl QrCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders symbols at least `min_size` pixels wide.
    pub fn with_min_size(min_size: u32) -> Self {
        Self { min_size }
    }
}

impl SymbolCodec for QrCodec {
    fn encode(&self, payload: &str) -> Result<Symbol, QrError> {
        if payload.is_empty() {
            return Err(QrError::EmptyPayload);
        }
        let code = QrCode::new(payload.as_bytes())?;
        let image = code
            .render::<Luma<u8>>()
            .min_dimensions(self.min_size, self.min_size)
            .build();
        tracing::trace!(len = payload.len(), size = image.width(), "symbol rendered");
        Ok(Symbol::new(payload.to_owned(), image))
    }

    fn decode_frame(&self, frame: &Frame) -> Decoded {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width() as usize,
            frame.height() as usize,
            |x, y| frame.luma_at(x as u32, y as u32),
        );

        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, content)) => return Decoded::Payload(content),
                Err(e) => tracing::trace!(error = ?e, "grid found but unreadable"),
            }
        }
        Decoded::NotFound
    }
}

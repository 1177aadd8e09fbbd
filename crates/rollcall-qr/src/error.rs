/// Errors from encoding a symbol or handling frame buffers.
///
/// Failing to find a symbol in a frame is NOT an error; that is
/// [`Decoded::NotFound`](crate::Decoded::NotFound).
#[derive(Debug, thiserror::Error)]
pub enum QrError {
    /// There is nothing to encode.
    #[error("payload is empty")]
    EmptyPayload,

    /// The payload does not fit in any QR version.
    #[error("payload cannot be encoded: {0}")]
    Encode(#[from] qrcode::types::QrError),

    /// A frame's pixel buffer does not match its dimensions.
    #[error("frame buffer is {actual} bytes, expected {expected} for {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Rendering the symbol to an image format failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

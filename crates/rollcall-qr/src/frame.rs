//! Pixel buffers going in and out of the codec.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat};

use crate::QrError;

/// One greyscale still from a camera: `width * height` luma bytes, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    luma: Vec<u8>,
}

impl Frame {
    /// Wraps a raw luma buffer.
    ///
    /// # Errors
    /// [`QrError::FrameSize`] if `luma.len() != width * height`.
    pub fn new(width: u32, height: u32, luma: Vec<u8>) -> Result<Self, QrError> {
        let expected = width as usize * height as usize;
        if luma.len() != expected {
            return Err(QrError::FrameSize {
                width,
                height,
                expected,
                actual: luma.len(),
            });
        }
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    /// A uniform frame, e.g. a lens cap or an empty wall.
    pub fn blank(width: u32, height: u32, level: u8) -> Self {
        Self {
            width,
            height,
            luma: vec![level; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Luma at `(x, y)`. Out-of-range coordinates read as white.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return u8::MAX;
        }
        self.luma[y as usize * self.width as usize + x as usize]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.luma
    }
}

impl From<GrayImage> for Frame {
    fn from(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            luma: image.into_raw(),
        }
    }
}

/// A rendered QR symbol, ready to display.
#[derive(Debug, Clone)]
pub struct Symbol {
    payload: String,
    image: GrayImage,
}

impl Symbol {
    pub(crate) fn new(payload: String, image: GrayImage) -> Self {
        Self { payload, image }
    }

    /// The text this symbol encodes.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Rendered size in pixels, quiet zone included.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// What a perfect camera pointed at the screen would capture.
    pub fn to_frame(&self) -> Frame {
        Frame::from(self.image.clone())
    }

    /// PNG bytes, for an `<img>` tag or a "download QR code" button.
    pub fn to_png(&self) -> Result<Vec<u8>, QrError> {
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(self.image.clone())
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }
}

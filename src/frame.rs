//! Sampled video frames.

use std::io::Cursor;

use image::{ImageError, RgbImage};

use crate::configuration::ImageFormat;

/// One decoded RGB8 frame together with its absolute index in the video.
///
/// A `Frame` lives for a single pipeline iteration: it is encoded for the
/// detector, written to disk, and dropped.
#[derive(Debug, Clone)]
pub struct Frame {
    index: u64,
    image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    /// Absolute frame index in the source video.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Encode the pixel buffer into a compressed image.
    ///
    /// # Errors
    ///
    /// Returns the encoder's [`ImageError`].
    pub fn encode(&self, format: ImageFormat) -> Result<Vec<u8>, ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        self.image.write_to(&mut buffer, format.to_image_format())?;
        Ok(buffer.into_inner())
    }
}

//! Error types for the `framelabel` crate.
//!
//! Two error classes exist. [`FrameLabelError`] is fatal: it halts the run
//! and is returned from every fallible library operation. [`DetectionError`]
//! is recoverable: it describes why a single frame could not be labelled and
//! is carried inside [`DetectionOutcome::Failed`](crate::DetectionOutcome)
//! so the pipeline can continue with the next frame.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified fatal error type for all `framelabel` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameLabelError {
    /// The video file could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while writing output files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while encoding or saving a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// A sampling stride of zero was provided.
    #[error("Stride must be greater than zero")]
    InvalidStride,

    /// A configuration value is outside its accepted range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Credentials for the detection service were not found.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// The HTTP client for the detection service could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// The run was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for FrameLabelError {
    fn from(error: FfmpegError) -> Self {
        FrameLabelError::FfmpegError(error.to_string())
    }
}

/// Why labelling a single frame failed.
///
/// These errors never abort a batch. The pipeline logs them, writes an empty
/// label file for the frame, and moves on.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DetectionError {
    /// The frame could not be encoded into an image for upload.
    #[error("Failed to encode frame for upload: {0}")]
    Encode(String),

    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("Detection request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Detection service returned {status}: {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the service, or the raw body.
        message: String,
    },

    /// The response body could not be interpreted as a label list.
    #[error("Malformed detection response: {0}")]
    MalformedResponse(String),

    /// The request could not be signed.
    #[error("Failed to sign detection request: {0}")]
    Signing(String),
}

//! Pipeline configuration.
//!
//! [`PipelineConfig`] is a builder that carries every tunable of a run:
//! input path, output layout, sampling stride, detection thresholds, the
//! target class, and the operational hooks (progress callback, cancellation
//! token). A default-constructed config reproduces the stock behaviour:
//! every 10th frame of `./zebras.mp4`, at most 10 labels at 50% confidence,
//! `Zebra` instances written under `./data`.
//!
//! # Example
//!
//! ```no_run
//! use framelabel::{PipelineConfig, ReadFailurePolicy};
//!
//! let config = PipelineConfig::new("traffic.mp4")
//!     .with_output_dir("dataset")
//!     .with_stride(5)
//!     .with_target_class("Car")
//!     .with_min_confidence(70.0)
//!     .with_read_failure_policy(ReadFailurePolicy::Skip { max_consecutive: 3 });
//! config.validate()?;
//! # Ok::<(), framelabel::FrameLabelError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::FrameLabelError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default sampling stride, in frames.
pub const DEFAULT_STRIDE: u64 = 10;
/// Default upper bound on labels returned per frame.
pub const DEFAULT_MAX_LABELS: u32 = 10;
/// Default minimum label confidence, in percent.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 50.0;
/// Default class written to the label files.
pub const DEFAULT_TARGET_CLASS: &str = "Zebra";
/// Default input video.
pub const DEFAULT_VIDEO_PATH: &str = "./zebras.mp4";
/// Default output root.
pub const DEFAULT_OUTPUT_DIR: &str = "./data";

/// Image encoding used both for the upload and for the saved frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Lossy JPEG. This is the default.
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
}

impl ImageFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    /// Parse a user-supplied extension or format name.
    pub fn from_extension(value: &str) -> Option<Self> {
        match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

/// What the frame source does when the decoder fails at an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFailurePolicy {
    /// Treat the failure as end of stream. This is the default.
    #[default]
    Stop,
    /// Step past the failing index and keep reading, giving up after
    /// `max_consecutive` failures in a row.
    Skip {
        /// Consecutive failures tolerated before the source ends.
        max_consecutive: u32,
    },
}

/// Parameters sent with every detection request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionOptions {
    /// Maximum number of labels the service may return.
    pub max_labels: u32,
    /// Minimum confidence (0–100) for a label to be returned.
    pub min_confidence: f32,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            max_labels: DEFAULT_MAX_LABELS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl DetectionOptions {
    /// Check that both values are in range.
    pub fn validate(&self) -> Result<(), FrameLabelError> {
        if self.max_labels == 0 {
            return Err(FrameLabelError::InvalidConfiguration(
                "max_labels must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(FrameLabelError::InvalidConfiguration(format!(
                "min_confidence must be within 0..=100, got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }
}

/// Where the two parallel output trees live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Directory receiving `frame_NNNNNN.<ext>` images.
    pub images_dir: PathBuf,
    /// Directory receiving `frame_NNNNNN.txt` label files.
    pub labels_dir: PathBuf,
}

impl OutputLayout {
    /// `<root>/images` and `<root>/labels`.
    pub fn under<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            images_dir: root.join("images"),
            labels_dir: root.join("labels"),
        }
    }
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::under(DEFAULT_OUTPUT_DIR)
    }
}

/// Configuration for one labelling run.
///
/// Pass it to [`Pipeline::new`](crate::Pipeline::new) or
/// [`framelabel::run`](crate::run).
#[derive(Clone)]
pub struct PipelineConfig {
    pub(crate) video_path: PathBuf,
    pub(crate) layout: OutputLayout,
    pub(crate) stride: u64,
    pub(crate) detection: DetectionOptions,
    pub(crate) target_class: String,
    pub(crate) image_format: ImageFormat,
    pub(crate) read_failure: ReadFailurePolicy,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) batch_size: u64,
}

impl Debug for PipelineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineConfig")
            .field("video_path", &self.video_path)
            .field("layout", &self.layout)
            .field("stride", &self.stride)
            .field("detection", &self.detection)
            .field("target_class", &self.target_class)
            .field("image_format", &self.image_format)
            .field("read_failure", &self.read_failure)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_VIDEO_PATH)
    }
}

impl PipelineConfig {
    /// Create a configuration for `video_path` with default settings.
    pub fn new<P: AsRef<Path>>(video_path: P) -> Self {
        Self {
            video_path: video_path.as_ref().to_path_buf(),
            layout: OutputLayout::default(),
            stride: DEFAULT_STRIDE,
            detection: DetectionOptions::default(),
            target_class: DEFAULT_TARGET_CLASS.to_string(),
            image_format: ImageFormat::default(),
            read_failure: ReadFailurePolicy::default(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Write `images/` and `labels/` under `dir`.
    #[must_use]
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.layout = OutputLayout::under(dir);
        self
    }

    /// Set the two output directories independently.
    #[must_use]
    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sample every `stride`th frame. Zero is rejected by
    /// [`validate`](PipelineConfig::validate).
    #[must_use]
    pub fn with_stride(mut self, stride: u64) -> Self {
        self.stride = stride;
        self
    }

    #[must_use]
    pub fn with_max_labels(mut self, max_labels: u32) -> Self {
        self.detection.max_labels = max_labels;
        self
    }

    #[must_use]
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.detection.min_confidence = min_confidence;
        self
    }

    /// Label name whose instances are written. Matching is exact and
    /// case-sensitive.
    #[must_use]
    pub fn with_target_class<S: Into<String>>(mut self, target_class: S) -> Self {
        self.target_class = target_class.into();
        self
    }

    #[must_use]
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    #[must_use]
    pub fn with_read_failure_policy(mut self, policy: ReadFailurePolicy) -> Self {
        self.read_failure = policy;
        self
    }

    /// Attach a progress callback, fired every
    /// [`batch_size`](PipelineConfig::with_batch_size) frames.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token, checked before each frame.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn detection(&self) -> DetectionOptions {
        self.detection
    }

    pub fn target_class(&self) -> &str {
        &self.target_class
    }

    pub fn image_format(&self) -> ImageFormat {
        self.image_format
    }

    pub fn read_failure_policy(&self) -> ReadFailurePolicy {
        self.read_failure
    }

    /// Check every field that has a restricted range.
    ///
    /// # Errors
    ///
    /// - [`FrameLabelError::InvalidStride`] for a zero stride.
    /// - [`FrameLabelError::InvalidConfiguration`] for an empty target class
    ///   or out-of-range detection options.
    pub fn validate(&self) -> Result<(), FrameLabelError> {
        if self.stride == 0 {
            return Err(FrameLabelError::InvalidStride);
        }
        if self.target_class.is_empty() {
            return Err(FrameLabelError::InvalidConfiguration(
                "target_class must not be empty".to_string(),
            ));
        }
        self.detection.validate()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

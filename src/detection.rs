//! Detection results and the detector seam.
//!
//! A [`Detector`] turns encoded image bytes into a list of [`Detection`]s.
//! [`detect_frame`] wraps one call for the pipeline and returns a
//! [`DetectionOutcome`], so the caller decides explicitly what a failed frame
//! means instead of having the failure swallowed somewhere below it.

use serde::{Deserialize, Serialize};

use crate::{
    configuration::{DetectionOptions, ImageFormat},
    error::DetectionError,
    frame::Frame,
};

/// A normalized bounding box. Every field is a fraction of the frame's
/// width or height, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// One detected occurrence of a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    pub bounding_box: BoundingBox,
    /// Per-instance confidence, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Instance {
    pub fn new(bounding_box: BoundingBox) -> Self {
        Self {
            bounding_box,
            confidence: None,
        }
    }
}

/// A label returned for a frame, with zero or more located instances.
///
/// Scene-level labels such as `"Grassland"` come back with no instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Detection {
    pub name: String,
    /// Label confidence, 0–100.
    pub confidence: f32,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

impl Detection {
    pub fn new<S: Into<String>>(name: S, confidence: f32, instances: Vec<Instance>) -> Self {
        Self {
            name: name.into(),
            confidence,
            instances,
        }
    }

    /// Exact, case-sensitive name comparison.
    pub fn is_class(&self, class: &str) -> bool {
        self.name == class
    }
}

/// An object-detection backend.
pub trait Detector {
    /// Detect labels in one encoded image.
    fn detect(
        &self,
        image_bytes: &[u8],
        options: &DetectionOptions,
    ) -> Result<Vec<Detection>, DetectionError>;
}

impl<D: Detector + ?Sized> Detector for &D {
    fn detect(
        &self,
        image_bytes: &[u8],
        options: &DetectionOptions,
    ) -> Result<Vec<Detection>, DetectionError> {
        (**self).detect(image_bytes, options)
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(
        &self,
        image_bytes: &[u8],
        options: &DetectionOptions,
    ) -> Result<Vec<Detection>, DetectionError> {
        (**self).detect(image_bytes, options)
    }
}

/// Result of labelling one frame.
#[derive(Debug)]
#[must_use]
pub enum DetectionOutcome {
    /// The service answered; the list may be empty.
    Detected(Vec<Detection>),
    /// The frame could not be labelled.
    Failed(DetectionError),
}

impl DetectionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DetectionOutcome::Failed(_))
    }

    /// The detections to annotate with: the service's list on success, an
    /// empty list on failure.
    pub fn into_detections(self) -> Vec<Detection> {
        match self {
            DetectionOutcome::Detected(detections) => detections,
            DetectionOutcome::Failed(_) => Vec::new(),
        }
    }
}

impl From<Result<Vec<Detection>, DetectionError>> for DetectionOutcome {
    fn from(result: Result<Vec<Detection>, DetectionError>) -> Self {
        match result {
            Ok(detections) => DetectionOutcome::Detected(detections),
            Err(error) => DetectionOutcome::Failed(error),
        }
    }
}

/// Encode `frame` in `format` and run it through `detector`.
///
/// Never returns an error: encoding and service failures are reported as
/// [`DetectionOutcome::Failed`].
pub fn detect_frame<D: Detector + ?Sized>(
    detector: &D,
    frame: &Frame,
    options: &DetectionOptions,
    format: ImageFormat,
) -> DetectionOutcome {
    let bytes = match frame.encode(format) {
        Ok(bytes) => bytes,
        Err(error) => return DetectionOutcome::Failed(DetectionError::Encode(error.to_string())),
    };

    log::debug!(
        "Sending frame {} ({} bytes) for detection",
        frame.index(),
        bytes.len()
    );
    detector.detect(&bytes, options).into()
}

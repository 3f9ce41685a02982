//! Per-frame annotation output.
//!
//! [`AnnotationWriter`] turns one frame and its detections into two files:
//! a label file holding one line per instance of the target class, and the
//! frame image itself. Both are always written, even when nothing matched,
//! so a consumer can tell "no objects" (empty label file) from "frame not
//! processed" (no file at all).
//!
//! Write failures are fatal. Unlike detection failures, they are never
//! downgraded to a warning.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
};

use crate::{
    annotation::{AnnotationLine, image_file_name, label_file_name},
    configuration::{ImageFormat, OutputLayout},
    detection::Detection,
    error::FrameLabelError,
    frame::Frame,
};

/// What [`AnnotationWriter::write`] produced for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnnotations {
    pub frame_index: u64,
    pub label_path: PathBuf,
    pub image_path: PathBuf,
    /// Lines written to the label file.
    pub lines: Vec<AnnotationLine>,
}

impl FrameAnnotations {
    pub fn instance_count(&self) -> usize {
        self.lines.len()
    }
}

/// Writes label files and frame images into an [`OutputLayout`].
#[derive(Debug, Clone)]
pub struct AnnotationWriter {
    layout: OutputLayout,
    target_class: String,
    image_format: ImageFormat,
}

impl AnnotationWriter {
    /// Create a writer without touching the filesystem.
    pub fn new<S: Into<String>>(
        layout: OutputLayout,
        target_class: S,
        image_format: ImageFormat,
    ) -> Self {
        Self {
            layout,
            target_class: target_class.into(),
            image_format,
        }
    }

    /// Create a writer and make sure both output directories exist.
    ///
    /// # Errors
    ///
    /// Returns [`FrameLabelError::IoError`] if a directory cannot be created.
    pub fn create<S: Into<String>>(
        layout: OutputLayout,
        target_class: S,
        image_format: ImageFormat,
    ) -> Result<Self, FrameLabelError> {
        fs::create_dir_all(&layout.images_dir)?;
        fs::create_dir_all(&layout.labels_dir)?;
        Ok(Self::new(layout, target_class, image_format))
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn target_class(&self) -> &str {
        &self.target_class
    }

    pub fn label_path(&self, frame_index: u64) -> PathBuf {
        self.layout.labels_dir.join(label_file_name(frame_index))
    }

    pub fn image_path(&self, frame_index: u64) -> PathBuf {
        self.layout
            .images_dir
            .join(image_file_name(frame_index, self.image_format.extension()))
    }

    /// Annotation lines for the target class, in detection order.
    pub fn annotation_lines(&self, frame: &Frame, detections: &[Detection]) -> Vec<AnnotationLine> {
        let (width, height) = (frame.width(), frame.height());
        detections
            .iter()
            .filter(|detection| detection.is_class(&self.target_class))
            .flat_map(|detection| detection.instances.iter())
            .map(|instance| {
                AnnotationLine::from_bounding_box(&instance.bounding_box, width, height)
            })
            .collect()
    }

    /// Write the label file and the image for `frame`.
    ///
    /// Existing files with the same index are truncated and overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`FrameLabelError::IoError`] or
    /// [`FrameLabelError::ImageError`] if either file cannot be written.
    pub fn write(
        &self,
        frame: &Frame,
        detections: &[Detection],
    ) -> Result<FrameAnnotations, FrameLabelError> {
        let label_path = self.label_path(frame.index());
        let lines = self.annotation_lines(frame, detections);

        let mut label_file = BufWriter::new(File::create(&label_path)?);
        for line in &lines {
            writeln!(label_file, "{line}")?;
        }
        label_file.flush()?;

        let image_path = self.image_path(frame.index());
        frame
            .image()
            .save_with_format(&image_path, self.image_format.to_image_format())?;

        log::debug!(
            "Wrote {} annotation(s) to {} and image to {}",
            lines.len(),
            label_path.display(),
            image_path.display(),
        );

        Ok(FrameAnnotations {
            frame_index: frame.index(),
            label_path,
            image_path,
            lines,
        })
    }
}

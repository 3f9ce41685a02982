//! Annotation lines and output file naming.
//!
//! Label files use the plain-text center/extent box format understood by
//! common detector trainers: one `class cx cy w h` line per object, no
//! header. Coordinates here are absolute pixels.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::detection::BoundingBox;

/// Class id written at the start of every line.
pub const DEFAULT_CLASS_ID: u32 = 0;

/// One object in a label file, in absolute pixel units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationLine {
    pub class_id: u32,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl AnnotationLine {
    /// Convert a normalized box on a `frame_width` × `frame_height` frame.
    ///
    /// ```
    /// use framelabel::{AnnotationLine, BoundingBox};
    ///
    /// let bbox = BoundingBox { left: 0.25, top: 0.25, width: 0.5, height: 0.5 };
    /// let line = AnnotationLine::from_bounding_box(&bbox, 100, 200);
    /// assert_eq!(line.to_string(), "0 50.0 100.0 50.0 100.0");
    /// ```
    pub fn from_bounding_box(bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> Self {
        let frame_width = f64::from(frame_width);
        let frame_height = f64::from(frame_height);

        let left = bbox.left * frame_width;
        let top = bbox.top * frame_height;
        let width = bbox.width * frame_width;
        let height = bbox.height * frame_height;

        Self {
            class_id: DEFAULT_CLASS_ID,
            center_x: left + width / 2.0,
            center_y: top + height / 2.0,
            width,
            height,
        }
    }

    #[must_use]
    pub fn with_class_id(mut self, class_id: u32) -> Self {
        self.class_id = class_id;
        self
    }
}

impl Display for AnnotationLine {
    /// Values use the shortest representation that round-trips and always
    /// carry a fractional part (`50.0`, not `50`).
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} {:?} {:?} {:?} {:?}",
            self.class_id, self.center_x, self.center_y, self.width, self.height
        )
    }
}

/// File stem shared by a frame's image and label file: `frame_000007`.
pub fn frame_file_stem(frame_index: u64) -> String {
    format!("frame_{frame_index:06}")
}

/// `frame_000007.txt`
pub fn label_file_name(frame_index: u64) -> String {
    format!("{}.txt", frame_file_stem(frame_index))
}

/// `frame_000007.<extension>`
pub fn image_file_name(frame_index: u64, extension: &str) -> String {
    format!("{}.{extension}", frame_file_stem(frame_index))
}

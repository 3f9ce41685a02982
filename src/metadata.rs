//! Video metadata types.
//!
//! [`VideoMetadata`] is read once when a [`VideoFile`](crate::VideoFile) is
//! opened and cached for the lifetime of the handle. The pipeline uses the
//! frame count to estimate how many frames a run will sample.

use std::time::Duration;

/// Metadata for the video stream being labelled.
///
/// # Example
///
/// ```no_run
/// use framelabel::VideoFile;
///
/// let video = VideoFile::open("input.mp4")?;
/// let metadata = video.metadata();
/// println!("{}x{} @ {:.2} fps", metadata.width, metadata.height, metadata.frames_per_second);
/// # Ok::<(), framelabel::FrameLabelError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (may be approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Estimated total number of frames, computed from duration and frame rate.
    pub frame_count: u64,
    /// Total duration of the container.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

impl VideoMetadata {
    /// Number of frames a run with `stride` is expected to sample, or `None`
    /// when the frame count is unknown.
    pub fn sampled_frame_count(&self, stride: u64) -> Option<u64> {
        if self.frame_count == 0 || stride == 0 {
            return None;
        }
        Some(self.frame_count.div_ceil(stride))
    }
}

//! Internal utility functions.
//!
//! Pixel-data copying and timestamp conversion shared by the FFmpeg-backed
//! reader.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

use crate::error::FrameLabelError;

/// Copy an RGB24 FFmpeg frame into a tightly-packed buffer suitable for
/// [`image::RgbImage::from_raw`].
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Rescale a PTS value to a frame index.
///
/// Rounds to the nearest frame so that timestamps stored with a coarser time
/// base than the frame rate do not land one frame early.
pub(crate) fn pts_to_frame_number(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let seconds = pts_to_seconds(pts, time_base).max(0.0);
    (seconds * frames_per_second).round() as u64
}

/// Frame index of a decoded frame from its best-effort timestamp.
///
/// A frame without any timestamp cannot be placed, so it is an error rather
/// than frame 0.
pub(crate) fn decoded_frame_number(
    timestamp: Option<i64>,
    time_base: Rational,
    frames_per_second: f64,
) -> Result<u64, FrameLabelError> {
    let pts = timestamp.ok_or_else(|| {
        FrameLabelError::VideoDecodeError("Decoded frame carries no timestamp".to_string())
    })?;
    Ok(pts_to_frame_number(pts, time_base, frames_per_second))
}

/// Convert a frame index to a seek timestamp in AV_TIME_BASE (microseconds).
///
/// `Input::seek` seeks across all streams (`stream_index = -1`), which
/// expects AV_TIME_BASE rather than the stream time base.
pub(crate) fn frame_number_to_seek_timestamp(frame_number: u64, frames_per_second: f64) -> i64 {
    let seconds = frame_number as f64 / frames_per_second;
    (seconds * 1_000_000.0) as i64
}

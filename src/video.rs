//! FFmpeg-backed video access.
//!
//! [`VideoFile`] owns the demuxer context for one input video. It caches the
//! stream metadata at open time and decodes individual frames by absolute
//! index on request. Dropping the handle closes the input, so whoever owns
//! the `VideoFile` owns the decoder lifetime.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{error::FrameLabelError, frame_source::FrameReader, metadata::VideoMetadata};

/// An opened video file.
///
/// # Example
///
/// ```no_run
/// use framelabel::VideoFile;
///
/// let mut video = VideoFile::open("input.mp4")?;
/// if let Some(image) = video.read_frame(120)? {
///     image.save("frame_120.png")?;
/// }
/// # Ok::<(), framelabel::FrameLabelError>(())
/// ```
pub struct VideoFile {
    input_context: Input,
    video_stream_index: usize,
    time_base: Rational,
    metadata: VideoMetadata,
    file_path: PathBuf,
}

impl Debug for VideoFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFile")
            .field("file_path", &self.file_path)
            .field("video_stream_index", &self.video_stream_index)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl VideoFile {
    /// Open a video file and locate its best video stream.
    ///
    /// Initializes FFmpeg (idempotent) and caches [`VideoMetadata`].
    ///
    /// # Errors
    ///
    /// - [`FrameLabelError::FileOpen`] if the file cannot be opened or its
    ///   codec parameters cannot be read.
    /// - [`FrameLabelError::NoVideoStream`] if the file has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FrameLabelError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening video file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| FrameLabelError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| FrameLabelError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(FrameLabelError::NoVideoStream)?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder_context = CodecContext::from_parameters(stream.parameters()).map_err(|error| {
            FrameLabelError::FileOpen {
                path: file_path.clone(),
                reason: format!("Failed to read video codec parameters: {error}"),
            }
        })?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| FrameLabelError::FileOpen {
                path: file_path.clone(),
                reason: format!("Failed to create video decoder: {error}"),
            })?;

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            let rate = stream.rate();
            if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            }
        };

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let frame_count = if stream.frames() > 0 {
            stream.frames() as u64
        } else if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            duration,
            codec,
            format: input_context.format().name().to_string(),
        };

        log::info!(
            "Opened video file: {} ({}x{}, {:.2} fps, ~{} frames, codec={})",
            file_path.display(),
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            video_stream_index,
            time_base,
            metadata,
            file_path,
        })
    }

    /// Cached stream metadata.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Decode the frame at absolute index `frame_number` as RGB8.
    ///
    /// Seeks to the nearest keyframe at or before the target and decodes
    /// forward until a frame at or past the target appears. Returns
    /// `Ok(None)` when the stream ends first.
    ///
    /// # Errors
    ///
    /// Returns [`FrameLabelError::VideoDecodeError`] when the frame rate is
    /// unknown, or [`FrameLabelError::FfmpegError`] when seeking or decoding
    /// fails.
    pub fn read_frame(&mut self, frame_number: u64) -> Result<Option<RgbImage>, FrameLabelError> {
        let frames_per_second = self.metadata.frames_per_second;
        if frames_per_second <= 0.0 {
            return Err(FrameLabelError::VideoDecodeError(
                "Cannot seek by frame index: unknown frame rate".to_string(),
            ));
        }

        let stream = self
            .input_context
            .stream(self.video_stream_index)
            .ok_or(FrameLabelError::NoVideoStream)?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let mut scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let seek_timestamp =
            crate::utilities::frame_number_to_seek_timestamp(frame_number, frames_per_second);
        log::debug!("Seeking to frame {frame_number} (ts={seek_timestamp}us)");
        if let Err(error) = self.input_context.seek(seek_timestamp, ..seek_timestamp) {
            // Some demuxers refuse to seek past the last keyframe.
            let frame_count = self.metadata.frame_count;
            if frame_count > 0 && frame_number >= frame_count {
                log::debug!("Seek past end of stream to frame {frame_number} failed: {error}");
                return Ok(None);
            }
            return Err(error.into());
        }

        let time_base = self.time_base;
        let video_stream_index = self.video_stream_index;
        let mut decoded_frame = VideoFrame::empty();
        let mut rgb_frame = VideoFrame::empty();

        let reached_target = |frame: &VideoFrame| -> Result<bool, FrameLabelError> {
            let index = crate::utilities::decoded_frame_number(
                frame.timestamp().or(frame.pts()),
                time_base,
                frames_per_second,
            )?;
            Ok(index >= frame_number)
        };

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != video_stream_index {
                continue;
            }

            decoder.send_packet(&packet)?;

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                if reached_target(&decoded_frame)? {
                    scaler.run(&decoded_frame, &mut rgb_frame)?;
                    return rgb_frame_to_image(&rgb_frame, width, height).map(Some);
                }
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if reached_target(&decoded_frame)? {
                scaler.run(&decoded_frame, &mut rgb_frame)?;
                return rgb_frame_to_image(&rgb_frame, width, height).map(Some);
            }
        }

        log::debug!("Reached end of stream before frame {frame_number}");
        Ok(None)
    }
}

impl FrameReader for VideoFile {
    fn read_frame(&mut self, index: u64) -> Result<Option<RgbImage>, FrameLabelError> {
        VideoFile::read_frame(self, index)
    }

    fn frame_count_hint(&self) -> Option<u64> {
        (self.metadata.frame_count > 0).then_some(self.metadata.frame_count)
    }
}

fn rgb_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<RgbImage, FrameLabelError> {
    let buffer = crate::utilities::frame_to_rgb_buffer(rgb_frame, width, height);
    RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        FrameLabelError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })
}

//! Strided frame sampling.
//!
//! [`FrameSource`] walks a video at a fixed stride: index 0, then `stride`,
//! `2 * stride`, and so on. Every call to
//! [`next_frame`](FrameSource::next_frame) performs exactly one
//! seek-and-decode through a [`FrameReader`]; nothing is buffered.
//!
//! # Example
//!
//! ```no_run
//! use framelabel::{FrameSource, VideoFile};
//!
//! let video = VideoFile::open("input.mp4")?;
//! let mut source = FrameSource::new(video, 30)?;
//!
//! while let Some(frame) = source.next_frame()? {
//!     println!("frame {} is {}x{}", frame.index(), frame.width(), frame.height());
//! }
//! # Ok::<(), framelabel::FrameLabelError>(())
//! ```

use image::RgbImage;

use crate::{configuration::ReadFailurePolicy, error::FrameLabelError, frame::Frame};

/// Random access to decoded frames by absolute index.
///
/// [`VideoFile`](crate::VideoFile) is the FFmpeg-backed implementation.
pub trait FrameReader {
    /// Position at `index` and decode one frame.
    ///
    /// `Ok(None)` means the video has no frame at or after `index`.
    fn read_frame(&mut self, index: u64) -> Result<Option<RgbImage>, FrameLabelError>;

    /// Total number of frames, when known up front.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }
}

impl<R: FrameReader + ?Sized> FrameReader for &mut R {
    fn read_frame(&mut self, index: u64) -> Result<Option<RgbImage>, FrameLabelError> {
        (**self).read_frame(index)
    }

    fn frame_count_hint(&self) -> Option<u64> {
        (**self).frame_count_hint()
    }
}

/// Yields every `stride`th frame of a [`FrameReader`].
///
/// The source owns its reader, so the underlying decoder is released when
/// the source is dropped.
#[derive(Debug)]
pub struct FrameSource<R: FrameReader> {
    reader: R,
    next_index: u64,
    stride: u64,
    policy: ReadFailurePolicy,
    read_failures: u64,
    yielded: u64,
    finished: bool,
}

impl<R: FrameReader> FrameSource<R> {
    /// Create a source starting at frame 0.
    ///
    /// # Errors
    ///
    /// Returns [`FrameLabelError::InvalidStride`] if `stride` is zero.
    pub fn new(reader: R, stride: u64) -> Result<Self, FrameLabelError> {
        if stride == 0 {
            return Err(FrameLabelError::InvalidStride);
        }
        Ok(Self {
            reader,
            next_index: 0,
            stride,
            policy: ReadFailurePolicy::default(),
            read_failures: 0,
            yielded: 0,
            finished: false,
        })
    }

    #[must_use]
    pub fn with_read_failure_policy(mut self, policy: ReadFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Index the next call will try to read.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Number of indices at which the reader reported an error.
    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }

    /// Frames this source is expected to yield, if the reader knows its length.
    pub fn expected_frames(&self) -> Option<u64> {
        self.reader
            .frame_count_hint()
            .map(|count| count.div_ceil(self.stride))
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn into_reader(self) -> R {
        self.reader
    }

    /// Read the frame at the current target index and advance by the stride.
    ///
    /// Returns `Ok(None)` at end of stream. A decoder error is handled
    /// according to the [`ReadFailurePolicy`]: under `Stop` it also ends the
    /// stream, under `Skip` the failing index is stepped over.
    ///
    /// # Errors
    ///
    /// Returns the reader's error if the source gives up before yielding a
    /// single frame, since the video cannot be decoded at all.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameLabelError> {
        let mut consecutive_failures = 0u32;

        while !self.finished {
            let index = self.next_index;
            let result = self.reader.read_frame(index);

            self.next_index = match index.checked_add(self.stride) {
                Some(next) => next,
                None => {
                    self.finished = true;
                    index
                }
            };

            let error = match result {
                Ok(Some(image)) => {
                    self.yielded += 1;
                    return Ok(Some(Frame::new(index, image)));
                }
                Ok(None) => {
                    log::debug!("End of video reached at frame {index}");
                    self.finished = true;
                    break;
                }
                Err(error) => error,
            };

            self.read_failures += 1;
            consecutive_failures += 1;
            let give_up = match self.policy {
                ReadFailurePolicy::Stop => true,
                ReadFailurePolicy::Skip { max_consecutive } => {
                    consecutive_failures > max_consecutive
                }
            };

            if !give_up {
                log::warn!("Failed to read frame {index}, skipping: {error}");
                continue;
            }

            self.finished = true;
            if self.yielded == 0 {
                log::error!("No frame could be decoded, last failure at frame {index}: {error}");
                return Err(error);
            }
            log::warn!(
                "Failed to read frame {index} ({consecutive_failures} consecutive failure(s)), \
                 treating as end of video: {error}"
            );
        }

        Ok(None)
    }
}

impl<R: FrameReader> Iterator for FrameSource<R> {
    type Item = Result<Frame, FrameLabelError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

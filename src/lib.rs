//! # framelabel
//!
//! Turn a video into an object-detection training set. `framelabel` samples
//! every Nth frame, asks a cloud label detector (Amazon Rekognition
//! `DetectLabels`) what it sees, keeps the instances of one target class,
//! and writes them as center/extent box lines next to the frame image.
//!
//! Frame decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framelabel::PipelineConfig;
//!
//! // Reads AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY from the environment.
//! let config = PipelineConfig::new("zebras.mp4")
//!     .with_output_dir("data")
//!     .with_stride(10)
//!     .with_target_class("Zebra");
//! let summary = framelabel::run(config)?;
//! println!("wrote {} boxes", summary.instances_written);
//! # Ok::<(), framelabel::FrameLabelError>(())
//! ```
//!
//! produces
//!
//! ```text
//! data/images/frame_000000.jpg   data/labels/frame_000000.txt
//! data/images/frame_000010.jpg   data/labels/frame_000010.txt
//! ...
//! ```
//!
//! where each label line is `0 <center_x> <center_y> <width> <height>` in
//! pixels.
//!
//! ## Custom detectors and sources
//!
//! The pipeline is generic over [`FrameReader`] and [`Detector`], so either
//! end can be swapped:
//!
//! ```no_run
//! use framelabel::{
//!     Detection, DetectionError, DetectionOptions, Detector, Pipeline, PipelineConfig, VideoFile,
//! };
//!
//! struct NothingHere;
//!
//! impl Detector for NothingHere {
//!     fn detect(&self, _: &[u8], _: &DetectionOptions) -> Result<Vec<Detection>, DetectionError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! let pipeline = Pipeline::new(PipelineConfig::new("input.mp4"))?;
//! let summary = pipeline.run_with(VideoFile::open("input.mp4")?, &NothingHere)?;
//! # Ok::<(), framelabel::FrameLabelError>(())
//! ```
//!
//! ## Failure policy
//!
//! A detection failure (network, credentials, malformed response) never
//! aborts a run: the frame still gets its image and an empty label file.
//! A failure to open the video, to decode any frame of it at all, or to
//! write an output file is fatal.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod annotation;
pub mod configuration;
pub mod detection;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod frame_source;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod rekognition;
pub mod signing;
mod utilities;
pub mod video;
pub mod writer;

pub use annotation::{AnnotationLine, frame_file_stem, image_file_name, label_file_name};
pub use configuration::{
    DetectionOptions, ImageFormat, OutputLayout, PipelineConfig, ReadFailurePolicy,
};
pub use detection::{BoundingBox, Detection, DetectionOutcome, Detector, Instance, detect_frame};
pub use error::{DetectionError, FrameLabelError};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame::Frame;
pub use frame_source::{FrameReader, FrameSource};
pub use metadata::VideoMetadata;
pub use pipeline::{Pipeline, RunSummary, run};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use rekognition::{RekognitionClient, RekognitionConfig, parse_detect_labels_response};
pub use signing::{Credentials, RequestSigner};
pub use video::VideoFile;
pub use writer::{AnnotationWriter, FrameAnnotations};

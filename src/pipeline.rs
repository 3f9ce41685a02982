//! The frame → detector → annotation loop.
//!
//! [`Pipeline`] drives one run: it samples frames through a
//! [`FrameSource`], labels each one with a [`Detector`], and hands the
//! result to an [`AnnotationWriter`]. The loop is strictly sequential.
//!
//! Failure handling is split in two. A [`DetectionOutcome::Failed`] frame is
//! logged and annotated with an empty detection list, and the loop moves on.
//! Any [`FrameLabelError`] (opening the video, writing a file) stops the run
//! immediately.

use std::time::{Duration, Instant};

use crate::{
    configuration::PipelineConfig,
    detection::{DetectionOutcome, Detector, detect_frame},
    error::FrameLabelError,
    frame::Frame,
    frame_source::{FrameReader, FrameSource},
    progress::ProgressTracker,
    rekognition::RekognitionClient,
    video::VideoFile,
    writer::{AnnotationWriter, FrameAnnotations},
};

/// Totals for a completed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Frames written (image + label file).
    pub frames_processed: u64,
    /// Annotation lines written across all label files.
    pub instances_written: u64,
    /// Indices whose detection call failed; their label files are empty.
    pub failed_frames: Vec<u64>,
    /// Indices at which the decoder reported an error.
    pub read_failures: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn detection_failures(&self) -> usize {
        self.failed_frames.len()
    }
}

/// A validated, ready-to-run configuration.
///
/// # Example
///
/// ```no_run
/// use framelabel::{Pipeline, PipelineConfig, RekognitionClient};
///
/// let pipeline = Pipeline::new(PipelineConfig::new("zebras.mp4").with_stride(5))?;
/// let detector = RekognitionClient::from_env()?;
/// let summary = pipeline.run(&detector)?;
/// println!("{} frames, {} zebras", summary.frames_processed, summary.instances_written);
/// # Ok::<(), framelabel::FrameLabelError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// # Errors
    ///
    /// Returns the first validation error from
    /// [`PipelineConfig::validate`].
    pub fn new(config: PipelineConfig) -> Result<Self, FrameLabelError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Create the output directories and return a writer for them.
    pub fn writer(&self) -> Result<AnnotationWriter, FrameLabelError> {
        AnnotationWriter::create(
            self.config.layout.clone(),
            self.config.target_class.clone(),
            self.config.image_format,
        )
    }

    /// Label and write a single frame.
    ///
    /// Returns what was written together with whether detection failed.
    ///
    /// # Errors
    ///
    /// Only write failures are returned; detection failures are not errors.
    pub fn process_frame<D: Detector + ?Sized>(
        &self,
        detector: &D,
        writer: &AnnotationWriter,
        frame: &Frame,
    ) -> Result<(FrameAnnotations, bool), FrameLabelError> {
        let outcome = detect_frame(
            detector,
            frame,
            &self.config.detection,
            self.config.image_format,
        );

        let detection_failed = match &outcome {
            DetectionOutcome::Failed(error) => {
                log::warn!(
                    "Detection failed for frame {}, writing empty annotations: {error}",
                    frame.index()
                );
                true
            }
            DetectionOutcome::Detected(detections) => {
                log::debug!(
                    "Frame {}: {} label(s) returned",
                    frame.index(),
                    detections.len()
                );
                false
            }
        };

        let annotations = writer.write(frame, &outcome.into_detections())?;
        Ok((annotations, detection_failed))
    }

    /// Run the loop over frames from `reader`.
    ///
    /// # Errors
    ///
    /// - [`FrameLabelError::Cancelled`] if the cancellation token fires.
    /// - The reader's error if not a single frame can be decoded.
    /// - [`FrameLabelError::IoError`] / [`FrameLabelError::ImageError`] if
    ///   an output file cannot be written.
    pub fn run_with<R: FrameReader, D: Detector + ?Sized>(
        &self,
        reader: R,
        detector: &D,
    ) -> Result<RunSummary, FrameLabelError> {
        let started = Instant::now();
        let writer = self.writer()?;
        let mut source = FrameSource::new(reader, self.config.stride)?
            .with_read_failure_policy(self.config.read_failure);
        let mut tracker = ProgressTracker::new(
            self.config.progress.clone(),
            source.expected_frames(),
            self.config.batch_size,
        );
        let mut summary = RunSummary::default();

        log::info!(
            "Labelling every {} frame(s) for class {:?} into {} and {}",
            self.config.stride,
            self.config.target_class,
            self.config.layout.images_dir.display(),
            self.config.layout.labels_dir.display(),
        );

        loop {
            if self.config.is_cancelled() {
                log::warn!(
                    "Run cancelled after {} frame(s)",
                    summary.frames_processed
                );
                return Err(FrameLabelError::Cancelled);
            }

            let Some(frame) = source.next_frame()? else {
                break;
            };

            let (annotations, detection_failed) = self.process_frame(detector, &writer, &frame)?;

            log::info!(
                "Frame {}: {} instance(s) of {}",
                frame.index(),
                annotations.instance_count(),
                self.config.target_class
            );

            summary.frames_processed += 1;
            summary.instances_written += annotations.instance_count() as u64;
            if detection_failed {
                summary.failed_frames.push(frame.index());
            }
            tracker.advance(frame.index(), detection_failed);
        }

        tracker.finish();
        summary.read_failures = source.read_failures();
        summary.elapsed = started.elapsed();

        log::info!(
            "Processed {} frame(s), wrote {} instance(s), {} detection failure(s) in {:.2?}",
            summary.frames_processed,
            summary.instances_written,
            summary.detection_failures(),
            summary.elapsed,
        );

        Ok(summary)
    }

    /// Open the configured video and run the loop over it.
    ///
    /// The video handle is dropped before this returns, on success and on
    /// error alike.
    ///
    /// # Errors
    ///
    /// Everything [`run_with`](Pipeline::run_with) returns, plus
    /// [`FrameLabelError::FileOpen`] / [`FrameLabelError::NoVideoStream`]
    /// if the video cannot be opened.
    pub fn run<D: Detector + ?Sized>(&self, detector: &D) -> Result<RunSummary, FrameLabelError> {
        let video = VideoFile::open(&self.config.video_path)?;
        self.run_with(video, detector)
    }
}

/// Label a whole video with Amazon Rekognition, using credentials and region
/// from the environment.
///
/// # Errors
///
/// Returns [`FrameLabelError::MissingCredentials`] if the key pair is not
/// set, plus everything [`Pipeline::run`] returns.
pub fn run(config: PipelineConfig) -> Result<RunSummary, FrameLabelError> {
    let pipeline = Pipeline::new(config)?;
    let detector = RekognitionClient::from_env()?;
    pipeline.run(&detector)
}

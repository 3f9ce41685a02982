//! Strided sampling tests against an in-memory frame reader.

use std::collections::HashSet;

use framelabel::{FrameLabelError, FrameReader, FrameSource, ReadFailurePolicy};
use image::{Rgb, RgbImage};

/// Serves `len` tiny frames; indices in `broken` fail to decode.
struct FakeReader {
    len: u64,
    broken: HashSet<u64>,
    requested: Vec<u64>,
    report_len: bool,
}

impl FakeReader {
    fn new(len: u64) -> Self {
        Self {
            len,
            broken: HashSet::new(),
            requested: Vec::new(),
            report_len: true,
        }
    }

    fn with_broken(mut self, indices: &[u64]) -> Self {
        self.broken.extend(indices);
        self
    }
}

impl FrameReader for FakeReader {
    fn read_frame(&mut self, index: u64) -> Result<Option<RgbImage>, FrameLabelError> {
        self.requested.push(index);
        if self.broken.contains(&index) {
            return Err(FrameLabelError::VideoDecodeError(format!("corrupt packet at {index}")));
        }
        if index >= self.len {
            return Ok(None);
        }
        Ok(Some(RgbImage::from_pixel(4, 3, Rgb([index as u8, 0, 0]))))
    }

    fn frame_count_hint(&self) -> Option<u64> {
        self.report_len.then_some(self.len)
    }
}

fn indices<R: FrameReader>(source: FrameSource<R>) -> Vec<u64> {
    source
        .map(|frame| frame.expect("Read should succeed").index())
        .collect()
}

// ── Stride ───────────────────────────────────────────────────────

#[test]
fn yields_multiples_of_stride() {
    let source = FrameSource::new(FakeReader::new(25), 10).expect("Failed to create source");
    assert_eq!(indices(source), vec![0, 10, 20]);
}

#[test]
fn stride_one_yields_every_frame() {
    let source = FrameSource::new(FakeReader::new(4), 1).expect("Failed to create source");
    assert_eq!(indices(source), vec![0, 1, 2, 3]);
}

#[test]
fn stride_larger_than_video_yields_first_frame_only() {
    let source = FrameSource::new(FakeReader::new(5), 100).expect("Failed to create source");
    assert_eq!(indices(source), vec![0]);
}

#[test]
fn empty_video_yields_nothing() {
    let source = FrameSource::new(FakeReader::new(0), 3).expect("Failed to create source");
    assert!(indices(source).is_empty());
}

#[test]
fn zero_stride_is_rejected() {
    let result = FrameSource::new(FakeReader::new(10), 0);
    assert!(matches!(result, Err(FrameLabelError::InvalidStride)));
}

#[test]
fn frames_carry_decoded_pixels() {
    let mut source = FrameSource::new(FakeReader::new(10), 3).expect("Failed to create source");
    source
        .next_frame()
        .expect("Read should succeed")
        .expect("Expected frame 0");
    let frame = source
        .next_frame()
        .expect("Read should succeed")
        .expect("Expected frame 3");

    assert_eq!(frame.index(), 3);
    assert_eq!((frame.width(), frame.height()), (4, 3));
    assert_eq!(frame.image().get_pixel(0, 0), &Rgb([3, 0, 0]));
}

#[test]
fn exhausted_source_stays_exhausted() {
    let mut source = FrameSource::new(FakeReader::new(2), 2).expect("Failed to create source");
    assert!(matches!(source.next_frame(), Ok(Some(_))));
    assert!(matches!(source.next_frame(), Ok(None)));
    assert!(matches!(source.next_frame(), Ok(None)));

    // One read past the end, then no further reads.
    assert_eq!(source.reader().requested, vec![0, 2]);
}

#[test]
fn next_index_advances_by_stride() {
    let mut source = FrameSource::new(FakeReader::new(100), 7).expect("Failed to create source");
    assert_eq!(source.next_index(), 0);
    source.next_frame().expect("Read should succeed");
    assert_eq!(source.next_index(), 7);
    source.next_frame().expect("Read should succeed");
    assert_eq!(source.next_index(), 14);
    assert_eq!(source.stride(), 7);
}

// ── Expected frame count ─────────────────────────────────────────

#[test]
fn expected_frames_rounds_up() {
    let source = FrameSource::new(FakeReader::new(25), 10).expect("Failed to create source");
    assert_eq!(source.expected_frames(), Some(3));

    let source = FrameSource::new(FakeReader::new(30), 10).expect("Failed to create source");
    assert_eq!(source.expected_frames(), Some(3));
}

#[test]
fn expected_frames_unknown_without_hint() {
    let mut reader = FakeReader::new(25);
    reader.report_len = false;
    let source = FrameSource::new(reader, 10).expect("Failed to create source");
    assert_eq!(source.expected_frames(), None);
}

// ── Read failures ────────────────────────────────────────────────

#[test]
fn stop_policy_ends_at_first_failure() {
    let source = FrameSource::new(FakeReader::new(50).with_broken(&[20]), 10)
        .expect("Failed to create source");
    let mut source = source.with_read_failure_policy(ReadFailurePolicy::Stop);

    let mut seen = Vec::new();
    while let Some(frame) = source.next_frame().expect("Read should succeed") {
        seen.push(frame.index());
    }

    assert_eq!(seen, vec![0, 10]);
    assert_eq!(source.read_failures(), 1);
}

#[test]
fn skip_policy_steps_over_failures() {
    let source = FrameSource::new(FakeReader::new(50).with_broken(&[10, 30]), 10)
        .expect("Failed to create source")
        .with_read_failure_policy(ReadFailurePolicy::Skip { max_consecutive: 1 });

    let mut source = source;
    let mut seen = Vec::new();
    while let Some(frame) = source.next_frame().expect("Read should succeed") {
        seen.push(frame.index());
    }

    assert_eq!(seen, vec![0, 20, 40]);
    assert_eq!(source.read_failures(), 2);
}

#[test]
fn skip_policy_gives_up_after_consecutive_failures() {
    let mut source = FrameSource::new(FakeReader::new(100).with_broken(&[1, 2, 3]), 1)
        .expect("Failed to create source")
        .with_read_failure_policy(ReadFailurePolicy::Skip { max_consecutive: 2 });

    let mut seen = Vec::new();
    while let Some(frame) = source.next_frame().expect("Read should succeed") {
        seen.push(frame.index());
    }

    assert_eq!(seen, vec![0]);
    assert_eq!(source.read_failures(), 3);
}

#[test]
fn skip_with_zero_tolerance_behaves_like_stop() {
    let source = FrameSource::new(FakeReader::new(10).with_broken(&[2]), 1)
        .expect("Failed to create source")
        .with_read_failure_policy(ReadFailurePolicy::Skip { max_consecutive: 0 });

    assert_eq!(indices(source), vec![0, 1]);
}

#[test]
fn into_reader_returns_the_reader() {
    let mut source = FrameSource::new(FakeReader::new(3), 1).expect("Failed to create source");
    source.next_frame().expect("Read should succeed");
    let reader = source.into_reader();
    assert_eq!(reader.requested, vec![0]);
}

#[test]
fn failure_before_any_frame_is_an_error() {
    let mut source = FrameSource::new(FakeReader::new(10).with_broken(&[0]), 5)
        .expect("Failed to create source");

    let result = source.next_frame();
    assert!(matches!(result, Err(FrameLabelError::VideoDecodeError(_))));
    assert_eq!(source.read_failures(), 1);

    // The source is finished after reporting the error.
    assert!(matches!(source.next_frame(), Ok(None)));
}

#[test]
fn skip_policy_exhausted_before_any_frame_is_an_error() {
    let source = FrameSource::new(FakeReader::new(10).with_broken(&[0, 1, 2]), 1)
        .expect("Failed to create source")
        .with_read_failure_policy(ReadFailurePolicy::Skip { max_consecutive: 2 });

    let results: Vec<_> = source.collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[test]
fn skip_policy_recovers_from_leading_failure() {
    let source = FrameSource::new(FakeReader::new(4).with_broken(&[0]), 1)
        .expect("Failed to create source")
        .with_read_failure_policy(ReadFailurePolicy::Skip { max_consecutive: 1 });

    assert_eq!(indices(source), vec![1, 2, 3]);
}

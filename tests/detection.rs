//! Detection result parsing and outcome tests.

use framelabel::{
    Detection, DetectionError, DetectionOptions, DetectionOutcome, Detector, Frame, ImageFormat,
    detect_frame, parse_detect_labels_response,
};
use image::RgbImage;

const SAMPLE_RESPONSE: &str = r#"{
    "Labels": [
        {
            "Name": "Zebra",
            "Confidence": 98.71,
            "Instances": [
                {
                    "BoundingBox": { "Width": 0.31, "Height": 0.42, "Left": 0.12, "Top": 0.33 },
                    "Confidence": 97.5
                },
                {
                    "BoundingBox": { "Width": 0.2, "Height": 0.25, "Left": 0.6, "Top": 0.4 },
                    "Confidence": 88.0
                }
            ],
            "Parents": [{ "Name": "Animal" }, { "Name": "Mammal" }],
            "Aliases": [],
            "Categories": [{ "Name": "Animals and Pets" }]
        },
        {
            "Name": "Grassland",
            "Confidence": 91.0,
            "Instances": [],
            "Parents": []
        },
        {
            "Name": "Savanna",
            "Confidence": 72.4
        }
    ],
    "LabelModelVersion": "3.0"
}"#;

// ── Response parsing ─────────────────────────────────────────────

#[test]
fn parses_labels_and_instances() {
    let detections = parse_detect_labels_response(SAMPLE_RESPONSE).expect("Failed to parse");

    assert_eq!(detections.len(), 3);
    assert_eq!(detections[0].name, "Zebra");
    assert_eq!(detections[0].instances.len(), 2);

    let first = &detections[0].instances[0];
    assert_eq!(first.bounding_box.left, 0.12);
    assert_eq!(first.bounding_box.top, 0.33);
    assert_eq!(first.bounding_box.width, 0.31);
    assert_eq!(first.bounding_box.height, 0.42);
    assert_eq!(first.confidence, Some(97.5));
}

#[test]
fn missing_instances_parse_as_empty() {
    let detections = parse_detect_labels_response(SAMPLE_RESPONSE).expect("Failed to parse");
    assert!(detections[1].instances.is_empty());
    assert!(detections[2].instances.is_empty());
}

#[test]
fn empty_label_list_is_valid() {
    let detections = parse_detect_labels_response(r#"{"Labels": []}"#).expect("Failed to parse");
    assert!(detections.is_empty());
}

#[test]
fn body_without_labels_is_malformed() {
    let result = parse_detect_labels_response(r#"{"LabelModelVersion": "3.0"}"#);
    assert!(matches!(result, Err(DetectionError::MalformedResponse(_))));
}

#[test]
fn non_json_body_is_malformed() {
    let result = parse_detect_labels_response("<html>502 Bad Gateway</html>");
    assert!(matches!(result, Err(DetectionError::MalformedResponse(_))));
}

#[test]
fn class_match_is_exact() {
    let detection = Detection::new("Zebra", 90.0, vec![]);
    assert!(detection.is_class("Zebra"));
    assert!(!detection.is_class("zebra"));
    assert!(!detection.is_class("Zebra "));
}

// ── Outcomes ─────────────────────────────────────────────────────

#[test]
fn failed_outcome_yields_no_detections() {
    let result: Result<Vec<Detection>, DetectionError> =
        Err(DetectionError::Transport("timed out".to_string()));
    let outcome = DetectionOutcome::from(result);
    assert!(outcome.is_failure());
    assert!(outcome.into_detections().is_empty());
}

#[test]
fn detected_outcome_keeps_list() {
    let result: Result<Vec<Detection>, DetectionError> =
        Ok(vec![Detection::new("Zebra", 99.0, vec![])]);
    let outcome = DetectionOutcome::from(result);
    assert!(!outcome.is_failure());
    assert_eq!(outcome.into_detections().len(), 1);
}

struct AlwaysFails;

impl Detector for AlwaysFails {
    fn detect(&self, _: &[u8], _: &DetectionOptions) -> Result<Vec<Detection>, DetectionError> {
        Err(DetectionError::Service {
            status: 400,
            message: "InvalidImageFormatException: Request has invalid image format".to_string(),
        })
    }
}

/// Checks that the uploaded bytes decode to an image of the frame's size.
struct ExpectsImage {
    width: u32,
    height: u32,
    format: image::ImageFormat,
}

impl Detector for ExpectsImage {
    fn detect(
        &self,
        bytes: &[u8],
        options: &DetectionOptions,
    ) -> Result<Vec<Detection>, DetectionError> {
        assert_eq!(options.max_labels, 10);
        assert_eq!(image::guess_format(bytes).expect("Unknown format"), self.format);
        let image = image::load_from_memory(bytes).expect("Upload should decode");
        assert_eq!((image.width(), image.height()), (self.width, self.height));
        Ok(Vec::new())
    }
}

#[test]
fn detect_frame_reports_service_failure() {
    let frame = Frame::new(4, RgbImage::new(8, 8));
    let outcome = detect_frame(
        &AlwaysFails,
        &frame,
        &DetectionOptions::default(),
        ImageFormat::Jpeg,
    );

    match outcome {
        DetectionOutcome::Failed(DetectionError::Service { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("InvalidImageFormatException"));
        }
        other => panic!("Expected a service failure, got {other:?}"),
    }
}

#[test]
fn detect_frame_uploads_encoded_jpeg() {
    let frame = Frame::new(0, RgbImage::new(48, 32));
    let detector = ExpectsImage {
        width: 48,
        height: 32,
        format: image::ImageFormat::Jpeg,
    };
    let outcome = detect_frame(&detector, &frame, &DetectionOptions::default(), ImageFormat::Jpeg);
    assert!(!outcome.is_failure());
}

#[test]
fn detect_frame_uploads_encoded_png() {
    let frame = Frame::new(0, RgbImage::new(5, 7));
    let detector = ExpectsImage {
        width: 5,
        height: 7,
        format: image::ImageFormat::Png,
    };
    let outcome = detect_frame(&detector, &frame, &DetectionOptions::default(), ImageFormat::Png);
    assert!(!outcome.is_failure());
}

#[test]
fn boxed_detector_is_a_detector() {
    let detector: Box<dyn Detector> = Box::new(AlwaysFails);
    let frame = Frame::new(0, RgbImage::new(2, 2));
    let outcome = detect_frame(&detector, &frame, &DetectionOptions::default(), ImageFormat::Png);
    assert!(outcome.is_failure());
}

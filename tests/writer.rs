//! Annotation writer tests: label files, images, class filtering.

use std::fs;

use framelabel::{
    AnnotationWriter, BoundingBox, Detection, Frame, ImageFormat, Instance, OutputLayout,
};
use image::{Rgb, RgbImage};

fn frame(index: u64, width: u32, height: u32) -> Frame {
    Frame::new(index, RgbImage::from_pixel(width, height, Rgb([40, 120, 200])))
}

fn instance(left: f64, top: f64, width: f64, height: f64) -> Instance {
    Instance::new(BoundingBox {
        left,
        top,
        width,
        height,
    })
}

fn writer_in(root: &std::path::Path, class: &str, format: ImageFormat) -> AnnotationWriter {
    AnnotationWriter::create(OutputLayout::under(root), class, format)
        .expect("Failed to create writer")
}

// ── Directories ──────────────────────────────────────────────────

#[test]
fn create_makes_both_directories() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temporary_directory.path().join("nested").join("out");

    let writer = writer_in(&root, "Zebra", ImageFormat::Jpeg);

    assert!(root.join("images").is_dir());
    assert!(root.join("labels").is_dir());
    assert_eq!(writer.layout().images_dir, root.join("images"));
    assert_eq!(writer.target_class(), "Zebra");
}

#[test]
fn create_is_idempotent() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    writer_in(temporary_directory.path(), "Zebra", ImageFormat::Jpeg);
    writer_in(temporary_directory.path(), "Zebra", ImageFormat::Jpeg);
}

#[test]
fn paths_follow_naming_scheme() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temporary_directory.path();
    let writer = AnnotationWriter::new(OutputLayout::under(root), "Zebra", ImageFormat::Png);

    assert_eq!(writer.label_path(7), root.join("labels").join("frame_000007.txt"));
    assert_eq!(writer.image_path(7), root.join("images").join("frame_000007.png"));
}

// ── Writing ──────────────────────────────────────────────────────

#[test]
fn writes_one_line_per_matching_instance() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path(), "Zebra", ImageFormat::Jpeg);

    let detections = vec![
        Detection::new("Grassland", 99.0, vec![]),
        Detection::new(
            "Zebra",
            97.5,
            vec![instance(0.25, 0.25, 0.5, 0.5), instance(0.0, 0.0, 0.5, 0.25)],
        ),
        Detection::new("Animal", 98.0, vec![instance(0.0, 0.0, 1.0, 1.0)]),
    ];

    let annotations = writer
        .write(&frame(10, 100, 200), &detections)
        .expect("Failed to write annotations");

    assert_eq!(annotations.frame_index, 10);
    assert_eq!(annotations.instance_count(), 2);

    let contents = fs::read_to_string(&annotations.label_path).expect("Failed to read label file");
    assert_eq!(contents, "0 50.0 100.0 50.0 100.0\n0 25.0 25.0 50.0 50.0\n");
    assert!(annotations.image_path.exists());
}

#[test]
fn class_match_is_case_sensitive() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path(), "Zebra", ImageFormat::Jpeg);

    let detections = vec![Detection::new("zebra", 95.0, vec![instance(0.1, 0.1, 0.2, 0.2)])];
    let annotations = writer
        .write(&frame(0, 64, 64), &detections)
        .expect("Failed to write annotations");

    assert_eq!(annotations.instance_count(), 0);
    let contents = fs::read_to_string(&annotations.label_path).expect("Failed to read label file");
    assert!(contents.is_empty());
}

#[test]
fn empty_detections_still_write_both_files() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path(), "Zebra", ImageFormat::Jpeg);

    let annotations = writer
        .write(&frame(30, 32, 24), &[])
        .expect("Failed to write annotations");

    let metadata = fs::metadata(&annotations.label_path).expect("Label file should exist");
    assert_eq!(metadata.len(), 0);

    let image = image::open(&annotations.image_path).expect("Image should decode");
    assert_eq!(image.width(), 32);
    assert_eq!(image.height(), 24);
}

#[test]
fn png_output_is_lossless() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path(), "Zebra", ImageFormat::Png);

    let source = frame(5, 16, 8);
    let annotations = writer.write(&source, &[]).expect("Failed to write annotations");

    assert!(annotations.image_path.to_string_lossy().ends_with("frame_000005.png"));
    let decoded = image::open(&annotations.image_path)
        .expect("Image should decode")
        .to_rgb8();
    assert_eq!(&decoded, source.image());
}

#[test]
fn rewriting_an_index_truncates_the_label_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = writer_in(temporary_directory.path(), "Zebra", ImageFormat::Jpeg);

    let many = vec![Detection::new(
        "Zebra",
        90.0,
        vec![instance(0.0, 0.0, 0.5, 0.5), instance(0.5, 0.5, 0.5, 0.5)],
    )];
    writer
        .write(&frame(0, 10, 10), &many)
        .expect("Failed to write annotations");

    let annotations = writer
        .write(&frame(0, 10, 10), &[])
        .expect("Failed to rewrite annotations");

    let contents = fs::read_to_string(&annotations.label_path).expect("Failed to read label file");
    assert!(contents.is_empty(), "Expected truncated label file, got: {contents:?}");
}

#[test]
fn write_fails_when_directory_is_missing() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = AnnotationWriter::new(
        OutputLayout::under(temporary_directory.path().join("missing")),
        "Zebra",
        ImageFormat::Jpeg,
    );

    let result = writer.write(&frame(0, 8, 8), &[]);
    assert!(result.is_err(), "Expected an error for a missing output directory");
}

#[test]
fn annotation_lines_use_frame_dimensions() {
    let writer = AnnotationWriter::new(OutputLayout::default(), "Car", ImageFormat::Jpeg);
    let detections = vec![Detection::new("Car", 80.0, vec![instance(0.5, 0.0, 0.5, 1.0)])];

    let lines = writer.annotation_lines(&frame(0, 400, 300), &detections);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].to_string(), "0 300.0 150.0 200.0 300.0");
}

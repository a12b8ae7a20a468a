use std::path::{Path, PathBuf};

use ela_classifier::{
    CellBounds, ClassifierConfig, ElaClassifier, PixelBuffer, RemainderPolicy, classify_batch,
    classify_image, classify_image_with,
};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use tempfile::TempDir;

const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

/// Small xorshift generator so the "tampered" block is the same on every run.
struct Noise(u32);

impl Noise {
    fn next(&mut self) -> u8 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        (self.0 >> 24) as u8
    }
}

fn flat(width: u32, height: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width, height, color)
}

fn paste_noise(image: &mut RgbImage, left: u32, top: u32, size: u32, seed: u32) {
    let mut noise = Noise(seed);
    for y in top..top + size {
        for x in left..left + size {
            image.put_pixel(x, y, Rgb([noise.next(), noise.next(), noise.next()]));
        }
    }
}

fn write_png(dir: &TempDir, name: &str, image: &RgbImage) -> PathBuf {
    let path = dir.path().join(name);
    image.save(&path).unwrap();
    path
}

fn score_of(path: &Path) -> f64 {
    classify_image(path, None).unwrap().score
}

#[test]
fn test_flat_gray_is_authentic() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(&dir, "gray.png", &flat(256, 256, GRAY));

    let verdict = classify_image(&path, None).unwrap();

    assert!(verdict.is_authentic);
    assert!(verdict.score < 1.2);
}

#[test]
fn test_pasted_noise_block_is_tampered_and_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = flat(256, 256, GRAY);
    paste_noise(&mut image, 96, 64, 32, 0x9E37_79B9);
    let path = write_png(&dir, "tampered.png", &image);
    let flagged_path = dir.path().join("biggest_diff.png");

    let verdict = classify_image(&path, Some(flagged_path.as_path())).unwrap();

    assert!(!verdict.is_authentic);
    assert!(verdict.score >= 1.2);

    let expected = image::imageops::crop_imm(&image, 96, 64, 32, 32).to_image();
    let flagged = image::open(&flagged_path).unwrap().to_rgb8();
    assert_eq!(flagged, expected);

    let result = ElaClassifier::open(&path).unwrap().classify().unwrap();
    assert_eq!((result.flagged.row, result.flagged.col), (2, 3));
    assert_eq!(
        result.flagged.bounds,
        CellBounds { top: 64, left: 96, height: 32, width: 32 }
    );
    assert_eq!(result.score, verdict.score);
}

#[test]
fn test_classification_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = RgbImage::from_fn(200, 144, |x, y| Rgb([(x + y) as u8, (x * 2) as u8, (y * 3) as u8]));
    paste_noise(&mut image, 25, 18, 25, 7);
    let path = write_png(&dir, "mixed.png", &image);

    let first = classify_image(&path, None).unwrap();
    let second = classify_image(&path, None).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_uniform_color_scores_near_zero() {
    let dir = tempfile::tempdir().unwrap();

    for (name, width, height) in [("single_cell.png", 8, 8), ("square.png", 64, 64), ("wide.png", 160, 48)] {
        let path = write_png(&dir, name, &flat(width, height, Rgb([200, 30, 90])));

        let verdict = classify_image(&path, None).unwrap();

        assert!(verdict.is_authentic, "{name}");
        assert!(verdict.score.abs() < 1e-9, "{name}: {}", verdict.score);
    }
}

#[test]
fn test_local_tampering_does_not_lower_the_score() {
    let dir = tempfile::tempdir().unwrap();
    let bases = [
        ("gray", flat(256, 256, GRAY)),
        ("ramp", RgbImage::from_fn(256, 256, |x, y| Rgb([(x / 2) as u8, (y / 2) as u8, 100]))),
    ];

    for (name, base) in bases {
        let base_path = write_png(&dir, &format!("{name}_base.png"), &base);
        let mut tampered = base.clone();
        paste_noise(&mut tampered, 160, 192, 32, 42);
        let tampered_path = write_png(&dir, &format!("{name}_tampered.png"), &tampered);

        let s0 = score_of(&base_path);
        let s1 = score_of(&tampered_path);

        assert!(s1 >= s0, "{name}: {s1} < {s0}");
    }
}

#[test]
fn test_non_image_file_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let text = dir.path().join("notes.txt");
    std::fs::write(&text, "not an image at all").unwrap();
    let fake_jpeg = dir.path().join("photo.jpg");
    std::fs::write(&fake_jpeg, [0u8, 1, 2, 3, 4, 5, 6, 7]).unwrap();

    for path in [text, fake_jpeg, dir.path().join("missing.png")] {
        let err = classify_image(&path, None).unwrap_err();
        assert!(err.is_decode(), "{}: {err}", path.display());
    }
}

#[test]
fn test_grayscale_input_keeps_one_channel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gray_luma.png");
    GrayImage::from_pixel(64, 64, Luma([90])).save(&path).unwrap();

    let classifier = ElaClassifier::open(&path).unwrap();
    assert_eq!(classifier.source().channels(), 1);

    let result = classifier.classify_with_flagged().unwrap();
    assert!(result.is_authentic);
    assert_eq!(result.flagged_region_image.unwrap().shape(), (8, 8, 1));
}

#[test]
fn test_uneven_dimensions_follow_remainder_policy() {
    let image = DynamicImage::ImageRgb8(flat(250, 130, GRAY));

    let truncated = ElaClassifier::from_image(&image).classify().unwrap();
    assert_eq!(truncated.flagged.bounds.height, 16);
    assert_eq!(truncated.flagged.bounds.width, 31);

    let config = ClassifierConfig::default().with_remainder(RemainderPolicy::ExtendTrailing);
    let extended = ElaClassifier::from_image(&image).with_config(config).classify().unwrap();
    assert_eq!(extended.region_means.len(), 64);
    assert!(extended.is_authentic);
}

#[test]
fn test_custom_config_and_jpeg_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = flat(128, 128, GRAY);
    paste_noise(&mut image, 64, 0, 32, 3);
    let path = write_png(&dir, "quad.png", &image);
    let flagged_path = dir.path().join("flagged.jpg");

    let config = ClassifierConfig::default().with_grid(4, 4).with_quality(90);
    let verdict = classify_image_with(&path, Some(flagged_path.as_path()), &config).unwrap();

    assert!(!verdict.is_authentic);
    let flagged = image::open(&flagged_path).unwrap();
    assert_eq!((flagged.width(), flagged.height()), (32, 32));
}

#[test]
fn test_invalid_config_is_rejected() {
    let image = DynamicImage::ImageRgb8(flat(64, 64, GRAY));
    let config = ClassifierConfig::default().with_quality(0);

    assert!(ElaClassifier::from_image(&image).with_config(config).classify().is_err());
}

#[test]
fn test_too_small_image_is_rejected() {
    let buffer = PixelBuffer::from_dynamic(&DynamicImage::ImageRgb8(flat(4, 40, GRAY)));

    assert!(ElaClassifier::from_buffer(buffer).classify().is_err());
}

#[test]
fn test_batch_failures_stay_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let clean = write_png(&dir, "clean.png", &flat(128, 128, GRAY));
    let mut tampered = flat(128, 128, GRAY);
    paste_noise(&mut tampered, 32, 32, 16, 11);
    let tampered = write_png(&dir, "tampered.png", &tampered);
    let missing = dir.path().join("missing.png");

    let paths = vec![clean.clone(), missing.clone(), tampered.clone()];
    let entries = classify_batch(&paths, &ClassifierConfig::default());

    assert_eq!(
        entries.iter().map(|e| e.path.clone()).collect::<Vec<_>>(),
        vec![clean.clone(), missing, tampered.clone()]
    );
    assert!(entries[1].result.as_ref().unwrap_err().is_decode());
    assert_eq!(*entries[0].result.as_ref().unwrap(), classify_image(&clean, None).unwrap());
    assert!(!entries[2].result.as_ref().unwrap().is_authentic);
}

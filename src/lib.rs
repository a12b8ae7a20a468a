use std::path::{Path, PathBuf};

use image::DynamicImage;
use ndarray::{Array3, ArrayView3, s};
use serde::Serialize;

use crate::{
    analysis::{codec::JpegCodec, ela::ElaAnalyzer, regions::RegionAggregator},
    detection::classifier::Classifier,
    error::{ForensicsError, Result},
};

pub mod error;
pub mod image_utils;
pub mod analysis;
pub mod detection;
pub mod report;
pub mod batch;

pub use batch::{BatchEntry, classify_batch};

/// How pixels past the last full grid cell are treated when the image size is
/// not a multiple of the grid size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RemainderPolicy {
    /// Trailing rows and columns belong to no cell.
    #[default]
    Truncate,
    /// The last row and column of cells grow to absorb the trailing pixels.
    ExtendTrailing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub quality: u8,
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub threshold: f64,
    pub remainder: RemainderPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            quality: 95,
            grid_rows: 8,
            grid_cols: 8,
            threshold: 1.2,
            remainder: RemainderPolicy::Truncate,
        }
    }
}

impl ClassifierConfig {
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_grid(mut self, rows: u32, cols: u32) -> Self {
        self.grid_rows = rows;
        self.grid_cols = cols;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(ForensicsError::InvalidParameter(format!(
                "quality must be within 1..=100, got {}",
                self.quality
            )));
        }
        if self.grid_rows == 0 || self.grid_cols == 0 {
            return Err(ForensicsError::InvalidParameter(format!(
                "grid must have at least one cell, got {}x{}",
                self.grid_rows, self.grid_cols
            )));
        }
        if !self.threshold.is_finite() {
            return Err(ForensicsError::InvalidParameter(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Decoded 8-bit image, stored as a `(height, width, channels)` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    samples: Array3<u8>,
}

impl PixelBuffer {
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            samples: image_utils::dynamic_to_array(image),
        }
    }

    pub fn from_array(samples: Array3<u8>) -> Result<Self> {
        let (height, width, channels) = samples.dim();
        if height == 0 || width == 0 || channels == 0 {
            return Err(ForensicsError::InvalidParameter(format!(
                "pixel buffer must not be empty, got {}x{}x{}",
                width, height, channels
            )));
        }
        Ok(Self { samples })
    }

    pub fn width(&self) -> usize {
        self.samples.dim().1
    }

    pub fn height(&self) -> usize {
        self.samples.dim().0
    }

    pub fn channels(&self) -> usize {
        self.samples.dim().2
    }

    /// `(height, width, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.samples.dim()
    }

    pub fn samples(&self) -> ArrayView3<'_, u8> {
        self.samples.view()
    }

    pub fn crop(&self, bounds: CellBounds) -> PixelBuffer {
        Self::from_view(self.samples.slice(s![
            bounds.top..bounds.top + bounds.height,
            bounds.left..bounds.left + bounds.width,
            ..
        ]))
    }

    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        image_utils::array_to_dynamic(self.samples.view())
    }

    pub(crate) fn from_view(view: ArrayView3<'_, u8>) -> Self {
        Self {
            samples: view.to_owned(),
        }
    }
}

/// Per-sample absolute difference of two pixel buffers of the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffBuffer {
    samples: Array3<u8>,
}

impl DiffBuffer {
    pub(crate) fn new(samples: Array3<u8>) -> Self {
        Self { samples }
    }

    pub fn width(&self) -> usize {
        self.samples.dim().1
    }

    pub fn height(&self) -> usize {
        self.samples.dim().0
    }

    pub fn channels(&self) -> usize {
        self.samples.dim().2
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.samples.dim()
    }

    pub fn samples(&self) -> ArrayView3<'_, u8> {
        self.samples.view()
    }

    pub fn max(&self) -> u8 {
        self.samples.iter().copied().max().unwrap_or(0)
    }

    pub fn mean(&self) -> f64 {
        image_utils::block_mean(self.samples.view())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellBounds {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

/// Grid position and pixel bounds of the region with the highest mean diff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlaggedRegion {
    pub row: u32,
    pub col: u32,
    pub bounds: CellBounds,
    pub mean_diff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub is_authentic: bool,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub is_authentic: bool,
    /// Highest region mean minus the 10th percentile of all region means.
    pub score: f64,
    /// 10th percentile of the region means.
    pub baseline: f64,
    pub threshold: f64,
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub flagged: FlaggedRegion,
    /// Region means in row-major grid order.
    pub region_means: Vec<f64>,
    pub flagged_region_image: Option<PixelBuffer>,
}

impl ClassificationResult {
    pub fn verdict(&self) -> Verdict {
        Verdict {
            is_authentic: self.is_authentic,
            score: self.score,
        }
    }

    pub fn save_flagged<P: AsRef<Path>>(&self, path: P, quality: u8) -> Result<()> {
        let image = self.flagged_region_image.as_ref().ok_or_else(|| {
            ForensicsError::InvalidParameter("flagged region image was not requested".into())
        })?;
        JpegCodec::new(quality).save(image, path)
    }
}

pub struct ElaClassifier {
    source: PixelBuffer,
    config: ClassifierConfig,
    path: Option<PathBuf>,
}

impl ElaClassifier {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = JpegCodec::decode(&path)?;

        Ok(Self {
            source,
            config: ClassifierConfig::default(),
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        Self::from_buffer(PixelBuffer::from_dynamic(image))
    }

    pub fn from_buffer(source: PixelBuffer) -> Self {
        Self {
            source,
            config: ClassifierConfig::default(),
            path: None,
        }
    }

    pub fn with_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn source(&self) -> &PixelBuffer {
        &self.source
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn classify(&self) -> Result<ClassificationResult> {
        self.run(false)
    }

    pub fn classify_with_flagged(&self) -> Result<ClassificationResult> {
        self.run(true)
    }

    fn run(&self, keep_flagged: bool) -> Result<ClassificationResult> {
        self.config.validate()?;

        let diff = ElaAnalyzer::new(self.config.quality).analyze(&self.source)?;
        let grid = RegionAggregator::from_config(&self.config).partition(&diff, &self.source)?;
        let result = Classifier::new(self.config.threshold).classify(&grid, keep_flagged)?;

        log::info!(
            "{}: {} (score {:.4}, baseline {:.4}, flagged cell {},{})",
            self.path
                .as_deref()
                .map_or_else(|| "<memory>".into(), |p| p.display().to_string()),
            if result.is_authentic { "authentic" } else { "tampered" },
            result.score,
            result.baseline,
            result.flagged.row,
            result.flagged.col,
        );

        Ok(result)
    }
}

/// Classifies the image at `path` with the default configuration, optionally
/// writing the most anomalous cell of the source image to `flagged_output`.
pub fn classify_image<P: AsRef<Path>>(path: P, flagged_output: Option<&Path>) -> Result<Verdict> {
    classify_image_with(path, flagged_output, &ClassifierConfig::default())
}

pub fn classify_image_with<P: AsRef<Path>>(
    path: P,
    flagged_output: Option<&Path>,
    config: &ClassifierConfig,
) -> Result<Verdict> {
    let classifier = ElaClassifier::open(path)?.with_config(config.clone());

    let result = match flagged_output {
        Some(output) => {
            let result = classifier.classify_with_flagged()?;
            result.save_flagged(output, config.quality)?;
            result
        }
        None => classifier.classify()?,
    };

    Ok(result.verdict())
}

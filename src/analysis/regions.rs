use ndarray::{ArrayView3, s};

use crate::{
    CellBounds, ClassifierConfig, DiffBuffer, PixelBuffer, RemainderPolicy,
    error::{ForensicsError, Result},
    image_utils::block_mean,
};

/// One cell of the classification grid.
#[derive(Debug, Clone)]
pub struct Region<'a> {
    pub row: u32,
    pub col: u32,
    pub bounds: CellBounds,
    pub mean_diff: f64,
    source: ArrayView3<'a, u8>,
}

impl<'a> Region<'a> {
    /// The cell's window into the source image (not the diff).
    pub fn source_view(&self) -> ArrayView3<'a, u8> {
        self.source.clone()
    }

    pub fn crop(&self) -> PixelBuffer {
        PixelBuffer::from_view(self.source.view())
    }
}

#[derive(Debug, Clone)]
pub struct RegionGrid<'a> {
    rows: u32,
    cols: u32,
    regions: Vec<Region<'a>>,
    max_index: usize,
}

impl<'a> RegionGrid<'a> {
    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Regions in row-major order.
    pub fn regions(&self) -> &[Region<'a>] {
        &self.regions
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&Region<'a>> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.regions.get((row * self.cols + col) as usize)
    }

    /// The region with the highest mean diff; the first one in row-major
    /// order wins ties.
    pub fn max_region(&self) -> Option<&Region<'a>> {
        self.regions.get(self.max_index)
    }

    pub fn means(&self) -> Vec<f64> {
        self.regions.iter().map(|r| r.mean_diff).collect()
    }
}

pub struct RegionAggregator {
    rows: u32,
    cols: u32,
    remainder: RemainderPolicy,
}

impl RegionAggregator {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            remainder: RemainderPolicy::Truncate,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.grid_rows, config.grid_cols).with_remainder(config.remainder)
    }

    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn partition<'a>(&self, diff: &DiffBuffer, source: &'a PixelBuffer) -> Result<RegionGrid<'a>> {
        if diff.shape() != source.shape() {
            return Err(ForensicsError::ShapeMismatch {
                left: diff.shape(),
                right: source.shape(),
            });
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(ForensicsError::InvalidParameter(format!(
                "grid must have at least one cell, got {}x{}",
                self.rows, self.cols
            )));
        }

        let (height, width, _) = diff.shape();
        let (rows, cols) = (self.rows as usize, self.cols as usize);
        let cell_height = height / rows;
        let cell_width = width / cols;

        if cell_height == 0 || cell_width == 0 {
            return Err(ForensicsError::ImageTooSmall {
                width,
                height,
                rows: self.rows,
                cols: self.cols,
            });
        }

        if self.remainder == RemainderPolicy::Truncate {
            log::debug!(
                "{}x{} grid over {}x{}: {} trailing row(s) and {} trailing column(s) excluded",
                self.rows,
                self.cols,
                width,
                height,
                height - rows * cell_height,
                width - cols * cell_width
            );
        }

        let diff_samples = diff.samples();
        let mut regions = Vec::with_capacity(rows * cols);
        let mut max_index = 0;
        let mut max_mean = f64::NEG_INFINITY;

        for row in 0..rows {
            for col in 0..cols {
                let top = row * cell_height;
                let left = col * cell_width;
                let (h, w) = match self.remainder {
                    RemainderPolicy::ExtendTrailing => (
                        if row + 1 == rows { height - top } else { cell_height },
                        if col + 1 == cols { width - left } else { cell_width },
                    ),
                    RemainderPolicy::Truncate => (cell_height, cell_width),
                };

                let mean_diff = block_mean(diff_samples.slice(s![top..top + h, left..left + w, ..]));

                if mean_diff > max_mean {
                    max_mean = mean_diff;
                    max_index = regions.len();
                }

                regions.push(Region {
                    row: row as u32,
                    col: col as u32,
                    bounds: CellBounds { top, left, height: h, width: w },
                    mean_diff,
                    source: source.samples().slice_move(s![top..top + h, left..left + w, ..]),
                });
            }
        }

        Ok(RegionGrid {
            rows: self.rows,
            cols: self.cols,
            regions,
            max_index,
        })
    }
}

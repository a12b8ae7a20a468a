use crate::{
    ClassificationResult, FlaggedRegion,
    analysis::regions::RegionGrid,
    error::{ForensicsError, Result},
};

/// Percentile of the region means used as the ambient noise floor.
pub const BASELINE_PERCENTILE: f64 = 10.0;

/// Turns a region grid into an authentic/tampered decision.
///
/// The score is the gap between the strongest region and the 10th
/// percentile of all regions. A single cell standing well above the rest of
/// the image's recompression noise indicates it was edited and saved
/// separately; the percentile floor tolerates a few naturally noisy cells.
pub struct Classifier {
    threshold: f64,
}

impl Classifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn classify(&self, grid: &RegionGrid<'_>, keep_flagged: bool) -> Result<ClassificationResult> {
        let region_means = grid.means();
        let empty = || ForensicsError::InvalidParameter("cannot classify an empty region grid".into());

        let baseline = percentile(&region_means, BASELINE_PERCENTILE).ok_or_else(empty)?;
        let max_region = grid.max_region().ok_or_else(empty)?;

        let score = max_region.mean_diff - baseline;
        let is_authentic = score < self.threshold;

        log::debug!(
            "max region ({}, {}) mean {:.4}, p{} {:.4}, score {:.4}, threshold {}",
            max_region.row,
            max_region.col,
            max_region.mean_diff,
            BASELINE_PERCENTILE,
            baseline,
            score,
            self.threshold
        );

        Ok(ClassificationResult {
            is_authentic,
            score,
            baseline,
            threshold: self.threshold,
            grid_rows: grid.rows(),
            grid_cols: grid.cols(),
            flagged: FlaggedRegion {
                row: max_region.row,
                col: max_region.col,
                bounds: max_region.bounds,
                mean_diff: max_region.mean_diff,
            },
            region_means,
            flagged_region_image: keep_flagged.then(|| max_region.crop()),
        })
    }
}

/// `p`-th percentile (0..=100) with linear interpolation between the two
/// closest ranks: over the ascending values `v`, `rank = p / 100 * (n - 1)`
/// and the result is `v[floor] + (v[ceil] - v[floor]) * fract(rank)`.
///
/// Returns `None` for an empty slice or `p` outside 0..=100.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

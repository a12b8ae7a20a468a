use std::path::Path;

use serde::Serialize;

use crate::{CellBounds, ClassificationResult};

#[derive(Serialize)]
pub struct JsonReport {
    pub path: Option<String>,
    pub is_authentic: bool,
    pub score: f64,
    pub threshold: f64,
    pub baseline: f64,
    pub flagged_region: FlaggedRegionSection,
    pub grid: GridSection,
}

#[derive(Serialize)]
pub struct FlaggedRegionSection {
    pub row: u32,
    pub col: u32,
    pub bounds: CellBounds,
    pub mean_diff: f64,
}

#[derive(Serialize)]
pub struct GridSection {
    pub rows: u32,
    pub cols: u32,
    pub region_means: Vec<f64>,
}

impl From<&ClassificationResult> for JsonReport {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            path: None,
            is_authentic: result.is_authentic,
            score: result.score,
            threshold: result.threshold,
            baseline: result.baseline,
            flagged_region: FlaggedRegionSection {
                row: result.flagged.row,
                col: result.flagged.col,
                bounds: result.flagged.bounds,
                mean_diff: result.flagged.mean_diff,
            },
            grid: GridSection {
                rows: result.grid_rows,
                cols: result.grid_cols,
                region_means: result.region_means.clone(),
            },
        }
    }
}

impl JsonReport {
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

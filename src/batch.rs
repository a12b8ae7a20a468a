use std::path::{Path, PathBuf};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{ClassifierConfig, Verdict, classify_image_with, error::Result};

#[derive(Debug)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub result: Result<Verdict>,
}

/// Classifies every path independently on the rayon pool. A failing image
/// only affects its own entry. Entries come back in input order.
pub fn classify_batch<P>(paths: &[P], config: &ClassifierConfig) -> Vec<BatchEntry>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let result = classify_image_with(path, None, config);

            if let Err(ref e) = result {
                log::warn!("{}: classification failed: {}", path.display(), e);
            }

            BatchEntry {
                path: path.to_path_buf(),
                result,
            }
        })
        .collect()
}

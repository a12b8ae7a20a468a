//! Classifies each image given on the command line and prints a JSON report.
//!
//! Run with: cargo run --example ela_classify -- <image>... [--flagged-dir <dir>]

use std::{env, fs, path::PathBuf};

use ela_classifier::{ClassifierConfig, ElaClassifier, error::Result, report::JsonReport};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut images = Vec::new();
    let mut flagged_dir: Option<PathBuf> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--flagged-dir" {
            flagged_dir = args.next().map(PathBuf::from);
        } else {
            images.push(PathBuf::from(arg));
        }
    }

    if images.is_empty() {
        println!("Usage: ela_classify <image>... [--flagged-dir <dir>]");
        return Ok(());
    }

    let config = ClassifierConfig::default();
    if let Some(ref dir) = flagged_dir {
        fs::create_dir_all(dir)?;
    }

    for path in &images {
        let classifier = ElaClassifier::open(path)?.with_config(config.clone());
        let result = classifier.classify_with_flagged()?;

        if let Some(ref dir) = flagged_dir {
            let stem = path.file_stem().map_or_else(|| "image".into(), |s| s.to_string_lossy());
            result.save_flagged(dir.join(format!("{stem}_flagged.png")), config.quality)?;
        }

        match JsonReport::from(&result).with_path(path).to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("{}: could not render report: {}", path.display(), e),
        }
    }

    Ok(())
}

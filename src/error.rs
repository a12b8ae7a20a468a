use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForensicsError {
    #[error("Failed to decode image{}: {source}", display_path(.path))]
    Decode {
        path: Option<PathBuf>,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Shape mismatch: {left:?} vs {right:?} (height, width, channels)")]
    ShapeMismatch {
        left: (usize, usize, usize),
        right: (usize, usize, usize),
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Image too small for a {rows}x{cols} grid: {width}x{height}")]
    ImageTooSmall {
        width: usize,
        height: usize,
        rows: u32,
        cols: u32,
    },
}

impl ForensicsError {
    pub fn is_decode(&self) -> bool {
        matches!(self, ForensicsError::Decode { .. })
    }

    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, ForensicsError::ShapeMismatch { .. })
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" '{}'", p.display()),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ForensicsError>;

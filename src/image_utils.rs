use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::{Array3, ArrayView3};

use crate::error::{ForensicsError, Result};

/// Converts a decoded image to a `(height, width, channels)` array of 8-bit
/// samples. Images without color become one channel, everything else three;
/// alpha is dropped because JPEG cannot carry it.
pub fn dynamic_to_array(image: &DynamicImage) -> Array3<u8> {
    let (width, height) = (image.width() as usize, image.height() as usize);

    let (raw, channels) = if image.color().has_color() {
        (image.to_rgb8().into_raw(), 3)
    } else {
        (image.to_luma8().into_raw(), 1)
    };

    Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        raw[(y * width + x) * channels + c]
    })
}

pub fn array_to_dynamic(arr: ArrayView3<'_, u8>) -> Result<DynamicImage> {
    let (height, width, channels) = arr.dim();
    let raw = arr.iter().copied().collect::<Vec<_>>();

    let image = match channels {
        1 => GrayImage::from_raw(width as u32, height as u32, raw).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width as u32, height as u32, raw).map(DynamicImage::ImageRgb8),
        _ => None,
    };

    image.ok_or_else(|| {
        ForensicsError::InvalidParameter(format!(
            "cannot build an image from {}x{} samples with {} channels",
            width, height, channels
        ))
    })
}

/// Mean over every sample in the block, all channels included.
pub fn block_mean(block: ArrayView3<'_, u8>) -> f64 {
    if block.is_empty() {
        return 0.0;
    }
    let sum = block.iter().map(|&v| v as u64).sum::<u64>();
    sum as f64 / block.len() as f64
}

use ndarray::Zip;

use crate::{
    DiffBuffer, PixelBuffer,
    analysis::codec::JpegCodec,
    error::{ForensicsError, Result},
};

pub struct ElaAnalyzer {
    codec: JpegCodec,
}

impl ElaAnalyzer {
    pub fn new(quality: u8) -> Self {
        Self {
            codec: JpegCodec::new(quality),
        }
    }

    pub fn quality(&self) -> u8 {
        self.codec.quality()
    }

    /// Error level of `source`: its difference against its own JPEG round trip.
    pub fn analyze(&self, source: &PixelBuffer) -> Result<DiffBuffer> {
        let recompressed = self.codec.reencode(source)?;
        let difference = diff(source, &recompressed)?;

        log::debug!(
            "error level at quality {}: max {}, mean {:.4}",
            self.quality(),
            difference.max(),
            difference.mean()
        );

        Ok(difference)
    }
}

/// Sample-wise `|a - b|`. Both buffers must have the same width, height and
/// channel count.
pub fn diff(a: &PixelBuffer, b: &PixelBuffer) -> Result<DiffBuffer> {
    if a.shape() != b.shape() {
        return Err(ForensicsError::ShapeMismatch {
            left: a.shape(),
            right: b.shape(),
        });
    }

    let samples = Zip::from(a.samples())
        .and(b.samples())
        .map_collect(|&x, &y| (x as i16 - y as i16).unsigned_abs() as u8);

    Ok(DiffBuffer::new(samples))
}

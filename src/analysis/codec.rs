use std::{
    fs::File,
    io::{BufWriter, Cursor},
    path::Path,
};

use image::{ImageError, ImageFormat, ImageReader, codecs::jpeg::JpegEncoder};

use crate::{
    PixelBuffer,
    error::{ForensicsError, Result},
};

/// Decodes images into [`PixelBuffer`]s and round-trips buffers through an
/// in-memory JPEG at a fixed quality.
#[derive(Debug, Clone, Copy)]
pub struct JpegCodec {
    quality: u8,
}

impl JpegCodec {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Reads an image file, sniffing the format from its content.
    pub fn decode<P: AsRef<Path>>(path: P) -> Result<PixelBuffer> {
        let path = path.as_ref();
        let decode_error = |source: ImageError| ForensicsError::Decode {
            path: Some(path.to_path_buf()),
            source,
        };

        let image = ImageReader::open(path)
            .map_err(|e| decode_error(ImageError::IoError(e)))?
            .with_guessed_format()
            .map_err(|e| decode_error(ImageError::IoError(e)))?
            .decode()
            .map_err(decode_error)?;

        let buffer = PixelBuffer::from_dynamic(&image);
        log::debug!(
            "decoded {}: {}x{}, {} channel(s)",
            path.display(),
            buffer.width(),
            buffer.height(),
            buffer.channels()
        );

        Ok(buffer)
    }

    pub fn decode_bytes(bytes: &[u8]) -> Result<PixelBuffer> {
        let image = image::load_from_memory(bytes)
            .map_err(|source| ForensicsError::Decode { path: None, source })?;
        Ok(PixelBuffer::from_dynamic(&image))
    }

    /// Encodes `buffer` as JPEG at this codec's quality and decodes it again.
    pub fn reencode(&self, buffer: &PixelBuffer) -> Result<PixelBuffer> {
        let image = buffer.to_dynamic()?;

        let mut bytes = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut bytes, self.quality);
        image
            .write_with_encoder(encoder)
            .map_err(ForensicsError::Encode)?;

        let recompressed = image::load_from_memory_with_format(bytes.get_ref(), ImageFormat::Jpeg)
            .map_err(|source| ForensicsError::Decode { path: None, source })?;
        let recompressed = PixelBuffer::from_dynamic(&recompressed);

        if recompressed.shape() != buffer.shape() {
            return Err(ForensicsError::ShapeMismatch {
                left: buffer.shape(),
                right: recompressed.shape(),
            });
        }

        log::debug!(
            "re-encoded {}x{} at quality {} ({} bytes)",
            buffer.width(),
            buffer.height(),
            self.quality,
            bytes.get_ref().len()
        );

        Ok(recompressed)
    }

    /// Writes `buffer` to `path` in the format implied by its extension.
    /// JPEG output is encoded at this codec's quality.
    pub fn save<P: AsRef<Path>>(&self, buffer: &PixelBuffer, path: P) -> Result<()> {
        let path = path.as_ref();
        let image = buffer.to_dynamic()?;
        let format = ImageFormat::from_path(path).map_err(ForensicsError::Encode)?;

        match format {
            ImageFormat::Jpeg => {
                let writer = BufWriter::new(File::create(path)?);
                let encoder = JpegEncoder::new_with_quality(writer, self.quality);
                image
                    .write_with_encoder(encoder)
                    .map_err(ForensicsError::Encode)?;
            }
            _ => image
                .save_with_format(path, format)
                .map_err(ForensicsError::Encode)?,
        }

        log::debug!("wrote {}x{} crop to {}", buffer.width(), buffer.height(), path.display());
        Ok(())
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(95)
    }
}

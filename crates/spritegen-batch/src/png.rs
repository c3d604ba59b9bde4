//! Deterministic PNG encoding and decoding for frames and sheets.
//!
//! Encoding uses fixed compression and filter settings so the same pixels
//! always produce the same bytes, which keeps sheet hashes stable between
//! runs.

use std::io::{Read, Write};

use png::{BitDepth, ColorType, Compression, Decoder, Encoder, FilterType, Transformations};
use thiserror::Error;

use crate::image::FrameImage;

/// Errors from PNG operations.
#[derive(Debug, Error)]
pub enum PngError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),

    #[error("PNG decoding error: {0}")]
    Decoding(#[from] png::DecodingError),

    #[error("Unsupported PNG layout: {0}")]
    Unsupported(String),
}

/// PNG export configuration for deterministic output.
#[derive(Debug, Clone)]
pub struct PngConfig {
    /// Compression level. Use a fixed value for determinism.
    pub compression: Compression,
    /// Filter type. Use a fixed value for determinism.
    pub filter: FilterType,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Default,
            filter: FilterType::NoFilter,
        }
    }
}

impl PngConfig {
    /// Config for temp frames: written once, read back once, then deleted.
    pub fn fast() -> Self {
        Self {
            compression: Compression::Fast,
            filter: FilterType::NoFilter,
        }
    }

    /// Config for final sheets (slower, smaller, still deterministic).
    pub fn best_compression() -> Self {
        Self {
            compression: Compression::Best,
            filter: FilterType::Paeth,
        }
    }
}

/// Encode an RGBA frame to any writer.
pub fn write_rgba_to_writer<W: Write>(
    image: &FrameImage,
    writer: W,
    config: &PngConfig,
) -> Result<(), PngError> {
    let mut encoder = Encoder::new(writer, image.width(), image.height());
    encoder.set_color(ColorType::Rgba);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(config.compression);
    encoder.set_filter(config.filter);

    // The png crate writes no timestamps unless asked to.
    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(image.as_rgba8())?;

    Ok(())
}

/// Encode to a `Vec<u8>` and return the bytes with their hash.
pub fn write_rgba_to_vec_with_hash(
    image: &FrameImage,
    config: &PngConfig,
) -> Result<(Vec<u8>, String), PngError> {
    let mut data = Vec::new();
    write_rgba_to_writer(image, &mut data, config)?;
    let hash = hash_png(&data);
    Ok((data, hash))
}

/// Compute the BLAKE3 hash of PNG data.
pub fn hash_png(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Decode a PNG into an RGBA8 frame.
///
/// Palette, 16-bit, grayscale, and RGB images are widened to RGBA8.
pub fn read_rgba<R: Read>(reader: R) -> Result<FrameImage, PngError> {
    let mut decoder = Decoder::new(reader);
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    let bytes = &buf[..info.buffer_size()];

    if info.bit_depth != BitDepth::Eight {
        return Err(PngError::Unsupported(format!(
            "bit depth {:?} after expansion",
            info.bit_depth
        )));
    }

    let pixels = (info.width as usize) * (info.height as usize);
    let mut rgba = Vec::with_capacity(pixels * 4);
    match info.color_type {
        ColorType::Rgba => rgba.extend_from_slice(bytes),
        ColorType::Rgb => {
            for px in bytes.chunks_exact(3) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
        ColorType::GrayscaleAlpha => {
            for px in bytes.chunks_exact(2) {
                rgba.extend_from_slice(&[px[0], px[0], px[0], px[1]]);
            }
        }
        ColorType::Grayscale => {
            for &v in bytes {
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        ColorType::Indexed => {
            return Err(PngError::Unsupported(
                "indexed color was not expanded".to_string(),
            ))
        }
    }

    FrameImage::from_rgba8(info.width, info.height, rgba)
        .map_err(|e| PngError::Unsupported(e.to_string()))
}

//! Independent PNG inspection.
//!
//! Sheets are decoded with the `png` crate directly rather than through
//! `spritegen_batch::png`, so a decoder bug cannot hide an encoder bug.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A decoded 8-bit RGBA PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPng {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedPng {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ]
    }

    /// Returns true if every pixel of the rectangle equals `color`.
    pub fn region_is(&self, x: u32, y: u32, width: u32, height: u32, color: [u8; 4]) -> bool {
        (y..y + height).all(|py| (x..x + width).all(|px| self.pixel(px, py) == color))
    }
}

/// Decodes a PNG written by the executor. Panics on anything but RGBA8.
pub fn decode_png(path: &Path) -> DecodedPng {
    let file = File::open(path).unwrap_or_else(|e| panic!("open {}: {}", path.display(), e));
    let decoder = png::Decoder::new(BufReader::new(file));
    let mut reader = decoder
        .read_info()
        .unwrap_or_else(|e| panic!("read {}: {}", path.display(), e));
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .unwrap_or_else(|e| panic!("decode {}: {}", path.display(), e));

    assert_eq!(info.color_type, png::ColorType::Rgba, "{}", path.display());
    assert_eq!(info.bit_depth, png::BitDepth::Eight, "{}", path.display());

    buf.truncate(info.buffer_size());
    DecodedPng {
        width: info.width,
        height: info.height,
        rgba: buf,
    }
}

//! In-memory RGBA8 images.

use crate::error::{BatchError, BatchResult};

/// A rendered frame or an assembled sheet.
///
/// Pixels are RGBA8, row-major, with row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl FrameImage {
    /// Creates a fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Creates an image with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 4);
        for _ in 0..count {
            data.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wraps raw RGBA8 bytes, checking the length against the dimensions.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> BatchResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(BatchError::invalid_image(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA8 bytes.
    pub fn as_rgba8(&self) -> &[u8] {
        &self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Pixel at `(x, y)`; transparent black when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Sets the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&color);
    }

    /// Copies `src` into this image with its top-left corner at `(x, y)`.
    ///
    /// Pixels are replaced, not blended. Parts of `src` that fall outside
    /// this image are clipped.
    pub fn blit(&mut self, src: &FrameImage, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let copy_w = src.width.min(self.width - x) as usize;
        let copy_h = src.height.min(self.height - y);
        for row in 0..copy_h {
            let src_start = src.offset(0, row);
            let dst_start = self.offset(x, y + row);
            self.data[dst_start..dst_start + copy_w * 4]
                .copy_from_slice(&src.data[src_start..src_start + copy_w * 4]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_transparent() {
        let image = FrameImage::new(3, 2);
        assert_eq!(image.as_rgba8().len(), 24);
        assert!(image.as_rgba8().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_rgba8_checks_length() {
        assert!(FrameImage::from_rgba8(2, 2, vec![0; 16]).is_ok());
        let err = FrameImage::from_rgba8(2, 2, vec![0; 15]).unwrap_err();
        assert!(err.to_string().contains("expected 16 bytes"));
    }

    #[test]
    fn test_get_set() {
        let mut image = FrameImage::new(4, 4);
        image.set(1, 2, [10, 20, 30, 40]);
        assert_eq!(image.get(1, 2), [10, 20, 30, 40]);
        assert_eq!(image.get(2, 1), [0, 0, 0, 0]);

        image.set(9, 9, [1, 1, 1, 1]);
        assert_eq!(image.get(9, 9), [0, 0, 0, 0]);
    }

    #[test]
    fn test_blit_places_pixels() {
        let src = FrameImage::filled(2, 2, [255, 0, 0, 255]);
        let mut dst = FrameImage::new(6, 4);
        dst.blit(&src, 2, 2);

        assert_eq!(dst.get(2, 2), [255, 0, 0, 255]);
        assert_eq!(dst.get(3, 3), [255, 0, 0, 255]);
        assert_eq!(dst.get(1, 2), [0, 0, 0, 0]);
        assert_eq!(dst.get(4, 2), [0, 0, 0, 0]);
        assert_eq!(dst.get(2, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn test_blit_clips_at_edge() {
        let src = FrameImage::filled(4, 4, [1, 2, 3, 4]);
        let mut dst = FrameImage::new(5, 5);
        dst.blit(&src, 3, 3);
        assert_eq!(dst.get(4, 4), [1, 2, 3, 4]);
        assert_eq!(dst.get(2, 2), [0, 0, 0, 0]);
    }
}

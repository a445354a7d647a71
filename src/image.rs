//! One-bit frame buffer for the chart.
//!
//! The layout matches what SSD16xx-style e-paper controllers expect: rows of
//! bytes, eight horizontal pixels per byte, most significant bit first, with a
//! set bit meaning white paper and a cleared bit meaning black ink.

use core::convert::Infallible;
use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};

/// A finished (or in-progress) chart bitmap.
///
/// `BinaryColor::On` is ink, `BinaryColor::Off` is paper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedImage {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl RenderedImage {
    /// Create a blank (all white) image.
    pub fn new(width: u32, height: u32) -> Self {
        // Each row has (width+7)/8 bytes
        let bytes_per_row = width.div_ceil(8);
        let buffer_size = (bytes_per_row * height) as usize;
        Self {
            width,
            height,
            buffer: vec![0xFF; buffer_size],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw packed rows, 1 = white.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Color at `(x, y)`, `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        let (byte_index, bit_mask) = self.locate(x, y)?;
        if self.buffer[byte_index] & bit_mask == 0 {
            Some(BinaryColor::On)
        } else {
            Some(BinaryColor::Off)
        }
    }

    /// Set a pixel; coordinates outside the image are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: BinaryColor) {
        let Some((byte_index, bit_mask)) = self.locate(x, y) else {
            return;
        };
        match color {
            BinaryColor::On => self.buffer[byte_index] &= !bit_mask,
            BinaryColor::Off => self.buffer[byte_index] |= bit_mask,
        }
    }

    /// Number of inked pixels.
    pub fn ink_count(&self) -> usize {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.pixel(x, y) == Some(BinaryColor::On))
            .count()
    }

    /// Iterate over rows as booleans (`true` = ink).
    pub fn rows(&self) -> impl Iterator<Item = Vec<bool>> + '_ {
        (0..self.height).map(move |y| {
            (0..self.width)
                .map(|x| self.pixel(x, y) == Some(BinaryColor::On))
                .collect()
        })
    }

    fn locate(&self, x: u32, y: u32) -> Option<(usize, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bytes_per_row = self.width.div_ceil(8);
        let byte_index = (y * bytes_per_row + x / 8) as usize;
        let bit_mask = 0x80 >> (x % 8);
        Some((byte_index, bit_mask))
    }
}

impl OriginDimensions for RenderedImage {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for RenderedImage {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, color);
            }
        }
        Ok(())
    }
}

use std::sync::Arc;

use image::RgbaImage;

use super::{palette::Palette, transition::Transition};
use crate::error::{DecodeError, Error, Result};

/// Palette-indexed frame. Pixels are stored top row first, but written bottom row first through
/// the cursor, left to right within a row.
#[derive(Debug, Clone)]
pub struct IndexedRaster {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    palette: Arc<Palette>,
    transparent: u8,

    // Write cursor, `y` counts rows from the top
    x: usize,
    y: usize,
    unset: usize,
}

impl IndexedRaster {
    /// Blank raster, filled with the palette's transparent index
    pub fn new(width: u32, height: u32, palette: Arc<Palette>) -> Result<Self> {
        let transparent = palette
            .transparent_index()
            .ok_or_else(|| Error::NoTransparentIndex(palette.name().to_string()))?;

        let (width, height) = (width as usize, height as usize);
        Ok(Self {
            width,
            height,
            pixels: vec![transparent; width * height],
            palette,
            transparent,
            x: 0,
            y: height.saturating_sub(1),
            unset: width * height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    pub fn height(&self) -> u32 {
        self.height as u32
    }

    pub fn palette(&self) -> &Arc<Palette> {
        &self.palette
    }

    pub fn transparent_index(&self) -> u8 {
        self.transparent
    }

    /// Row-major, top row first
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at column `x` of row `y`, row 0 being the top
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn row(&self, y: usize) -> Option<&[u8]> {
        (y < self.height).then(|| &self.pixels[y * self.width..(y + 1) * self.width])
    }

    /// Pixels written so far
    pub fn written(&self) -> usize {
        self.pixels.len() - self.unset
    }

    pub fn is_complete(&self) -> bool {
        self.unset == 0
    }

    /// Write one index at the cursor and advance it
    pub fn write(&mut self, index: u8) -> std::result::Result<(), DecodeError> {
        if self.unset == 0 {
            return Err(DecodeError::Overflow {
                capacity: self.pixels.len(),
            });
        }

        self.pixels[self.y * self.width + self.x] = index;
        self.unset -= 1;

        self.x += 1;
        if self.x == self.width {
            self.x = 0;
            // Moving up past the top row only happens once the raster is full
            self.y = self.y.saturating_sub(1);
        }

        Ok(())
    }

    pub fn write_run(&mut self, index: u8, count: usize) -> std::result::Result<(), DecodeError> {
        (0..count).try_for_each(|_| self.write(index))
    }

    pub fn write_transparent(&mut self, count: usize) -> std::result::Result<(), DecodeError> {
        self.write_run(self.transparent, count)
    }

    pub fn write_literal(&mut self, indices: &[u8]) -> std::result::Result<(), DecodeError> {
        indices.iter().try_for_each(|&index| self.write(index))
    }

    /// Check that every pixel was written
    pub fn finish(self) -> std::result::Result<Self, DecodeError> {
        if self.unset != 0 {
            return Err(DecodeError::PixelCountMismatch {
                expected: self.pixels.len(),
                actual: self.written(),
            });
        }
        Ok(self)
    }

    /// Remap every non-transparent pixel
    pub fn apply_transition(&mut self, transition: &Transition) {
        let transparent = self.transparent;
        self.pixels
            .iter_mut()
            .filter(|p| **p != transparent)
            .for_each(|p| *p = transition.map(*p));
    }

    /// Resolve indices to colors
    pub fn to_rgba_image(&self) -> RgbaImage {
        let table = self.palette.rgba_table();
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            table[self.pixels[y as usize * self.width + x as usize] as usize]
        })
    }
}

/// Rasters compare by dimensions, pixels and palette name
impl PartialEq for IndexedRaster {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.pixels == other.pixels
            && self.palette.name() == other.palette.name()
    }
}

impl Eq for IndexedRaster {}

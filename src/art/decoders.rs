//! Pixel reconstruction for the sprite encodings. Every decoder writes through the raster's
//! cursor, so output always starts at the bottom-left pixel.

use super::raster::IndexedRaster;
use crate::error::DecodeError;

type Result<T> = std::result::Result<T, DecodeError>;

/// Tile frames are always 32x32
pub const TILE_SIZE: usize = 32;

/// Side of a tile row whose pixels are omitted from the byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSide {
    Left,
    Right,
}

/// Which half of a tile is abbreviated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileShape {
    /// Both halves, mirrored. 544 byte frames.
    UpperLower,
    /// Only the upper half, the rest is full width. 800 byte frames.
    UpperOnly,
}

/// Explicit bytes per row, bottom row first
const UPPER_LOWER_ROWS: [usize; TILE_SIZE] = [
    0, 4, 4, 8, 8, 12, 12, 16, 16, 20, 20, 24, 24, 28, 28, 32, 32, 32, 28, 28, 24, 24, 20, 20, 16,
    16, 12, 12, 8, 8, 4, 4,
];

const UPPER_ONLY_ROWS: [usize; TILE_SIZE] = [
    4, 4, 8, 8, 12, 12, 16, 16, 20, 20, 24, 24, 28, 28, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32,
    32, 32, 32, 32, 32, 32, 32,
];

impl TileShape {
    pub fn row_sizes(&self) -> &'static [usize; TILE_SIZE] {
        match self {
            TileShape::UpperLower => &UPPER_LOWER_ROWS,
            TileShape::UpperOnly => &UPPER_ONLY_ROWS,
        }
    }

    /// Bytes at the row's boundary that are stored but always transparent
    pub fn transparent_slots(&self, row: usize) -> usize {
        let has_slots = match self {
            TileShape::UpperLower => row % 2 == 1,
            TileShape::UpperOnly => row <= 14 && row % 2 == 0,
        };
        if has_slots {
            2
        } else {
            0
        }
    }

    /// Total byte length of a frame with this shape
    pub fn frame_size(&self) -> usize {
        self.row_sizes().iter().sum()
    }
}

/// Byte cursor over one frame
struct FrameReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> FrameReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8]> {
        if needed > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(bytes)
    }

    fn byte(&mut self) -> Result<u8> {
        self.take(1).map(|b| b[0])
    }

    fn expect_end(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

/// Standard CEL runs: commands up to 127 are literal runs, anything above encodes
/// `256 - command` transparent pixels
pub fn decode_cel(data: &[u8], raster: &mut IndexedRaster) -> Result<()> {
    let mut reader = FrameReader::new(data);

    while !reader.is_empty() {
        let command = reader.byte()?;
        if command <= 127 {
            raster.write_literal(reader.take(command as usize)?)?;
        } else {
            raster.write_transparent(256 - command as usize)?;
        }
    }

    Ok(())
}

/// Standard CL2 runs, with a signed command: non-negative commands are transparent runs,
/// negative ones literal runs up to 65 pixels and single color fills beyond that
pub fn decode_cl2(data: &[u8], raster: &mut IndexedRaster) -> Result<()> {
    let mut reader = FrameReader::new(data);

    while !reader.is_empty() {
        let command = reader.byte()? as i8;
        if command >= 0 {
            raster.write_transparent(command as usize)?;
            continue;
        }

        let n = command.unsigned_abs() as usize;
        if n <= 65 {
            raster.write_literal(reader.take(n)?)?;
        } else {
            let color = reader.byte()?;
            raster.write_run(color, n - 65)?;
        }
    }

    Ok(())
}

/// 1024 bytes, one per pixel
pub fn decode_tile_opaque(data: &[u8], raster: &mut IndexedRaster) -> Result<()> {
    let mut reader = FrameReader::new(data);
    raster.write_literal(reader.take(TILE_SIZE * TILE_SIZE)?)?;
    reader.expect_end()
}

/// Tile with pixels left out of each row. The omitted pixels are implied transparent, and
/// some rows also store two transparent bytes next to the omitted part.
pub fn decode_tile_implicit(
    data: &[u8],
    raster: &mut IndexedRaster,
    side: TileSide,
    shape: TileShape,
) -> Result<()> {
    let mut reader = FrameReader::new(data);

    for (row, &row_size) in shape.row_sizes().iter().enumerate() {
        let implicit = TILE_SIZE - row_size;
        let slots = shape.transparent_slots(row);
        let colors = row_size - slots;

        match side {
            TileSide::Left => {
                raster.write_transparent(implicit)?;
                reader.take(slots)?;
                raster.write_transparent(slots)?;
                raster.write_literal(reader.take(colors)?)?;
            }
            TileSide::Right => {
                raster.write_literal(reader.take(colors)?)?;
                reader.take(slots)?;
                raster.write_transparent(slots)?;
                raster.write_transparent(implicit)?;
            }
        }
    }

    reader.expect_end()
}

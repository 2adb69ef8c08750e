use image::Rgba;
use tracing::warn;

use crate::error::{Error, Result};

pub const PALETTE_ENTRIES: usize = 256;

/// Byte size of a palette file: 256 packed RGB triples
pub const PALETTE_FILE_SIZE: usize = PALETTE_ENTRIES * 3;

const TRANSPARENT_KEY: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// 256 color lookup table with one designated transparent slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    name: String,
    colors: [Rgba<u8>; PALETTE_ENTRIES],
    transparent_index: Option<u8>,
}

impl Palette {
    /// Build from packed RGB triples. The first pure white entry becomes the transparent one.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PALETTE_FILE_SIZE {
            return Err(Error::InvalidPalette {
                name: name.to_string(),
                reason: format!("expected {PALETTE_FILE_SIZE} bytes, got {}", bytes.len()),
            });
        }

        let mut colors = [Rgba([0, 0, 0, 0xFF]); PALETTE_ENTRIES];
        let mut transparent_index = None;

        for (i, rgb) in bytes.chunks_exact(3).enumerate() {
            if rgb == TRANSPARENT_KEY && transparent_index.is_none() {
                transparent_index = Some(i as u8);
                colors[i] = Rgba([0xFF, 0xFF, 0xFF, 0]);
            } else {
                colors[i] = Rgba([rgb[0], rgb[1], rgb[2], 0xFF]);
            }
        }

        if transparent_index.is_none() {
            warn!("Palette {} has no transparent entry", name);
        }

        Ok(Self {
            name: name.to_string(),
            colors,
            transparent_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent_index
    }

    pub fn color(&self, index: usize) -> Result<Rgba<u8>> {
        self.colors
            .get(index)
            .copied()
            .ok_or(Error::PaletteIndexOutOfRange(index))
    }

    pub fn rgba_table(&self) -> &[Rgba<u8>; PALETTE_ENTRIES] {
        &self.colors
    }
}

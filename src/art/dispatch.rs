//! Choice of decoder per frame

use super::{
    decoders::{
        decode_cel, decode_cl2, decode_tile_implicit, decode_tile_opaque, TileShape, TileSide,
        TILE_SIZE,
    },
    raster::IndexedRaster,
};
use crate::{
    error::{DecodeError, Error, Result},
    path::split_extension,
};

const OPAQUE_TILE_LEN: usize = 0x400;
const UPPER_LOWER_TILE_LEN: usize = 0x220;
const UPPER_ONLY_TILE_LEN: usize = 0x320;

/// Level tile sets, along with the 1024 byte frames in them that are not opaque tiles
const LEVEL_FILES: &[(&str, &[usize])] = &[
    ("l1.cel", &[148, 159, 181, 186, 188]),
    ("l2.cel", &[47, 1397, 1399, 1411]),
    ("l3.cel", &[]),
    ("l4.cel", &[336, 639]),
    ("town.cel", &[2328, 2367, 2593]),
];

/// Offsets that are all zero in a tile missing its left side
const LEFT_ZERO_OFFSETS: [usize; 16] = [
    0, 1, 8, 9, 24, 25, 48, 49, 80, 81, 120, 121, 168, 169, 224, 225,
];

const RIGHT_ZERO_OFFSETS: [usize; 16] = [
    2, 3, 14, 15, 34, 35, 62, 63, 98, 99, 142, 143, 194, 195, 254, 255,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    Cl2,
    Cel,
    TileOpaque,
    TileImplicit { side: TileSide, shape: TileShape },
}

impl DecoderKind {
    /// Tiles ignore the advertised frame size
    pub fn fixed_size(&self) -> Option<(u32, u32)> {
        match self {
            DecoderKind::Cl2 | DecoderKind::Cel => None,
            DecoderKind::TileOpaque | DecoderKind::TileImplicit { .. } => {
                Some((TILE_SIZE as u32, TILE_SIZE as u32))
            }
        }
    }

    pub fn decode(
        &self,
        data: &[u8],
        raster: &mut IndexedRaster,
    ) -> std::result::Result<(), DecodeError> {
        match *self {
            DecoderKind::Cl2 => decode_cl2(data, raster),
            DecoderKind::Cel => decode_cel(data, raster),
            DecoderKind::TileOpaque => decode_tile_opaque(data, raster),
            DecoderKind::TileImplicit { side, shape } => {
                decode_tile_implicit(data, raster, side, shape)
            }
        }
    }
}

fn level_exceptions(file_name: &str) -> Option<&'static [usize]> {
    LEVEL_FILES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(file_name))
        .map(|(_, exceptions)| *exceptions)
}

fn all_zero(data: &[u8], offsets: &[usize]) -> bool {
    offsets.iter().all(|&i| data.get(i) == Some(&0))
}

fn detect_implicit_side(data: &[u8]) -> Option<TileSide> {
    if all_zero(data, &LEFT_ZERO_OFFSETS) {
        Some(TileSide::Left)
    } else if all_zero(data, &RIGHT_ZERO_OFFSETS) {
        Some(TileSide::Right)
    } else {
        None
    }
}

fn select_tile(exceptions: &[usize], frame_index: usize, data: &[u8]) -> Option<DecoderKind> {
    let shape = match data.len() {
        OPAQUE_TILE_LEN if exceptions.contains(&frame_index) => return None,
        OPAQUE_TILE_LEN => return Some(DecoderKind::TileOpaque),
        UPPER_LOWER_TILE_LEN => TileShape::UpperLower,
        UPPER_ONLY_TILE_LEN => TileShape::UpperOnly,
        _ => return None,
    };

    detect_implicit_side(data).map(|side| DecoderKind::TileImplicit { side, shape })
}

/// Pick the decoder for one frame of `file_name`. Only the extension, the level tile set
/// names, the frame's length and a few of its bytes are considered.
pub fn select_decoder(file_name: &str, frame_index: usize, data: &[u8]) -> Result<DecoderKind> {
    let extension = split_extension(file_name).1.map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("cl2") => Ok(DecoderKind::Cl2),
        Some("cel") => Ok(level_exceptions(file_name)
            .and_then(|exceptions| select_tile(exceptions, frame_index, data))
            .unwrap_or(DecoderKind::Cel)),
        _ => Err(Error::UnsupportedExtension(file_name.to_string())),
    }
}

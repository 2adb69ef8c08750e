//! Sprite decoding: from a logical resource name to palette-indexed frames

pub mod cache;
pub mod decoders;
pub mod dispatch;
pub mod frames;
pub mod palette;
pub mod raster;
pub mod transition;

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

pub use cache::AssetCache;
pub use dispatch::{select_decoder, DecoderKind};
pub use frames::RawFrame;
pub use palette::Palette;
pub use raster::IndexedRaster;
pub use transition::Transition;

use crate::{
    bundle::ArchiveMember,
    bundle_fs::FS,
    error::{Error, Result},
    path::{bare_name, split_extension},
    properties::{PropertyRecord, PropertyRegistry},
};

const SUPPORTED_EXTENSIONS: [&str; 2] = ["cel", "cl2"];

/// Decodes CEL and CL2 sprites, including bundles of several members
#[derive(Clone)]
pub struct SpriteDecoder {
    fs: FS,
    registry: Arc<PropertyRegistry>,
}

fn check_extension(file_name: &str) -> Result<()> {
    match split_extension(file_name).1 {
        Some(ext) if SUPPORTED_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) => Ok(()),
        _ => Err(Error::UnsupportedExtension(file_name.to_string())),
    }
}

fn decode_frame(
    file_name: &str,
    frame: &RawFrame,
    record: &PropertyRecord,
    palette: &Arc<Palette>,
) -> Result<IndexedRaster> {
    let kind = select_decoder(file_name, frame.index, &frame.bytes)?;
    let (width, height) = kind.fixed_size().unwrap_or_else(|| {
        (
            record.frame_width(frame.index),
            record.frame_height(frame.index),
        )
    });

    let context = |source| Error::Decode {
        name: frame.alias.clone(),
        frame: frame.index,
        source,
    };

    let mut raster = IndexedRaster::new(width, height, Arc::clone(palette))?;
    kind.decode(&frame.bytes, &mut raster).map_err(context)?;
    raster.finish().map_err(context)
}

impl SpriteDecoder {
    pub fn new(fs: FS, registry: Arc<PropertyRegistry>) -> Self {
        Self { fs, registry }
    }

    pub fn registry(&self) -> &Arc<PropertyRegistry> {
        &self.registry
    }

    pub fn fs(&self) -> &FS {
        &self.fs
    }

    fn members(&self, logical_name: &str) -> Result<Vec<ArchiveMember>> {
        self.fs.resolve(logical_name)?.members()
    }

    /// Raw frames of every member, in order
    pub fn frames(&self, logical_name: &str) -> Result<Vec<RawFrame>> {
        let mut all = Vec::new();
        for member in self.members(logical_name)? {
            let file_name = bare_name(&member.path);
            check_extension(&file_name)?;

            let record = self.registry.record(&file_name)?;
            all.extend(frames::read_frames(&file_name, &member.bytes, record)?);
        }
        Ok(all)
    }

    pub fn decode(&self, logical_name: &str, palette: &Arc<Palette>) -> Result<Vec<IndexedRaster>> {
        self.decode_with_transition(logical_name, palette, None)
    }

    /// Decode every frame of every member named by `logical_name`, in order
    pub fn decode_with_transition(
        &self,
        logical_name: &str,
        palette: &Arc<Palette>,
        transition: Option<&Transition>,
    ) -> Result<Vec<IndexedRaster>> {
        let mut rasters = Vec::new();

        for member in self.members(logical_name)? {
            let file_name = bare_name(&member.path);
            check_extension(&file_name)?;

            let record = self.registry.record(&file_name)?;
            if !record.supports_palette(palette.name()) {
                return Err(Error::IncompatiblePalette {
                    file: file_name,
                    palette: palette.name().to_string(),
                });
            }
            if palette.transparent_index().is_none() {
                return Err(Error::NoTransparentIndex(palette.name().to_string()));
            }
            if let Some(transition) = transition {
                if !record.supports_transition(transition.name()) {
                    return Err(Error::IncompatibleTransition {
                        file: file_name,
                        transition: transition.name().to_string(),
                    });
                }
            }

            let frames = frames::read_frames(&file_name, &member.bytes, record)?;
            debug!("Decoding {} frames of {}", frames.len(), member.path);

            let mut decoded = frames
                .par_iter()
                .map(|frame| {
                    let record = self.registry.record_for(&frame.alias, &file_name)?;
                    decode_frame(&file_name, frame, record, palette)
                })
                .collect::<Result<Vec<_>>>()?;

            if let Some(transition) = transition {
                decoded
                    .iter_mut()
                    .for_each(|raster| raster.apply_transition(transition));
            }

            rasters.extend(decoded);
        }

        Ok(rasters)
    }
}

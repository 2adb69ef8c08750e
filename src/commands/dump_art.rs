use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    art::{AssetCache, IndexedRaster, Palette, SpriteDecoder, Transition},
    path::BUNDLE_SEPARATOR,
};

#[derive(Debug, Serialize)]
struct FrameSummary {
    index: usize,
    width: u32,
    height: u32,
    file: PathBuf,
}

#[derive(Debug, Serialize)]
struct ArtSummary<'a> {
    name: &'a str,
    palette: &'a str,
    transition: Option<&'a str>,
    frames: Vec<FrameSummary>,
}

/// Folder a logical name's frames are written to
fn art_folder(output_folder: &Path, logical_name: &str) -> PathBuf {
    output_folder.join(
        logical_name
            .trim_matches('/')
            .replace(BUNDLE_SEPARATOR, "_")
            .replace('\\', "/"),
    )
}

fn write_frames(rasters: &[IndexedRaster], folder: &Path) -> Result<Vec<FrameSummary>> {
    fs::create_dir_all(folder).context("Failed to create folder")?;

    rasters
        .iter()
        .enumerate()
        .map(|(index, raster)| {
            let file = folder.join(format!("{index:04}.png"));
            raster
                .to_rgba_image()
                .save(&file)
                .with_context(|| format!("Failed to write {file:?}"))?;

            Ok(FrameSummary {
                index,
                width: raster.width(),
                height: raster.height(),
                file,
            })
        })
        .collect()
}

fn dump_one<'a>(
    decoder: &SpriteDecoder,
    logical_name: &'a str,
    palette: &'a Arc<Palette>,
    transition: Option<&'a Transition>,
    output_folder: &Path,
) -> Result<ArtSummary<'a>> {
    let rasters = decoder
        .decode_with_transition(logical_name, palette, transition)
        .with_context(|| format!("Failed to decode {logical_name}"))?;

    let frames = write_frames(&rasters, &art_folder(output_folder, logical_name))?;

    Ok(ArtSummary {
        name: logical_name,
        palette: palette.name(),
        transition: transition.map(Transition::name),
        frames,
    })
}

/// Decode sprites and write each frame as a PNG, along with a JSON summary of what was written
pub fn dump_art(
    decoder: &SpriteDecoder,
    cache: &AssetCache,
    logical_names: &[String],
    palette: &str,
    transition: Option<&str>,
    output_folder: &Path,
) -> Result<()> {
    let palette = cache
        .palette(palette)
        .with_context(|| format!("Failed to load palette {palette:?}"))?;
    let transition = transition
        .map(|t| {
            cache
                .transition(t)
                .with_context(|| format!("Failed to load transition {t:?}"))
        })
        .transpose()?;

    let summaries = logical_names
        .iter()
        .filter_map(|name| {
            match dump_one(
                decoder,
                name,
                &palette,
                transition.as_deref(),
                output_folder,
            ) {
                Ok(summary) => {
                    info!("Dumped {} frames of {}", summary.frames.len(), name);
                    Some(summary)
                }
                Err(e) => {
                    warn!("Failed to dump art: {:?}", e);
                    None
                }
            }
        })
        .collect::<Vec<_>>();

    fs::create_dir_all(output_folder).context("Failed to create folder")?;
    let summary_file = File::create(output_folder.join("summary.json"))
        .context("Failed to create summary file")?;
    serde_json::to_writer_pretty(BufWriter::new(summary_file), &summaries)
        .context("Failed to write summary")?;

    Ok(())
}

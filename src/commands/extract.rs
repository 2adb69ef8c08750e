use std::{fs, path::Path};

use anyhow::{Context, Result};
use glob::Pattern;
use tracing::{info, warn};

use super::{matches_any, slash_path};
use crate::bundle_fs::FS;

/// Extract members matching any of the glob patterns to disk
pub fn extract_files(fs: &FS, patterns: &[Pattern], output_folder: &Path) -> Result<()> {
    let filenames = fs
        .list()
        .filter(|filename| matches_any(filename, patterns))
        .collect::<Vec<_>>();
    let filenames = filenames.iter().map(|f| f.as_str()).collect::<Vec<_>>();

    fs.batch_read(&filenames)
        // Report and skip unreadable members
        .filter_map(|f| match f {
            Ok(x) => Some(x),
            Err((path, e)) => {
                warn!("Failed to extract file: {:?}: {}", path, e);
                None
            }
        })
        .map(|(filename, contents)| -> Result<_> {
            let out_filename = output_folder.join(slash_path(filename));
            if let Some(parent) = out_filename.parent() {
                fs::create_dir_all(parent).context("Failed to create folder")?;
            }

            fs::write(out_filename, &contents).context("Failed to write file")?;

            Ok(filename)
        })
        .for_each(|result| match result {
            Ok(filename) => info!("Extracted file: {}", filename),
            Err(e) => warn!("Failed to extract file: {:?}", e),
        });

    Ok(())
}

use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use glob::Pattern;
use tracing::warn;

use super::{matches_any, slash_path};
use crate::bundle_fs::FS;

/// List member paths matching any of the glob patterns
pub fn list_files(fs: &FS, patterns: &[Pattern]) -> Result<()> {
    let mut stdout = BufWriter::new(io::stdout().lock());

    let mut paths = fs.list().peekable();
    if paths.peek().is_none() {
        warn!("The archive carries no file list, pass one with --listfile");
    }

    paths
        .filter(|path| matches_any(path, patterns))
        .try_for_each(|p| writeln!(stdout, "{}", slash_path(&p)).context("Failed to write to stdout"))?;

    stdout.flush().context("Failed to flush stdout")
}

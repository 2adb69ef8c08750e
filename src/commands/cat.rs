use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};

use crate::bundle_fs::FS;

/// Write the resolved buffer of a logical name to stdout. Names joining several members with `+`
/// produce a framed buffer.
pub fn cat_file(fs: &FS, logical_name: &str) -> Result<()> {
    let resolved = fs.resolve(logical_name).context("Failed to read file")?;

    let mut stdout = BufWriter::new(io::stdout().lock());
    stdout
        .write_all(&resolved.buffer)
        .context("Failed to write to stdout")?;

    stdout.flush().context("Failed to flush stdout")
}

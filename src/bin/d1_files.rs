use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use d1_tools::{
    art::{AssetCache, SpriteDecoder},
    bundle_fs::FS,
    commands::{
        cat::cat_file, dump_art::dump_art, extract::extract_files, list::list_files,
    },
    properties::PropertyRegistry,
};
use glob::Pattern;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Subcommand)]
enum Command {
    /// List files
    List {
        /// Glob patterns to filter the list of files
        #[clap(default_value = "**")]
        #[arg(num_args = 1..)]
        globs: Vec<Pattern>,
    },
    /// Extract matched files to a folder
    Extract {
        /// Path to the folder to output the extracted files
        output_folder: PathBuf,
        /// Glob patterns to filter the list of files
        #[clap(default_value = "**")]
        #[arg(num_args = 1..)]
        globs: Vec<Pattern>,
    },
    /// Write a resource to stdout. Several files can be joined with `+`.
    Cat {
        /// Logical name of the resource
        path: String,
    },
    /// Decode CEL/CL2 sprites into PNG frames
    DumpArt {
        /// Path to the folder to output the frames
        output_folder: PathBuf,
        /// Palette to decode with
        #[arg(long, default_value = "town")]
        palette: String,
        /// Optional color transition to apply
        #[arg(long)]
        transition: Option<String>,
        /// Logical names of the sprites
        #[arg(num_args = 1.., required = true)]
        names: Vec<String>,
    },
}

/// Reads files and sprites out of the game's MPQ archive
#[derive(Parser, Debug)]
#[command(name = "d1_files")]
#[clap(version)]
struct Cli {
    /// Path to the MPQ archive
    #[arg(short, long, env = "D1_ARCHIVE")]
    archive: PathBuf,

    /// Property database to use instead of the bundled one
    #[arg(long)]
    properties: Option<PathBuf>,

    /// File list naming the archive's members, for archives without one
    #[arg(long)]
    listfile: Option<PathBuf>,

    /// Log debug messages
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    ensure!(cli.archive.exists(), "Archive {:?} doesn't exist", cli.archive);

    let listfile = cli
        .listfile
        .as_ref()
        .map(fs::read)
        .transpose()
        .context("Failed to read list file")?;
    let fs = FS::from_mpq(&cli.archive, listfile.as_deref())
        .context("Failed to initialise file system")?;

    match cli.command {
        Command::List { globs } => list_files(&fs, &globs).context("List command failed")?,
        Command::Cat { path } => cat_file(&fs, &path).context("Cat command failed")?,
        Command::Extract {
            output_folder,
            globs,
        } => extract_files(&fs, &globs, &output_folder).context("Extract command failed")?,
        Command::DumpArt {
            output_folder,
            palette,
            transition,
            names,
        } => {
            let registry = match &cli.properties {
                Some(path) => PropertyRegistry::load(path),
                None => PropertyRegistry::bundled(),
            }
            .context("Failed to load property database")?;
            let registry = Arc::new(registry);

            let cache = AssetCache::new(fs.clone(), Arc::clone(&registry));
            let decoder = SpriteDecoder::new(fs, registry);

            dump_art(
                &decoder,
                &cache,
                &names,
                &palette,
                transition.as_deref(),
                &output_folder,
            )
            .context("Dump Art command failed")?
        }
    }

    Ok(())
}

use thiserror::Error;

use crate::archive::ArchiveError;

/// Failure while reconstructing the pixels of a single frame
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// More pixels were produced than the raster holds
    #[error("raster overflow: frame produces more than {capacity} pixels")]
    Overflow { capacity: usize },

    /// The byte stream ended before the raster was filled
    #[error("pixel count mismatch: expected {expected}, decoded {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },

    /// A run needed more bytes than the slice has left
    #[error("truncated frame: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A fixed size tile frame left bytes unconsumed
    #[error("tile frame has {0} trailing bytes")]
    TrailingBytes(usize),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("no property record for {0}")]
    MissingProperties(String),

    #[error("invalid property {key}: {reason}")]
    InvalidProperty { key: String, reason: String },

    #[error("failed to parse settings at line {line}: {reason}")]
    Settings { line: usize, reason: String },

    #[error("member not found in archive: {0}")]
    MemberNotFound(String),

    #[error("palette {palette:?} is not compatible with {file}")]
    IncompatiblePalette { file: String, palette: String },

    #[error("transition {transition:?} is not compatible with {file}")]
    IncompatibleTransition { file: String, transition: String },

    #[error("palette {0:?} has no transparent index")]
    NoTransparentIndex(String),

    #[error("invalid palette {name:?}: {reason}")]
    InvalidPalette { name: String, reason: String },

    #[error("palette index out of range: {0}")]
    PaletteIndexOutOfRange(usize),

    #[error("invalid transition {name:?}: expected 256 bytes, got {len}")]
    InvalidTransition { name: String, len: usize },

    #[error("invalid offset table in {name}: {reason}")]
    InvalidOffsetTable { name: String, reason: String },

    #[error("invalid bundle header: {0}")]
    InvalidBundleHeader(String),

    #[error("failed to decode {name} frame {frame}: {source}")]
    Decode {
        name: String,
        frame: usize,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

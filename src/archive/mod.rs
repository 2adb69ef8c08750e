//! Read-only access to the container holding the game's assets

pub mod crypt;
pub mod mpq;

use std::collections::BTreeMap;

use bytes::Bytes;
use thiserror::Error;

pub use mpq::MpqArchive;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("no MPQ header found")]
    MissingHeader,

    #[error("invalid MPQ header: {0}")]
    InvalidHeader(String),

    #[error("{table} table out of bounds")]
    TableOutOfBounds { table: &'static str },

    #[error("file not found in archive: {0}")]
    NotFound(String),

    #[error("block {index} of {path} is out of bounds")]
    BlockOutOfBounds { path: String, index: usize },

    #[error("corrupt sector table in {0}")]
    CorruptSectorTable(String),

    #[error("unsupported compression mask 0x{mask:02X} in {path}")]
    UnsupportedCompression { path: String, mask: u8 },

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A container of named members. Paths use the native `\` separator and are matched
/// case-insensitively.
pub trait ArchiveStore: Send + Sync {
    fn contains(&self, path: &str) -> bool;

    fn read(&self, path: &str) -> Result<Bytes, ArchiveError>;

    /// All member names the container knows about. May be empty when it carries no name list.
    fn list(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Archive held entirely in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    members: BTreeMap<String, (String, Bytes)>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, contents: impl Into<Bytes>) {
        self.members
            .insert(path.to_ascii_lowercase(), (path.to_string(), contents.into()));
    }

    pub fn with(mut self, path: &str, contents: impl Into<Bytes>) -> Self {
        self.insert(path, contents);
        self
    }
}

impl ArchiveStore for MemoryArchive {
    fn contains(&self, path: &str) -> bool {
        self.members.contains_key(&path.to_ascii_lowercase())
    }

    fn read(&self, path: &str) -> Result<Bytes, ArchiveError> {
        self.members
            .get(&path.to_ascii_lowercase())
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| ArchiveError::NotFound(path.to_string()))
    }

    fn list(&self) -> Vec<String> {
        self.members.values().map(|(name, _)| name.clone()).collect()
    }
}

use std::{path::Path, sync::Arc};

use bytes::Bytes;
use tracing::debug;

use crate::{
    archive::{ArchiveStore, MpqArchive},
    bundle::{self, ArchiveMember, BundleHeader},
    error::{Error, Result},
    path::{normalize, split_logical_name},
};

/// Buffer produced for a logical resource name
#[derive(Debug, Clone)]
pub struct ResolvedBundle {
    pub buffer: Bytes,
    /// Index of the first member byte, i.e. the framing header's length
    pub data_start: usize,
    pub header: Option<BundleHeader>,
    /// Normalized member paths, in order
    pub paths: Vec<String>,
}

impl ResolvedBundle {
    /// Split the buffer back into its members
    pub fn members(&self) -> Result<Vec<ArchiveMember>> {
        let path = self.paths.first().map(String::as_str).unwrap_or_default();
        if self.header.is_none() {
            // A lone member is never framed, even if its bytes start with the tag
            return Ok(vec![ArchiveMember {
                path: path.to_string(),
                bytes: self.buffer.clone(),
            }]);
        }

        bundle::split(&self.buffer, path)
    }
}

/// Virtual file system resolving logical names against one container
#[derive(Clone)]
pub struct FS {
    archive: Arc<dyn ArchiveStore>,
}

impl FS {
    pub fn new(archive: impl ArchiveStore + 'static) -> FS {
        FS {
            archive: Arc::new(archive),
        }
    }

    /// Initialise a file system over an MPQ container on disk
    pub fn from_mpq(archive_path: &Path, listfile: Option<&[u8]>) -> Result<FS> {
        let mut archive = MpqArchive::open(archive_path)?;
        if let Some(listfile) = listfile {
            archive = archive.with_listfile(listfile);
        }

        Ok(FS::new(archive))
    }

    /// Lists all member paths the container names
    pub fn list(&self) -> impl Iterator<Item = String> + '_ {
        self.archive.list().into_iter()
    }

    /// Whether every member named by the logical name exists
    pub fn exists(&self, logical_name: &str) -> bool {
        split_logical_name(logical_name)
            .iter()
            .all(|path| self.archive.contains(path))
    }

    /// Read a single member
    pub fn read(&self, path: &str) -> Result<Bytes> {
        let path = normalize(path);
        if !self.archive.contains(&path) {
            return Err(Error::MemberNotFound(path));
        }

        Ok(self.archive.read(&path)?)
    }

    /// Read many files at once, reporting failures per path
    pub fn batch_read<'a>(
        &'a self,
        paths: &'a [&str],
    ) -> impl Iterator<Item = std::result::Result<(&'a str, Bytes), (&'a str, Error)>> + 'a {
        paths
            .iter()
            .map(|&path| self.read(path).map(|c| (path, c)).map_err(|e| (path, e)))
    }

    /// Resolve a logical name, possibly naming several `+` separated members, to one buffer.
    /// Several members get a framing header so the buffer can be split again later.
    pub fn resolve(&self, logical_name: &str) -> Result<ResolvedBundle> {
        let paths = split_logical_name(logical_name);

        if let Some(missing) = paths.iter().find(|p| !self.archive.contains(p)) {
            return Err(Error::MemberNotFound(missing.clone()));
        }

        let mut header = BundleHeader::default();
        let mut data = Vec::new();
        for path in &paths {
            let contents = self.archive.read(path)?;
            debug!("Resolved {} ({} bytes)", path, contents.len());

            header.push(path, data.len() as u64);
            data.extend_from_slice(&contents);
        }

        if paths.len() == 1 {
            return Ok(ResolvedBundle {
                buffer: Bytes::from(data),
                data_start: 0,
                header: None,
                paths,
            });
        }

        let mut buffer = header.serialize();
        let data_start = buffer.len();
        buffer.extend(data);

        Ok(ResolvedBundle {
            buffer: Bytes::from(buffer),
            data_start,
            header: Some(header),
            paths,
        })
    }
}

//! Framing header for buffers made of several archive members.
//!
//! Layout (little-endian): `u32` tag length, tag, 4 byte format tag, `u64` member count, then per
//! member a `u32` length-prefixed UTF-8 path and its `i64` start offset. Offsets are relative to
//! the first byte after the header.

use bytes::Bytes;
use nom::{
    bytes::complete::tag,
    combinator::{map_res, verify},
    multi::{count, length_data},
    number::complete::{le_i64, le_u32, le_u64},
    IResult,
};

use crate::error::{Error, Result};

pub const BUNDLE_TAG: &[u8] = b"D1BUNDLE";
pub const FORMAT_TAG: &[u8; 4] = b"QTD1";

/// One named resource extracted from the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub path: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub path: String,
    pub start_offset: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleHeader {
    pub entries: Vec<BundleEntry>,
}

/// Bytes every framed buffer starts with
fn tag_prefix() -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + BUNDLE_TAG.len() + FORMAT_TAG.len());
    prefix.extend((BUNDLE_TAG.len() as u32).to_le_bytes());
    prefix.extend(BUNDLE_TAG);
    prefix.extend(FORMAT_TAG);
    prefix
}

impl BundleHeader {
    pub fn push(&mut self, path: &str, start_offset: u64) {
        self.entries.push(BundleEntry {
            path: path.to_string(),
            start_offset,
        });
    }

    pub fn serialized_size(&self) -> usize {
        tag_prefix().len()
            + 8
            + self
                .entries
                .iter()
                .map(|e| 4 + e.path.len() + 8)
                .sum::<usize>()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_size());
        out.extend(tag_prefix());
        out.extend((self.entries.len() as u64).to_le_bytes());

        for entry in &self.entries {
            out.extend((entry.path.len() as u32).to_le_bytes());
            out.extend(entry.path.as_bytes());
            out.extend((entry.start_offset as i64).to_le_bytes());
        }

        out
    }
}

/// Whether the buffer starts with a framing header
pub fn is_framed(buffer: &[u8]) -> bool {
    buffer.starts_with(&tag_prefix())
}

fn parse_entry(input: &[u8]) -> IResult<&[u8], BundleEntry> {
    let (input, path) = map_res(length_data(le_u32), std::str::from_utf8)(input)?;
    let (input, start_offset) = verify(le_i64, |offset: &i64| *offset >= 0)(input)?;

    Ok((
        input,
        BundleEntry {
            path: path.to_string(),
            start_offset: start_offset as u64,
        },
    ))
}

pub fn parse_bundle_header(input: &[u8]) -> IResult<&[u8], BundleHeader> {
    let prefix = tag_prefix();
    let (input, _) = tag(prefix.as_slice())(input)?;
    // Every entry takes at least 12 bytes, which bounds the allocation for corrupt counts
    let (input, member_count) =
        verify(le_u64, |n: &u64| *n <= (input.len() / 12) as u64)(input)?;
    let (input, entries) = count(parse_entry, member_count as usize)(input)?;

    Ok((input, BundleHeader { entries }))
}

/// Parse the framing header, returning it along with the index where member data starts.
/// `None` for unframed buffers.
pub fn read_header(buffer: &[u8]) -> Result<Option<(BundleHeader, usize)>> {
    if !is_framed(buffer) {
        return Ok(None);
    }

    let (rest, header) = parse_bundle_header(buffer)
        .map_err(|e| Error::InvalidBundleHeader(format!("{e:?}")))?;

    Ok(Some((header, buffer.len() - rest.len())))
}

/// Split a buffer back into its members. An unframed buffer is a single member named
/// `fallback_name`.
pub fn split(buffer: &Bytes, fallback_name: &str) -> Result<Vec<ArchiveMember>> {
    let Some((header, data_start)) = read_header(buffer)? else {
        return Ok(vec![ArchiveMember {
            path: fallback_name.to_string(),
            bytes: buffer.clone(),
        }]);
    };

    let data = buffer.slice(data_start..);
    let ends = header
        .entries
        .iter()
        .skip(1)
        .map(|e| e.start_offset as usize)
        .chain(std::iter::once(data.len()));

    header
        .entries
        .iter()
        .zip(ends)
        .map(|(entry, end)| {
            let start = entry.start_offset as usize;
            if start > end || end > data.len() {
                return Err(Error::InvalidBundleHeader(format!(
                    "member {} spans {}..{} of {} bytes",
                    entry.path,
                    start,
                    end,
                    data.len()
                )));
            }

            Ok(ArchiveMember {
                path: entry.path.clone(),
                bytes: data.slice(start..end),
            })
        })
        .collect()
}

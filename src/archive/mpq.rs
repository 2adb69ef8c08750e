use std::{fs, io::Read, path::Path};

use bytes::Bytes;
use flate2::read::ZlibDecoder;
use nom::{
    bytes::complete::tag,
    multi::count,
    number::complete::{le_u16, le_u32},
    IResult,
};
use tracing::{debug, info};

use super::{
    crypt::{self, decrypt_block, hash_string, HashType},
    ArchiveError, ArchiveStore,
};

const MAGIC: &[u8] = b"MPQ\x1A";
const HEADER_ALIGNMENT: usize = 0x200;
/// Sectors above 512 MiB are never written by real archives
const MAX_SECTOR_SIZE_SHIFT: u16 = 20;

const HASH_ENTRY_EMPTY: u32 = 0xFFFF_FFFF;
const HASH_ENTRY_DELETED: u32 = 0xFFFF_FFFE;

const FLAG_IMPLODE: u32 = 0x0000_0100;
const FLAG_COMPRESS: u32 = 0x0000_0200;
const FLAG_ENCRYPTED: u32 = 0x0001_0000;
const FLAG_FIX_KEY: u32 = 0x0002_0000;
const FLAG_SINGLE_UNIT: u32 = 0x0100_0000;
const FLAG_EXISTS: u32 = 0x8000_0000;

const COMPRESSION_ZLIB: u8 = 0x02;
const COMPRESSION_PKWARE: u8 = 0x08;

#[derive(Debug, Clone)]
pub struct MpqHeader {
    pub header_size: u32,
    pub archive_size: u32,
    pub format_version: u16,
    pub sector_size_shift: u16,
    pub hash_table_offset: u32,
    pub block_table_offset: u32,
    pub hash_table_entries: u32,
    pub block_table_entries: u32,
}

#[derive(Debug, Clone)]
pub struct HashEntry {
    pub name_a: u32,
    pub name_b: u32,
    pub locale: u16,
    pub platform: u16,
    pub block_index: u32,
}

#[derive(Debug, Clone)]
pub struct BlockEntry {
    pub file_pos: u32,
    pub compressed_size: u32,
    pub file_size: u32,
    pub flags: u32,
}

impl BlockEntry {
    fn is_compressed(&self) -> bool {
        self.flags & (FLAG_IMPLODE | FLAG_COMPRESS) != 0
    }
}

fn parse_header(input: &[u8]) -> IResult<&[u8], MpqHeader> {
    let (input, _) = tag(MAGIC)(input)?;
    let (input, header_size) = le_u32(input)?;
    let (input, archive_size) = le_u32(input)?;
    let (input, format_version) = le_u16(input)?;
    let (input, sector_size_shift) = le_u16(input)?;
    let (input, hash_table_offset) = le_u32(input)?;
    let (input, block_table_offset) = le_u32(input)?;
    let (input, hash_table_entries) = le_u32(input)?;
    let (input, block_table_entries) = le_u32(input)?;

    Ok((
        input,
        MpqHeader {
            header_size,
            archive_size,
            format_version,
            sector_size_shift,
            hash_table_offset,
            block_table_offset,
            hash_table_entries,
            block_table_entries,
        },
    ))
}

fn parse_hash_entry(input: &[u8]) -> IResult<&[u8], HashEntry> {
    let (input, name_a) = le_u32(input)?;
    let (input, name_b) = le_u32(input)?;
    let (input, locale) = le_u16(input)?;
    let (input, platform) = le_u16(input)?;
    let (input, block_index) = le_u32(input)?;

    Ok((
        input,
        HashEntry {
            name_a,
            name_b,
            locale,
            platform,
            block_index,
        },
    ))
}

fn parse_block_entry(input: &[u8]) -> IResult<&[u8], BlockEntry> {
    let (input, file_pos) = le_u32(input)?;
    let (input, compressed_size) = le_u32(input)?;
    let (input, file_size) = le_u32(input)?;
    let (input, flags) = le_u32(input)?;

    Ok((
        input,
        BlockEntry {
            file_pos,
            compressed_size,
            file_size,
            flags,
        },
    ))
}

/// Read-only MPQ container
pub struct MpqArchive {
    data: Bytes,
    header_offset: usize,
    header: MpqHeader,
    hash_table: Vec<HashEntry>,
    block_table: Vec<BlockEntry>,
    names: Vec<String>,
}

impl MpqArchive {
    /// Open an archive from disk
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let data = fs::read(path)?;
        let archive = Self::from_bytes(Bytes::from(data))?;

        info!(
            "Opened archive {} ({} blocks, {} named members)",
            path.display(),
            archive.block_table.len(),
            archive.names.len()
        );

        Ok(archive)
    }

    pub fn from_bytes(data: Bytes) -> Result<Self, ArchiveError> {
        let header_offset = (0..data.len())
            .step_by(HEADER_ALIGNMENT)
            .find(|&offset| data[offset..].starts_with(MAGIC))
            .ok_or(ArchiveError::MissingHeader)?;

        let (_, header) = parse_header(&data[header_offset..])
            .map_err(|e| ArchiveError::InvalidHeader(format!("{e:?}")))?;

        if header.hash_table_entries != 0 && !header.hash_table_entries.is_power_of_two() {
            return Err(ArchiveError::InvalidHeader(format!(
                "hash table size {} is not a power of two",
                header.hash_table_entries
            )));
        }
        if header.sector_size_shift > MAX_SECTOR_SIZE_SHIFT {
            return Err(ArchiveError::InvalidHeader(format!(
                "sector size shift {} is too large",
                header.sector_size_shift
            )));
        }

        let hash_bytes = Self::decrypted_table(
            &data,
            header_offset + header.hash_table_offset as usize,
            header.hash_table_entries as usize * 16,
            "(hash table)",
            "hash",
        )?;
        let (_, hash_table) = count(parse_hash_entry, header.hash_table_entries as usize)(
            hash_bytes.as_slice(),
        )
        .map_err(|_| ArchiveError::TableOutOfBounds { table: "hash" })?;

        let block_bytes = Self::decrypted_table(
            &data,
            header_offset + header.block_table_offset as usize,
            header.block_table_entries as usize * 16,
            "(block table)",
            "block",
        )?;
        let (_, block_table) = count(parse_block_entry, header.block_table_entries as usize)(
            block_bytes.as_slice(),
        )
        .map_err(|_| ArchiveError::TableOutOfBounds { table: "block" })?;

        debug!(
            "MPQ header at 0x{:X}: version {}, sector size {}",
            header_offset,
            header.format_version,
            512usize << header.sector_size_shift
        );

        let mut archive = Self {
            data,
            header_offset,
            header,
            hash_table,
            block_table,
            names: Vec::new(),
        };

        // The name list is optional, so a missing or unreadable one just leaves `list` empty
        if let Ok(listfile) = archive.read("(listfile)") {
            archive.names = parse_listfile(&listfile);
        }

        Ok(archive)
    }

    /// Supply member names for archives that don't carry their own list
    pub fn with_listfile(mut self, listfile: &[u8]) -> Self {
        self.names = parse_listfile(listfile);
        self
    }

    pub fn header(&self) -> &MpqHeader {
        &self.header
    }

    fn decrypted_table(
        data: &[u8],
        offset: usize,
        len: usize,
        key_name: &str,
        table: &'static str,
    ) -> Result<Vec<u8>, ArchiveError> {
        let mut bytes = data
            .get(offset..offset + len)
            .ok_or(ArchiveError::TableOutOfBounds { table })?
            .to_vec();
        decrypt_block(&mut bytes, hash_string(key_name, HashType::FileKey));

        Ok(bytes)
    }

    fn sector_size(&self) -> usize {
        512 << self.header.sector_size_shift
    }

    fn find_block(&self, path: &str) -> Option<(usize, &BlockEntry)> {
        let entries = self.hash_table.len();
        if entries == 0 {
            return None;
        }

        let start = hash_string(path, HashType::TableOffset) as usize & (entries - 1);
        let name_a = hash_string(path, HashType::NameA);
        let name_b = hash_string(path, HashType::NameB);

        let mut found: Option<&HashEntry> = None;
        for i in 0..entries {
            let entry = &self.hash_table[(start + i) & (entries - 1)];
            match entry.block_index {
                HASH_ENTRY_EMPTY => break,
                HASH_ENTRY_DELETED => continue,
                _ if entry.name_a == name_a && entry.name_b == name_b => {
                    if entry.locale == 0 {
                        found = Some(entry);
                        break;
                    }
                    found.get_or_insert(entry);
                }
                _ => {}
            }
        }

        let index = found?.block_index as usize;
        self.block_table
            .get(index)
            .filter(|block| block.flags & FLAG_EXISTS != 0)
            .map(|block| (index, block))
    }

    fn read_block(
        &self,
        path: &str,
        index: usize,
        block: &BlockEntry,
    ) -> Result<Vec<u8>, ArchiveError> {
        let start = self.header_offset + block.file_pos as usize;
        let raw = self
            .data
            .get(start..start + block.compressed_size as usize)
            .ok_or_else(|| ArchiveError::BlockOutOfBounds {
                path: path.to_string(),
                index,
            })?;

        let file_size = block.file_size as usize;
        let key = (block.flags & FLAG_ENCRYPTED != 0).then(|| {
            crypt::file_key(
                path,
                block.file_pos,
                block.file_size,
                block.flags & FLAG_FIX_KEY != 0,
            )
        });

        if block.flags & FLAG_SINGLE_UNIT != 0 {
            let mut buf = raw.to_vec();
            if let Some(key) = key {
                decrypt_block(&mut buf, key);
            }
            return self.expand_sector(path, block, buf, file_size);
        }

        let sector_size = self.sector_size();
        let sector_count = file_size.div_ceil(sector_size);
        let mut out = Vec::with_capacity(file_size);

        if block.is_compressed() {
            let table_len = (sector_count + 1) * 4;
            let mut table = raw
                .get(..table_len)
                .ok_or_else(|| ArchiveError::CorruptSectorTable(path.to_string()))?
                .to_vec();
            if let Some(key) = key {
                decrypt_block(&mut table, key.wrapping_sub(1));
            }
            let (_, offsets) = count(le_u32::<_, nom::error::Error<_>>, sector_count + 1)(
                table.as_slice(),
            )
            .map_err(|_| ArchiveError::CorruptSectorTable(path.to_string()))?;

            for (i, bounds) in offsets.windows(2).enumerate() {
                let (begin, end) = (bounds[0] as usize, bounds[1] as usize);
                if begin > end || end > raw.len() {
                    return Err(ArchiveError::CorruptSectorTable(path.to_string()));
                }

                let mut sector = raw[begin..end].to_vec();
                if let Some(key) = key {
                    decrypt_block(&mut sector, key.wrapping_add(i as u32));
                }

                let expected = sector_size.min(file_size - i * sector_size);
                out.extend(self.expand_sector(path, block, sector, expected)?);
            }
        } else {
            for (i, chunk) in raw[..file_size.min(raw.len())]
                .chunks(sector_size)
                .enumerate()
            {
                let mut sector = chunk.to_vec();
                if let Some(key) = key {
                    decrypt_block(&mut sector, key.wrapping_add(i as u32));
                }
                out.extend(sector);
            }
        }

        if out.len() != file_size {
            return Err(ArchiveError::Decompression(format!(
                "{path} expanded to {} bytes, expected {file_size}",
                out.len()
            )));
        }

        Ok(out)
    }

    /// A stored sector is compressed only when it is smaller than its expanded size
    fn expand_sector(
        &self,
        path: &str,
        block: &BlockEntry,
        mut sector: Vec<u8>,
        expected: usize,
    ) -> Result<Vec<u8>, ArchiveError> {
        if !block.is_compressed() || sector.len() >= expected {
            sector.truncate(expected);
            return Ok(sector);
        }

        if block.flags & FLAG_IMPLODE != 0 {
            return explode(path, &sector, expected);
        }

        let (&mask, payload) = sector
            .split_first()
            .ok_or_else(|| ArchiveError::Decompression(format!("empty sector in {path}")))?;

        match mask {
            COMPRESSION_PKWARE => explode(path, payload, expected),
            COMPRESSION_ZLIB => {
                let mut out = Vec::with_capacity(expected);
                ZlibDecoder::new(payload)
                    .read_to_end(&mut out)
                    .map_err(|e| ArchiveError::Decompression(e.to_string()))?;
                Ok(out)
            }
            mask => Err(ArchiveError::UnsupportedCompression {
                path: path.to_string(),
                mask,
            }),
        }
    }
}

/// PKWARE DCL sector, cut to the sector's expanded size
fn explode(path: &str, sector: &[u8], expected: usize) -> Result<Vec<u8>, ArchiveError> {
    let mut out = pklib::explode_bytes(sector)
        .map_err(|e| ArchiveError::Decompression(format!("{path}: {e}")))?;
    out.truncate(expected);
    Ok(out)
}

fn parse_listfile(contents: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(contents)
        .split([';', '\r', '\n'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

impl ArchiveStore for MpqArchive {
    fn contains(&self, path: &str) -> bool {
        self.find_block(path).is_some()
    }

    fn read(&self, path: &str) -> Result<Bytes, ArchiveError> {
        let (index, block) = self
            .find_block(path)
            .ok_or_else(|| ArchiveError::NotFound(path.to_string()))?;

        debug!("Reading {} from block {}", path, index);
        self.read_block(path, index, block).map(Bytes::from)
    }

    fn list(&self) -> Vec<String> {
        self.names.clone()
    }
}

#![allow(dead_code)]

use d1_tools::archive::crypt::{encrypt_block, file_key, hash_string, HashType};

const HASH_ENTRIES: usize = 16;
const FLAG_ENCRYPTED: u32 = 0x0001_0000;
const FLAG_SINGLE_UNIT: u32 = 0x0100_0000;
const FLAG_EXISTS: u32 = 0x8000_0000;

/// Uncompressed MPQ holding `members`, each stored as a single unit. Members whose name ends in
/// `.pal` are encrypted.
pub fn build_mpq(members: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut blocks = Vec::new();
    let mut hashes = vec![[0xFFu8; 16]; HASH_ENTRIES];

    for (block_index, (path, contents)) in members.iter().enumerate() {
        let file_pos = (32 + body.len()) as u32;
        let mut flags = FLAG_EXISTS | FLAG_SINGLE_UNIT;
        let mut stored = contents.clone();

        if path.ends_with(".pal") {
            flags |= FLAG_ENCRYPTED;
            encrypt_block(
                &mut stored,
                file_key(path, file_pos, contents.len() as u32, false),
            );
        }

        blocks.extend([file_pos, stored.len() as u32, contents.len() as u32, flags]);
        body.extend(stored);

        let mut slot = hash_string(path, HashType::TableOffset) as usize % HASH_ENTRIES;
        while hashes[slot][12..16] != [0xFF; 4] {
            slot = (slot + 1) % HASH_ENTRIES;
        }
        let mut entry = [0u8; 16];
        entry[0..4].copy_from_slice(&hash_string(path, HashType::NameA).to_le_bytes());
        entry[4..8].copy_from_slice(&hash_string(path, HashType::NameB).to_le_bytes());
        entry[8..12].copy_from_slice(&[0; 4]);
        entry[12..16].copy_from_slice(&(block_index as u32).to_le_bytes());
        hashes[slot] = entry;
    }

    let mut hash_table = hashes.concat();
    encrypt_block(&mut hash_table, hash_string("(hash table)", HashType::FileKey));
    let mut block_table = blocks
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect::<Vec<_>>();
    encrypt_block(
        &mut block_table,
        hash_string("(block table)", HashType::FileKey),
    );

    let hash_table_offset = 32 + body.len() as u32;
    let block_table_offset = hash_table_offset + hash_table.len() as u32;

    let mut out = Vec::new();
    out.extend(b"MPQ\x1A");
    out.extend(32u32.to_le_bytes());
    out.extend((block_table_offset + block_table.len() as u32).to_le_bytes());
    out.extend(0u16.to_le_bytes());
    out.extend(3u16.to_le_bytes());
    out.extend(hash_table_offset.to_le_bytes());
    out.extend(block_table_offset.to_le_bytes());
    out.extend((HASH_ENTRIES as u32).to_le_bytes());
    out.extend((members.len() as u32).to_le_bytes());
    out.extend(body);
    out.extend(hash_table);
    out.extend(block_table);
    out
}

/// Frame table followed by the frames
pub fn build_image(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut out = (frames.len() as u32).to_le_bytes().to_vec();
    let mut offset = 4 * (frames.len() + 2);
    out.extend((offset as u32).to_le_bytes());
    for frame in frames {
        offset += frame.len();
        out.extend((offset as u32).to_le_bytes());
    }
    frames.iter().for_each(|f| out.extend(f));
    out
}

/// Grey ramp palette, the last entry keyed as transparent
pub fn palette_bytes() -> Vec<u8> {
    let mut bytes = (0..=255u8).flat_map(|i| [i, i, i]).collect::<Vec<_>>();
    bytes[255 * 3..].copy_from_slice(&[0xFF, 0xFF, 0xFF]);
    bytes
}

/// CEL frame of `len` literal pixels, all `color`
pub fn cel_literal(len: usize, color: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let mut left = len;
    while left > 0 {
        let run = left.min(127);
        out.push(run as u8);
        out.extend(std::iter::repeat(color).take(run));
        left -= run;
    }
    out
}

/// Tile frame with zeros at `zero_offsets` and `fill` elsewhere
pub fn tile(len: usize, zero_offsets: &[usize], fill: u8) -> Vec<u8> {
    let mut data = vec![fill; len];
    zero_offsets.iter().for_each(|&i| data[i] = 0);
    data
}

pub const LEFT_ZERO_OFFSETS: [usize; 16] = [
    0, 1, 8, 9, 24, 25, 48, 49, 80, 81, 120, 121, 168, 169, 224, 225,
];

pub const RIGHT_ZERO_OFFSETS: [usize; 16] = [
    2, 3, 14, 15, 34, 35, 62, 63, 98, 99, 142, 143, 194, 195, 254, 255,
];

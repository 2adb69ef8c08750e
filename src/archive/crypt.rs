//! MPQ name hashing and block encryption

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    TableOffset = 0,
    NameA = 1,
    NameB = 2,
    FileKey = 3,
}

static CRYPT_TABLE: OnceLock<[u32; 0x500]> = OnceLock::new();

fn crypt_table() -> &'static [u32; 0x500] {
    CRYPT_TABLE.get_or_init(|| {
        let mut table = [0u32; 0x500];
        let mut seed: u32 = 0x0010_0001;

        for i in 0..0x100 {
            let mut index = i;
            for _ in 0..5 {
                seed = (seed * 125 + 3) % 0x2A_AAAB;
                let high = (seed & 0xFFFF) << 16;
                seed = (seed * 125 + 3) % 0x2A_AAAB;
                let low = seed & 0xFFFF;

                table[index] = high | low;
                index += 0x100;
            }
        }

        table
    })
}

/// Hash a member name. Case and path separator insensitive.
pub fn hash_string(name: &str, hash_type: HashType) -> u32 {
    let table = crypt_table();
    let offset = (hash_type as usize) << 8;

    let mut seed1: u32 = 0x7FED_7FED;
    let mut seed2: u32 = 0xEEEE_EEEE;

    for byte in name.bytes() {
        let ch = match byte.to_ascii_uppercase() {
            b'/' => b'\\',
            c => c,
        } as u32;

        seed1 = table[offset + ch as usize] ^ seed1.wrapping_add(seed2);
        seed2 = ch
            .wrapping_add(seed1)
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
    }

    seed1
}

/// Decrypt a buffer in place. Trailing bytes that don't fill a whole word are left untouched.
pub fn decrypt_block(data: &mut [u8], mut key: u32) {
    let table = crypt_table();
    let mut seed: u32 = 0xEEEE_EEEE;

    for chunk in data.chunks_exact_mut(4) {
        seed = seed.wrapping_add(table[0x400 + (key & 0xFF) as usize]);

        let value = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let plain = value ^ key.wrapping_add(seed);

        key = ((!key << 0x15).wrapping_add(0x1111_1111)) | (key >> 0x0B);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);

        chunk.copy_from_slice(&plain.to_le_bytes());
    }
}

/// Inverse of [`decrypt_block`]
pub fn encrypt_block(data: &mut [u8], mut key: u32) {
    let table = crypt_table();
    let mut seed: u32 = 0xEEEE_EEEE;

    for chunk in data.chunks_exact_mut(4) {
        seed = seed.wrapping_add(table[0x400 + (key & 0xFF) as usize]);

        let plain = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let value = plain ^ key.wrapping_add(seed);

        key = ((!key << 0x15).wrapping_add(0x1111_1111)) | (key >> 0x0B);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);

        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

/// Key used to encrypt a member, derived from its base name
pub fn file_key(path: &str, block_pos: u32, file_size: u32, fix_key: bool) -> u32 {
    let base_name = path.rsplit(['\\', '/']).next().unwrap_or(path);
    let key = hash_string(base_name, HashType::FileKey);

    if fix_key {
        key.wrapping_add(block_pos) ^ file_size
    } else {
        key
    }
}

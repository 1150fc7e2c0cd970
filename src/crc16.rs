//! Cluster key hashing: CRC16-XMODEM over the key or its `{hash tag}`,
//! reduced to one of 16384 slots.

use memchr::memchr;

/// Number of hash slots in a Redis Cluster.
pub const SLOT_COUNT: u16 = 16384;

/// CRC16-XMODEM lookup table (polynomial 0x1021).
static CRC16_TABLE: [u16; 256] = {
    let mut table = [0u16; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |crc, &byte| {
        (crc << 8) ^ CRC16_TABLE[((crc >> 8) as u8 ^ byte) as usize]
    })
}

/// The part of `key` that is hashed.
///
/// The first `{` and the first `}` after it delimit the tag; an empty tag
/// (`{}`) or a missing `}` means the whole key is hashed.
pub fn hash_tag(key: &[u8]) -> &[u8] {
    let Some(open) = memchr(b'{', key) else {
        return key;
    };
    match memchr(b'}', &key[open + 1..]) {
        Some(len) if len > 0 => &key[open + 1..open + 1 + len],
        _ => key,
    }
}

pub fn hash_slot(key: &[u8]) -> u16 {
    crc16(hash_tag(key)) % SLOT_COUNT
}

/// Slot shared by every key, `Ok(None)` when there are no keys, or the
/// first two differing slots.
pub fn common_slot<'a, I>(keys: I) -> Result<Option<u16>, (u16, u16)>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut slot = None;
    for key in keys {
        let s = hash_slot(key);
        match slot {
            None => slot = Some(s),
            Some(first) if first != s => return Err((first, s)),
            Some(_) => {}
        }
    }
    Ok(slot)
}

// ── Tests ──────────────────────────────────────────────────────────

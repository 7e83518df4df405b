//! String hash functions used to derive bit positions.
//!
//! Three classic rolling accumulators run over the key's UTF-16 code units
//! with 32-bit signed wrapping arithmetic:
//!
//! - `hash1`: shift-and-subtract (`h * 31 + c`)
//! - `hash2`: djb2 (`h * 33 + c`, seeded with 5381)
//! - `hash3`: sdbm (`c + (h << 6) + (h << 16) - h`)
//!
//! All three multipliers are congruent to -1 or 1 modulo 32, so their low bits
//! move together. Each accumulator is therefore run through the MurmurHash3
//! 32-bit finalizer before being folded to a non-negative value, which keeps
//! the three positions independent for power-of-two filter sizes.

/// Number of independent hash families.
pub const HASH_FAMILIES: u32 = 3;

/// Shift-and-subtract accumulator, folded to a non-negative value.
pub fn hash1(key: &str) -> u32 {
    let mut h: i32 = 0;
    for c in key.encode_utf16() {
        h = (h << 5).wrapping_sub(h).wrapping_add(c as i32);
    }
    fold(h)
}

/// djb2 accumulator, folded to a non-negative value.
pub fn hash2(key: &str) -> u32 {
    let mut h: i32 = 5381;
    for c in key.encode_utf16() {
        h = (h << 5).wrapping_add(h).wrapping_add(c as i32);
    }
    fold(h)
}

/// sdbm accumulator, folded to a non-negative value.
pub fn hash3(key: &str) -> u32 {
    let mut h: i32 = 0;
    for c in key.encode_utf16() {
        h = (c as i32)
            .wrapping_add(h << 6)
            .wrapping_add(h << 16)
            .wrapping_sub(h);
    }
    fold(h)
}

/// Compute `num_hashes` bit positions in `[0, num_bits)` for `key`.
///
/// The first three positions come from `hash1`, `hash2` and `hash3`. Any
/// further positions are generated by double hashing: `h2 + j * h3`.
/// Duplicate positions are allowed.
pub fn bit_positions(key: &str, num_bits: usize, num_hashes: u32) -> Vec<usize> {
    if num_bits == 0 {
        return Vec::new();
    }

    let families = [hash1(key), hash2(key), hash3(key)];
    let mut positions = Vec::with_capacity(num_hashes as usize);

    for j in 0..num_hashes {
        let h = match families.get(j as usize) {
            Some(&h) => h,
            None => families[1].wrapping_add(j.wrapping_mul(families[2])),
        };
        positions.push((h as usize) % num_bits);
    }

    positions
}

/// Finalize and fold a signed accumulator into `[0, 2^31]`.
fn fold(h: i32) -> u32 {
    (fmix32(h as u32) as i32).unsigned_abs()
}

/// MurmurHash3 32-bit finalizer.
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

//! Fixed-size packed bit array backing every filter.

use crate::error::{Error, Result};

/// A fixed-length sequence of bits, packed 8 per byte.
///
/// Bit `i` lives in byte `i / 8` at position `i % 8`, least significant bit
/// first. The length never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitArray {
    bytes: Vec<u8>,
    num_bits: usize,
}

impl BitArray {
    /// Create an array of `num_bits` bits, all unset.
    pub fn new(num_bits: usize) -> Self {
        Self {
            bytes: vec![0u8; Self::byte_len(num_bits)],
            num_bits,
        }
    }

    /// Rebuild an array from its packed bytes.
    ///
    /// The byte count must be exactly `ceil(num_bits / 8)`. Padding bits past
    /// `num_bits` in the last byte are cleared.
    pub fn from_bytes(num_bits: usize, mut bytes: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(num_bits);
        if bytes.len() != expected {
            return Err(Error::corruption(format!(
                "bit array size mismatch: expected {} bytes for {} bits, got {}",
                expected,
                num_bits,
                bytes.len()
            )));
        }

        let tail = num_bits % 8;
        if tail != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= (1u8 << tail) - 1;
            }
        }

        Ok(Self { bytes, num_bits })
    }

    /// Number of bytes needed to hold `num_bits` bits.
    pub fn byte_len(num_bits: usize) -> usize {
        num_bits.div_ceil(8)
    }

    /// Set bit `pos`. Positions outside the array are ignored.
    pub fn set_bit(&mut self, pos: usize) {
        if pos < self.num_bits {
            self.bytes[pos / 8] |= 1 << (pos % 8);
        }
    }

    /// Whether bit `pos` is set. Positions outside the array read as unset.
    pub fn get_bit(&self, pos: usize) -> bool {
        if pos < self.num_bits {
            (self.bytes[pos / 8] & (1 << (pos % 8))) != 0
        } else {
            false
        }
    }

    /// Reset every bit to 0.
    pub fn clear(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }

    /// Number of bits currently set.
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Number of bits in the array.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// The packed backing bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

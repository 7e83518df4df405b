//! Bloom Filter implementation.
//!
//! A space-efficient probabilistic data structure used to test whether an element
//! is a member of a set. False positive matches are possible, but false negatives are not.

use crate::config::FilterOptions;
use crate::error::{Error, Result};
use crate::filter::bits::BitArray;
use crate::filter::{hash, Filter, KeyNormalizer};

/// Size of the binary snapshot header.
const HEADER_LEN: usize = 17;

/// BloomFilter provides probabilistic set membership testing over string keys.
///
/// # Example
/// ```
/// use feedbloom::filter::{BloomFilter, Filter};
///
/// let mut filter = BloomFilter::new(1024, 3);
/// filter.add("post-1");
/// filter.add("post-2");
///
/// assert!(filter.might_contain("post-1"));
/// assert!(filter.might_contain("post-2"));
/// // post-3 might return true (false positive) or false
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// Bit array for the bloom filter
    bits: BitArray,
    /// Number of hash functions to use
    num_hashes: u32,
    /// Normalization applied before hashing
    normalizer: KeyNormalizer,
}

impl BloomFilter {
    /// Create an empty BloomFilter with `num_bits` bits and `num_hashes` hash
    /// functions. Keys are hashed as given.
    ///
    /// `num_bits` is raised to at least 1 and `num_hashes` is clamped to
    /// `1..=30`.
    pub fn new(num_bits: usize, num_hashes: u32) -> Self {
        Self {
            bits: BitArray::new(num_bits.max(1)),
            num_hashes: num_hashes.clamp(1, 30),
            normalizer: KeyNormalizer::Identity,
        }
    }

    /// Create an empty BloomFilter from options.
    pub fn from_options(options: &FilterOptions) -> Self {
        Self::new(options.num_bits, options.num_hashes).with_normalizer(options.normalizer)
    }

    /// Set the key normalization.
    pub fn with_normalizer(mut self, normalizer: KeyNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Bit positions for `key`, after normalization.
    ///
    /// Always returns the same positions for the same key. Positions may
    /// repeat.
    pub fn get_hashes(&self, key: &str) -> Vec<usize> {
        let key = self.normalizer.apply(key);
        hash::bit_positions(&key, self.bits.num_bits(), self.num_hashes)
    }

    /// Get the size of the filter in bytes.
    pub fn size(&self) -> usize {
        self.bits.as_bytes().len()
    }

    /// Get the number of hash functions used.
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Get the number of bits in the filter.
    pub fn num_bits(&self) -> usize {
        self.bits.num_bits()
    }

    /// Get the key normalization.
    pub fn normalizer(&self) -> KeyNormalizer {
        self.normalizer
    }

    /// The underlying bit array.
    pub fn bits(&self) -> &BitArray {
        &self.bits
    }

    /// Whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.bits.count_ones() == 0
    }

    /// Fraction of bits currently set, in `[0, 1]`.
    pub fn fill_ratio(&self) -> f64 {
        self.bits.count_ones() as f64 / self.bits.num_bits() as f64
    }

    /// Calculate the approximate false positive rate after `num_keys` distinct insertions.
    ///
    /// p = (1 - e^(-kn/m))^k
    /// where k = num_hashes, n = num_keys, m = num_bits
    pub fn estimated_false_positive_rate(&self, num_keys: usize) -> f64 {
        if num_keys == 0 {
            return 0.0;
        }

        let k = self.num_hashes as f64;
        let n = num_keys as f64;
        let m = self.bits.num_bits() as f64;

        let exp = (-k * n / m).exp();
        (1.0 - exp).powf(k)
    }

    /// Serialize the bits as a JSON array of byte values.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self.bits.as_bytes())?)
    }

    /// Rebuild a filter from a JSON array of byte values.
    ///
    /// Fails if the JSON is malformed, holds anything other than integers in
    /// `0..=255`, or has the wrong length for `options.num_bits`.
    pub fn from_json(options: &FilterOptions, json: &str) -> Result<Self> {
        let bytes: Vec<u8> = serde_json::from_str(json)?;
        let mut filter = Self::from_options(options);
        filter.bits = BitArray::from_bytes(filter.bits.num_bits(), bytes)?;
        Ok(filter)
    }
}

impl Filter for BloomFilter {
    /// Check if a key may exist in the set.
    ///
    /// Returns `true` if the key might exist (with possible false positives).
    /// Returns `false` if the key definitely does not exist (no false negatives).
    fn might_contain(&self, key: &str) -> bool {
        self.get_hashes(key).into_iter().all(|pos| self.bits.get_bit(pos))
    }

    /// Add a key to the filter.
    fn add(&mut self, key: &str) {
        for pos in self.get_hashes(key) {
            self.bits.set_bit(pos);
        }
    }

    fn clear(&mut self) {
        self.bits.clear();
    }

    /// Encode the filter to bytes for storage.
    ///
    /// Format:
    /// [num_hashes: 4 bytes][num_bits: 8 bytes][normalizer: 1 byte][crc32: 4 bytes][bits: variable]
    fn encode(&self) -> Vec<u8> {
        let bytes = self.bits.as_bytes();
        let mut encoded = Vec::with_capacity(HEADER_LEN + bytes.len());

        encoded.extend_from_slice(&self.num_hashes.to_le_bytes());
        encoded.extend_from_slice(&(self.bits.num_bits() as u64).to_le_bytes());
        encoded.push(self.normalizer.to_u8());
        encoded.extend_from_slice(&crc32fast::hash(bytes).to_le_bytes());
        encoded.extend_from_slice(bytes);

        encoded
    }

    /// Decode a filter from bytes.
    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::corruption("Bloom filter data too short"));
        }

        let num_hashes = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let raw_bits = u64::from_le_bytes([
            data[4], data[5], data[6], data[7],
            data[8], data[9], data[10], data[11],
        ]);
        let normalizer = KeyNormalizer::from_u8(data[12])
            .ok_or_else(|| Error::corruption(format!("Unknown key normalizer: {}", data[12])))?;
        let expected = u32::from_le_bytes([data[13], data[14], data[15], data[16]]);

        let body = &data[HEADER_LEN..];
        let num_bits = match usize::try_from(raw_bits) {
            Ok(n) if n > 0 && n / 8 <= body.len() && (1..=30).contains(&num_hashes) => n,
            _ => return Err(Error::corruption("Bloom filter header out of range")),
        };

        if body.len() != BitArray::byte_len(num_bits) {
            return Err(Error::corruption("Bloom filter size mismatch"));
        }

        let actual = crc32fast::hash(body);
        if actual != expected {
            return Err(Error::ChecksumMismatch { expected, actual });
        }

        Ok(Self {
            bits: BitArray::from_bytes(num_bits, body.to_vec())?,
            num_hashes,
            normalizer,
        })
    }
}

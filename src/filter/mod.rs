//! Probabilistic membership filters.
//!
//! A filter answers "definitely not present" or "possibly present" for a
//! string key. Both consumers in this crate (seen posts and username
//! prechecks) share the same [`BloomFilter`], configured differently.

pub mod bits;
pub mod bloom;
pub mod hash;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

pub use bits::BitArray;
pub use bloom::BloomFilter;

/// Filter trait for key membership checking
pub trait Filter {
    /// Check if a key may exist (can have false positives, never false negatives)
    fn might_contain(&self, key: &str) -> bool;

    /// Add a key to the filter
    fn add(&mut self, key: &str);

    /// Reset the filter to the empty set
    fn clear(&mut self);

    /// Get the serialized representation of the filter
    fn encode(&self) -> Vec<u8>;

    /// Create a filter from serialized data
    fn decode(data: &[u8]) -> crate::Result<Self>
    where
        Self: Sized;
}

/// Normalization applied to every key before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyNormalizer {
    /// Hash keys exactly as given (post ids).
    #[default]
    Identity,
    /// Lowercase keys before hashing (usernames).
    Lowercase,
}

impl KeyNormalizer {
    /// Apply the normalization to `key`.
    pub fn apply<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match self {
            KeyNormalizer::Identity => Cow::Borrowed(key),
            KeyNormalizer::Lowercase => {
                if key.is_ascii() && !key.bytes().any(|b| b.is_ascii_uppercase()) {
                    Cow::Borrowed(key)
                } else {
                    Cow::Owned(key.to_lowercase())
                }
            }
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            KeyNormalizer::Identity => 0,
            KeyNormalizer::Lowercase => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(KeyNormalizer::Identity),
            1 => Some(KeyNormalizer::Lowercase),
            _ => None,
        }
    }
}

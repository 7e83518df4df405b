//! Configuration options for feedbloom filters and their adapters.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::filter::KeyNormalizer;

/// Storage key the seen-posts filter persists under by default.
pub const DEFAULT_SEEN_POSTS_KEY: &str = "bloom-seen-posts";

/// Sizing and key handling for a single bloom filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Number of bits in the filter (`M`).
    /// Default: 1024
    pub num_bits: usize,

    /// Number of hash functions (`K`).
    /// Default: 3
    pub num_hashes: u32,

    /// Normalization applied to keys before hashing.
    /// Default: KeyNormalizer::Identity
    pub normalizer: KeyNormalizer,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self::seen_posts()
    }
}

impl FilterOptions {
    /// Creates a new FilterOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client-side seen-posts filter: 1024 bits, 3 hashes, keys as given.
    pub fn seen_posts() -> Self {
        Self {
            num_bits: 1024,
            num_hashes: 3,
            normalizer: KeyNormalizer::Identity,
        }
    }

    /// Server-side username filter: 10000 bits, 3 hashes, lowercased keys.
    pub fn usernames() -> Self {
        Self {
            num_bits: 10_000,
            num_hashes: 3,
            normalizer: KeyNormalizer::Lowercase,
        }
    }

    /// Sets the number of bits.
    pub fn num_bits(mut self, num_bits: usize) -> Self {
        self.num_bits = num_bits;
        self
    }

    /// Sets the number of hash functions.
    pub fn num_hashes(mut self, num_hashes: u32) -> Self {
        self.num_hashes = num_hashes;
        self
    }

    /// Sets the key normalization.
    pub fn normalizer(mut self, normalizer: KeyNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.num_bits == 0 {
            return Err(crate::Error::invalid_argument("num_bits must be > 0"));
        }
        if self.num_hashes == 0 || self.num_hashes > 30 {
            return Err(crate::Error::invalid_argument(
                "num_hashes must be between 1 and 30",
            ));
        }
        Ok(())
    }
}

/// Options for the client-side seen-posts adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeenPostsOptions {
    /// Key the filter's bytes are persisted under.
    /// Default: "bloom-seen-posts"
    pub storage_key: String,

    /// Filter sizing.
    /// Default: FilterOptions::seen_posts()
    pub filter: FilterOptions,
}

impl Default for SeenPostsOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_SEEN_POSTS_KEY.to_string(),
            filter: FilterOptions::seen_posts(),
        }
    }
}

impl SeenPostsOptions {
    /// Creates a new SeenPostsOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage key.
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Sets the filter options.
    pub fn filter(mut self, filter: FilterOptions) -> Self {
        self.filter = filter;
        self
    }

    /// Parses options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.storage_key.is_empty() {
            return Err(crate::Error::invalid_argument("storage_key must not be empty"));
        }
        self.filter.validate()
    }
}

/// Retry policy for the startup bulk load of the username filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitPolicy {
    /// Attempts before giving up and running uninitialized.
    /// Default: 3
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds; attempt `n` waits
    /// `n * backoff_ms`.
    /// Default: 200
    pub backoff_ms: u64,
}

impl Default for InitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 200,
        }
    }
}

impl InitPolicy {
    /// A policy that tries exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(attempt as u64))
    }
}

/// Options for the server-side username precheck adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecheckOptions {
    /// Filter sizing. Fields left out of a JSON config come from
    /// `FilterOptions::usernames()`.
    /// Default: FilterOptions::usernames()
    #[serde(
        default = "FilterOptions::usernames",
        deserialize_with = "deserialize_username_filter"
    )]
    pub filter: FilterOptions,

    /// Bulk-load retry policy.
    /// Default: InitPolicy::default()
    pub init: InitPolicy,
}

impl Default for PrecheckOptions {
    fn default() -> Self {
        Self {
            filter: FilterOptions::usernames(),
            init: InitPolicy::default(),
        }
    }
}

impl PrecheckOptions {
    /// Creates a new PrecheckOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter options.
    pub fn filter(mut self, filter: FilterOptions) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the bulk-load retry policy.
    pub fn init(mut self, init: InitPolicy) -> Self {
        self.init = init;
        self
    }

    /// Parses options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Validates the options and returns an error if any are invalid.
    ///
    /// Username lookups are case-insensitive, so the filter must lowercase
    /// its keys.
    pub fn validate(&self) -> crate::Result<()> {
        if self.init.max_attempts == 0 {
            return Err(crate::Error::invalid_argument("init.max_attempts must be > 0"));
        }
        if self.filter.normalizer != KeyNormalizer::Lowercase {
            return Err(crate::Error::invalid_argument(
                "username filter normalizer must be lowercase",
            ));
        }
        self.filter.validate()
    }
}

/// Username filter fields as they appear in config; absent ones fall back
/// to the username preset rather than `FilterOptions::default()`.
#[derive(Deserialize)]
struct PartialFilterOptions {
    num_bits: Option<usize>,
    num_hashes: Option<u32>,
    normalizer: Option<KeyNormalizer>,
}

fn deserialize_username_filter<'de, D>(deserializer: D) -> Result<FilterOptions, D::Error>
where
    D: Deserializer<'de>,
{
    let partial = PartialFilterOptions::deserialize(deserializer)?;
    let preset = FilterOptions::usernames();
    Ok(FilterOptions {
        num_bits: partial.num_bits.unwrap_or(preset.num_bits),
        num_hashes: partial.num_hashes.unwrap_or(preset.num_hashes),
        normalizer: partial.normalizer.unwrap_or(preset.normalizer),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = FilterOptions::default();
        assert_eq!(opts.num_bits, 1024);
        assert_eq!(opts.num_hashes, 3);
        assert_eq!(opts.normalizer, KeyNormalizer::Identity);

        let seen = SeenPostsOptions::default();
        assert_eq!(seen.storage_key, "bloom-seen-posts");
        assert_eq!(seen.filter, FilterOptions::seen_posts());

        let precheck = PrecheckOptions::default();
        assert_eq!(precheck.filter.num_bits, 10_000);
        assert_eq!(precheck.filter.normalizer, KeyNormalizer::Lowercase);
        assert_eq!(precheck.init.max_attempts, 3);
    }

    #[test]
    fn test_options_builder() {
        let opts = FilterOptions::new()
            .num_bits(2048)
            .num_hashes(4)
            .normalizer(KeyNormalizer::Lowercase);

        assert_eq!(opts.num_bits, 2048);
        assert_eq!(opts.num_hashes, 4);
        assert_eq!(opts.normalizer, KeyNormalizer::Lowercase);

        let seen = SeenPostsOptions::new().storage_key("bloom-seen-posts:bob");
        assert_eq!(seen.storage_key, "bloom-seen-posts:bob");
    }

    #[test]
    fn test_options_validation() {
        let mut opts = FilterOptions::default();
        assert!(opts.validate().is_ok());

        opts.num_bits = 0;
        assert!(opts.validate().is_err());

        opts.num_bits = 1024;
        opts.num_hashes = 0;
        assert!(opts.validate().is_err());

        opts.num_hashes = 31;
        assert!(opts.validate().is_err());

        let seen = SeenPostsOptions::new().storage_key("");
        assert!(seen.validate().is_err());

        let precheck = PrecheckOptions::new().init(InitPolicy {
            max_attempts: 0,
            backoff_ms: 10,
        });
        assert!(precheck.validate().is_err());
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = InitPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(600));
        assert_eq!(InitPolicy::no_retry().backoff(1), Duration::ZERO);
    }

    #[test]
    fn test_from_json_with_defaults() {
        let opts = PrecheckOptions::from_json(r#"{"init": {"max_attempts": 5}}"#).unwrap();
        assert_eq!(opts.init.max_attempts, 5);
        assert_eq!(opts.init.backoff_ms, 200);
        assert_eq!(opts.filter, FilterOptions::usernames());

        let seen = SeenPostsOptions::from_json(
            r#"{"storage_key": "seen", "filter": {"num_bits": 2048, "normalizer": "lowercase"}}"#,
        )
        .unwrap();
        assert_eq!(seen.storage_key, "seen");
        assert_eq!(seen.filter.num_bits, 2048);
        assert_eq!(seen.filter.num_hashes, 3);
        assert_eq!(seen.filter.normalizer, KeyNormalizer::Lowercase);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(SeenPostsOptions::from_json(r#"{"filter": {"num_bits": 0}}"#).is_err());
        assert!(PrecheckOptions::from_json("not json").is_err());
        assert!(PrecheckOptions::from_json(r#"{"filter": {"num_bits": 0}}"#).is_err());
    }

    #[test]
    fn test_partial_precheck_filter_keeps_username_preset() {
        let opts = PrecheckOptions::from_json(r#"{"filter": {"num_bits": 20000}}"#).unwrap();
        assert_eq!(opts.filter.num_bits, 20_000);
        assert_eq!(opts.filter.num_hashes, 3);
        assert_eq!(opts.filter.normalizer, KeyNormalizer::Lowercase);

        let opts = PrecheckOptions::from_json(r#"{"filter": {}}"#).unwrap();
        assert_eq!(opts.filter, FilterOptions::usernames());
    }

    #[test]
    fn test_precheck_requires_lowercase_normalizer() {
        let err = PrecheckOptions::from_json(r#"{"filter": {"normalizer": "identity"}}"#)
            .unwrap_err();
        assert!(matches!(err, crate::Error::InvalidArgument(_)));

        let opts = PrecheckOptions::new().filter(FilterOptions::seen_posts());
        assert!(opts.validate().is_err());
    }
}

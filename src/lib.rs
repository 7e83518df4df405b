//! # feedbloom - Bloom Filters for a Forum Feed
//!
//! feedbloom provides the probabilistic membership filter a forum uses in two
//! places, plus the adapters that wire it into each:
//!
//! - **Seen posts** (client side): remembers which posts a viewer has opened,
//!   in a small filter persisted to a storage area after every change.
//! - **Username precheck** (server side): a filter of every registered
//!   username, bulk-loaded at startup, that lets availability checks skip the
//!   user directory for names nobody has taken.
//!
//! ## Architecture
//!
//! - **BitArray**: fixed-size packed bit vector
//! - **Hash engine**: three string hash families mapping a key to bit positions
//! - **BloomFilter**: `add` / `might_contain` / `clear`, JSON and binary snapshots
//! - **SeenPosts / SeenPostsRegistry**: persisted per-storage-key filters
//! - **UsernamePrecheck**: shared filter gating the authoritative directory lookup
//!
//! A filter never reports an added key as absent. It may report a key that
//! was never added as present; callers that need certainty confirm positives
//! elsewhere.
//!
//! ## Example Usage
//!
//! ```rust
//! use feedbloom::config::SeenPostsOptions;
//! use feedbloom::seen::{MemoryStorage, SeenPostsRegistry};
//! use feedbloom::username::{Availability, MemoryDirectory, UsernamePrecheck};
//!
//! # fn main() -> Result<(), feedbloom::Error> {
//! // Server: load known usernames once, then check before registering
//! let directory = MemoryDirectory::with_users(["alice", "bob"]);
//! let precheck = UsernamePrecheck::default();
//! precheck.initialize(&directory)?;
//!
//! assert_eq!(precheck.check_availability(&directory, "alice")?, Availability::Taken);
//! precheck.register(&directory, "carol")?;
//!
//! // Client: mark a post as seen when it is opened
//! let registry = SeenPostsRegistry::new(MemoryStorage::new());
//! let seen = registry.get(&SeenPostsOptions::default().storage_key);
//! seen.lock().mark_opened("post-42");
//! assert!(seen.lock().might_contain("post-42"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod config;
pub mod error;
pub mod filter;
pub mod seen;
pub mod username;

// Re-exports
pub use config::{FilterOptions, InitPolicy, PrecheckOptions, SeenPostsOptions};
pub use error::{Error, Result};
pub use filter::{BitArray, BloomFilter, Filter, KeyNormalizer};
pub use seen::{SeenPosts, SeenPostsRegistry, Storage};
pub use username::{Availability, UserDirectory, UsernamePrecheck};

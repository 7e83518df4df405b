//! Seen-posts tracking.
//!
//! Remembers which posts a viewer has opened using a small persisted bloom
//! filter. A post that was opened always reads back as seen; a post that was
//! never opened occasionally reads as seen too (a false positive), which only
//! costs a dimmed card.
//!
//! The filter's bytes are the only state. They are written back to the
//! storage area as a JSON array of byte values after every mutation, and read
//! back on open. Anything unreadable is treated as "nothing seen yet".

mod registry;
pub mod storage;

use log::{debug, warn};

use crate::config::SeenPostsOptions;
use crate::error::Result;
use crate::filter::{BloomFilter, Filter};

pub use registry::{SeenPostsHandle, SeenPostsRegistry};
pub use storage::{FileStorage, MemoryStorage, Storage};

/// A persisted filter of opened post ids bound to one storage key.
///
/// # Example
///
/// ```
/// use feedbloom::config::SeenPostsOptions;
/// use feedbloom::seen::{MemoryStorage, SeenPosts};
///
/// let storage = MemoryStorage::new();
/// let mut seen = SeenPosts::open(storage.clone(), SeenPostsOptions::default());
///
/// assert!(!seen.might_contain("post-42"));
/// seen.mark_opened("post-42");
///
/// // A fresh instance over the same storage sees the same state
/// let reloaded = SeenPosts::open(storage, SeenPostsOptions::default());
/// assert!(reloaded.might_contain("post-42"));
/// ```
#[derive(Debug)]
pub struct SeenPosts<S: Storage> {
    storage: S,
    options: SeenPostsOptions,
    filter: BloomFilter,
}

impl<S: Storage> SeenPosts<S> {
    /// Open the filter stored under `options.storage_key`, or start empty.
    pub fn open(storage: S, options: SeenPostsOptions) -> Self {
        let filter = BloomFilter::from_options(&options.filter);
        let mut seen = Self {
            storage,
            options,
            filter,
        };
        seen.load();
        seen
    }

    /// Replace the in-memory state with what is persisted.
    ///
    /// Missing, unreadable, or malformed data (including a byte array of the
    /// wrong length) resets the filter to empty instead of failing.
    pub fn load(&mut self) {
        let key = &self.options.storage_key;
        self.filter = match self.storage.get_item(key) {
            Ok(Some(raw)) => match BloomFilter::from_json(&self.options.filter, &raw) {
                Ok(filter) => filter,
                Err(e) => {
                    warn!("Discarding unreadable seen-posts filter {:?}: {}", key, e);
                    BloomFilter::from_options(&self.options.filter)
                }
            },
            Ok(None) => BloomFilter::from_options(&self.options.filter),
            Err(e) => {
                warn!("Failed to read seen-posts filter {:?}: {}", key, e);
                BloomFilter::from_options(&self.options.filter)
            }
        };
    }

    /// Write the full bit array back to storage, logging any failure.
    pub fn save(&self) {
        if let Err(e) = self.try_save() {
            warn!(
                "Failed to persist seen-posts filter {:?}: {}",
                self.options.storage_key, e
            );
        }
    }

    /// Write the full bit array back to storage.
    pub fn try_save(&self) -> Result<()> {
        let json = self.filter.to_json()?;
        self.storage.set_item(&self.options.storage_key, &json)
    }

    /// Record `post_id` as seen and persist.
    ///
    /// Call this when the viewer actually opens the post, not when it is
    /// rendered.
    pub fn add(&mut self, post_id: &str) {
        self.filter.add(post_id);
        self.save();
    }

    /// Whether `post_id` may have been seen. Never false for an added id.
    pub fn might_contain(&self, post_id: &str) -> bool {
        self.filter.might_contain(post_id)
    }

    /// Record an open of `post_id`, skipping the write if it already reads
    /// as seen. Returns whether the filter was written.
    pub fn mark_opened(&mut self, post_id: &str) -> bool {
        if self.might_contain(post_id) {
            debug!("Post {:?} already marked as seen", post_id);
            return false;
        }
        self.add(post_id);
        true
    }

    /// Forget everything and persist the empty state.
    pub fn clear(&mut self) {
        self.filter.clear();
        self.save();
    }

    /// The storage key this filter persists under.
    pub fn storage_key(&self) -> &str {
        &self.options.storage_key
    }

    /// The underlying filter.
    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }
}

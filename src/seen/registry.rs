use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::config::{FilterOptions, SeenPostsOptions, DEFAULT_SEEN_POSTS_KEY};
use crate::seen::{SeenPosts, Storage};

/// Shared handle to one storage key's seen-posts filter.
pub type SeenPostsHandle<S> = Arc<Mutex<SeenPosts<S>>>;

/// Hands out at most one [`SeenPosts`] per storage key.
///
/// The first request for a key loads it from storage; later requests get the
/// same instance back. Construct one registry per storage area at startup and
/// pass it to whatever renders posts.
#[derive(Debug)]
pub struct SeenPostsRegistry<S: Storage + Clone> {
    storage: S,
    filter: FilterOptions,
    instances: Mutex<HashMap<String, SeenPostsHandle<S>>>,
}

impl<S: Storage + Clone> SeenPostsRegistry<S> {
    /// Create a registry over `storage` using the seen-posts filter sizing.
    pub fn new(storage: S) -> Self {
        Self::with_filter(storage, FilterOptions::seen_posts())
    }

    /// Create a registry whose filters use `filter` sizing.
    pub fn with_filter(storage: S, filter: FilterOptions) -> Self {
        Self {
            storage,
            filter,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// The filter for `storage_key`, loading it on first use.
    pub fn get(&self, storage_key: &str) -> SeenPostsHandle<S> {
        let mut instances = self.instances.lock();
        if let Some(handle) = instances.get(storage_key) {
            return Arc::clone(handle);
        }

        debug!("Loading seen-posts filter {:?}", storage_key);
        let options = SeenPostsOptions::new()
            .storage_key(storage_key)
            .filter(self.filter.clone());
        let handle = Arc::new(Mutex::new(SeenPosts::open(self.storage.clone(), options)));
        instances.insert(storage_key.to_string(), Arc::clone(&handle));
        handle
    }

    /// The filter stored under `"bloom-seen-posts"`.
    pub fn get_default(&self) -> SeenPostsHandle<S> {
        self.get(DEFAULT_SEEN_POSTS_KEY)
    }

    /// Number of filters constructed so far.
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    /// Whether no filter has been constructed yet.
    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

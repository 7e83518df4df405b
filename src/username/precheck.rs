//! Bloom-filter precheck in front of the user directory.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::config::PrecheckOptions;
use crate::error::{Error, Result};
use crate::filter::{BloomFilter, Filter, KeyNormalizer};
use crate::username::directory::UserDirectory;
use crate::username::validate::validate_username;

/// Outcome of a username availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// No active user holds the name.
    Available,
    /// An active user already holds the name.
    Taken,
}

impl Availability {
    /// Whether the name can be registered.
    pub fn is_available(self) -> bool {
        self == Availability::Available
    }
}

/// Counters describing how the precheck has been used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecheckStats {
    /// Number of `add` calls, including the bulk load
    pub insertions: u64,
    /// Checks answered "available" without touching the directory
    pub fast_path_hits: u64,
    /// Checks that fell through to the directory
    pub fallback_lookups: u64,
    /// Fraction of filter bits set
    pub fill_ratio: f64,
}

impl PrecheckStats {
    /// Fraction of checks that skipped the directory (0.0 to 1.0)
    pub fn fast_path_rate(&self) -> f64 {
        let total = self.fast_path_hits + self.fallback_lookups;
        if total == 0 {
            0.0
        } else {
            self.fast_path_hits as f64 / total as f64
        }
    }
}

/// Process-wide username filter consulted before the user directory.
///
/// A negative answer from the filter means the name is definitely free and
/// the directory is not queried. A positive answer is only a hint and is
/// always confirmed against the directory, whose unique constraint remains
/// the real guard against duplicates.
///
/// Construct once at startup, share with `Arc`, and call
/// [`initialize`](Self::initialize) before serving traffic. Checks issued
/// before the bulk load completes are allowed; they may report a taken name
/// as available until the directory rejects it at write time.
///
/// # Example
///
/// ```
/// use feedbloom::username::{Availability, MemoryDirectory, UsernamePrecheck};
///
/// # fn main() -> feedbloom::Result<()> {
/// let directory = MemoryDirectory::with_users(["alice"]);
/// let precheck = UsernamePrecheck::default();
/// precheck.initialize(&directory)?;
///
/// assert_eq!(precheck.check_availability(&directory, "Alice")?, Availability::Taken);
/// assert_eq!(precheck.check_availability(&directory, "newname")?, Availability::Available);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct UsernamePrecheck {
    options: PrecheckOptions,
    filter: RwLock<BloomFilter>,
    initialized: AtomicBool,
    /// Serializes bulk loads so two callers cannot both load
    init_lock: Mutex<()>,
    insertions: AtomicU64,
    fast_path_hits: AtomicU64,
    fallback_lookups: AtomicU64,
}

impl Default for UsernamePrecheck {
    fn default() -> Self {
        Self::new(PrecheckOptions::default())
    }
}

impl UsernamePrecheck {
    /// Create an empty, uninitialized precheck.
    ///
    /// The filter always lowercases its keys, whatever normalizer `options`
    /// carries, so that checks stay case-insensitive.
    pub fn new(mut options: PrecheckOptions) -> Self {
        if options.filter.normalizer != KeyNormalizer::Lowercase {
            warn!(
                "Username filter configured with {:?} normalizer; using lowercase",
                options.filter.normalizer
            );
            options.filter.normalizer = KeyNormalizer::Lowercase;
        }
        let filter = BloomFilter::from_options(&options.filter);
        Self {
            options,
            filter: RwLock::new(filter),
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            insertions: AtomicU64::new(0),
            fast_path_hits: AtomicU64::new(0),
            fallback_lookups: AtomicU64::new(0),
        }
    }

    /// Bulk-load every active username from `directory`.
    ///
    /// Returns the number of usernames loaded, or 0 if the filter was already
    /// initialized. A failed load is retried according to the configured
    /// [`InitPolicy`](crate::config::InitPolicy); if every attempt fails the
    /// last error is returned and the precheck stays uninitialized, so a
    /// later call may try again.
    pub fn initialize<D: UserDirectory + ?Sized>(&self, directory: &D) -> Result<usize> {
        let _guard = self.init_lock.lock();
        if self.is_initialized() {
            return Ok(0);
        }

        let policy = &self.options.init;
        let mut attempt = 1;
        loop {
            match directory.active_usernames() {
                Ok(usernames) => {
                    {
                        let mut filter = self.filter.write();
                        for username in &usernames {
                            filter.add(username);
                        }
                    }
                    self.insertions.fetch_add(usernames.len() as u64, Ordering::Relaxed);
                    self.initialized.store(true, Ordering::Release);
                    info!("Username bloom filter initialized with {} usernames", usernames.len());
                    return Ok(usernames.len());
                }
                Err(e) if attempt < policy.max_attempts => {
                    let delay = policy.backoff(attempt);
                    warn!(
                        "Username bloom filter load attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, policy.max_attempts, e, delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    error!("Failed to initialize username bloom filter: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Whether the bulk load has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Record a username, e.g. right after it was registered.
    pub fn add(&self, username: &str) {
        self.filter.write().add(username);
        self.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether a user with this name might exist. Case-insensitive; never
    /// false for a name that was added.
    pub fn might_exist(&self, username: &str) -> bool {
        self.filter.read().might_contain(username)
    }

    /// Decide whether `username` can be registered.
    ///
    /// Rejects malformed names with [`Error::InvalidArgument`]. Names the
    /// filter has never seen are reported available without querying
    /// `directory`; anything else is looked up there.
    pub fn check_availability<D: UserDirectory + ?Sized>(
        &self,
        directory: &D,
        username: &str,
    ) -> Result<Availability> {
        validate_username(username)?;

        if !self.might_exist(username) {
            self.fast_path_hits.fetch_add(1, Ordering::Relaxed);
            debug!("Username {:?} not in filter, skipping directory lookup", username);
            return Ok(Availability::Available);
        }

        self.fallback_lookups.fetch_add(1, Ordering::Relaxed);
        if directory.username_taken(username)? {
            Ok(Availability::Taken)
        } else {
            debug!("Username {:?} was a filter false positive", username);
            Ok(Availability::Available)
        }
    }

    /// Register `username` in `directory` and record it in the filter.
    ///
    /// Fails with [`Error::AlreadyExists`] ("Username already taken") when the
    /// check or the directory's unique constraint rejects the name.
    pub fn register<D: UserDirectory + ?Sized>(&self, directory: &D, username: &str) -> Result<()> {
        if self.check_availability(directory, username)? == Availability::Taken {
            return Err(Error::already_exists("Username already taken"));
        }

        if let Err(e) = directory.create_user(username) {
            if matches!(e, Error::AlreadyExists(_)) {
                // The filter missed a name the directory holds
                self.add(username);
            }
            return Err(e);
        }
        self.add(username);
        info!("Registered username {:?}", username);
        Ok(())
    }

    /// A snapshot of the usage counters.
    pub fn stats(&self) -> PrecheckStats {
        PrecheckStats {
            insertions: self.insertions.load(Ordering::Relaxed),
            fast_path_hits: self.fast_path_hits.load(Ordering::Relaxed),
            fallback_lookups: self.fallback_lookups.load(Ordering::Relaxed),
            fill_ratio: self.filter.read().fill_ratio(),
        }
    }

    /// The options this precheck was built with.
    pub fn options(&self) -> &PrecheckOptions {
        &self.options
    }
}

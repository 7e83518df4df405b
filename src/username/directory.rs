//! The user directory the precheck consults as its authoritative source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{Error, Result};

/// Read and write access to the set of registered users.
///
/// Implemented by the application's document store. Lookups are
/// case-insensitive and only consider users that have not been deleted.
pub trait UserDirectory: Send + Sync {
    /// Every non-deleted username, as stored.
    fn active_usernames(&self) -> Result<Vec<String>>;

    /// Whether a non-deleted user with this name exists, ignoring case.
    fn username_taken(&self, username: &str) -> Result<bool>;

    /// Create a user. Fails with [`Error::AlreadyExists`] if the unique
    /// username constraint rejects it.
    fn create_user(&self, username: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct UserRecord {
    username: String,
    deleted: bool,
}

/// In-process [`UserDirectory`] keyed by lowercased username.
///
/// Counts authoritative lookups so callers can see how often the filter let
/// them skip one.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
    lookups: AtomicU64,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding the given users.
    pub fn with_users<I, T>(usernames: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let directory = Self::new();
        {
            let mut users = directory.users.write();
            for username in usernames {
                let username = username.into();
                users.insert(
                    username.to_lowercase(),
                    UserRecord {
                        username,
                        deleted: false,
                    },
                );
            }
        }
        directory
    }

    /// Soft-delete a user. Returns whether an active user was deleted.
    pub fn delete_user(&self, username: &str) -> bool {
        match self.users.write().get_mut(&username.to_lowercase()) {
            Some(record) if !record.deleted => {
                record.deleted = true;
                true
            }
            _ => false,
        }
    }

    /// Number of authoritative lookups served so far.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of active users.
    pub fn len(&self) -> usize {
        self.users.read().values().filter(|r| !r.deleted).count()
    }

    /// Whether there are no active users.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserDirectory for MemoryDirectory {
    fn active_usernames(&self) -> Result<Vec<String>> {
        Ok(self
            .users
            .read()
            .values()
            .filter(|r| !r.deleted)
            .map(|r| r.username.clone())
            .collect())
    }

    fn username_taken(&self, username: &str) -> Result<bool> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .read()
            .get(&username.to_lowercase())
            .is_some_and(|r| !r.deleted))
    }

    fn create_user(&self, username: &str) -> Result<()> {
        let mut users = self.users.write();
        let key = username.to_lowercase();
        if users.get(&key).is_some_and(|r| !r.deleted) {
            return Err(Error::already_exists("Username already taken"));
        }
        users.insert(
            key,
            UserRecord {
                username: username.to_string(),
                deleted: false,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let directory = MemoryDirectory::with_users(["Alice"]);
        assert!(directory.username_taken("alice").unwrap());
        assert!(directory.username_taken("ALICE").unwrap());
        assert!(!directory.username_taken("bob").unwrap());
        assert_eq!(directory.lookups(), 3);
    }

    #[test]
    fn test_active_usernames_skips_deleted() {
        let directory = MemoryDirectory::with_users(["alice", "Bob", "carol"]);
        assert!(directory.delete_user("bob"));
        assert!(!directory.delete_user("bob"));
        assert!(!directory.delete_user("nobody"));

        let mut names = directory.active_usernames().unwrap();
        names.sort();
        assert_eq!(names, vec!["alice".to_string(), "carol".to_string()]);
        assert_eq!(directory.len(), 2);
        assert!(!directory.username_taken("bob").unwrap());
    }

    #[test]
    fn test_create_user_enforces_uniqueness() {
        let directory = MemoryDirectory::new();
        assert!(directory.is_empty());

        directory.create_user("Dave").unwrap();
        let err = directory.create_user("dave").unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));

        directory.delete_user("dave");
        directory.create_user("dave").unwrap();
        assert_eq!(directory.len(), 1);
    }
}

//! Integration tests for the username availability precheck

use feedbloom::config::{InitPolicy, PrecheckOptions};
use feedbloom::username::{Availability, MemoryDirectory, UserDirectory, UsernamePrecheck};
use feedbloom::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};

/// Wraps a directory and fails its next few bulk loads
struct FlakyDirectory {
    inner: MemoryDirectory,
    failing_loads: AtomicU32,
}

impl FlakyDirectory {
    fn new(usernames: &[&str], failures: u32) -> Self {
        Self {
            inner: MemoryDirectory::with_users(usernames.iter().copied()),
            failing_loads: AtomicU32::new(failures),
        }
    }
}

impl UserDirectory for FlakyDirectory {
    fn active_usernames(&self) -> Result<Vec<String>> {
        let fail = self
            .failing_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(Error::unavailable("user directory is not reachable"));
        }
        self.inner.active_usernames()
    }

    fn username_taken(&self, username: &str) -> Result<bool> {
        self.inner.username_taken(username)
    }

    fn create_user(&self, username: &str) -> Result<()> {
        self.inner.create_user(username)
    }
}

fn fast_retry() -> PrecheckOptions {
    PrecheckOptions::new().init(InitPolicy {
        max_attempts: 2,
        backoff_ms: 1,
    })
}

#[test]
fn test_empty_filter_skips_directory() {
    let directory = MemoryDirectory::new();
    let precheck = UsernamePrecheck::default();
    precheck.initialize(&directory).unwrap();

    assert!(!precheck.might_exist("newname"));
    assert_eq!(
        precheck.check_availability(&directory, "newname").unwrap(),
        Availability::Available
    );
    assert_eq!(directory.lookups(), 0);
}

#[test]
fn test_seeded_name_confirmed_by_directory() {
    let directory = MemoryDirectory::with_users(["alice"]);
    let precheck = UsernamePrecheck::default();
    precheck.initialize(&directory).unwrap();

    assert!(precheck.might_exist("alice"));
    let err = precheck.register(&directory, "alice").unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(ref msg) if msg == "Username already taken"));
    assert_eq!(directory.lookups(), 1);
}

#[test]
fn test_deleted_name_is_false_positive_then_available() {
    let directory = MemoryDirectory::with_users(["alice"]);
    let precheck = UsernamePrecheck::default();
    precheck.initialize(&directory).unwrap();

    directory.delete_user("alice");

    assert!(precheck.might_exist("alice"));
    let availability = precheck.check_availability(&directory, "alice").unwrap();
    assert!(availability.is_available());

    precheck.register(&directory, "alice").unwrap();
    assert!(directory.username_taken("alice").unwrap());
}

#[test]
fn test_registration_visible_to_later_checks() {
    let directory = MemoryDirectory::new();
    let precheck = UsernamePrecheck::default();
    precheck.initialize(&directory).unwrap();

    precheck.register(&directory, "NewUser_1").unwrap();
    assert!(precheck.might_exist("newuser_1"));
    assert_eq!(
        precheck.check_availability(&directory, "NEWUSER_1").unwrap(),
        Availability::Taken
    );
}

#[test]
fn test_bulk_load_many_users() {
    let names: Vec<String> = (0..1000).map(|i| format!("member_{}", i)).collect();
    let directory = MemoryDirectory::with_users(names.iter().cloned());

    let precheck = UsernamePrecheck::default();
    assert_eq!(precheck.initialize(&directory).unwrap(), 1000);

    for name in &names {
        assert!(precheck.might_exist(name));
        assert_eq!(
            precheck.check_availability(&directory, name).unwrap(),
            Availability::Taken
        );
    }

    // Fresh names mostly skip the directory
    let before = directory.lookups();
    for i in 0..1000 {
        let name = format!("visitor_{}", i);
        assert!(precheck.check_availability(&directory, &name).unwrap().is_available());
    }
    let fallbacks = directory.lookups() - before;
    println!("Fallback lookups for 1000 fresh names: {}", fallbacks);
    assert!(fallbacks < 100, "too many fallbacks: {}", fallbacks);

    let stats = precheck.stats();
    assert!(stats.fast_path_rate() > 0.0);
}

#[test]
fn test_failed_bulk_load_degrades_gracefully() {
    let directory = FlakyDirectory::new(&["alice"], 5);

    let precheck = UsernamePrecheck::new(fast_retry());
    assert!(precheck.initialize(&directory).is_err());
    assert!(!precheck.is_initialized());

    // Fast path says available; the directory's constraint still refuses
    assert!(precheck.check_availability(&directory, "alice").unwrap().is_available());
    let err = precheck.register(&directory, "alice").unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
}

#[test]
fn test_invalid_names_rejected() {
    let directory = MemoryDirectory::new();
    let precheck = UsernamePrecheck::default();

    let too_long = "y".repeat(31);
    for name in ["ab", "has space", "dash-name", too_long.as_str()] {
        let err = precheck.check_availability(&directory, name).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)), "{} should be rejected", name);
        assert!(precheck.register(&directory, name).is_err());
    }
    assert!(directory.is_empty());
    assert_eq!(directory.lookups(), 0);
}

#[test]
fn test_options_from_json() {
    let options = PrecheckOptions::from_json(
        r#"{"filter": {"num_bits": 20000, "normalizer": "lowercase"}, "init": {"max_attempts": 1}}"#,
    )
    .unwrap();
    let precheck = UsernamePrecheck::new(options);
    assert_eq!(precheck.options().filter.num_bits, 20_000);

    precheck.add("Zoe");
    assert!(precheck.might_exist("zoe"));
}

#[test]
fn test_partial_filter_config_stays_case_insensitive() {
    let options = PrecheckOptions::from_json(r#"{"filter": {"num_bits": 20000}}"#).unwrap();
    let directory = MemoryDirectory::with_users(["Alice"]);
    let precheck = UsernamePrecheck::new(options);
    precheck.initialize(&directory).unwrap();

    assert!(precheck.might_exist("alice"));
    assert_eq!(
        precheck.check_availability(&directory, "alice").unwrap(),
        Availability::Taken
    );
    assert_eq!(directory.lookups(), 1);
}

#[test]
fn test_directory_rejection_is_remembered() {
    let directory = FlakyDirectory::new(&["alice"], 5);
    let precheck = UsernamePrecheck::new(fast_retry());
    assert!(precheck.initialize(&directory).is_err());

    assert!(precheck.register(&directory, "alice").is_err());
    assert_eq!(
        precheck.check_availability(&directory, "ALICE").unwrap(),
        Availability::Taken
    );
}

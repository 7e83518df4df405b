//! Server-side username availability precheck.
//!
//! Registration and availability queries first validate the name's shape,
//! then ask a bloom filter of known usernames. Only when the filter says the
//! name might exist is the user directory consulted.

pub mod directory;
pub mod precheck;
pub mod validate;

pub use directory::{MemoryDirectory, UserDirectory};
pub use precheck::{Availability, PrecheckStats, UsernamePrecheck};
pub use validate::{validate_username, MAX_USERNAME_LEN, MIN_USERNAME_LEN};

//! Syntactic username checks, independent of any filter or directory.

use crate::error::{Error, Result};

/// Minimum username length.
pub const MIN_USERNAME_LEN: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 30;

/// Check length bounds and the allowed character set (ASCII letters, digits
/// and `_`). Rules are applied in order and the first failure is reported.
pub fn validate_username(username: &str) -> Result<()> {
    let len = username.encode_utf16().count();
    if len < MIN_USERNAME_LEN {
        return Err(Error::invalid_argument(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    if len > MAX_USERNAME_LEN {
        return Err(Error::invalid_argument(format!(
            "Username cannot exceed {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !username.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(Error::invalid_argument(
            "Username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(())
}

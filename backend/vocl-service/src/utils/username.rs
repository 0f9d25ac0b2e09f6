//! Username rules
//!
//! A username is 3-20 characters of lowercase letters, digits and
//! underscores, starts with a letter, never contains `__`, and is not one of
//! the reserved route or staff names.

use std::fmt;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 20;

/// Names that collide with routes, staff roles or the brand
pub const RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "administrator",
    "root",
    "system",
    "support",
    "help",
    "api",
    "www",
    "mail",
    "vocl",
    "bevocl",
    "moderator",
    "mod",
    "staff",
    "official",
    "settings",
    "explore",
    "search",
    "notifications",
    "messages",
    "login",
    "logout",
    "signup",
    "register",
    "about",
    "terms",
    "privacy",
    "null",
    "undefined",
    "anonymous",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsernameError {
    TooShort,
    TooLong,
    MustStartWithLetter,
    InvalidCharacters,
    ConsecutiveUnderscores,
    Reserved,
}

impl fmt::Display for UsernameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            UsernameError::TooShort => "Invalid username: must be at least 3 characters",
            UsernameError::TooLong => "Invalid username: must be at most 20 characters",
            UsernameError::MustStartWithLetter => "Invalid username: must start with a letter",
            UsernameError::InvalidCharacters => {
                "Invalid username: only lowercase letters, numbers and underscores are allowed"
            }
            UsernameError::ConsecutiveUnderscores => {
                "Invalid username: cannot contain consecutive underscores"
            }
            UsernameError::Reserved => "Username is reserved",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for UsernameError {}

/// Trim and lowercase user input before validation
pub fn normalize_username(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_lowercase()
}

/// Validate an already-normalized username.
///
/// Checks run in a fixed order so the first failing rule is reported.
pub fn validate_username(username: &str) -> Result<(), UsernameError> {
    let len = username.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err(UsernameError::TooShort);
    }
    if len > MAX_USERNAME_LEN {
        return Err(UsernameError::TooLong);
    }

    if !username.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(UsernameError::MustStartWithLetter);
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(UsernameError::InvalidCharacters);
    }

    if username.contains("__") {
        return Err(UsernameError::ConsecutiveUnderscores);
    }

    if RESERVED_USERNAMES.contains(&username) {
        return Err(UsernameError::Reserved);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        for name in ["abc", "alice", "bob_123", "a_b_c", "z0123456789012345678"] {
            assert_eq!(validate_username(name), Ok(()), "{} should be valid", name);
        }
    }

    #[test]
    fn test_length_limits() {
        assert_eq!(validate_username("ab"), Err(UsernameError::TooShort));
        assert_eq!(validate_username(""), Err(UsernameError::TooShort));
        assert_eq!(
            validate_username(&"a".repeat(21)),
            Err(UsernameError::TooLong)
        );
    }

    #[test]
    fn test_must_start_with_letter() {
        assert_eq!(validate_username("1abc"), Err(UsernameError::MustStartWithLetter));
        assert_eq!(validate_username("_abc"), Err(UsernameError::MustStartWithLetter));
        assert_eq!(validate_username("Alice"), Err(UsernameError::MustStartWithLetter));
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(validate_username("al-ice"), Err(UsernameError::InvalidCharacters));
        assert_eq!(validate_username("aliCe"), Err(UsernameError::InvalidCharacters));
        assert_eq!(validate_username("al.ice"), Err(UsernameError::InvalidCharacters));
        assert_eq!(validate_username("aliçe"), Err(UsernameError::InvalidCharacters));
    }

    #[test]
    fn test_consecutive_underscores() {
        assert_eq!(
            validate_username("al__ice"),
            Err(UsernameError::ConsecutiveUnderscores)
        );
        assert_eq!(validate_username("al_ice_"), Ok(()));
    }

    #[test]
    fn test_reserved() {
        assert_eq!(validate_username("admin"), Err(UsernameError::Reserved));
        assert_eq!(validate_username("vocl"), Err(UsernameError::Reserved));
        assert_eq!(validate_username("admins"), Ok(()));
    }

    #[test]
    fn test_normalize_then_validate() {
        let name = normalize_username("  @Alice_B ");
        assert_eq!(name, "alice_b");
        assert_eq!(validate_username(&name), Ok(()));
    }

    #[test]
    fn test_error_messages() {
        assert!(UsernameError::TooShort.to_string().starts_with("Invalid username"));
        assert_eq!(UsernameError::Reserved.to_string(), "Username is reserved");
    }
}

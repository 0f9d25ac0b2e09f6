//! Error message sanitization
//!
//! Known user-facing phrasings pass through untouched. Anything that looks
//! like it came from the database, the auth provider, or the network stack is
//! replaced with [`GENERIC_ERROR_MESSAGE`].

/// Fallback shown to clients in place of an unsafe error message
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Longest message passed through when it matches neither list
const MAX_PASSTHROUGH_LEN: usize = 200;

/// Messages starting with one of these (case-insensitive) are always safe
const SAFE_PREFIXES: &[&str] = &[
    "unauthorized",
    "forbidden",
    "not found",
    "rate limit exceeded",
    "invalid username",
    "username is taken",
    "username is reserved",
    "content violates community guidelines",
    "post not found",
    "you must be logged in",
    "file type not allowed",
    "file too large",
    "validation error",
];

/// Substrings (case-insensitive) that mark a message as leaking internals
const SENSITIVE_PATTERNS: &[&str] = &[
    "duplicate key",
    "violates",
    "constraint",
    "relation \"",
    "column",
    "syntax error",
    "permission denied for",
    "jwt",
    "token",
    "password",
    "secret",
    "stack",
    "at line",
    "econnrefused",
    "timeout",
    "sql",
    "postgres",
    "pgrst",
    "internal",
    "database",
    "external service",
];

/// Return a message safe to show to an end user.
///
/// Outside production the message is returned unchanged.
pub fn sanitize_error_message(message: &str, production: bool) -> String {
    if !production {
        return message.to_string();
    }

    let lowered = message.to_lowercase();

    if SAFE_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return message.to_string();
    }

    if SENSITIVE_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return GENERIC_ERROR_MESSAGE.to_string();
    }

    if message.chars().count() > MAX_PASSTHROUGH_LEN {
        return GENERIC_ERROR_MESSAGE.to_string();
    }

    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_replaced_in_production() {
        let msg = "duplicate key value violates unique constraint \"profiles_username_key\"";
        assert_eq!(sanitize_error_message(msg, true), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_development_passes_everything() {
        let msg = "duplicate key value violates unique constraint";
        assert_eq!(sanitize_error_message(msg, false), msg);
    }

    #[test]
    fn test_allow_listed_message_unchanged() {
        assert_eq!(sanitize_error_message("Unauthorized", true), "Unauthorized");
        assert_eq!(
            sanitize_error_message("Rate limit exceeded. Please slow down.", true),
            "Rate limit exceeded. Please slow down."
        );
    }

    #[test]
    fn test_allow_list_wins_over_deny_list() {
        let msg = "Unauthorized: invalid or expired token";
        assert_eq!(sanitize_error_message(msg, true), msg);
    }

    #[test]
    fn test_sensitive_patterns_are_case_insensitive() {
        assert_eq!(
            sanitize_error_message("PGRST116: JSON object requested", true),
            GENERIC_ERROR_MESSAGE
        );
        assert_eq!(
            sanitize_error_message("connect ECONNREFUSED 127.0.0.1:5432", true),
            GENERIC_ERROR_MESSAGE
        );
    }

    #[test]
    fn test_plain_message_passes() {
        assert_eq!(
            sanitize_error_message("You cannot follow yourself", true),
            "You cannot follow yourself"
        );
    }

    #[test]
    fn test_overlong_message_replaced() {
        let msg = "a".repeat(201);
        assert_eq!(sanitize_error_message(&msg, true), GENERIC_ERROR_MESSAGE);
    }
}

//! Length limits and tag normalization for user-written text

use crate::error::AppError;

pub const MAX_DISPLAY_NAME_LEN: usize = 50;
pub const MAX_BIO_LEN: usize = 300;
pub const MAX_POST_BODY_LEN: usize = 5000;
pub const MAX_COMMENT_LEN: usize = 1000;
pub const MAX_TAGS: usize = 30;
pub const MAX_TAG_LEN: usize = 50;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Display names are 1-50 characters once trimmed
pub fn validate_display_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Display name cannot be empty".into()));
    }
    if char_len(trimmed) > MAX_DISPLAY_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Display name must be at most {} characters",
            MAX_DISPLAY_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_bio(bio: &str) -> Result<String, AppError> {
    let trimmed = bio.trim();
    if char_len(trimmed) > MAX_BIO_LEN {
        return Err(AppError::Validation(format!(
            "Bio must be at most {} characters",
            MAX_BIO_LEN
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_post_body(body: &str) -> Result<(), AppError> {
    if char_len(body) > MAX_POST_BODY_LEN {
        return Err(AppError::Validation(format!(
            "Post must be at most {} characters",
            MAX_POST_BODY_LEN
        )));
    }
    Ok(())
}

/// Comments must be non-blank and at most 1000 characters
pub fn validate_comment(body: &str) -> Result<String, AppError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".into()));
    }
    if char_len(trimmed) > MAX_COMMENT_LEN {
        return Err(AppError::Validation(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Normalize a single tag: strip `#`, lowercase, whitespace runs become `-`,
/// anything outside `[a-z0-9_-]` is dropped.
pub fn normalize_tag(raw: &str) -> String {
    let lowered = raw.trim().trim_start_matches('#').to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_dash = false;

    for c in lowered.chars() {
        if c.is_whitespace() {
            pending_dash = !out.is_empty();
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            if pending_dash {
                out.push('-');
                pending_dash = false;
            }
            out.push(c);
        }
    }
    out
}

/// Normalize a post's tag list: empty tags are dropped, duplicates collapse
/// to the first occurrence.
pub fn normalize_tags(raw: &[String]) -> Result<Vec<String>, AppError> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.iter().map(|t| normalize_tag(t)) {
        if tag.is_empty() || tags.contains(&tag) {
            continue;
        }
        if char_len(&tag) > MAX_TAG_LEN {
            return Err(AppError::Validation(format!(
                "Tags must be at most {} characters",
                MAX_TAG_LEN
            )));
        }
        tags.push(tag);
    }

    if tags.len() > MAX_TAGS {
        return Err(AppError::Validation(format!(
            "A post can have at most {} tags",
            MAX_TAGS
        )));
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("#Foo Bar"), "foo-bar");
        assert_eq!(normalize_tag("  ##Art  "), "art");
        assert_eq!(normalize_tag("lo-fi   beats!"), "lo-fi-beats");
        assert_eq!(normalize_tag("!!!"), "");
    }

    #[test]
    fn test_normalize_tags_dedupes_and_drops_empty() {
        let raw = vec!["#Music".to_string(), "music".to_string(), " ".to_string(), "Jazz".to_string()];
        assert_eq!(normalize_tags(&raw).unwrap(), vec!["music", "jazz"]);
    }

    #[test]
    fn test_tag_limits() {
        let too_many: Vec<String> = (0..31).map(|i| format!("tag{}", i)).collect();
        assert!(normalize_tags(&too_many).is_err());

        let too_long = vec!["a".repeat(51)];
        assert!(normalize_tags(&too_long).is_err());

        let ok: Vec<String> = (0..30).map(|i| format!("tag{}", i)).collect();
        assert_eq!(normalize_tags(&ok).unwrap().len(), 30);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(validate_display_name("  Alice  ").unwrap(), "Alice");
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(51)).is_err());
        assert!(validate_display_name(&"é".repeat(50)).is_ok());
    }

    #[test]
    fn test_bio_and_bodies() {
        assert!(validate_bio(&"b".repeat(300)).is_ok());
        assert!(validate_bio(&"b".repeat(301)).is_err());
        assert!(validate_post_body(&"p".repeat(5000)).is_ok());
        assert!(validate_post_body(&"p".repeat(5001)).is_err());
        assert!(validate_comment(" ").is_err());
        assert!(validate_comment(&"c".repeat(1001)).is_err());
        assert_eq!(validate_comment(" nice ").unwrap(), "nice");
    }
}

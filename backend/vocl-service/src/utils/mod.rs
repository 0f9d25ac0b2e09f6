pub mod embeds;
pub mod mentions;
pub mod text;
pub mod username;

/// Clamp a client-supplied page size to 1..=50, defaulting to 20
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, 50)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 20);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(500)), 50);
        assert_eq!(clamp_limit(Some(33)), 33);
    }
}

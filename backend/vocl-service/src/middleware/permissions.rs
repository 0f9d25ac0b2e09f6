/// Role-based authorization
///
/// Roles are ordered levels stored as a smallint on the profile row. Checks
/// compare levels, so a higher role can do everything a lower one can.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Result type for permission checks
pub type PermissionResult = Result<(), AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User = 0,
    Moderator = 1,
    Admin = 2,
    Owner = 3,
}

impl Role {
    /// Unknown levels fall back to `User`
    pub fn from_level(level: i16) -> Self {
        match level {
            1 => Role::Moderator,
            2 => Role::Admin,
            3 => Role::Owner,
            _ => Role::User,
        }
    }

    pub fn level(self) -> i16 {
        self as i16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }
}

pub fn is_moderator(role: Role) -> bool {
    role >= Role::Moderator
}

pub fn is_admin(role: Role) -> bool {
    role >= Role::Admin
}

/// A moderator may act on users strictly below their own level
pub fn can_moderate_user(actor: Role, target: Role) -> bool {
    is_moderator(actor) && actor > target
}

/// Admins may grant any role below their own
pub fn can_assign_role(actor: Role, new_role: Role) -> bool {
    is_admin(actor) && new_role < actor
}

pub fn require_role(actor: Role, minimum: Role) -> PermissionResult {
    if actor >= minimum {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "{} role required",
            capitalize(minimum.as_str())
        )))
    }
}

/// Content may be removed by its author or by any moderator
pub fn check_content_removal(user_id: Uuid, author_id: Uuid, role: Role) -> PermissionResult {
    if user_id == author_id || is_moderator(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You don't have permission to delete this content".into(),
        ))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_level_clamps_unknown() {
        assert_eq!(Role::from_level(0), Role::User);
        assert_eq!(Role::from_level(2), Role::Admin);
        assert_eq!(Role::from_level(3), Role::Owner);
        assert_eq!(Role::from_level(9), Role::User);
        assert_eq!(Role::from_level(-1), Role::User);
    }

    #[test]
    fn test_role_predicates() {
        assert!(!is_moderator(Role::User));
        assert!(is_moderator(Role::Moderator));
        assert!(is_moderator(Role::Owner));
        assert!(!is_admin(Role::Moderator));
        assert!(is_admin(Role::Admin));
    }

    #[test]
    fn test_can_moderate_user() {
        assert!(can_moderate_user(Role::Moderator, Role::User));
        assert!(!can_moderate_user(Role::Moderator, Role::Moderator));
        assert!(!can_moderate_user(Role::Admin, Role::Owner));
        assert!(can_moderate_user(Role::Owner, Role::Admin));
        assert!(!can_moderate_user(Role::User, Role::User));
    }

    #[test]
    fn test_can_assign_role() {
        assert!(can_assign_role(Role::Admin, Role::Moderator));
        assert!(!can_assign_role(Role::Admin, Role::Admin));
        assert!(can_assign_role(Role::Owner, Role::Admin));
        assert!(!can_assign_role(Role::Moderator, Role::User));
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(Role::Admin, Role::Moderator).is_ok());
        let err = require_role(Role::User, Role::Moderator).unwrap_err();
        assert_eq!(err.to_string(), "Forbidden: Moderator role required");
    }

    #[test]
    fn test_content_removal() {
        let author = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(check_content_removal(author, author, Role::User).is_ok());
        assert!(check_content_removal(other, author, Role::User).is_err());
        assert!(check_content_removal(other, author, Role::Moderator).is_ok());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use crate::middleware::Role;

/// Reason recorded on reports raised by the moderation gate
pub const AUTO_FLAGGED_REASON: &str = "auto_flagged";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportTarget {
    Post,
    Comment,
    Profile,
}

impl ReportTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Profile => "profile",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "post" => Some(Self::Post),
            "comment" => Some(Self::Comment),
            "profile" => Some(Self::Profile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveAction {
    Dismiss,
    RemoveContent,
    BanUser,
}

impl ResolveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dismiss => "dismiss",
            Self::RemoveContent => "remove_content",
            Self::BanUser => "ban_user",
        }
    }

    pub fn resulting_status(&self) -> ReportStatus {
        match self {
            Self::Dismiss => ReportStatus::Dismissed,
            Self::RemoveContent | Self::BanUser => ReportStatus::Resolved,
        }
    }
}

/// Report database entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    /// `None` for reports raised automatically
    pub reporter_id: Option<Uuid>,
    pub target_type: String,
    pub target_id: Uuid,
    pub reason: String,
    pub details: Option<String>,
    pub status: String,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit log database entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub details: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub target_type: ReportTarget,
    pub target_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub reason: String,
    #[validate(length(max = 1000))]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveReportRequest {
    pub action: ResolveAction,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportQuery {
    pub status: Option<String>,
    pub cursor: Option<DateTime<Utc>>,
    pub cursor_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BanRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditLogQuery {
    pub cursor: Option<DateTime<Utc>>,
    pub cursor_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_action_wire_format() {
        let action: ResolveAction = serde_json::from_str("\"remove_content\"").unwrap();
        assert_eq!(action, ResolveAction::RemoveContent);
        assert_eq!(action.resulting_status(), ReportStatus::Resolved);
        assert_eq!(ResolveAction::Dismiss.resulting_status(), ReportStatus::Dismissed);
    }

    #[test]
    fn test_report_target_parse() {
        assert_eq!(ReportTarget::from_str("comment"), Some(ReportTarget::Comment));
        assert_eq!(ReportTarget::from_str("story"), None);
    }
}

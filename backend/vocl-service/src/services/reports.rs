/// Report service - user reports, moderator queue, admin actions
///
/// Every moderator or admin mutation writes an audit log row in the same
/// transaction as the change itself.
use actix_middleware::{RateLimitConfig, RateLimiter};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::db::{audit_repo, engagement_repo, post_repo, profile_repo, report_repo};
use crate::error::{AppError, Result};
use crate::middleware::{can_assign_role, can_moderate_user, require_role, Role};
use crate::models::{
    AuditLog, AuditLogQuery, BanRequest, CreateReportRequest, Profile, Report, ReportQuery,
    ReportStatus, ReportTarget, ResolveAction, ResolveReportRequest,
};
use crate::services::{enforce_rate_limit, load_active_profile};
use crate::utils::clamp_limit;

/// Check that `action` can be applied to a report on `target`.
///
/// `owner_role` is the role of whoever owns the reported content, if they
/// still exist.
pub fn check_resolution(
    action: ResolveAction,
    target: ReportTarget,
    actor_role: Role,
    owner_role: Option<Role>,
) -> Result<()> {
    require_role(actor_role, Role::Moderator)?;

    match action {
        ResolveAction::Dismiss => Ok(()),
        ResolveAction::RemoveContent => match target {
            ReportTarget::Profile => Err(AppError::BadRequest(
                "Profiles cannot be removed; ban the user instead".into(),
            )),
            ReportTarget::Post | ReportTarget::Comment => Ok(()),
        },
        ResolveAction::BanUser => {
            let owner = owner_role
                .ok_or_else(|| AppError::NotFound("Reported user not found".into()))?;
            if can_moderate_user(actor_role, owner) {
                Ok(())
            } else {
                Err(AppError::Forbidden("You cannot moderate this user".into()))
            }
        }
    }
}

/// Reporters cannot flag their own content
pub fn check_reporter(reporter_id: Uuid, owner_id: Uuid) -> Result<()> {
    if owner_id == reporter_id {
        return Err(AppError::BadRequest("You cannot report your own content".into()));
    }
    Ok(())
}

fn parse_status_filter(status: Option<&str>) -> Result<Option<&str>> {
    match status {
        None | Some("all") => Ok(None),
        Some(s @ ("pending" | "resolved" | "dismissed")) => Ok(Some(s)),
        Some(other) => Err(AppError::BadRequest(format!("Unknown report status: {}", other))),
    }
}

#[derive(Clone)]
pub struct ReportService {
    pool: PgPool,
    limiter: RateLimiter,
}

impl ReportService {
    pub fn new(pool: PgPool, limiter: RateLimiter) -> Self {
        Self { pool, limiter }
    }

    async fn actor(&self, actor_id: Uuid) -> Result<Profile> {
        load_active_profile(&self.pool, actor_id).await
    }

    async fn target_profile(&self, user_id: Uuid) -> Result<Profile> {
        profile_repo::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// Profile id owning the reported content, if it is still visible
    async fn target_owner(&self, target: ReportTarget, target_id: Uuid) -> Result<Option<Uuid>> {
        let owner = match target {
            ReportTarget::Post => post_repo::find_post_by_id(&self.pool, target_id)
                .await?
                .map(|p| p.author_id),
            ReportTarget::Comment => engagement_repo::find_comment(&self.pool, target_id)
                .await?
                .map(|c| c.author_id),
            ReportTarget::Profile => profile_repo::find_by_id(&self.pool, target_id)
                .await?
                .map(|p| p.id),
        };
        Ok(owner)
    }

    /// Owner of reported content even after its author deleted it
    async fn reported_owner(&self, target: ReportTarget, target_id: Uuid) -> Result<Option<Uuid>> {
        let owner = match target {
            ReportTarget::Post => {
                post_repo::find_post_author_including_deleted(&self.pool, target_id).await?
            }
            ReportTarget::Comment => {
                engagement_repo::find_comment_author_including_deleted(&self.pool, target_id)
                    .await?
            }
            ReportTarget::Profile => Some(target_id),
        };
        Ok(owner)
    }

    pub async fn create_report(&self, reporter_id: Uuid, req: &CreateReportRequest) -> Result<Report> {
        req.validate()?;
        self.actor(reporter_id).await?;

        let owner = self
            .target_owner(req.target_type, req.target_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Report target not found".into()))?;
        check_reporter(reporter_id, owner)?;
        enforce_rate_limit(&self.limiter, "report", reporter_id, &RateLimitConfig::report())?;

        let details = req
            .details
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let report = report_repo::create_report(
            &self.pool,
            Some(reporter_id),
            req.target_type.as_str(),
            req.target_id,
            req.reason.trim(),
            details,
        )
        .await?;

        tracing::info!(
            report_id = %report.id,
            target_type = req.target_type.as_str(),
            target_id = %req.target_id,
            "Report created"
        );
        Ok(report)
    }

    pub async fn list_reports(&self, actor_id: Uuid, query: &ReportQuery) -> Result<Vec<Report>> {
        let actor = self.actor(actor_id).await?;
        require_role(actor.role(), Role::Moderator)?;

        let status = parse_status_filter(query.status.as_deref())?;
        let reports =
            report_repo::list_reports(
            &self.pool,
            status,
            query.cursor,
            query.cursor_id,
            clamp_limit(query.limit),
        )
        .await?;
        Ok(reports)
    }

    pub async fn resolve_report(
        &self,
        actor_id: Uuid,
        report_id: Uuid,
        req: &ResolveReportRequest,
    ) -> Result<Report> {
        req.validate()?;
        let actor = self.actor(actor_id).await?;
        require_role(actor.role(), Role::Moderator)?;

        let report = report_repo::find_report(&self.pool, report_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Report not found".into()))?;
        if report.status != ReportStatus::Pending.as_str() {
            return Err(AppError::Conflict("Report already resolved".into()));
        }
        let target = ReportTarget::from_str(&report.target_type)
            .ok_or_else(|| AppError::Internal(format!("bad report target {}", report.target_type)))?;

        let owner = match self.reported_owner(target, report.target_id).await? {
            Some(id) => profile_repo::find_by_id(&self.pool, id).await?,
            None => None,
        };
        check_resolution(req.action, target, actor.role(), owner.as_ref().map(Profile::role))?;

        let note = req.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let mut tx = self.pool.begin().await?;

        match req.action {
            ResolveAction::Dismiss => {}
            ResolveAction::RemoveContent => match target {
                ReportTarget::Post => {
                    post_repo::soft_delete_post(&mut *tx, report.target_id).await?;
                }
                ReportTarget::Comment => {
                    engagement_repo::soft_delete_comment(&mut *tx, report.target_id).await?;
                }
                ReportTarget::Profile => {}
            },
            ResolveAction::BanUser => {
                if let Some(owner) = &owner {
                    profile_repo::set_banned(&mut *tx, owner.id, true).await?;
                }
            }
        }

        let resolved = report_repo::resolve_report(
            &mut *tx,
            report_id,
            req.action.resulting_status().as_str(),
            actor_id,
            note,
        )
        .await?
        .ok_or_else(|| AppError::Conflict("Report already resolved".into()))?;

        audit_repo::insert_audit_log(
            &mut *tx,
            actor_id,
            "report.resolve",
            "report",
            Some(report_id),
            serde_json::json!({
                "action": req.action.as_str(),
                "target_type": report.target_type,
                "target_id": report.target_id,
                "owner_id": owner.as_ref().map(|o| o.id),
                "note": note,
            }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            report_id = %report_id,
            actor_id = %actor_id,
            action = req.action.as_str(),
            "Report resolved"
        );
        Ok(resolved)
    }

    pub async fn set_role(&self, actor_id: Uuid, target_id: Uuid, role: Role) -> Result<Profile> {
        let actor = self.actor(actor_id).await?;
        require_role(actor.role(), Role::Admin)?;
        if actor_id == target_id {
            return Err(AppError::BadRequest("You cannot change your own role".into()));
        }

        let target = self.target_profile(target_id).await?;
        if !can_assign_role(actor.role(), role) || !can_moderate_user(actor.role(), target.role()) {
            return Err(AppError::Forbidden("You cannot assign this role".into()));
        }

        let mut tx = self.pool.begin().await?;
        let updated = profile_repo::set_role(&mut *tx, target_id, role.level()).await?;
        audit_repo::insert_audit_log(
            &mut *tx,
            actor_id,
            "user.set_role",
            "profile",
            Some(target_id),
            serde_json::json!({ "from": target.role().as_str(), "to": role.as_str() }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(actor_id = %actor_id, target_id = %target_id, role = role.as_str(), "Role changed");
        Ok(updated)
    }

    async fn set_banned(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        banned: bool,
        reason: Option<&str>,
    ) -> Result<Profile> {
        let actor = self.actor(actor_id).await?;
        require_role(actor.role(), Role::Admin)?;

        let target = self.target_profile(target_id).await?;
        if !can_moderate_user(actor.role(), target.role()) {
            return Err(AppError::Forbidden("You cannot moderate this user".into()));
        }

        let action = if banned { "user.ban" } else { "user.unban" };
        let mut tx = self.pool.begin().await?;
        let updated = profile_repo::set_banned(&mut *tx, target_id, banned).await?;
        audit_repo::insert_audit_log(
            &mut *tx,
            actor_id,
            action,
            "profile",
            Some(target_id),
            serde_json::json!({ "reason": reason }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(actor_id = %actor_id, target_id = %target_id, action = action, "Ban state changed");
        Ok(updated)
    }

    pub async fn ban_user(&self, actor_id: Uuid, target_id: Uuid, req: &BanRequest) -> Result<Profile> {
        req.validate()?;
        let reason = req.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
        self.set_banned(actor_id, target_id, true, reason).await
    }

    pub async fn unban_user(&self, actor_id: Uuid, target_id: Uuid) -> Result<Profile> {
        self.set_banned(actor_id, target_id, false, None).await
    }

    pub async fn list_audit_logs(&self, actor_id: Uuid, query: &AuditLogQuery) -> Result<Vec<AuditLog>> {
        let actor = self.actor(actor_id).await?;
        require_role(actor.role(), Role::Admin)?;

        let logs =
            audit_repo::list_audit_logs(
            &self.pool,
            query.cursor,
            query.cursor_id,
            clamp_limit(query.limit),
        )
        .await?;
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_cannot_resolve() {
        let err = check_resolution(ResolveAction::Dismiss, ReportTarget::Post, Role::User, None)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_remove_content_targets() {
        assert!(check_resolution(
            ResolveAction::RemoveContent,
            ReportTarget::Comment,
            Role::Moderator,
            Some(Role::User)
        )
        .is_ok());
        assert!(matches!(
            check_resolution(
                ResolveAction::RemoveContent,
                ReportTarget::Profile,
                Role::Admin,
                Some(Role::User)
            ),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_ban_respects_hierarchy() {
        let ban = |actor, owner| check_resolution(ResolveAction::BanUser, ReportTarget::Post, actor, owner);

        assert!(ban(Role::Moderator, Some(Role::User)).is_ok());
        assert!(matches!(ban(Role::Moderator, Some(Role::Moderator)), Err(AppError::Forbidden(_))));
        assert!(matches!(ban(Role::Admin, Some(Role::Owner)), Err(AppError::Forbidden(_))));
        assert!(matches!(ban(Role::Admin, None), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_self_report_rejected() {
        let user = Uuid::new_v4();
        assert!(matches!(check_reporter(user, user), Err(AppError::BadRequest(_))));
        assert!(check_reporter(user, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_status_filter() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(parse_status_filter(Some("all")).unwrap(), None);
        assert_eq!(parse_status_filter(Some("pending")).unwrap(), Some("pending"));
        assert!(parse_status_filter(Some("open")).is_err());
    }
}

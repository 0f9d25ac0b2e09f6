/// Notification service - inserts, lists and fans out notifications
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{notification_repo, profile_repo};
use crate::error::{AppError, Result};
use crate::metrics::NOTIFICATIONS_CREATED;
use crate::models::{NewNotification, Notification, NotificationKind, NotificationView, Profile};
use crate::services::email::{mention_email, EmailTemplate, Mailer};
use crate::utils::mentions::extract_mentions;

#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

/// Who gets a mention notification and who also gets an email
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MentionTargets {
    pub recipients: Vec<Uuid>,
    pub emails: Vec<String>,
}

/// Drop the actor, then collect email addresses of recipients who opted in
pub fn mention_targets(profiles: &[Profile], actor_id: Uuid) -> MentionTargets {
    let mut targets = MentionTargets::default();
    for profile in profiles.iter().filter(|p| p.id != actor_id) {
        targets.recipients.push(profile.id);
        if profile.email_notifications {
            if let Some(email) = &profile.email {
                targets.emails.push(email.clone());
            }
        }
    }
    targets
}

/// Send `email` to every address; returns how many were accepted
async fn deliver_all(mailer: &dyn Mailer, to: &[String], email: &EmailTemplate) -> usize {
    let mut sent = 0;
    for address in to {
        match mailer.send(address, &email.subject, &email.html, &email.text).await {
            Ok(()) => sent += 1,
            Err(e) => tracing::warn!(error = %e, "Mention email failed"),
        }
    }
    sent
}

impl NotificationService {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>, frontend_url: String) -> Self {
        Self {
            pool,
            mailer,
            frontend_url,
        }
    }

    /// Insert a notification unless the recipient is the actor
    pub async fn create(&self, notification: NewNotification) -> Result<Option<Notification>> {
        if notification.is_self_notification() {
            return Ok(None);
        }

        let created = notification_repo::insert_notification(&self.pool, &notification).await?;
        NOTIFICATIONS_CREATED
            .with_label_values(&[notification.kind.as_str()])
            .inc();
        Ok(Some(created))
    }

    /// Like `create`, but a failure is logged instead of returned.
    ///
    /// Used after the triggering action has already been committed.
    pub async fn create_best_effort(&self, notification: NewNotification) {
        let kind = notification.kind.as_str();
        if let Err(e) = self.create(notification).await {
            tracing::warn!(kind = kind, error = %e, "Failed to create notification");
        }
    }

    /// Notify everyone @mentioned in `text`. Returns notifications created.
    pub async fn notify_mentions(
        &self,
        actor_id: Uuid,
        post_id: Uuid,
        comment_id: Option<Uuid>,
        text: &str,
    ) -> Result<usize> {
        let usernames = extract_mentions(text);
        if usernames.is_empty() {
            return Ok(0);
        }

        let profiles = profile_repo::find_by_usernames(&self.pool, &usernames).await?;
        let targets = mention_targets(&profiles, actor_id);
        if targets.recipients.is_empty() {
            return Ok(0);
        }

        let template = NewNotification::new(Uuid::nil(), Some(actor_id), NotificationKind::Mention)
            .with_post(post_id)
            .with_comment(comment_id);
        let created =
            notification_repo::insert_for_recipients(&self.pool, &template, &targets.recipients)
                .await? as usize;
        NOTIFICATIONS_CREATED
            .with_label_values(&[NotificationKind::Mention.as_str()])
            .inc_by(created as u64);

        if !targets.emails.is_empty() {
            self.send_mention_emails(actor_id, post_id, text, targets.emails)
                .await;
        }

        tracing::debug!(post_id = %post_id, count = created, "Mention notifications created");
        Ok(created)
    }

    /// Emails go out in the background; failures are logged only
    async fn send_mention_emails(&self, actor_id: Uuid, post_id: Uuid, text: &str, emails: Vec<String>) {
        let actor = match profile_repo::find_by_id(&self.pool, actor_id).await {
            Ok(Some(actor)) => actor,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load actor for mention emails");
                return;
            }
        };

        let email = mention_email(&self.frontend_url, &actor.username, post_id, text);
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            deliver_all(mailer.as_ref(), &emails, &email).await;
        });
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        cursor: Option<chrono::DateTime<chrono::Utc>>,
        cursor_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<NotificationView>> {
        let items = notification_repo::list_notifications(
            &self.pool,
            user_id,
            unread_only,
            cursor,
            cursor_id,
            limit,
        )
        .await?;
        Ok(items)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        Ok(notification_repo::unread_count(&self.pool, user_id).await?)
    }

    pub async fn mark_read(&self, user_id: Uuid, ids: &[Uuid]) -> Result<u64> {
        Ok(notification_repo::mark_read(&self.pool, user_id, ids).await?)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        Ok(notification_repo::mark_all_read(&self.pool, user_id).await?)
    }

    /// Raise a `message` notification on behalf of the messaging surface
    pub async fn notify_message(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        preview: &str,
    ) -> Result<Option<Notification>> {
        if sender_id == recipient_id {
            return Err(AppError::BadRequest("Cannot message yourself".into()));
        }
        if profile_repo::find_by_id(&self.pool, recipient_id).await?.is_none() {
            return Err(AppError::NotFound("Recipient not found".into()));
        }

        self.create(
            NewNotification::new(recipient_id, Some(sender_id), NotificationKind::Message)
                .with_message(preview.trim()),
        )
        .await
    }
}

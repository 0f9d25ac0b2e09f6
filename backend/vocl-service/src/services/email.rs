/// Outgoing email
/// Uses lettre for SMTP delivery; a no-op mailer stands in when SMTP is not configured
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use uuid::Uuid;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Invalid email address: {0}")]
    Address(String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> Result<(), EmailError>;
}

/// SMTP mailer over STARTTLS
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| EmailError::Build("SMTP_HOST is not set".into()))?;

        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| EmailError::Transport(format!("Failed to build SMTP transport: {}", e)))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        let address: Address = config
            .from_email
            .parse()
            .map_err(|e| EmailError::Address(format!("{}: {}", config.from_email, e)))?;

        Ok(Self {
            transport,
            from: Mailbox::new(Some(config.from_name.clone()), address),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> Result<(), EmailError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| EmailError::Address(format!("{}: {}", to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                text.to_string(),
                html.to_string(),
            ))
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Used when SMTP is not configured; logs and drops the message
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str, _text: &str) -> Result<(), EmailError> {
        tracing::debug!(to = %to, subject = %subject, "Email disabled, dropping message");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    pub subject: String,
    pub html: String,
    pub text: String,
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// First 140 characters of the mentioning text
fn excerpt(text: &str) -> String {
    const MAX: usize = 140;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX).collect();
        format!("{}…", cut.trim_end())
    }
}

/// "@actor mentioned you" email linking to the post
pub fn mention_email(frontend_url: &str, actor_username: &str, post_id: Uuid, text: &str) -> EmailTemplate {
    let post_url = format!("{}/post/{}", frontend_url.trim_end_matches('/'), post_id);
    let snippet = excerpt(text);

    let html = format!(
        r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .quote {{ background-color: #f4f4f4; border-left: 4px solid #7c3aed; padding: 10px 15px; margin: 15px 0; }}
        .button {{ display: inline-block; background-color: #7c3aed; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; }}
        .footer {{ margin-top: 20px; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <p><strong>@{actor}</strong> mentioned you on be.vocl:</p>
        <div class="quote">{snippet}</div>
        <p><a href="{url}" class="button">View post</a></p>
        <div class="footer">
            <p>You can turn off email notifications in your profile settings.</p>
        </div>
    </div>
</body>
</html>
"#,
        actor = escape_html(actor_username),
        snippet = escape_html(&snippet),
        url = post_url,
    );

    let text = format!(
        "@{} mentioned you on be.vocl:\n\n\"{}\"\n\nView post: {}\n\n---\nYou can turn off email notifications in your profile settings.\n",
        actor_username, snippet, post_url
    );

    EmailTemplate {
        subject: format!("@{} mentioned you", actor_username),
        html,
        text,
    }
}

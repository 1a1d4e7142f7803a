//! Email Service
//!
//! Renders templated notifications and hands them to a transport: a local
//! `.eml` outbox in development, SMTP everywhere else.

mod templates;
mod transport;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::Message;
use serde::{Deserialize, Serialize};
use tenant_common::EmailSend;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;

pub use templates::{find_template, render, render_plain, EmailTemplate, TEMPLATES};
#[cfg(test)]
pub use transport::testing::RecordingMailer;
pub use transport::{transport_for, MailTransport, OutboxMailer, PreviewUrl, SmtpMailer};

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Missing required fields for email notification")]
    MissingFields,

    #[error("Email template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Failed to build email message: {0}")]
    Build(String),

    #[error("Failed to send email: {0}")]
    Transport(String),
}

impl EmailError {
    /// Only transport failures are worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Delivery details returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailResult {
    pub message_id: String,
    pub preview_url: Option<String>,
}

/// Outcome of one `notification/email.send`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub template: String,
    pub recipient: String,
    pub email_result: EmailResult,
}

/// A validated, rendered message ready for delivery.
#[derive(Debug, Clone)]
pub struct PreparedEmail {
    pub template: &'static str,
    pub recipient: String,
    pub subject: String,
    pub html: String,
    to: Mailbox,
}

/// Template registry plus transport.
#[derive(Clone)]
pub struct EmailDispatcher {
    transport: Arc<dyn MailTransport>,
    from: Mailbox,
}

impl EmailDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, from: Mailbox) -> Self {
        Self { transport, from }
    }

    /// Build the dispatcher for the configured environment.
    pub fn from_config(config: &Config) -> Result<Self> {
        let from: Mailbox = config
            .email_from
            .parse()
            .context("EMAIL_FROM is not a valid email address")?;
        Ok(Self::new(Arc::from(transport_for(config)?), from))
    }

    /// Validate the request and render its template.
    pub fn prepare(&self, request: &EmailSend) -> Result<PreparedEmail, EmailError> {
        let (Some(recipient), Some(key)) = (
            request.to.as_deref().filter(|s| !s.trim().is_empty()),
            request.template.as_deref().filter(|s| !s.trim().is_empty()),
        ) else {
            return Err(EmailError::MissingFields);
        };

        let template =
            find_template(key).ok_or_else(|| EmailError::TemplateNotFound(key.to_string()))?;

        let to: Mailbox = recipient
            .parse()
            .map_err(|_| EmailError::InvalidRecipient(recipient.to_string()))?;

        Ok(PreparedEmail {
            template: template.key,
            recipient: recipient.to_string(),
            subject: render_plain(template.subject, &request.template_data),
            html: render(template.body, &request.template_data),
            to,
        })
    }

    /// Hand a prepared message to the transport.
    pub async fn deliver(&self, email: &PreparedEmail) -> Result<EmailResult, EmailError> {
        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain());

        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.clone())
            .subject(email.subject.clone())
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let preview_url = self.transport.deliver(message).await?;

        info!(
            template = email.template,
            recipient = %email.recipient,
            message_id = %message_id,
            "Email sent"
        );
        if let Some(url) = &preview_url {
            info!(preview_url = %url, "Email preview available");
        }

        Ok(EmailResult {
            message_id,
            preview_url,
        })
    }
}

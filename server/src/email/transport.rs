//! Mail transports.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::EmailError;
use crate::config::Config;

/// Where a delivered message can be inspected, if anywhere.
pub type PreviewUrl = Option<String>;

/// Delivers a fully built message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<PreviewUrl, EmailError>;
}

/// SMTP relay used outside development.
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &Config) -> Result<Self> {
        let host = config.email_host.as_ref().context("EMAIL_HOST is required")?;

        let builder = if config.email_secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .context("Failed to create SMTP TLS transport")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .context("Failed to create SMTP STARTTLS transport")?
        };
        let builder = builder.port(config.email_port);

        let mailer = match (&config.email_user, &config.email_password) {
            (Some(user), Some(password)) => builder
                .credentials(Credentials::new(user.clone(), password.clone()))
                .build(),
            _ => builder.build(),
        };

        Ok(Self { mailer })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, message: Message) -> Result<PreviewUrl, EmailError> {
        self.mailer
            .send(message)
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;
        Ok(None)
    }
}

/// Writes `.eml` files into a local directory.
pub struct OutboxMailer {
    dir: PathBuf,
    transport: AsyncFileTransport<Tokio1Executor>,
}

impl OutboxMailer {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create mail outbox {}", dir.display()))?;
        let dir = dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve mail outbox {}", dir.display()))?;

        Ok(Self {
            transport: AsyncFileTransport::new(&dir),
            dir,
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MailTransport for OutboxMailer {
    async fn deliver(&self, message: Message) -> Result<PreviewUrl, EmailError> {
        let file_id = self
            .transport
            .send(message)
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        let path = self.dir.join(format!("{file_id}.eml"));
        let preview = url::Url::from_file_path(&path)
            .map(String::from)
            .unwrap_or_else(|()| format!("file://{}", path.display()));
        Ok(Some(preview))
    }
}

/// Pick the transport for the configured environment.
pub fn transport_for(config: &Config) -> Result<Box<dyn MailTransport>> {
    if config.uses_outbox() {
        return Ok(Box::new(OutboxMailer::new(&config.mail_outbox_dir)?));
    }
    if !config.has_smtp() {
        tracing::warn!("SMTP credentials incomplete, relaying without authentication");
    }
    Ok(Box::new(SmtpMailer::new(config)?))
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Captures messages instead of sending them.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<Message>>,
        pub fail_with: Option<String>,
    }

    impl RecordingMailer {
        pub fn failing(reason: &str) -> Self {
            Self {
                sent: Mutex::default(),
                fail_with: Some(reason.to_string()),
            }
        }

        pub fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MailTransport for RecordingMailer {
        async fn deliver(&self, message: Message) -> Result<PreviewUrl, EmailError> {
            if let Some(reason) = &self.fail_with {
                return Err(EmailError::Transport(reason.clone()));
            }
            self.sent.lock().unwrap().push(message);
            Ok(None)
        }
    }
}

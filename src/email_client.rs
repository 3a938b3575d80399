use async_trait::async_trait;
use mail_send::{SmtpClientBuilder, mail_builder::MessageBuilder};
use thiserror::Error;
use tokio::time::timeout;

use crate::constants::SMTP_SEND_TIMEOUT;

#[derive(Clone)]
pub struct EmailClientConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("smtp error: {0}")]
    Smtp(#[from] mail_send::Error),

    #[error("email dispatch timed out")]
    Timeout,
}

/// Outbound notification channel. The service only ever needs "deliver this
/// text to this address"; tests substitute a recording fake.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    config: EmailClientConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let config = &self.config;

        let message = MessageBuilder::new()
            .from(config.username.as_ref())
            .to(to)
            .subject(subject)
            .text_body(body);

        let deliver = async {
            SmtpClientBuilder::new(config.smtp_server.as_ref(), config.smtp_port)
                .implicit_tls(false)
                .credentials((config.username.as_ref(), config.password.as_ref()))
                .connect()
                .await?
                .send(message)
                .await?;
            Ok(())
        };

        match timeout(SMTP_SEND_TIMEOUT, deliver).await {
            Ok(result) => result,
            Err(_) => Err(MailError::Timeout),
        }
    }
}

//! Email sending abstraction.
//!
//! Uses Resend in production, SMTP (lettre) in development.
//! This allows local development without a Resend account.

use anyhow::Result;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
};
use resend_rs::types::CreateEmailBaseOptions;

const RESET_CODE_SUBJECT: &str = "Reset password code";

/// Delivers messages to users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send a password reset code.
    async fn send_reset_code(&self, to: &str, code: &str) -> Result<()>;
}

fn reset_code_body(to: &str, code: &str) -> String {
    format!(
        "Hi there, {}.\n\nPlease enter this code to reset your password: {}\n\nThis code expires in 2 minutes.",
        to, code
    )
}

/// Email sender selected from config.
pub enum EmailSenderImpl {
    /// SMTP-based sender using lettre (for development)
    Smtp(SmtpSender),
    /// Resend API sender (for production)
    Resend(ResendSender),
}

impl EmailSenderImpl {
    /// Uses Resend if an api key is provided, otherwise falls back to SMTP.
    pub fn new(
        resend_api_key: Option<String>,
        smtp_url: Option<String>,
        from: String,
    ) -> Result<Self> {
        if let Some(api_key) = resend_api_key.filter(|k| !k.is_empty()) {
            Ok(Self::Resend(ResendSender::new(api_key, from)))
        } else if let Some(url) = smtp_url.filter(|u| !u.is_empty()) {
            Ok(Self::Smtp(SmtpSender::new(url, from)?))
        } else {
            anyhow::bail!("Either RESEND_API_KEY or SMTP_URL must be configured")
        }
    }
}

#[async_trait]
impl EmailSender for EmailSenderImpl {
    async fn send_reset_code(&self, to: &str, code: &str) -> Result<()> {
        let body = reset_code_body(to, code);
        match self {
            Self::Resend(sender) => sender.send(to, RESET_CODE_SUBJECT, &body).await,
            Self::Smtp(sender) => sender.send(to, RESET_CODE_SUBJECT, &body).await,
        }
    }
}

/// SMTP sender using lettre's tokio transport.
pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(smtp_url: String, from: String) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(&smtp_url)?.build();

        Ok(Self {
            transport,
            from: from.parse()?,
        })
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, to.parse()?))
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(email).await?;

        Ok(())
    }
}

/// Resend API sender.
pub struct ResendSender {
    client: resend_rs::Resend,
    from: String,
}

impl ResendSender {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: resend_rs::Resend::new(&api_key),
            from,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = CreateEmailBaseOptions::new(&self.from, [to], subject).with_text(body);

        self.client.emails.send(email).await?;

        Ok(())
    }
}

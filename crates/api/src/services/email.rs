//! Email sending abstraction.
//!
//! Uses Resend in production, SMTP (lettre) in development.
//! This allows local development without a Resend account.

use anyhow::Result;
use async_trait::async_trait;
use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
};
use resend_rs::types::CreateEmailBaseOptions;

/// A plain-text message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

/// Email sender backed by Resend or SMTP.
pub enum EmailSenderImpl {
    /// SMTP-based sender using lettre (for development)
    Smtp(SmtpSender),
    /// Resend API sender (for production)
    Resend(ResendSender),
}

impl EmailSenderImpl {
    /// Create a new email sender based on config.
    /// Uses Resend if api key is provided, otherwise falls back to SMTP.
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
            anyhow::bail!("Either SOFCAR_RESEND_API_KEY or SOFCAR_SMTP_URL must be configured")
        }
    }
}

#[async_trait]
impl EmailSender for EmailSenderImpl {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        match self {
            Self::Resend(sender) => sender.send(email).await,
            Self::Smtp(sender) => sender.send(email).await,
        }
    }
}

/// SMTP sender using lettre.
pub struct SmtpSender {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(smtp_url: String, from: String) -> Result<Self> {
        let transport = SmtpTransport::from_url(&smtp_url)?.build();

        Ok(Self {
            transport,
            from: from.parse()?,
        })
    }

    pub async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, email.to.parse()?))
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)?;

        // lettre's SmtpTransport blocks on network I/O.
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message)).await??;

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

    pub async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let message = CreateEmailBaseOptions::new(&self.from, [email.to.as_str()], &email.subject)
            .with_text(&email.body);

        self.client.emails.send(message).await?;

        Ok(())
    }
}

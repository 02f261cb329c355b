/// Outbound email
///
/// Messages are built from structured [`MailContent`], rendered to both a
/// plain-text and an HTML body, and handed to an [`EmailSender`].
///
/// Delivery is best effort. [`dispatch_email`] logs a failed send and
/// returns normally, so a mail outage never fails the request that
/// triggered it.
///
/// # Modules
///
/// - [`content`]: structured content, rendering and the message templates
/// - [`sender`]: log, in-memory and HTTP API senders

pub mod content;
pub mod sender;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

pub use content::{MailAction, MailContent, Product};
pub use sender::{HttpEmailSender, LogEmailSender, MemoryEmailSender};

/// Error type for email delivery
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email transport failed: {0}")]
    Transport(String),

    #[error("Email provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl EmailMessage {
    /// Renders structured content into a message
    pub fn render(to: &str, subject: &str, content: &MailContent, product: &Product) -> Self {
        Self {
            to: to.to_string(),
            subject: subject.to_string(),
            text: content.render_text(product),
            html: content.render_html(product),
        }
    }
}

/// Email delivery abstraction
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Delivers one message
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Sends a message and logs the outcome; never returns an error
pub async fn dispatch_email(sender: &dyn EmailSender, message: EmailMessage) {
    match sender.send(&message).await {
        Ok(()) => info!(to = %message.to, subject = %message.subject, "Email sent"),
        Err(e) => error!(
            to = %message.to,
            subject = %message.subject,
            error = %e,
            "Email Service Failed"
        ),
    }
}

/// Email sender implementations
///
/// - [`LogEmailSender`]: logs the message instead of delivering it
/// - [`MemoryEmailSender`]: keeps messages in memory for inspection
/// - [`HttpEmailSender`]: posts the message to an HTTP mail API

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::{EmailError, EmailMessage, EmailSender};

/// Development sender that logs instead of delivering
#[derive(Debug, Clone, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Email delivery disabled, logging message"
        );
        debug!(body = %message.text, "Email text body");
        Ok(())
    }
}

/// Sender that records every message; clones share the same store
#[derive(Debug, Clone, Default)]
pub struct MemoryEmailSender {
    messages: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MemoryEmailSender {
    /// Returns a snapshot of all recorded messages
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Returns the most recent message sent to `to`
    pub fn last_to(&self, to: &str) -> Option<EmailMessage> {
        self.messages().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl EmailSender for MemoryEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        self.messages
            .lock()
            .map_err(|_| EmailError::Transport("message store poisoned".to_string()))?
            .push(message.clone());
        Ok(())
    }
}

/// Sender for JSON mail APIs (Mailtrap send API and compatible)
///
/// Posts `{from, to, subject, text, html}` with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    from: String,
}

impl HttpEmailSender {
    pub fn new(
        api_url: impl Into<String>,
        api_token: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_token: api_token.into(),
            from: from.into(),
        })
    }

    fn payload(&self, message: &EmailMessage) -> serde_json::Value {
        json!({
            "from": { "email": self.from, "name": "Task Manager" },
            "to": [{ "email": message.to }],
            "subject": message.subject,
            "text": message.text,
            "html": message.html,
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

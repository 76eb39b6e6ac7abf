// ABOUTME: SMTP mail delivery for notify steps
// ABOUTME: Builds plain-text messages and hands them to lettre's async SMTP transport

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::MailTransport;
use crate::engine::error::{ExecutionError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub smtp_server: String,
    pub from_addr: String,
    pub to_addr: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    fn build(&self) -> Result<Message> {
        let from = parse_mailbox("sender", &self.from_addr)?;
        let to = parse_mailbox("recipient", &self.to_addr)?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .body(self.body.clone())
            .map_err(|e| ExecutionError::capability_failed("mail transport", e))
    }
}

fn parse_mailbox(role: &str, address: &str) -> Result<Mailbox> {
    address.parse::<Mailbox>().map_err(|e| {
        ExecutionError::capability_failed(
            "mail transport",
            format!("invalid {} '{}': {}", role, address, e),
        )
    })
}

/// Unauthenticated SMTP delivery, one connection per message.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    port: u16,
}

impl SmtpMailer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for SmtpMailer {
    fn default() -> Self {
        Self::new(25)
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let email = message.build()?;
        let transport =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(message.smtp_server.as_str())
                .port(self.port)
                .build();

        transport
            .send(email)
            .await
            .map_err(|e| ExecutionError::capability_failed("mail transport", e))?;

        info!(
            "Sent notification email to {} via {}:{}",
            message.to_addr, message.smtp_server, self.port
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(from: &str, to: &str) -> MailMessage {
        MailMessage {
            smtp_server: "localhost".to_string(),
            from_addr: from.to_string(),
            to_addr: to.to_string(),
            subject: "Notification".to_string(),
            body: "done".to_string(),
        }
    }

    #[test]
    fn test_build_valid_message() {
        assert!(message("robot@example.com", "ops@example.com").build().is_ok());
    }

    #[test]
    fn test_build_rejects_bad_recipient() {
        let err = message("robot@example.com", "not an address").build().unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::CapabilityFailed { capability: "mail transport", .. }
        ));
    }
}

// ABOUTME: Notify step handler
// ABOUTME: Logs the message and, when a recipient is given, mails it through the mail transport

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::params::{decode, lenient_string};
use super::StepHandler;
use crate::capabilities::MailMessage;
use crate::engine::error::Result;
use crate::engine::{StepOutcome, StepScope};
use crate::parser::{Step, StepType};

pub const DEFAULT_SUBJECT: &str = "Notification";

#[derive(Debug, Default, Deserialize)]
struct NotifyParams {
    #[serde(default, deserialize_with = "lenient_string")]
    message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    subject: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    smtp_server: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    from_addr: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct NotifyStep;

#[async_trait]
impl StepHandler for NotifyStep {
    fn step_type(&self) -> StepType {
        StepType::Notify
    }

    async fn execute(&self, step: &Step, scope: &StepScope<'_>) -> Result<StepOutcome> {
        let params: NotifyParams = decode(step)?;
        let message = params.message.unwrap_or_default();
        info!("Notification: {}", message);

        let Some(to_addr) = non_blank(params.email) else {
            return Ok(StepOutcome::Completed);
        };

        let settings = scope.settings();
        let mail = MailMessage {
            smtp_server: non_blank(params.smtp_server).unwrap_or_else(|| settings.smtp_server.clone()),
            from_addr: non_blank(params.from_addr).unwrap_or_else(|| settings.from_addr.clone()),
            to_addr,
            subject: non_blank(params.subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            body: message,
        };
        info!("Sending notification email to {} via {}", mail.to_addr, mail.smtp_server);

        scope.capabilities().mail.send(&mail).await?;
        Ok(StepOutcome::Completed)
    }
}

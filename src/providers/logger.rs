//! Logger transport that only logs deliveries.
//!
//! Useful for staging environments, to see what would be sent without sending
//! or storing anything.

use async_trait::async_trait;

use crate::delivery::{Delivery, DeliveryResult, Transport};
use crate::error::MailError;

/// Transport that emits tracing events instead of sending.
pub struct LoggerTransport {
    /// If true, log the full message. If false, just a recipient summary.
    log_full: bool,
}

impl LoggerTransport {
    /// Brief output (recipients and subject).
    pub fn new() -> Self {
        Self { log_full: false }
    }

    /// Full message details.
    pub fn full() -> Self {
        Self { log_full: true }
    }

    pub fn log_full(mut self, full: bool) -> Self {
        self.log_full = full;
        self
    }
}

impl Default for LoggerTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LoggerTransport {
    async fn send(&self, delivery: &Delivery) -> Result<DeliveryResult, MailError> {
        let message_id = uuid::Uuid::new_v4().to_string();
        let message = &delivery.message;

        if self.log_full {
            tracing::info!(
                message_id = %message_id,
                from = ?message.from_email(),
                from_name = ?message.from_name(),
                to = ?message.to_emails(),
                bcc = ?message.bcc_address(),
                subject = ?message.subject(),
                template = ?delivery.template_name,
                send_at = ?delivery.send_at,
                ip_pool = ?delivery.ip_pool,
                "Message logged (full)"
            );

            let body = serde_json::to_string(message)?;
            tracing::debug!(message = %body, "Message body");
        } else {
            tracing::info!(
                message_id = %message_id,
                to = ?message.to_emails(),
                subject = ?message.subject(),
                "Message logged"
            );
        }

        Ok(DeliveryResult::new(message_id))
    }

    fn provider_name(&self) -> &'static str {
        "logger"
    }
}

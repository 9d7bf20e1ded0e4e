//! Deliveries and the collaborators that carry them.
//!
//! A [`Delivery`] is everything needed to hand one assembled message to the
//! Mandrill API: the message, the template (for template sends), and the send
//! flags. The crate never talks to the network itself. Sending goes through a
//! [`Transport`], and deferred sends through a [`DeferredQueue`].
//!
//! # Why `async_trait`?
//!
//! Transports are held as `Arc<dyn Transport>` so that staging and production
//! can pick one at runtime. Native async traits are not object-safe, so the
//! macro boxes the returned futures. Sending is I/O-bound and the allocation is
//! negligible next to it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::Instrument;

#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::error::MailError;
use crate::format::MergeVar;
use crate::message::Message;

/// Format of `send_at` in API payloads (always UTC).
pub const SEND_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of a successful hand-off to a transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Message ID assigned by the transport
    pub message_id: String,
    /// Optional transport-specific response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_response: Option<Value>,
}

impl DeliveryResult {
    /// Create a new delivery result with just a message ID.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            provider_response: None,
        }
    }

    /// Create a delivery result with the transport's response.
    pub fn with_response(message_id: impl Into<String>, response: Value) -> Self {
        Self {
            message_id: message_id.into(),
            provider_response: Some(response),
        }
    }
}

/// An assembled message plus its send options.
///
/// Serializes to a self-contained job payload, so it can be queued and sent
/// later by another process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_content: Option<Vec<MergeVar>>,
    pub message: Message,
    #[serde(rename = "async", default)]
    pub async_send: Option<bool>,
    #[serde(default)]
    pub ip_pool: Option<String>,
    /// UTC timestamp formatted with [`SEND_AT_FORMAT`].
    #[serde(default)]
    pub send_at: Option<String>,
}

impl Delivery {
    /// A plain message send with no flags.
    pub fn message(message: Message) -> Self {
        Self {
            template_name: None,
            template_content: None,
            message,
            async_send: None,
            ip_pool: None,
            send_at: None,
        }
    }

    /// Turn this into a template send.
    pub fn template(mut self, name: impl Into<String>, content: Vec<MergeVar>) -> Self {
        self.template_name = Some(name.into());
        self.template_content = Some(content);
        self
    }

    pub fn is_template(&self) -> bool {
        self.template_name.is_some()
    }

    /// The request body for the Mandrill API.
    ///
    /// `{key, template_name, template_content, message, async, ip_pool, send_at}`,
    /// where the template keys are only present for template sends.
    pub fn api_payload(&self, key: &str) -> Result<Value, MailError> {
        let mut payload = Map::new();
        payload.insert("key".into(), Value::String(key.to_string()));
        if let Some(name) = &self.template_name {
            payload.insert("template_name".into(), Value::String(name.clone()));
            payload.insert(
                "template_content".into(),
                serde_json::to_value(self.template_content.as_deref().unwrap_or_default())?,
            );
        }
        payload.insert("message".into(), self.message.clone().into());
        payload.insert("async".into(), serde_json::to_value(self.async_send)?);
        payload.insert("ip_pool".into(), serde_json::to_value(&self.ip_pool)?);
        payload.insert("send_at".into(), serde_json::to_value(&self.send_at)?);
        Ok(Value::Object(payload))
    }

    /// Serialize into a job payload for a [`DeferredQueue`].
    pub fn to_job_payload(&self) -> Result<String, MailError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild a delivery from a job payload.
    pub fn from_job_payload(payload: &str) -> Result<Self, MailError> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Something that hands deliveries to Mandrill (or pretends to).
///
/// ```rust,ignore
/// struct HttpTransport { client: reqwest::Client, key: String }
///
/// #[async_trait]
/// impl Transport for HttpTransport {
///     async fn send(&self, delivery: &Delivery) -> Result<DeliveryResult, MailError> {
///         let body = delivery.api_payload(&self.key)?;
///         // POST to /messages/send.json or /messages/send-template.json
///         # unimplemented!()
///     }
///
///     fn provider_name(&self) -> &'static str {
///         "mandrill"
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a single delivery.
    async fn send(&self, delivery: &Delivery) -> Result<DeliveryResult, MailError>;

    /// Send several deliveries one after another, stopping at the first error.
    async fn send_many(&self, deliveries: &[Delivery]) -> Result<Vec<DeliveryResult>, MailError> {
        let mut results = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            results.push(self.send(delivery).await?);
        }
        Ok(results)
    }

    /// Transport name (for logging/metrics).
    fn provider_name(&self) -> &'static str {
        "unknown"
    }

    /// Check that required configuration is present.
    ///
    /// [`deliver_with`] calls this before every send and skips the send on error.
    fn validate_config(&self) -> Result<(), MailError> {
        Ok(())
    }
}

/// Options for a deferred send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Queue name; the queue's default when unset.
    pub queue: Option<String>,
}

impl JobOptions {
    pub fn queue(name: impl Into<String>) -> Self {
        Self {
            queue: Some(name.into()),
        }
    }
}

/// A background job queue that accepts serialized deliveries.
///
/// The worker side calls [`perform_job`] with the payload.
#[async_trait]
pub trait DeferredQueue: Send + Sync {
    async fn enqueue(&self, payload: String, options: &JobOptions) -> Result<(), MailError>;
}

/// Send a delivery through a transport, with tracing and metrics.
pub async fn deliver_with<T: Transport + ?Sized>(
    delivery: &Delivery,
    transport: &T,
) -> Result<DeliveryResult, MailError> {
    let provider = transport.provider_name();

    let span = tracing::info_span!(
        "mandrill.deliver",
        transport = provider,
        to = ?delivery.message.to_emails(),
        subject = delivery.message.subject().unwrap_or_default(),
        template = delivery.template_name.as_deref().unwrap_or_default(),
    );

    async move {
        tracing::debug!("Delivering message");

        if let Err(e) = transport.validate_config() {
            tracing::error!(error = %e, "Transport is not configured");
            return Err(e);
        }

        #[cfg(feature = "metrics")]
        let start = Instant::now();

        let result = transport.send(delivery).await;

        #[cfg(feature = "metrics")]
        {
            let duration = start.elapsed().as_secs_f64();
            let status = if result.is_ok() { "success" } else { "error" };
            metrics::counter!("mandrill_deliveries_total", "transport" => provider, "status" => status)
                .increment(1);
            metrics::histogram!("mandrill_delivery_duration_seconds", "transport" => provider)
                .record(duration);
        }

        match &result {
            Ok(r) => tracing::info!(message_id = %r.message_id, "Message delivered"),
            Err(e) => tracing::error!(error = %e, "Message delivery failed"),
        }

        result
    }
    .instrument(span)
    .await
}

/// Queue a delivery for later.
pub async fn deliver_later_with<Q: DeferredQueue + ?Sized>(
    delivery: &Delivery,
    queue: &Q,
    options: &JobOptions,
) -> Result<(), MailError> {
    let payload = delivery.to_job_payload()?;
    queue.enqueue(payload, options).await?;
    tracing::info!(
        queue = options.queue.as_deref().unwrap_or("default"),
        to = ?delivery.message.to_emails(),
        "Message queued for delivery"
    );
    Ok(())
}

/// Worker entry point: rebuild a queued delivery and send it.
pub async fn perform_job<T: Transport + ?Sized>(
    payload: &str,
    transport: &T,
) -> Result<DeliveryResult, MailError> {
    let delivery = Delivery::from_job_payload(payload)?;
    deliver_with(&delivery, transport).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> Delivery {
        let mut message = Message::new();
        message.insert("subject", "Hi");
        message.insert("to", json!([{"email": "a@example.com", "name": "a@example.com"}]));
        Delivery::message(message)
    }

    struct Echo;

    #[async_trait]
    impl Transport for Echo {
        async fn send(&self, delivery: &Delivery) -> Result<DeliveryResult, MailError> {
            Ok(DeliveryResult::new(
                delivery.message.subject().unwrap_or_default().to_string(),
            ))
        }

        fn provider_name(&self) -> &'static str {
            "echo"
        }
    }

    #[derive(Default)]
    struct VecQueue(Mutex<Vec<(String, JobOptions)>>);

    #[async_trait]
    impl DeferredQueue for VecQueue {
        async fn enqueue(&self, payload: String, options: &JobOptions) -> Result<(), MailError> {
            self.0.lock().push((payload, options.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_message_payload_shape() {
        let payload = sample().api_payload("KEY").unwrap();
        let keys: Vec<&str> = payload.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["key", "message", "async", "ip_pool", "send_at"]);
        assert_eq!(payload["async"], Value::Null);
    }

    #[test]
    fn test_template_payload_shape() {
        let delivery = sample().template("welcome", vec![MergeVar::new("blank", "")]);
        let payload = delivery.api_payload("").unwrap();
        let keys: Vec<&str> = payload.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["key", "template_name", "template_content", "message", "async", "ip_pool", "send_at"]
        );
        assert_eq!(payload["template_content"], json!([{"name": "blank", "content": ""}]));
    }

    #[test]
    fn test_job_payload_survives_the_queue() {
        let mut delivery = sample().template("welcome", vec![]);
        delivery.async_send = Some(true);
        delivery.ip_pool = Some("Main Pool".into());
        delivery.send_at = Some("2030-01-01 09:30:00".into());

        let payload = delivery.to_job_payload().unwrap();
        assert!(payload.contains("\"async\":true"));
        assert_eq!(Delivery::from_job_payload(&payload).unwrap(), delivery);
    }

    #[test]
    fn test_garbage_job_payload() {
        assert!(matches!(
            Delivery::from_job_payload("not json"),
            Err(MailError::JsonError(_))
        ));
    }

    #[tokio::test]
    async fn test_deliver_later_then_perform() {
        let queue = VecQueue::default();
        deliver_later_with(&sample(), &queue, &JobOptions::queue("mailers"))
            .await
            .unwrap();

        let (payload, options) = queue.0.lock().pop().unwrap();
        assert_eq!(options.queue.as_deref(), Some("mailers"));

        let result = perform_job(&payload, &Echo).await.unwrap();
        assert_eq!(result.message_id, "Hi");
    }

    struct Unconfigured(AtomicUsize);

    #[async_trait]
    impl Transport for Unconfigured {
        async fn send(&self, _delivery: &Delivery) -> Result<DeliveryResult, MailError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(DeliveryResult::new("sent"))
        }

        fn validate_config(&self) -> Result<(), MailError> {
            Err(MailError::Configuration("MANDRILL_API_KEY is not set".into()))
        }
    }

    #[tokio::test]
    async fn test_deliver_checks_config_before_sending() {
        let transport = Unconfigured(AtomicUsize::new(0));
        let err = deliver_with(&sample(), &transport).await.unwrap_err();
        assert!(matches!(err, MailError::Configuration(_)));
        assert_eq!(transport.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_many_default() {
        let results = Echo.send_many(&[sample(), sample()]).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}

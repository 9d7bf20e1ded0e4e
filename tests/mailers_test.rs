//! Mailer tests: assembling, sending, queueing and URL helpers.

use async_trait::async_trait;
use mandrill_mailer::providers::LocalTransport;
use mandrill_mailer::{
    perform_job, AttachmentSpec, Config, DeferredQueue, JobOptions, MailError, Mailer,
    MailerClass, MessageArgs, MessageMailer, RouteTable, TemplateMailer, UrlOptions,
};
use parking_lot::Mutex;
use serde_json::{json, Map};
use std::sync::Arc;

fn class() -> Arc<MailerClass> {
    let class = MailerClass::new("InvitationMailer");
    class.default("from", "invites@example.com");
    class.default("from_name", "Invitations");
    class
}

fn config() -> Arc<Config> {
    Arc::new(
        Config::new()
            .api_key("md-test")
            .default_url_options(UrlOptions::new("app.example.com").protocol("https")),
    )
}

#[derive(Default)]
struct MemoryQueue {
    jobs: Mutex<Vec<(String, JobOptions)>>,
}

#[async_trait]
impl DeferredQueue for MemoryQueue {
    async fn enqueue(&self, payload: String, options: &JobOptions) -> Result<(), MailError> {
        self.jobs.lock().push((payload, options.clone()));
        Ok(())
    }
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn message_mailer_delivers_through_transport() {
    let transport = LocalTransport::new();
    let mailer = MessageMailer::new(&class())
        .with_config(config())
        .mandrill_mail(
            MessageArgs::new()
                .subject("You're invited")
                .to(("Ann", "ann@example.com"))
                .html("<p>Join us</p>")
                .attachment(AttachmentSpec::from_bytes("invite.ics", b"BEGIN:VCALENDAR".to_vec())),
        )
        .unwrap();

    let result = mailer.deliver(&transport).await.unwrap();
    assert!(!result.message_id.is_empty());

    let stored = transport.last_delivery().unwrap();
    assert_eq!(&stored.delivery, mailer.delivery().unwrap());
    assert_eq!(stored.delivery.message.from_name(), Some("Invitations"));
    assert_eq!(
        stored.delivery.message.get("attachments").unwrap()[0]["content"],
        json!("QkVHSU46VkNBTEVOREFS")
    );
}

#[tokio::test]
async fn template_mailer_delivers_through_transport() {
    let transport = LocalTransport::new();
    let mailer = TemplateMailer::new(&class())
        .with_config(config())
        .mandrill_mail(
            MessageArgs::new()
                .template("invitation")
                .to("ann@example.com")
                .var("EVENT", "Launch"),
        )
        .unwrap();

    mailer.deliver(&transport).await.unwrap();
    assert!(transport.sent_with_template("invitation"));

    let data = mailer.data().unwrap();
    assert_eq!(data["key"], json!("md-test"));
    assert_eq!(data["template_content"], json!([{"name": "blank", "content": ""}]));
}

#[tokio::test]
async fn transport_failure_is_returned() {
    let transport = LocalTransport::new();
    transport.set_failure("connection refused");

    let mailer = MessageMailer::new(&class())
        .with_config(config())
        .mandrill_mail(MessageArgs::new().to("ann@example.com"))
        .unwrap();

    let err = mailer.deliver(&transport).await.unwrap_err();
    assert!(matches!(
        err,
        MailError::ProviderError { provider: "local", ref message, .. } if message == "connection refused"
    ));
}

#[tokio::test]
async fn unprepared_mailer_cannot_deliver() {
    let transport = LocalTransport::new();
    let mailer = MessageMailer::new(&class()).with_config(config());
    assert!(mailer.deliver(&transport).await.is_err());
    assert_eq!(transport.delivery_count(), 0);
}

// ============================================================================
// Deferred Delivery
// ============================================================================

#[tokio::test]
async fn deliver_later_then_perform_job() {
    let queue = MemoryQueue::default();
    let transport = LocalTransport::new();

    let mailer = TemplateMailer::new(&class())
        .with_config(config())
        .mandrill_mail(
            MessageArgs::new()
                .template("invitation")
                .to("ann@example.com")
                .ip_pool("Main Pool")
                .async_send(true),
        )
        .unwrap();

    mailer
        .deliver_later(&queue, &JobOptions::queue("mailers"))
        .await
        .unwrap();
    assert_eq!(transport.delivery_count(), 0);

    let (payload, options) = queue.jobs.lock().remove(0);
    assert_eq!(options.queue.as_deref(), Some("mailers"));

    perform_job(&payload, &transport).await.unwrap();
    let stored = transport.last_delivery().unwrap();
    assert_eq!(&stored.delivery, mailer.delivery().unwrap());
    assert_eq!(stored.delivery.ip_pool.as_deref(), Some("Main Pool"));
    assert_eq!(stored.delivery.async_send, Some(true));
}

// ============================================================================
// URL Helpers
// ============================================================================

fn routes() -> Arc<RouteTable> {
    Arc::new(
        RouteTable::new()
            .route("root", "/")
            .route("invitation", "/invitations/:token"),
    )
}

#[test]
fn url_merges_default_url_options() {
    let mailer = MessageMailer::new(&class())
        .with_config(config())
        .with_url_resolver(routes());

    let mut params = Map::new();
    params.insert("token".into(), json!("abc"));
    assert_eq!(
        mailer.url("invitation", params).unwrap(),
        "https://app.example.com/invitations/abc"
    );
}

#[test]
fn image_helpers() {
    let mailer = MessageMailer::new(&class())
        .with_config(config())
        .with_url_resolver(routes());

    assert_eq!(mailer.image_path("logo.png").unwrap(), "/assets/logo.png");
    assert_eq!(
        mailer.image_url("logo.png").unwrap(),
        "https://app.example.com/assets/logo.png"
    );
}

#[test]
fn url_without_resolver_is_a_configuration_error() {
    let mailer = MessageMailer::new(&class()).with_config(config());
    assert!(matches!(
        mailer.image_path("logo.png"),
        Err(MailError::Configuration(_))
    ));
}

//! Local transport tests.

use mandrill_mailer::providers::LocalTransport;
use mandrill_mailer::{
    deliver_with, Config, Delivery, Mailer, MailerClass, MessageArgs, MessageMailer, Storage,
    Transport,
};
use std::sync::Arc;

fn delivery(to: &str, subject: &str) -> Delivery {
    let class = MailerClass::new("LocalTestMailer");
    MessageMailer::new(&class)
        .with_config(Arc::new(Config::new()))
        .mandrill_mail(MessageArgs::new().to(to).subject(subject))
        .unwrap()
        .into_delivery()
        .unwrap()
}

// ============================================================================
// Basic Delivery
// ============================================================================

#[tokio::test]
async fn send_returns_ok() {
    let transport = LocalTransport::new();
    let result = transport.send(&delivery("tony@example.com", "Hello")).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn send_many_returns_ok() {
    let transport = LocalTransport::new();
    let results = transport
        .send_many(&[
            delivery("steve@example.com", "Hello, Steve"),
            delivery("natasha@example.com", "Hello, Natasha"),
        ])
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(transport.delivery_count(), 2);
}

#[tokio::test]
async fn deliver_with_captures_identical_tuple() {
    let transport = LocalTransport::new();
    let sent = delivery("steve@example.com", "Hello");

    deliver_with(&sent, &transport).await.unwrap();
    assert_eq!(transport.last_delivery().unwrap().delivery, sent);
}

#[tokio::test]
async fn works_as_dyn_transport() {
    let local = LocalTransport::new();
    let transport: Arc<dyn Transport> = Arc::new(local.clone());

    deliver_with(&delivery("a@example.com", "Dyn"), transport.as_ref())
        .await
        .unwrap();
    assert_eq!(local.delivery_count(), 1);
    assert_eq!(transport.provider_name(), "local");
}

// ============================================================================
// Storage
// ============================================================================

#[tokio::test]
async fn shares_storage() {
    let transport = LocalTransport::new();
    let storage = transport.storage();

    transport.send(&delivery("a@example.com", "One")).await.unwrap();
    assert_eq!(storage.count(), 1);

    let other = LocalTransport::with_storage(storage);
    other.send(&delivery("b@example.com", "Two")).await.unwrap();
    assert_eq!(transport.delivery_count(), 2);
}

#[tokio::test]
async fn flush_empties_storage() {
    let transport = LocalTransport::new();
    transport.send(&delivery("a@example.com", "One")).await.unwrap();
    transport.send(&delivery("b@example.com", "Two")).await.unwrap();

    let flushed = transport.flush();
    assert_eq!(flushed[0].delivery.message.subject(), Some("Two"));
    assert!(!transport.has_deliveries());
}

//! Logger transport tests.

use mandrill_mailer::providers::LoggerTransport;
use mandrill_mailer::{deliver_with, Delivery, Message, Transport};

fn delivery() -> Delivery {
    let mut message = Message::new();
    message.insert("subject", "Hello, Avengers!");
    message.insert("from_email", "tony.stark@example.com");
    Delivery::message(message)
}

#[tokio::test]
async fn send_returns_message_id() {
    let result = LoggerTransport::new().send(&delivery()).await.unwrap();
    assert!(!result.message_id.is_empty());
}

#[tokio::test]
async fn full_logging_returns_message_id() {
    let result = deliver_with(&delivery(), &LoggerTransport::full()).await.unwrap();
    assert!(!result.message_id.is_empty());
}

#[test]
fn provider_name() {
    assert_eq!(LoggerTransport::default().provider_name(), "logger");
}

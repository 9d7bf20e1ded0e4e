//! Tests for the interceptor functionality.
//!
//! Interceptors run after assembly and before the message reaches a transport.

use mandrill_mailer::providers::LocalTransport;
use mandrill_mailer::{
    Config, Interceptor, MailError, Mailer, MailerClass, Message, MessageArgs, MessageMailer,
    TemplateMailer,
};
use serde_json::json;
use std::sync::Arc;

fn class() -> Arc<MailerClass> {
    let class = MailerClass::new("InterceptedMailer");
    class.default("from", "app@example.com");
    class
}

/// Test that an overlay replaces the caller's recipients.
#[tokio::test]
async fn overlay_redirects_recipients() {
    let transport = LocalTransport::new();
    let config = Config::new().interceptor_params(json!({"to": "x@y.com"}));

    let mailer = MessageMailer::new(&class())
        .with_config(Arc::new(config))
        .mandrill_mail(MessageArgs::new().subject("Hi").to("real@example.com"))
        .unwrap();
    mailer.deliver(&transport).await.unwrap();

    let stored = transport.last_delivery().unwrap();
    assert_eq!(stored.delivery.message.get("to"), Some(&json!("x@y.com")));
    assert!(transport.sent_to("x@y.com"));
    assert!(!transport.sent_to("real@example.com"));
}

/// Test that a transform can tag every message.
#[test]
fn transform_tags_message() {
    let config = Config::new().interceptor(|message: &mut Message| {
        let subject = message.subject().unwrap_or_default().to_string();
        message.insert("subject", format!("[STAGING] {}", subject));
        message.insert("tags", json!(["staging"]));
    });

    let mailer = TemplateMailer::new(&class())
        .with_config(Arc::new(config))
        .mandrill_mail(MessageArgs::new().template("welcome").subject("Welcome"))
        .unwrap();

    let message = mailer.message().unwrap();
    assert_eq!(message.subject(), Some("[STAGING] Welcome"));
    assert_eq!(message.get("tags"), Some(&json!(["staging"])));
}

struct RedirectTo(&'static str);

impl Interceptor for RedirectTo {
    fn intercept(&self, message: &mut Message) {
        message.insert("to", json!([{"email": self.0, "name": self.0}]));
        message.insert("bcc_address", json!(null));
    }
}

/// Test that a struct interceptor works the same as a closure.
#[test]
fn struct_interceptor() {
    let config = Config::new().interceptor(RedirectTo("qa@example.com"));
    let mailer = MessageMailer::new(&class())
        .with_config(Arc::new(config))
        .mandrill_mail(
            MessageArgs::new()
                .to("customer@example.com")
                .bcc("audit@example.com"),
        )
        .unwrap();

    assert_eq!(mailer.message().unwrap().to_emails(), vec!["qa@example.com"]);
    assert_eq!(mailer.bcc(), None);
}

/// Test that a misconfigured overlay is accepted at configuration time and
/// only fails when a message is assembled.
#[test]
fn string_overlay_fails_lazily() {
    let config = Arc::new(Config::new().interceptor_params("x@y.com"));

    let mailer = MessageMailer::new(&class()).with_config(Arc::clone(&config));
    let err = mailer.mandrill_mail(MessageArgs::new()).unwrap_err();
    assert!(matches!(err, MailError::InvalidInterceptorConfig(_)));
}

/// Test that configuring both forms is rejected.
#[test]
fn both_forms_rejected() {
    let config = Config::new()
        .interceptor(RedirectTo("qa@example.com"))
        .interceptor_params(json!({"subaccount": "staging"}));

    let err = MessageMailer::new(&class())
        .with_config(Arc::new(config))
        .mandrill_mail(MessageArgs::new())
        .unwrap_err();
    assert!(matches!(err, MailError::InvalidInterceptorConfig(_)));
}

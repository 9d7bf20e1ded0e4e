//! Testing utilities and assertion helpers.
//!
//! Assertions run over the deliveries captured by a
//! [`LocalTransport`](crate::providers::LocalTransport). Each failure message
//! lists what was actually delivered.
//!
//! # Example
//!
//! ```rust,ignore
//! use mandrill_mailer::providers::LocalTransport;
//! use mandrill_mailer::testing::*;
//!
//! #[tokio::test]
//! async fn test_invitation_flow() {
//!     let transport = LocalTransport::new();
//!
//!     // ... trigger the send ...
//!
//!     assert_delivery_count(&transport, 1);
//!     assert_delivered_to(&transport, "user@example.com");
//!     assert_template(&transport, "invitation");
//!     assert_merge_var(&transport, "FNAME", "Ann");
//!     assert_merge_var_content(&transport, "user@example.com");
//!     assert_subject_matches(&transport, r"^Welcome, .+!$");
//! }
//! ```

use regex::Regex;
use serde_json::Value;

use crate::providers::LocalTransport;
use crate::storage::StoredDelivery;

// ============================================================================
// Helper Functions
// ============================================================================

/// Format captured deliveries for failure messages.
fn format_summary(deliveries: &[StoredDelivery]) -> String {
    if deliveries.is_empty() {
        return "  (nothing delivered)".to_string();
    }

    deliveries
        .iter()
        .enumerate()
        .map(|(i, stored)| {
            let d = &stored.delivery;
            format!(
                "  {}. To: [{}], From: {}, Subject: \"{}\", Template: {}",
                i + 1,
                d.message.to_emails().join(", "),
                d.message.from_email().unwrap_or("<none>"),
                d.message.subject().unwrap_or_default(),
                d.template_name.as_deref().unwrap_or("<none>")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("Invalid regex '{}': {}", pattern, e))
}

// ============================================================================
// Counting
// ============================================================================

/// Assert that at least one delivery was made.
///
/// # Panics
///
/// Panics if nothing was delivered.
pub fn assert_delivered(transport: &LocalTransport) {
    assert!(
        transport.has_deliveries(),
        "Expected at least one delivery, but nothing was delivered"
    );
}

/// Assert that nothing was delivered.
pub fn assert_no_deliveries(transport: &LocalTransport) {
    let deliveries = transport.deliveries();
    assert!(
        deliveries.is_empty(),
        "Expected no deliveries, but {} were made.\n\nDelivered:\n{}",
        deliveries.len(),
        format_summary(&deliveries)
    );
}

/// Assert that exactly N deliveries were made.
pub fn assert_delivery_count(transport: &LocalTransport, expected: usize) {
    let actual = transport.delivery_count();
    assert!(
        actual == expected,
        "Expected {} delivery(ies), but {} were made.\n\nDelivered:\n{}",
        expected,
        actual,
        format_summary(&transport.deliveries())
    );
}

// ============================================================================
// Recipients and Sender
// ============================================================================

/// Assert that a delivery went to `email` (case-insensitive).
pub fn assert_delivered_to(transport: &LocalTransport, email: &str) {
    assert!(
        transport.sent_to(email),
        "Expected a delivery to '{}'.\n\nDelivered:\n{}",
        email,
        format_summary(&transport.deliveries())
    );
}

/// Assert that no delivery went to `email`.
pub fn refute_delivered_to(transport: &LocalTransport, email: &str) {
    assert!(
        !transport.sent_to(email),
        "Expected no delivery to '{}', but found one.\n\nDelivered:\n{}",
        email,
        format_summary(&transport.deliveries())
    );
}

/// Assert that the most recent delivery was sent from `email`.
pub fn assert_from(transport: &LocalTransport, email: &str) {
    let last = last_delivery(transport);
    let actual = last.delivery.message.from_email();
    assert!(
        actual == Some(email),
        "Expected the last delivery to be from '{}', got {:?}",
        email,
        actual
    );
}

// ============================================================================
// Subject and Template
// ============================================================================

/// Assert that a delivery has exactly this subject.
pub fn assert_subject(transport: &LocalTransport, subject: &str) {
    let deliveries = transport.deliveries();
    let found = deliveries
        .iter()
        .any(|stored| stored.delivery.message.subject() == Some(subject));
    assert!(
        found,
        "Expected a delivery with subject '{}'.\n\nDelivered:\n{}",
        subject,
        format_summary(&deliveries)
    );
}

/// Assert that a delivery's subject matches a regex.
///
/// # Panics
///
/// Panics if the pattern is invalid or nothing matches.
pub fn assert_subject_matches(transport: &LocalTransport, pattern: &str) {
    let re = compile(pattern);
    let deliveries = transport.deliveries();
    let found = deliveries.iter().any(|stored| {
        stored
            .delivery
            .message
            .subject()
            .map(|s| re.is_match(s))
            .unwrap_or(false)
    });
    assert!(
        found,
        "Expected a delivery with subject matching /{}/.\n\nDelivered:\n{}",
        pattern,
        format_summary(&deliveries)
    );
}

/// Assert that a delivery used the named template.
pub fn assert_template(transport: &LocalTransport, template: &str) {
    assert!(
        transport.sent_with_template(template),
        "Expected a delivery of template '{}'.\n\nDelivered:\n{}",
        template,
        format_summary(&transport.deliveries())
    );
}

// ============================================================================
// Merge Vars
// ============================================================================

/// Assert that the most recent delivery has a global merge var with this value.
pub fn assert_merge_var(transport: &LocalTransport, name: &str, expected: impl Into<Value>) {
    let expected = expected.into();
    let last = last_delivery(transport);
    let actual = last.delivery.message.merge_var(name);
    assert!(
        actual.as_ref() == Some(&expected),
        "Expected merge var {} = {}, got {:?}.\n\nMerge vars: {:?}",
        name,
        expected,
        actual,
        last.delivery.message.global_merge_vars()
    );
}

/// Assert that the most recent delivery's `CONTENT` merge var contains `text`.
pub fn assert_merge_var_content(transport: &LocalTransport, text: &str) {
    let last = last_delivery(transport);
    let content = last.delivery.message.merge_var("CONTENT");
    let found = match &content {
        Some(Value::String(s)) => s.contains(text),
        Some(other) => other.to_string().contains(text),
        None => false,
    };
    assert!(
        found,
        "Expected merge var CONTENT to include '{}', got {:?}",
        text,
        content
    );
}

// ============================================================================
// Retrieval
// ============================================================================

/// The most recent delivery.
///
/// # Panics
///
/// Panics if nothing was delivered.
pub fn last_delivery(transport: &LocalTransport) -> StoredDelivery {
    transport
        .last_delivery()
        .unwrap_or_else(|| panic!("Expected a delivery, but nothing was delivered"))
}

/// Deliveries addressed to `email`.
pub fn deliveries_to(transport: &LocalTransport, email: &str) -> Vec<StoredDelivery> {
    transport.find_deliveries(|d| {
        d.message
            .to_emails()
            .iter()
            .any(|to| to.eq_ignore_ascii_case(email))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{Delivery, Transport};
    use crate::message::Message;
    use serde_json::json;

    async fn transport_with_one() -> LocalTransport {
        let mut message = Message::new();
        message.insert("subject", "Welcome, Ann!");
        message.insert("from_email", "team@example.com");
        message.insert("to", json!([{"email": "ann@example.com", "name": "Ann"}]));
        message.insert(
            "global_merge_vars",
            json!([
                {"name": "FNAME", "content": "Ann"},
                {"name": "CONTENT", "content": "Hello ann@example.com"}
            ]),
        );
        let transport = LocalTransport::new();
        transport
            .send(&Delivery::message(message).template("welcome", vec![]))
            .await
            .unwrap();
        transport
    }

    #[tokio::test]
    async fn test_passing_assertions() {
        let transport = transport_with_one().await;
        assert_delivered(&transport);
        assert_delivery_count(&transport, 1);
        assert_delivered_to(&transport, "ANN@example.com");
        refute_delivered_to(&transport, "bob@example.com");
        assert_from(&transport, "team@example.com");
        assert_subject(&transport, "Welcome, Ann!");
        assert_subject_matches(&transport, r"^Welcome, \w+!$");
        assert_template(&transport, "welcome");
        assert_merge_var(&transport, "FNAME", "Ann");
        assert_merge_var_content(&transport, "ann@example.com");
        assert_eq!(deliveries_to(&transport, "ann@example.com").len(), 1);
    }

    #[test]
    fn test_no_deliveries() {
        assert_no_deliveries(&LocalTransport::new());
    }

    #[tokio::test]
    #[should_panic(expected = "Expected a delivery of template 'goodbye'")]
    async fn test_wrong_template_panics() {
        let transport = transport_with_one().await;
        assert_template(&transport, "goodbye");
    }

    #[test]
    #[should_panic(expected = "nothing was delivered")]
    fn test_last_delivery_panics_when_empty() {
        last_delivery(&LocalTransport::new());
    }
}

//! Local transport for development and testing.
//!
//! Captures deliveries in memory instead of sending them, for programmatic
//! assertions in tests.
//!
//! ```rust,ignore
//! use mandrill_mailer::providers::LocalTransport;
//! use mandrill_mailer::testing::*;
//!
//! #[tokio::test]
//! async fn test_sends_invitation() {
//!     let transport = LocalTransport::new();
//!
//!     // Code under test
//!     invite(&transport, "user@example.com").await;
//!
//!     assert_delivery_count(&transport, 1);
//!     assert_delivered_to(&transport, "user@example.com");
//!     assert_template(&transport, "invitation");
//! }
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::delivery::{Delivery, DeliveryResult, Transport};
use crate::error::MailError;
use crate::storage::{MemoryStorage, Storage, StoredDelivery};

/// Transport that stores deliveries in memory.
pub struct LocalTransport {
    storage: Arc<MemoryStorage>,
    /// If set, send() returns this error (for testing error paths).
    fail_with: RwLock<Option<String>>,
}

impl LocalTransport {
    /// Create a local transport with fresh storage.
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::shared())
    }

    /// Create a local transport over existing storage.
    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        Self {
            storage,
            fail_with: RwLock::new(None),
        }
    }

    pub fn storage(&self) -> Arc<MemoryStorage> {
        Arc::clone(&self.storage)
    }

    // =========================================================================
    // Failure Simulation
    // =========================================================================

    /// Make every send fail with `message` until cleared.
    pub fn set_failure(&self, message: impl Into<String>) {
        *self.fail_with.write() = Some(message.into());
    }

    pub fn clear_failure(&self) {
        *self.fail_with.write() = None;
    }

    // =========================================================================
    // Delivery Access
    // =========================================================================

    /// All captured deliveries (newest first).
    pub fn deliveries(&self) -> Vec<StoredDelivery> {
        self.storage.all()
    }

    pub fn last_delivery(&self) -> Option<StoredDelivery> {
        self.storage.all().into_iter().next()
    }

    pub fn delivery_count(&self) -> usize {
        self.storage.count()
    }

    pub fn has_deliveries(&self) -> bool {
        self.storage.count() > 0
    }

    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Remove and return all captured deliveries.
    pub fn flush(&self) -> Vec<StoredDelivery> {
        self.storage.flush()
    }

    // =========================================================================
    // Query Helpers
    // =========================================================================

    /// Whether any delivery went to `email` (case-insensitive).
    pub fn sent_to(&self, email: &str) -> bool {
        self.storage.all().iter().any(|stored| {
            stored
                .delivery
                .message
                .to_emails()
                .iter()
                .any(|to| to.eq_ignore_ascii_case(email))
        })
    }

    pub fn sent_with_template(&self, template: &str) -> bool {
        self.storage
            .all()
            .iter()
            .any(|stored| stored.delivery.template_name.as_deref() == Some(template))
    }

    pub fn find_deliveries<F>(&self, predicate: F) -> Vec<StoredDelivery>
    where
        F: Fn(&Delivery) -> bool,
    {
        self.storage
            .all()
            .into_iter()
            .filter(|stored| predicate(&stored.delivery))
            .collect()
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LocalTransport {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            fail_with: RwLock::new(self.fail_with.read().clone()),
        }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, delivery: &Delivery) -> Result<DeliveryResult, MailError> {
        if let Some(message) = self.fail_with.read().clone() {
            return Err(MailError::provider("local", message));
        }

        let message_id = self.storage.push(delivery.clone());
        Ok(DeliveryResult::new(message_id))
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}

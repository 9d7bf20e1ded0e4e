//! Storage trait and in-memory implementation for captured deliveries.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::delivery::Delivery;

/// A captured delivery with metadata.
#[derive(Debug, Clone)]
pub struct StoredDelivery {
    /// Unique identifier for this delivery.
    pub id: String,
    pub delivery: Delivery,
    /// When the delivery was captured.
    pub sent_at: DateTime<Utc>,
}

/// Trait for delivery storage backends.
pub trait Storage: Send + Sync {
    /// Store a delivery and return its ID.
    fn push(&self, delivery: Delivery) -> String;

    /// Pop and return the most recent delivery.
    fn pop(&self) -> Option<StoredDelivery>;

    fn get(&self, id: &str) -> Option<StoredDelivery>;

    /// All stored deliveries, newest first.
    fn all(&self) -> Vec<StoredDelivery>;

    fn delete(&self, id: &str) -> bool;

    fn clear(&self);

    fn count(&self) -> usize;

    /// Remove and return all stored deliveries, newest first.
    fn flush(&self) -> Vec<StoredDelivery>;
}

/// Thread-safe in-memory storage.
///
/// Used by [`LocalTransport`](crate::providers::LocalTransport).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    deliveries: HashMap<String, StoredDelivery>,
    /// Insertion order of IDs.
    order: Vec<String>,
}

impl Inner {
    fn newest_first(&self) -> Vec<StoredDelivery> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.deliveries.get(id).cloned())
            .collect()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage wrapped in an Arc for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Storage for MemoryStorage {
    fn push(&self, delivery: Delivery) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let stored = StoredDelivery {
            id: id.clone(),
            delivery,
            sent_at: Utc::now(),
        };

        let mut inner = self.inner.write();
        inner.deliveries.insert(id.clone(), stored);
        inner.order.push(id.clone());
        id
    }

    fn pop(&self) -> Option<StoredDelivery> {
        let mut inner = self.inner.write();
        let id = inner.order.pop()?;
        inner.deliveries.remove(&id)
    }

    fn get(&self, id: &str) -> Option<StoredDelivery> {
        self.inner.read().deliveries.get(id).cloned()
    }

    fn all(&self) -> Vec<StoredDelivery> {
        self.inner.read().newest_first()
    }

    fn delete(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.deliveries.remove(id).is_some() {
            inner.order.retain(|x| x != id);
            true
        } else {
            false
        }
    }

    fn clear(&self) {
        let mut inner = self.inner.write();
        inner.deliveries.clear();
        inner.order.clear();
    }

    fn count(&self) -> usize {
        self.inner.read().deliveries.len()
    }

    fn flush(&self) -> Vec<StoredDelivery> {
        let mut inner = self.inner.write();
        let result = inner.newest_first();
        inner.deliveries.clear();
        inner.order.clear();
        result
    }
}

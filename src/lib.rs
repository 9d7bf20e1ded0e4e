//! # Mandrill Mailer
//!
//! Turn loosely-typed email arguments into canonical Mandrill message payloads.
//!
//! ## Quick Start
//!
//! Declare a mailer class with its defaults once:
//! ```rust
//! use mandrill_mailer::MailerClass;
//!
//! let invitations = MailerClass::new("InvitationMailer");
//! invitations.default("from", "invites@example.com");
//! invitations.default("from_name", "Example Invitations");
//! ```
//!
//! Then build and send messages from anywhere:
//! ```rust,ignore
//! use mandrill_mailer::{Mailer, MessageArgs, TemplateMailer};
//!
//! let mailer = TemplateMailer::new(&invitations).mandrill_mail(
//!     MessageArgs::new()
//!         .template("invitation")
//!         .subject("You're invited")
//!         .to(("Ann", "ann@example.com"))
//!         .var("EVENT", "Launch party"),
//! )?;
//!
//! mailer.deliver(&transport).await?;
//! ```
//!
//! The crate does no network I/O. Sending goes through a [`Transport`] you
//! supply (or [`providers::LocalTransport`] in tests), and deferred sends
//! through a [`DeferredQueue`].
//!
//! ## Assembly Without a Mailer
//!
//! ```rust
//! use mandrill_mailer::{assemble, Defaults, MessageArgs};
//!
//! let message = assemble(&MessageArgs::new().subject("Hi"), &Defaults::root()).unwrap();
//! assert_eq!(message.from_email(), Some("example@email.com"));
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `MANDRILL_API_KEY` | API key placed in the `key` field of API payloads |
//! | `MANDRILL_DEFAULT_URL_HOST` | Host merged into generated URLs |
//! | `MANDRILL_DEFAULT_URL_PROTOCOL` | Protocol merged into generated URLs |
//!
//! ## Feature Flags
//!
//! - `local` (default) - [`providers::LocalTransport`] and the [`testing`] helpers
//! - `metrics` - Prometheus-style metrics (counters/histograms)
//!
//! ## Metrics
//!
//! Enable `features = ["metrics"]` to emit:
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `mandrill_deliveries_total` | Counter | transport, status | Total deliveries |
//! | `mandrill_delivery_duration_seconds` | Histogram | transport | Delivery duration |
//!
//! Install a recorder (e.g., `metrics-exporter-prometheus`) in your app to collect them.

/// The version of the mandrill-mailer crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod address;
mod args;
mod attachment;
mod config;
mod defaults;
mod delivery;
mod error;
mod format;
mod interceptor;
mod mailers;
mod message;
mod url;

pub mod providers;

#[cfg(feature = "local")]
mod storage;

#[cfg(feature = "local")]
pub mod testing;

use parking_lot::RwLock;
use std::sync::Arc;

// Re-exports
pub use address::{normalize_recipients, Recipient, RecipientSpec, Recipients, ToRecipient};
pub use args::MessageArgs;
pub use attachment::{to_attachments, to_images, AttachmentSpec, EncodedAttachment, RawContent};
pub use config::{Config, UrlOptions};
pub use defaults::{Defaults, Fixture, MailerClass, TestOptions, FALLBACK_FROM};
pub use delivery::{
    deliver_later_with, deliver_with, perform_job, DeferredQueue, Delivery, DeliveryResult,
    JobOptions, Transport, SEND_AT_FORMAT,
};
pub use error::MailError;
pub use format::{
    to_boolean, to_merge_vars, to_recipient_merge_vars, to_recipient_metadata, MergeVar,
    MergeVarSet, RecipientMergeVars, RecipientMetadata,
};
pub use interceptor::{apply_interceptor, Interceptor};
pub use mailers::{Mailer, MailerState, MessageMailer, TemplateMailer};
pub use message::{assemble, Message, ACCEPTED_MERGE_LANGUAGES};
pub use url::{RouteTable, UrlResolver};

#[cfg(feature = "local")]
pub use storage::{MemoryStorage, Storage, StoredDelivery};

// ============================================================================
// Global Configuration
// ============================================================================

/// Global config - swappable for testing
static CONFIG: RwLock<Option<Arc<Config>>> = RwLock::new(None);

/// The process-wide configuration.
///
/// Read from `MANDRILL_*` environment variables on first use unless
/// [`configure`] ran first.
pub fn config() -> Arc<Config> {
    if let Some(config) = CONFIG.read().as_ref() {
        return Arc::clone(config);
    }

    let mut guard = CONFIG.write();
    let config = guard.get_or_insert_with(|| {
        tracing::debug!("Loading mailer configuration from environment");
        Arc::new(Config::from_env())
    });
    Arc::clone(config)
}

/// Replace the process-wide configuration.
///
/// ```rust
/// use mandrill_mailer::{configure, Config};
///
/// configure(Config::new().api_key("md-xxxx"));
/// ```
pub fn configure(config: Config) {
    let mut guard = CONFIG.write();
    *guard = Some(Arc::new(config));
}

/// Update the process-wide configuration in place.
///
/// ```rust
/// use mandrill_mailer::configure_with;
/// use serde_json::json;
///
/// configure_with(|config| {
///     config.interceptor_params = Some(json!({"to": "qa@example.com"}));
/// });
/// ```
pub fn configure_with<F: FnOnce(&mut Config)>(update: F) {
    let mut guard = CONFIG.write();
    let mut config = match guard.as_deref() {
        Some(current) => current.clone(),
        None => Config::from_env(),
    };
    update(&mut config);
    *guard = Some(Arc::new(config));
}

/// Reset the global config (useful for tests).
///
/// The next [`config`] call re-reads the environment.
pub fn reset() {
    let mut guard = CONFIG.write();
    *guard = None;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::Config;
    pub use crate::Delivery;
    pub use crate::DeliveryResult;
    pub use crate::MailError;
    pub use crate::Mailer;
    pub use crate::MailerClass;
    pub use crate::MessageArgs;
    pub use crate::Recipient;
    pub use crate::ToRecipient;
    pub use crate::Transport;
    pub use crate::{configure, configure_with, deliver_with};
    pub use crate::{MessageMailer, TemplateMailer};

    #[cfg(feature = "local")]
    pub use crate::Storage;
}

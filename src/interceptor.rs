//! Message interceptors for rewriting payloads before hand-off.
//!
//! An interceptor sees every assembled message. Use it in test or staging
//! environments to redirect recipients or tag outgoing mail.
//!
//! Two forms are supported, and exactly one may be configured:
//!
//! - a transform ([`Config::interceptor`]) that mutates the message in place;
//! - a static overlay ([`Config::interceptor_params`]) whose keys replace the
//!   message's keys.
//!
//! # Example
//!
//! ```rust
//! use mandrill_mailer::{Config, Message};
//!
//! let config = Config::new().interceptor(|message: &mut Message| {
//!     message.insert("subaccount", "staging");
//! });
//! ```

use serde_json::Value;

use crate::config::Config;
use crate::error::MailError;
use crate::message::Message;

/// A trait for rewriting messages after assembly.
///
/// For simple cases, use a closure:
///
/// ```rust,ignore
/// Config::new().interceptor(|message: &mut Message| {
///     message.insert("to", json!([{"email": "qa@example.com"}]));
/// })
/// ```
///
/// For complex logic, implement the trait on a struct:
///
/// ```rust,ignore
/// struct TagEnvironment { env: String }
///
/// impl Interceptor for TagEnvironment {
///     fn intercept(&self, message: &mut Message) {
///         message.insert("tags", json!([self.env]));
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync {
    /// Mutate the message in place.
    fn intercept(&self, message: &mut Message);
}

impl<F> Interceptor for F
where
    F: Fn(&mut Message) + Send + Sync,
{
    fn intercept(&self, message: &mut Message) {
        (self)(message)
    }
}

/// Run the configured interceptor, if any, over an assembled message.
///
/// # Errors
///
/// `InvalidInterceptorConfig` when both forms are configured, or when the
/// overlay is not a JSON object. Both are only detected here, at use time.
pub fn apply_interceptor(mut message: Message, config: &Config) -> Result<Message, MailError> {
    let params = match &config.interceptor_params {
        None | Some(Value::Null) => None,
        Some(params) => Some(params),
    };

    match (&config.interceptor, params) {
        (None, None) => Ok(message),
        (Some(_), Some(_)) => Err(MailError::InvalidInterceptorConfig(
            "configure either `interceptor` or `interceptor_params`, not both".into(),
        )),
        (Some(interceptor), None) => {
            interceptor.intercept(&mut message);
            tracing::debug!("Applied message interceptor");
            Ok(message)
        }
        (None, Some(Value::Object(overlay))) => {
            message.merge(overlay);
            tracing::debug!(keys = overlay.len(), "Applied interceptor params");
            Ok(message)
        }
        (None, Some(other)) => Err(MailError::InvalidInterceptorConfig(format!(
            "`interceptor_params` must be a mapping, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}

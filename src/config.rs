//! Configuration surface read at assembly time.
//!
//! ## Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `MANDRILL_API_KEY` | API key placed in the `key` field of API payloads |
//! | `MANDRILL_DEFAULT_URL_HOST` | Host merged into generated URLs |
//! | `MANDRILL_DEFAULT_URL_PROTOCOL` | Protocol merged into generated URLs |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fmt;
use std::sync::Arc;

use crate::interceptor::Interceptor;

/// Host and protocol merged into every URL a mailer generates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlOptions {
    pub host: Option<String>,
    pub protocol: Option<String>,
}

impl UrlOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            protocol: None,
        }
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }
}

/// Process-wide mailer configuration.
///
/// At most one of `interceptor` and `interceptor_params` may be set. This is
/// checked when a message is assembled, not here.
///
/// ```
/// use mandrill_mailer::Config;
/// use serde_json::json;
///
/// let config = Config::new()
///     .api_key("md-xxxx")
///     .interceptor_params(json!({"to": "qa@example.com"}));
/// ```
#[derive(Clone, Default)]
pub struct Config {
    /// API key; empty when unset.
    pub api_key: String,
    pub default_url_options: UrlOptions,
    /// Transform applied to every assembled message.
    pub interceptor: Option<Arc<dyn Interceptor>>,
    /// Overlay merged on top of every assembled message. Must be a JSON object.
    pub interceptor_params: Option<Value>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from `MANDRILL_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("MANDRILL_API_KEY").unwrap_or_default(),
            default_url_options: UrlOptions {
                host: env::var("MANDRILL_DEFAULT_URL_HOST").ok(),
                protocol: env::var("MANDRILL_DEFAULT_URL_PROTOCOL").ok(),
            },
            interceptor: None,
            interceptor_params: None,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn default_url_options(mut self, options: UrlOptions) -> Self {
        self.default_url_options = options;
        self
    }

    /// Install a transform run on every assembled message.
    pub fn interceptor<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptor = Some(Arc::new(interceptor));
        self
    }

    /// Install an overlay merged over every assembled message.
    pub fn interceptor_params(mut self, params: impl Into<Value>) -> Self {
        self.interceptor_params = Some(params.into());
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("default_url_options", &self.default_url_options)
            .field("interceptor", &self.interceptor.as_ref().map(|_| "<fn>"))
            .field("interceptor_params", &self.interceptor_params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let config = Config::new()
            .api_key("secret")
            .default_url_options(UrlOptions::new("example.com").protocol("https"))
            .interceptor_params(json!({"subaccount": "staging"}));

        assert_eq!(config.api_key, "secret");
        assert_eq!(config.default_url_options.host.as_deref(), Some("example.com"));
        assert_eq!(config.default_url_options.protocol.as_deref(), Some("https"));
        assert!(config.interceptor.is_none());
        assert_eq!(config.interceptor_params, Some(json!({"subaccount": "staging"})));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::new().api_key("secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_default_api_key_is_empty() {
        assert_eq!(Config::default().api_key, "");
    }
}

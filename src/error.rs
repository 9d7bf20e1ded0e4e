//! Error types for mandrill-mailer.

use thiserror::Error;

/// Errors that can occur while assembling or handing off a message.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// `merge_language` is not one of the languages the API accepts.
    #[error("Invalid merge language `{0}`, value must be one of: mailchimp, handlebars")]
    InvalidMergeLanguage(String),

    /// The global interceptor configuration is unusable.
    ///
    /// Raised when a message is assembled, not when the configuration is set.
    #[error("Invalid interceptor configuration: {0}")]
    InvalidInterceptorConfig(String),

    /// Attachment or image entry supplies neither raw nor pre-encoded content.
    #[error("Malformed attachment: {0}")]
    MalformedAttachment(String),

    /// No test setup was registered under this mailer method name.
    #[error("The mailer method `{0}` does not have test setup")]
    MissingTestFixture(String),

    /// Missing required field or option.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid email address format.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Configuration error (missing env var, invalid value, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error sending the message.
    #[error("Send error: {0}")]
    SendError(String),

    /// Transport-specific error with details.
    #[error("Provider error ({provider}): {message}")]
    ProviderError {
        provider: &'static str,
        message: String,
        /// Optional HTTP status code
        status: Option<u16>,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(String),
}

impl MailError {
    /// Create a provider-specific error.
    ///
    /// For [`Transport`](crate::Transport) implementations reporting a
    /// rejected send.
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider,
            message: message.into(),
            status: None,
        }
    }
}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

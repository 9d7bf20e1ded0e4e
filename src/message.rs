//! The canonical message and the assembler that produces it.
//!
//! [`assemble`] merges caller arguments with the resolved mailer defaults and
//! emits every key of the API's message schema. Keys the caller did not supply
//! are present as `null` unless a default applies. Caller keys outside the
//! schema are dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::address::normalize_recipients;
use crate::args::MessageArgs;
use crate::attachment::{to_attachments, to_images};
use crate::defaults::{Defaults, FALLBACK_FROM};
use crate::error::MailError;
use crate::format::{
    to_boolean, to_merge_vars, to_recipient_merge_vars, to_recipient_metadata, MergeVar,
};

/// Values accepted for `merge_language`.
pub const ACCEPTED_MERGE_LANGUAGES: [&str; 2] = ["mailchimp", "handlebars"];

/// A fully normalized message, ready for the transport.
///
/// Kept as an ordered JSON object so interceptors can replace any key with any
/// shape, exactly as the API would receive it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Shallow merge: every key of `overlay` replaces the message's key.
    pub fn merge(&mut self, overlay: &Map<String, Value>) {
        for (key, value) in overlay {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn subject(&self) -> Option<&str> {
        self.get("subject").and_then(Value::as_str)
    }

    pub fn from_email(&self) -> Option<&str> {
        self.get("from_email").and_then(Value::as_str)
    }

    pub fn from_name(&self) -> Option<&str> {
        self.get("from_name").and_then(Value::as_str)
    }

    /// The `to` value; normally a recipient list, but interceptors may replace it.
    pub fn to(&self) -> Option<&Value> {
        self.get("to")
    }

    /// Addresses in `to`, whether it holds a recipient list or a bare string.
    pub fn to_emails(&self) -> Vec<&str> {
        match self.to() {
            Some(Value::String(email)) => vec![email.as_str()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(email) => Some(email.as_str()),
                    other => other.get("email").and_then(Value::as_str),
                })
                .collect(),
            Some(Value::Object(item)) => item
                .get("email")
                .and_then(Value::as_str)
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn bcc_address(&self) -> Option<&str> {
        self.get("bcc_address").and_then(Value::as_str)
    }

    /// Global merge variables, parsed back from their `{name, content}` form.
    pub fn global_merge_vars(&self) -> Vec<MergeVar> {
        self.get("global_merge_vars")
            .cloned()
            .and_then(|vars| serde_json::from_value(vars).ok())
            .unwrap_or_default()
    }

    /// Content of one global merge variable.
    pub fn merge_var(&self, name: &str) -> Option<Value> {
        self.global_merge_vars()
            .into_iter()
            .find(|var| var.name == name)
            .map(|var| var.content)
    }
}

impl From<Map<String, Value>> for Message {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Message> for Value {
    fn from(message: Message) -> Self {
        Value::Object(message.0)
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, MailError> {
    Ok(serde_json::to_value(value)?)
}

fn string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn string_or<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>, fallback: &str) -> Value {
    let chosen = candidates
        .into_iter()
        .flatten()
        .next()
        .unwrap_or(fallback);
    Value::String(chosen.to_string())
}

/// Flags whose absence means "on". An explicit `null` is still off.
fn flag_default_on(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(value) => to_boolean(Some(value)),
    }
}

/// Compile caller arguments and resolved defaults into the canonical message.
///
/// Precedence for every key is caller argument, then mailer default, then a
/// fixed literal.
///
/// Without a `to` argument the message's `to` is an empty list.
///
/// # Errors
///
/// - `InvalidMergeLanguage` when `merge_language` is set to anything but
///   `mailchimp` or `handlebars`.
/// - `MalformedAttachment` when an attachment or image carries no content.
///
/// ```
/// use mandrill_mailer::{assemble, Defaults, MessageArgs};
/// use serde_json::json;
///
/// let args = MessageArgs::new().subject("S").to("a@b.com").var("X", "1");
/// let message = assemble(&args, &Defaults::root()).unwrap();
///
/// assert_eq!(message.get("to"), Some(&json!([{"email": "a@b.com", "name": "a@b.com"}])));
/// assert_eq!(message.get("track_opens"), Some(&json!(true)));
/// ```
pub fn assemble(args: &MessageArgs, defaults: &Defaults) -> Result<Message, MailError> {
    if let Some(language) = &args.merge_language {
        if !ACCEPTED_MERGE_LANGUAGES.contains(&language.as_str()) {
            return Err(MailError::InvalidMergeLanguage(language.clone()));
        }
    }

    let to = args
        .to
        .as_ref()
        .map(normalize_recipients)
        .unwrap_or_default();

    let global_vars = args
        .vars
        .as_ref()
        .or(args.global_merge_vars.as_ref())
        .or(defaults.merge_vars());
    let recipient_vars = args.recipient_vars.as_ref().or(args.merge_vars.as_ref());
    let view_content_link = match &args.view_content_link {
        Some(value) if to_boolean(Some(value)) => Some(value),
        _ => defaults.view_content_link(),
    };

    let mut message = Message::new();
    message.insert("html", string(&args.html));
    message.insert("text", string(&args.text));
    message.insert("subject", string(&args.subject));
    message.insert(
        "from_email",
        string_or([args.from.as_deref(), defaults.from()], FALLBACK_FROM),
    );
    message.insert(
        "from_name",
        string_or(
            [
                args.from_name.as_deref(),
                args.from.as_deref(),
                defaults.from_name(),
                defaults.from(),
            ],
            FALLBACK_FROM,
        ),
    );
    message.insert("to", to_value(&to)?);
    message.insert("headers", to_value(&args.headers)?);
    message.insert("important", to_boolean(args.important.as_ref()));
    message.insert("track_opens", flag_default_on(args.track_opens.as_ref()));
    message.insert("track_clicks", flag_default_on(args.track_clicks.as_ref()));
    message.insert("auto_text", flag_default_on(args.auto_text.as_ref()));
    message.insert("auto_html", to_boolean(args.auto_html.as_ref()));
    message.insert("inline_css", to_boolean(args.inline_css.as_ref()));
    message.insert("url_strip_qs", flag_default_on(args.url_strip_qs.as_ref()));
    message.insert(
        "preserve_recipients",
        to_boolean(args.preserve_recipients.as_ref()),
    );
    message.insert("view_content_link", to_boolean(view_content_link));
    message.insert("bcc_address", string(&args.bcc));
    message.insert("tracking_domain", string(&args.tracking_domain));
    message.insert("signing_domain", string(&args.signing_domain));
    message.insert("return_path_domain", string(&args.return_path_domain));
    message.insert("merge", to_boolean(args.merge.as_ref()));
    message.insert("merge_language", string(&args.merge_language));
    message.insert("global_merge_vars", to_value(to_merge_vars(global_vars))?);
    message.insert(
        "merge_vars",
        to_value(to_recipient_merge_vars(recipient_vars.map(Vec::as_slice)))?,
    );
    message.insert("tags", to_value(&args.tags)?);
    message.insert("subaccount", string(&args.subaccount));
    message.insert(
        "google_analytics_domains",
        to_value(&args.google_analytics_domains)?,
    );
    message.insert(
        "google_analytics_campaign",
        string(&args.google_analytics_campaign),
    );
    message.insert("metadata", to_value(&args.metadata)?);
    message.insert(
        "recipient_metadata",
        to_value(to_recipient_metadata(args.recipient_metadata.as_deref()))?,
    );
    message.insert(
        "attachments",
        to_value(to_attachments(args.attachments.as_deref())?)?,
    );
    message.insert("images", to_value(to_images(args.images.as_deref())?)?);

    tracing::debug!(
        subject = ?args.subject,
        recipients = to.len(),
        "Assembled message"
    );

    Ok(message)
}

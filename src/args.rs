//! Caller arguments describing one message.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::address::{RecipientSpec, Recipients, ToRecipient};
use crate::attachment::AttachmentSpec;
use crate::error::MailError;
use crate::format::MergeVarSet;

/// Loosely-typed arguments for one message.
///
/// Build them in code:
///
/// ```
/// use mandrill_mailer::MessageArgs;
///
/// let args = MessageArgs::new()
///     .subject("Welcome!")
///     .to("user@example.com")
///     .to(("Second User", "second@example.com"))
///     .var("FNAME", "Ada")
///     .track_clicks(false);
/// ```
///
/// or deserialize them from JSON, where unknown keys are ignored:
///
/// ```
/// use mandrill_mailer::MessageArgs;
/// use serde_json::json;
///
/// let args = MessageArgs::from_value(json!({
///     "subject": "Welcome!",
///     "to": [{"email": "user@example.com", "name": "User"}],
///     "vars": {"FNAME": "Ada"},
///     "important": 1
/// })).unwrap();
/// ```
///
/// ## Fields
///
/// - `to` - a bare address, a `{email, name}` object, or a list of either
/// - `vars` / `global_merge_vars` - `{NAME: content}` applied to every recipient
/// - `recipient_vars` / `merge_vars` - `[{rcpt: {NAME: content}}]`
/// - `attachments`, `images` - see [`AttachmentSpec`]
/// - Flags (`important`, `track_opens`, ...) accept any JSON value and are
///   coerced with [`to_boolean`](crate::to_boolean). `track_opens`,
///   `track_clicks`, `auto_text` and `url_strip_qs` are on when the key is
///   absent; an explicit `null` turns them off.
/// - `headers`, `tags`, `metadata` and `google_analytics_domains` are
///   forwarded as given
/// - `template`, `template_content`, `async`, `ip_pool`, `send_at` - send
///   options, carried beside the message rather than inside it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageArgs {
    pub html: Option<String>,
    pub text: Option<String>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub from_name: Option<String>,
    pub to: Option<Recipients>,
    pub headers: Option<Value>,
    pub important: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub track_opens: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub track_clicks: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub auto_text: Option<Value>,
    pub auto_html: Option<Value>,
    pub inline_css: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub url_strip_qs: Option<Value>,
    pub preserve_recipients: Option<Value>,
    pub view_content_link: Option<Value>,
    pub bcc: Option<String>,
    pub tracking_domain: Option<String>,
    pub signing_domain: Option<String>,
    pub return_path_domain: Option<String>,
    pub merge: Option<Value>,
    pub merge_language: Option<String>,
    pub vars: Option<MergeVarSet>,
    pub global_merge_vars: Option<MergeVarSet>,
    pub recipient_vars: Option<Vec<MergeVarSet>>,
    pub merge_vars: Option<Vec<MergeVarSet>>,
    pub tags: Option<Value>,
    pub subaccount: Option<String>,
    pub google_analytics_domains: Option<Value>,
    pub google_analytics_campaign: Option<String>,
    pub metadata: Option<Value>,
    pub recipient_metadata: Option<Vec<MergeVarSet>>,
    pub attachments: Option<Vec<AttachmentSpec>>,
    pub images: Option<Vec<AttachmentSpec>>,

    /// Template slug, used by template sends only.
    pub template: Option<String>,
    /// `{region: html}` content injected into template regions.
    pub template_content: Option<MergeVarSet>,
    #[serde(rename = "async")]
    pub async_send: Option<Value>,
    pub ip_pool: Option<String>,
    pub send_at: Option<DateTime<Utc>>,
}

impl MessageArgs {
    /// Create empty arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse arguments from a JSON object.
    pub fn from_value(value: Value) -> Result<Self, MailError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the sender address.
    pub fn from(mut self, email: impl Into<String>) -> Self {
        self.from = Some(email.into());
        self
    }

    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    /// Add a recipient.
    ///
    /// Can be called multiple times. Accepts anything that implements
    /// [`ToRecipient`]: a bare address, a `(name, email)` tuple, a
    /// [`Recipient`](crate::Recipient), or your own types.
    pub fn to(mut self, recipient: impl ToRecipient) -> Self {
        let spec: RecipientSpec = recipient.to_recipient();
        self.to = Some(match self.to.take() {
            None => Recipients::One(spec),
            Some(existing) => existing.push(spec),
        });
        self
    }

    /// Replace all recipients.
    pub fn put_to(mut self, recipients: impl Into<Recipients>) -> Self {
        self.to = Some(recipients.into());
        self
    }

    pub fn bcc(mut self, email: impl Into<String>) -> Self {
        self.bcc = Some(email.into());
        self
    }

    /// Add a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        insert_into(&mut self.headers, name.into(), Value::String(value.into()));
        self
    }

    /// Add a global merge variable.
    pub fn var(mut self, name: impl Into<String>, content: impl Into<Value>) -> Self {
        self.vars
            .get_or_insert_with(Map::new)
            .insert(name.into(), content.into());
        self
    }

    /// Add merge variables for a single recipient.
    pub fn recipient_vars(mut self, rcpt: impl Into<String>, vars: MergeVarSet) -> Self {
        let mut entry = Map::new();
        entry.insert(rcpt.into(), Value::Object(vars));
        self.recipient_vars.get_or_insert_with(Vec::new).push(entry);
        self
    }

    /// Add opaque metadata for a single recipient.
    pub fn recipient_metadata(mut self, rcpt: impl Into<String>, values: impl Into<Value>) -> Self {
        let mut entry = Map::new();
        entry.insert(rcpt.into(), values.into());
        self.recipient_metadata
            .get_or_insert_with(Vec::new)
            .push(entry);
        self
    }

    pub fn important(mut self, value: impl Into<Value>) -> Self {
        self.important = Some(value.into());
        self
    }

    pub fn track_opens(mut self, value: impl Into<Value>) -> Self {
        self.track_opens = Some(value.into());
        self
    }

    pub fn track_clicks(mut self, value: impl Into<Value>) -> Self {
        self.track_clicks = Some(value.into());
        self
    }

    pub fn auto_text(mut self, value: impl Into<Value>) -> Self {
        self.auto_text = Some(value.into());
        self
    }

    pub fn auto_html(mut self, value: impl Into<Value>) -> Self {
        self.auto_html = Some(value.into());
        self
    }

    pub fn inline_css(mut self, value: impl Into<Value>) -> Self {
        self.inline_css = Some(value.into());
        self
    }

    pub fn url_strip_qs(mut self, value: impl Into<Value>) -> Self {
        self.url_strip_qs = Some(value.into());
        self
    }

    pub fn preserve_recipients(mut self, value: impl Into<Value>) -> Self {
        self.preserve_recipients = Some(value.into());
        self
    }

    pub fn view_content_link(mut self, value: impl Into<Value>) -> Self {
        self.view_content_link = Some(value.into());
        self
    }

    pub fn merge(mut self, value: impl Into<Value>) -> Self {
        self.merge = Some(value.into());
        self
    }

    /// `mailchimp` or `handlebars`; anything else fails assembly.
    pub fn merge_language(mut self, language: impl Into<String>) -> Self {
        self.merge_language = Some(language.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        push_onto(&mut self.tags, Value::String(tag.into()));
        self
    }

    pub fn subaccount(mut self, subaccount: impl Into<String>) -> Self {
        self.subaccount = Some(subaccount.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        insert_into(&mut self.metadata, key.into(), value.into());
        self
    }

    pub fn attachment(mut self, attachment: AttachmentSpec) -> Self {
        self.attachments
            .get_or_insert_with(Vec::new)
            .push(attachment);
        self
    }

    pub fn image(mut self, image: AttachmentSpec) -> Self {
        self.images.get_or_insert_with(Vec::new).push(image);
        self
    }

    /// Template to render; only read by template sends.
    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    /// Fill a template region.
    pub fn template_content(mut self, region: impl Into<String>, html: impl Into<Value>) -> Self {
        self.template_content
            .get_or_insert_with(Map::new)
            .insert(region.into(), html.into());
        self
    }

    /// Ask the API to queue the send on its side.
    pub fn async_send(mut self, async_send: bool) -> Self {
        self.async_send = Some(Value::Bool(async_send));
        self
    }

    pub fn ip_pool(mut self, pool: impl Into<String>) -> Self {
        self.ip_pool = Some(pool.into());
        self
    }

    /// Schedule the send. Any time zone is accepted and converted to UTC.
    pub fn send_at<Tz: TimeZone>(mut self, at: DateTime<Tz>) -> Self {
        self.send_at = Some(at.with_timezone(&Utc));
        self
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only a missing key is `None`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

// A non-object is replaced rather than merged into.
fn insert_into(slot: &mut Option<Value>, key: String, value: Value) {
    let mut map = match slot.take() {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    map.insert(key, value);
    *slot = Some(Value::Object(map));
}

fn push_onto(slot: &mut Option<Value>, item: Value) {
    let mut items = match slot.take() {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => Vec::new(),
        Some(single) => vec![single],
    };
    items.push(item);
    *slot = Some(Value::Array(items));
}

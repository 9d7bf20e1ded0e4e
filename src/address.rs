//! Recipient shapes and their normalization.

use crate::error::MailError;
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structured recipient as the API expects it.
///
/// # Examples
///
/// ```
/// use mandrill_mailer::Recipient;
///
/// let rcpt = Recipient::new("user@example.com");
/// assert_eq!(rcpt.email, "user@example.com");
/// assert_eq!(rcpt.name.as_deref(), Some("user@example.com"));
///
/// let rcpt = Recipient::with_name("Alice", "alice@example.com");
/// assert_eq!(rcpt.name.as_deref(), Some("Alice"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Email address (e.g., "alice@example.com"). Empty when the caller left it out.
    #[serde(default)]
    pub email: String,
    /// Display name. Bare addresses use the address itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Header the recipient lands in (`to`, `cc` or `bcc`); the API assumes `to`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Recipient {
    /// Create a recipient from a bare address; the name mirrors the address.
    ///
    /// Logs a warning if the address fails a basic sanity check. For strict
    /// validation, use [`Recipient::parse`] instead.
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        warn_if_suspicious(&email);
        Self {
            name: Some(email.clone()),
            email,
            kind: None,
        }
    }

    /// Create a recipient with a display name.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        warn_if_suspicious(&email);
        Self {
            email,
            name: Some(name.into()),
            kind: None,
        }
    }

    /// Set the recipient header type (`to`, `cc` or `bcc`).
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Parse and validate an email address.
    ///
    /// Uses RFC 5321/5322 compliant validation.
    ///
    /// ```
    /// use mandrill_mailer::Recipient;
    ///
    /// assert!(Recipient::parse("user@example.com").is_ok());
    /// assert!(Recipient::parse("not-an-email").is_err());
    /// ```
    pub fn parse(email: &str) -> Result<Self, MailError> {
        if !EmailAddress::is_valid(email) {
            return Err(MailError::InvalidAddress(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
        Ok(Self {
            email: email.to_string(),
            name: Some(email.to_string()),
            kind: None,
        })
    }

    /// Format as "Name <email>", or just "email" when the name is the address.
    pub fn formatted(&self) -> String {
        match &self.name {
            Some(name) if name.is_empty() || *name == self.email => self.email.clone(),
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

fn warn_if_suspicious(email: &str) {
    if email.is_empty() || !email.contains('@') {
        tracing::warn!(
            email = %email,
            "Creating recipient with potentially invalid email. Use Recipient::parse() for strict validation."
        );
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

/// One recipient as a caller may supply it: a bare address or a structured pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipientSpec {
    /// `"user@example.com"`
    Address(String),
    /// `{"email": "user@example.com", "name": "User"}`
    Structured(Recipient),
}

impl RecipientSpec {
    /// Normalize into a structured recipient.
    ///
    /// Structured input passes through unchanged.
    pub fn into_recipient(self) -> Recipient {
        match self {
            Self::Address(email) => Recipient::new(email),
            Self::Structured(rcpt) => rcpt,
        }
    }
}

/// The `to` argument: a single recipient or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(RecipientSpec),
    Many(Vec<RecipientSpec>),
}

impl Recipients {
    /// Append a recipient, promoting a single value into a list.
    pub fn push(self, spec: RecipientSpec) -> Self {
        match self {
            Self::One(first) => Self::Many(vec![first, spec]),
            Self::Many(mut all) => {
                all.push(spec);
                Self::Many(all)
            }
        }
    }
}

/// Normalize any accepted recipient shape into an ordered list of `{email, name}`.
///
/// ```
/// use mandrill_mailer::{normalize_recipients, Recipient, Recipients};
///
/// let to: Recipients = "a@b.com".into();
/// assert_eq!(normalize_recipients(&to), vec![Recipient::new("a@b.com")]);
/// ```
pub fn normalize_recipients(recipients: &Recipients) -> Vec<Recipient> {
    match recipients {
        Recipients::One(spec) => vec![spec.clone().into_recipient()],
        Recipients::Many(specs) => specs
            .iter()
            .cloned()
            .map(RecipientSpec::into_recipient)
            .collect(),
    }
}

impl From<&str> for RecipientSpec {
    fn from(email: &str) -> Self {
        Self::Address(email.to_string())
    }
}

impl From<String> for RecipientSpec {
    fn from(email: String) -> Self {
        Self::Address(email)
    }
}

impl From<Recipient> for RecipientSpec {
    fn from(rcpt: Recipient) -> Self {
        Self::Structured(rcpt)
    }
}

// From tuple (name, email)
impl From<(&str, &str)> for RecipientSpec {
    fn from((name, email): (&str, &str)) -> Self {
        Self::Structured(Recipient::with_name(name, email))
    }
}

impl From<RecipientSpec> for Recipients {
    fn from(spec: RecipientSpec) -> Self {
        Self::One(spec)
    }
}

impl From<&str> for Recipients {
    fn from(email: &str) -> Self {
        Self::One(email.into())
    }
}

impl From<String> for Recipients {
    fn from(email: String) -> Self {
        Self::One(email.into())
    }
}

impl From<Recipient> for Recipients {
    fn from(rcpt: Recipient) -> Self {
        Self::One(rcpt.into())
    }
}

impl<T: Into<RecipientSpec>> From<Vec<T>> for Recipients {
    fn from(specs: Vec<T>) -> Self {
        specs.into_iter().collect()
    }
}

impl<T: Into<RecipientSpec>> FromIterator<T> for Recipients {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::Many(iter.into_iter().map(Into::into).collect())
    }
}

/// Trait for types that can act as a message recipient.
///
/// Implement this for your own types to pass them straight to
/// [`MessageArgs::to`](crate::MessageArgs::to).
///
/// ```rust
/// use mandrill_mailer::{Recipient, RecipientSpec, ToRecipient};
///
/// struct User {
///     name: String,
///     email: String,
/// }
///
/// impl ToRecipient for User {
///     fn to_recipient(&self) -> RecipientSpec {
///         Recipient::with_name(&self.name, &self.email).into()
///     }
/// }
/// ```
pub trait ToRecipient {
    fn to_recipient(&self) -> RecipientSpec;
}

impl<T: ToRecipient + ?Sized> ToRecipient for &T {
    fn to_recipient(&self) -> RecipientSpec {
        (*self).to_recipient()
    }
}

impl ToRecipient for Recipient {
    fn to_recipient(&self) -> RecipientSpec {
        RecipientSpec::Structured(self.clone())
    }
}

impl ToRecipient for RecipientSpec {
    fn to_recipient(&self) -> RecipientSpec {
        self.clone()
    }
}

impl ToRecipient for str {
    fn to_recipient(&self) -> RecipientSpec {
        RecipientSpec::Address(self.to_string())
    }
}

impl ToRecipient for String {
    fn to_recipient(&self) -> RecipientSpec {
        RecipientSpec::Address(self.clone())
    }
}

impl<N: AsRef<str>, E: AsRef<str>> ToRecipient for (N, E) {
    fn to_recipient(&self) -> RecipientSpec {
        RecipientSpec::Structured(Recipient::with_name(self.0.as_ref(), self.1.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_string_mirrors_name() {
        let to: Recipients = "a@b.com".into();
        let rcpts = normalize_recipients(&to);
        assert_eq!(rcpts.len(), 1);
        assert_eq!(rcpts[0].email, "a@b.com");
        assert_eq!(rcpts[0].name.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_structured_passes_through() {
        let to: Recipients = Recipient::with_name("A", "a@b.com").into();
        let once = normalize_recipients(&to);
        assert_eq!(once, vec![Recipient::with_name("A", "a@b.com")]);

        let again: Recipients = once.clone().into_iter().collect();
        assert_eq!(normalize_recipients(&again), once);
    }

    #[test]
    fn test_mixed_list_keeps_order() {
        let to: Recipients = serde_json::from_value(json!([
            "first@example.com",
            {"email": "second@example.com", "name": "Second"},
            {"email": "third@example.com", "name": "Third", "type": "bcc"}
        ]))
        .unwrap();

        let rcpts = normalize_recipients(&to);
        assert_eq!(rcpts.len(), 3);
        assert_eq!(rcpts[0], Recipient::new("first@example.com"));
        assert_eq!(rcpts[1].name.as_deref(), Some("Second"));
        assert_eq!(rcpts[2].kind.as_deref(), Some("bcc"));
    }

    #[test]
    fn test_structured_without_name_is_unchanged() {
        let to: Recipients = serde_json::from_value(json!({"email": "x@y.com"})).unwrap();
        let rcpts = normalize_recipients(&to);
        assert_eq!(rcpts[0].name, None);
        assert_eq!(serde_json::to_value(&rcpts[0]).unwrap(), json!({"email": "x@y.com"}));
    }

    #[test]
    fn test_push_promotes_to_list() {
        let to = Recipients::from("one@example.com").push("two@example.com".into());
        assert_eq!(normalize_recipients(&to).len(), 2);
    }

    #[test]
    fn test_parse() {
        assert!(Recipient::parse("user+tag@sub.example.com").is_ok());
        assert!(Recipient::parse("").is_err());
        assert!(Recipient::parse("no-at-sign").is_err());
    }

    #[test]
    fn test_formatted() {
        assert_eq!(Recipient::new("a@b.com").formatted(), "a@b.com");
        assert_eq!(
            Recipient::with_name("Alice", "alice@example.com").to_string(),
            "Alice <alice@example.com>"
        );
    }

    #[test]
    fn test_tuple_to_recipient() {
        let spec = ("Alice", "alice@example.com").to_recipient();
        assert_eq!(
            spec.into_recipient(),
            Recipient::with_name("Alice", "alice@example.com")
        );
    }
}

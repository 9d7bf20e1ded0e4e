//! Formatters turning caller-friendly maps into the API's array shapes.
//!
//! The API wants `[{name, content}]` instead of `{name: content}`, and
//! per-recipient data as `[{rcpt, vars}]` / `[{rcpt, values}]`. Empty or
//! absent input always yields an empty array, never `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flat merge-variable map as callers supply it: `{"NAME": "content"}`.
pub type MergeVarSet = Map<String, Value>;

/// A single `{name, content}` merge variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeVar {
    pub name: String,
    pub content: Value,
}

impl MergeVar {
    pub fn new(name: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Merge variables scoped to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientMergeVars {
    pub rcpt: String,
    pub vars: Vec<MergeVar>,
}

/// Opaque per-recipient metadata, forwarded without reinterpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientMetadata {
    pub rcpt: String,
    pub values: Value,
}

/// Collapse a loosely-typed value into a strict boolean.
///
/// Only `false` and absence (`None` or JSON `null`) are false. Everything
/// else, `0` and `""` included, is true.
///
/// ```
/// use mandrill_mailer::to_boolean;
/// use serde_json::json;
///
/// assert!(!to_boolean(None));
/// assert!(!to_boolean(Some(&json!(false))));
/// assert!(to_boolean(Some(&json!(0))));
/// assert!(to_boolean(Some(&json!(""))));
/// ```
pub fn to_boolean(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null) | Some(Value::Bool(false)))
}

/// Convert `{name: content}` into `[{name, content}]`, keeping the map's order.
pub fn to_merge_vars(vars: Option<&MergeVarSet>) -> Vec<MergeVar> {
    let Some(vars) = vars else {
        return Vec::new();
    };
    vars.iter()
        .map(|(name, content)| MergeVar {
            name: name.clone(),
            content: content.clone(),
        })
        .collect()
}

/// Convert `[{rcpt: {name: content}}]` into `[{rcpt, vars: [{name, content}]}]`.
///
/// One output entry per input entry, in input order. Duplicate recipients are
/// kept as separate entries.
pub fn to_recipient_merge_vars(entries: Option<&[MergeVarSet]>) -> Vec<RecipientMergeVars> {
    let Some(entries) = entries else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|entry| recipient_entry(entry, "recipient_vars"))
        .map(|(rcpt, value)| {
            let vars = match value {
                Value::Object(vars) => to_merge_vars(Some(vars)),
                Value::Null => Vec::new(),
                other => {
                    tracing::warn!(rcpt = %rcpt, value = %other, "Recipient vars are not a map, sending none");
                    Vec::new()
                }
            };
            RecipientMergeVars {
                rcpt: rcpt.to_string(),
                vars,
            }
        })
        .collect()
}

/// Convert `[{rcpt: values}]` into `[{rcpt, values}]`, leaving `values` untouched.
///
/// One output entry per input entry, in input order.
pub fn to_recipient_metadata(entries: Option<&[MergeVarSet]>) -> Vec<RecipientMetadata> {
    let Some(entries) = entries else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|entry| recipient_entry(entry, "recipient_metadata"))
        .map(|(rcpt, values)| RecipientMetadata {
            rcpt: rcpt.to_string(),
            values: values.clone(),
        })
        .collect()
}

static NO_VALUE: Value = Value::Null;

/// The recipient key is taken positionally from each single-entry map.
///
/// An empty map yields an empty `rcpt` with no value.
fn recipient_entry<'a>(entry: &'a MergeVarSet, field: &'static str) -> (&'a str, &'a Value) {
    if entry.len() > 1 {
        tracing::warn!(
            field = field,
            keys = entry.len(),
            "Per-recipient entry has more than one key, using the first"
        );
    }
    match entry.iter().next() {
        Some((rcpt, value)) => (rcpt.as_str(), value),
        None => {
            tracing::warn!(field = field, "Per-recipient entry is empty");
            ("", &NO_VALUE)
        }
    }
}

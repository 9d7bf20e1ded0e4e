//! Mailer classes and their inherited defaults.
//!
//! A [`MailerClass`] represents one category of outgoing email. Each class can
//! declare defaults (`from`, `from_name`, `merge_vars`, `view_content_link`,
//! ...) and may point to a parent class. Resolving a class's defaults walks the
//! parent chain from the root down, deep-merging each level so the most
//! specific declaration wins.
//!
//! ```
//! use mandrill_mailer::MailerClass;
//!
//! let base = MailerClass::new("ApplicationMailer");
//! base.default("from", "support@example.com");
//!
//! let invites = MailerClass::inherit(&base, "InvitationMailer");
//! invites.default("from_name", "Invitations");
//!
//! let resolved = invites.defaults();
//! assert_eq!(resolved.from(), Some("support@example.com"));
//! assert_eq!(resolved.from_name(), Some("Invitations"));
//! ```
//!
//! Declarations are expected once at startup. Concurrent declarations racing
//! with sends are the caller's responsibility to avoid.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::delivery::Delivery;
use crate::error::MailError;
use crate::format::MergeVarSet;

/// Sender used when no class in the chain declares `from`.
pub const FALLBACK_FROM: &str = "example@email.com";

/// Bumped on every declaration anywhere; invalidates memoized resolutions.
static GENERATION: AtomicU64 = AtomicU64::new(0);

/// A resolved defaults record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Defaults(Map<String, Value>);

impl Defaults {
    /// The record every chain starts from: only the fallback sender.
    pub fn root() -> Self {
        let mut record = Map::new();
        record.insert("from".into(), Value::String(FALLBACK_FROM.into()));
        Self(record)
    }

    /// Build a record directly from a JSON object.
    pub fn from_value(value: Value) -> Result<Self, MailError> {
        match value {
            Value::Object(record) => Ok(Self(record)),
            other => Err(MailError::Configuration(format!(
                "defaults must be a mapping, got `{}`",
                other
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn from(&self) -> Option<&str> {
        self.get("from").and_then(Value::as_str)
    }

    pub fn from_name(&self) -> Option<&str> {
        self.get("from_name").and_then(Value::as_str)
    }

    pub fn merge_vars(&self) -> Option<&MergeVarSet> {
        self.get("merge_vars").and_then(Value::as_object)
    }

    pub fn view_content_link(&self) -> Option<&Value> {
        self.get("view_content_link")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Deep-merge `overlay` on top of this record; overlay keys win.
    fn deep_merge(&mut self, overlay: &Map<String, Value>) {
        deep_merge(&mut self.0, overlay);
    }
}

fn deep_merge(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (base.get_mut(key), value) {
            deep_merge(existing, incoming);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}

/// Options passed to a test fixture. Must contain `email`.
pub type TestOptions = Map<String, Value>;

/// A registered test setup.
pub type Fixture =
    Arc<dyn Fn(&Arc<MailerClass>, &TestOptions) -> Result<Delivery, MailError> + Send + Sync>;

/// One category of outgoing email, with its own defaults and test fixtures.
pub struct MailerClass {
    name: String,
    parent: Option<Arc<MailerClass>>,
    declared: RwLock<Option<Map<String, Value>>>,
    resolved: RwLock<Option<(u64, Defaults)>>,
    fixtures: RwLock<HashMap<String, Fixture>>,
}

impl MailerClass {
    /// Create a root class.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(name.into(), None))
    }

    /// Create a class inheriting `parent`'s defaults.
    pub fn inherit(parent: &Arc<Self>, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(name.into(), Some(Arc::clone(parent))))
    }

    fn build(name: String, parent: Option<Arc<Self>>) -> Self {
        Self {
            name,
            parent,
            declared: RwLock::new(None),
            resolved: RwLock::new(None),
            fixtures: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<MailerClass>> {
        self.parent.as_ref()
    }

    /// Declare a single default on this class.
    ///
    /// Later declarations of the same key replace earlier ones. Ancestors and
    /// siblings are never affected.
    pub fn default(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        let mut update = Map::new();
        update.insert(key.into(), value.into());
        self.declare(update)
    }

    /// Declare several defaults at once.
    pub fn declare(&self, defaults: Map<String, Value>) -> &Self {
        {
            let mut declared = self.declared.write();
            let record = declared.get_or_insert_with(Map::new);
            for (key, value) in defaults {
                record.insert(key, value);
            }
        }
        GENERATION.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(mailer = %self.name, "Declared mailer defaults");
        self
    }

    /// Whether this class declared any defaults of its own.
    pub fn has_own_defaults(&self) -> bool {
        self.declared.read().is_some()
    }

    /// Resolve this class's defaults through its ancestry.
    ///
    /// Memoized per class until the next declaration anywhere.
    pub fn defaults(&self) -> Defaults {
        let generation = GENERATION.load(Ordering::Acquire);
        if let Some((cached_at, record)) = &*self.resolved.read() {
            if *cached_at == generation {
                return record.clone();
            }
        }

        let record = self.resolve();
        *self.resolved.write() = Some((generation, record.clone()));
        record
    }

    fn resolve(&self) -> Defaults {
        let mut record = match &self.parent {
            Some(parent) => parent.defaults(),
            None => Defaults::root(),
        };
        if let Some(own) = &*self.declared.read() {
            record.deep_merge(own);
        }
        record
    }

    /// Register a test setup under a mailer method name.
    ///
    /// ```
    /// use mandrill_mailer::{Mailer, MailerClass, MessageArgs, MessageMailer};
    ///
    /// let class = MailerClass::new("UserMailer");
    /// class.test_setup_for("welcome", |class, options| {
    ///     let email = options["email"].as_str().unwrap_or_default();
    ///     let args = MessageArgs::new().subject("Welcome").to(email);
    ///     MessageMailer::new(class).mandrill_mail(args)?.into_delivery()
    /// });
    /// ```
    pub fn test_setup_for<F>(&self, method: impl Into<String>, fixture: F)
    where
        F: Fn(&Arc<MailerClass>, &TestOptions) -> Result<Delivery, MailError> + Send + Sync + 'static,
    {
        self.fixtures.write().insert(method.into(), Arc::new(fixture));
    }

    /// Run a registered test setup.
    ///
    /// # Errors
    ///
    /// - `MissingField("email")` when `options` has no `email`.
    /// - `MissingTestFixture` when nothing is registered under `method`.
    pub fn test(self: &Arc<Self>, method: &str, options: &TestOptions) -> Result<Delivery, MailError> {
        if !matches!(options.get("email"), Some(Value::String(email)) if !email.is_empty()) {
            return Err(MailError::MissingField("email"));
        }

        let fixture = self
            .fixtures
            .read()
            .get(method)
            .cloned()
            .ok_or_else(|| MailError::MissingTestFixture(method.to_string()))?;

        tracing::debug!(mailer = %self.name, method = method, "Running test setup");
        fixture(self, options)
    }
}

impl fmt::Debug for MailerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerClass")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("declared", &*self.declared.read())
            .finish()
    }
}

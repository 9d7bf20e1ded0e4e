//! Mailers: the user-facing entry points that turn caller arguments into a
//! ready-to-send [`Delivery`].
//!
//! | Mailer | Mandrill endpoint |
//! |--------|-------------------|
//! | [`MessageMailer`] | `messages/send` |
//! | [`TemplateMailer`] | `messages/send-template` |
//!
//! Both share the [`Mailer`] trait, which provides accessors over the
//! assembled message, payload rendering, delivery, and URL helpers.

mod message;
mod template;

pub use message::MessageMailer;
pub use template::TemplateMailer;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::address::{normalize_recipients, Recipients};
use crate::args::MessageArgs;
use crate::config::Config;
use crate::defaults::MailerClass;
use crate::delivery::{
    deliver_later_with, deliver_with, DeferredQueue, Delivery, DeliveryResult, JobOptions,
    Transport, SEND_AT_FORMAT,
};
use crate::error::MailError;
use crate::format::to_boolean;
use crate::interceptor::apply_interceptor;
use crate::message::{assemble, Message};
use crate::url::{join_image_url, UrlResolver};

/// State shared by every mailer.
#[derive(Clone)]
pub struct MailerState {
    class: Arc<MailerClass>,
    config: Option<Arc<Config>>,
    url_resolver: Option<Arc<dyn UrlResolver>>,
    delivery: Option<Delivery>,
}

impl MailerState {
    fn new(class: &Arc<MailerClass>) -> Self {
        Self {
            class: Arc::clone(class),
            config: None,
            url_resolver: None,
            delivery: None,
        }
    }

    /// The explicit config if one was given, else the process-wide one.
    fn config(&self) -> Arc<Config> {
        match &self.config {
            Some(config) => Arc::clone(config),
            None => crate::config(),
        }
    }

    /// Assemble the message, run the interceptor, and pull out the send flags.
    fn prepare(&self, args: &MessageArgs) -> Result<Delivery, MailError> {
        let defaults = self.class.defaults();
        let message = assemble(args, &defaults)?;
        let message = apply_interceptor(message, &self.config())?;

        let mut delivery = Delivery::message(message);
        delivery.async_send = args.async_send.as_ref().map(|flag| to_boolean(Some(flag)));
        delivery.ip_pool = args.ip_pool.clone();
        delivery.send_at = args
            .send_at
            .map(|at| at.format(SEND_AT_FORMAT).to_string());

        tracing::debug!(
            mailer = %self.class.name(),
            subject = delivery.message.subject().unwrap_or_default(),
            recipients = delivery.message.to_emails().len(),
            "Assembled message"
        );
        Ok(delivery)
    }

    fn prepared(&self) -> Result<&Delivery, MailError> {
        self.delivery.as_ref().ok_or(MailError::MissingField("message"))
    }

    fn resolver(&self) -> Result<&Arc<dyn UrlResolver>, MailError> {
        self.url_resolver
            .as_ref()
            .ok_or_else(|| MailError::Configuration("no URL resolver configured".into()))
    }
}

impl std::fmt::Debug for MailerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailerState")
            .field("class", &self.class.name())
            .field("config", &self.config)
            .field("url_resolver", &self.url_resolver.as_ref().map(|_| "<resolver>"))
            .field("delivery", &self.delivery)
            .finish()
    }
}

/// Behaviour common to both mailer variants.
///
/// Implementors only expose their [`MailerState`]; everything else is provided.
#[async_trait]
pub trait Mailer: Send + Sync + Sized {
    fn state(&self) -> &MailerState;

    fn state_mut(&mut self) -> &mut MailerState;

    /// Use an explicit config instead of the process-wide one.
    fn with_config(mut self, config: Arc<Config>) -> Self {
        self.state_mut().config = Some(config);
        self
    }

    /// Inject the resolver used by [`url`](Mailer::url) and the image helpers.
    fn with_url_resolver(mut self, resolver: Arc<dyn UrlResolver>) -> Self {
        self.state_mut().url_resolver = Some(resolver);
        self
    }

    fn mailer_class(&self) -> &Arc<MailerClass> {
        &self.state().class
    }

    /// The prepared delivery, once `mandrill_mail` has run.
    fn delivery(&self) -> Option<&Delivery> {
        self.state().delivery.as_ref()
    }

    fn message(&self) -> Option<&Message> {
        self.delivery().map(|d| &d.message)
    }

    /// Take the prepared delivery.
    fn into_delivery(mut self) -> Result<Delivery, MailError> {
        self.state_mut()
            .delivery
            .take()
            .ok_or(MailError::MissingField("message"))
    }

    /// Sender address of the assembled message.
    fn from(&self) -> Option<&str> {
        self.message().and_then(Message::from_email)
    }

    /// Recipients of the assembled message, as assembled (or as overridden
    /// by an interceptor).
    fn to(&self) -> Option<&Value> {
        self.message().and_then(Message::to)
    }

    fn bcc(&self) -> Option<&str> {
        self.message().and_then(Message::bcc_address)
    }

    /// Replace the recipients of the assembled message.
    fn set_to(&mut self, recipients: impl Into<Recipients> + Send) -> Result<(), MailError> {
        let recipients = normalize_recipients(&recipients.into());
        let to = serde_json::to_value(recipients)?;
        let delivery = self
            .state_mut()
            .delivery
            .as_mut()
            .ok_or(MailError::MissingField("message"))?;
        delivery.message.insert("to", to);
        Ok(())
    }

    /// The API payload, with the configured key.
    fn data(&self) -> Result<Value, MailError> {
        let delivery = self.state().prepared()?;
        delivery.api_payload(&self.state().config().api_key)
    }

    /// Send now through `transport`.
    async fn deliver<T: Transport + ?Sized>(&self, transport: &T) -> Result<DeliveryResult, MailError> {
        let delivery = self.state().prepared()?;
        deliver_with(delivery, transport).await
    }

    /// Queue for a background worker.
    async fn deliver_later<Q: DeferredQueue + ?Sized>(
        &self,
        queue: &Q,
        options: &JobOptions,
    ) -> Result<(), MailError> {
        let delivery = self.state().prepared()?;
        deliver_later_with(delivery, queue, options).await
    }

    /// Absolute URL for a named route. The configured host and protocol are
    /// merged into `params`.
    fn url(&self, route: &str, params: Map<String, Value>) -> Result<String, MailError> {
        let mut params = params;
        let options = self.state().config().default_url_options.clone();
        if let Some(host) = options.host {
            params.insert("host".into(), Value::String(host));
        }
        if let Some(protocol) = options.protocol {
            params.insert("protocol".into(), Value::String(protocol));
        }
        self.state().resolver()?.url_for(route, &params)
    }

    fn image_path(&self, image: &str) -> Result<String, MailError> {
        self.state().resolver()?.asset_path(image)
    }

    /// Root URL joined with the image's asset path.
    fn image_url(&self, image: &str) -> Result<String, MailError> {
        let root = self.url("root", Map::new())?;
        Ok(join_image_url(&root, &self.image_path(image)?))
    }
}

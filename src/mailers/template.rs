use serde_json::{Map, Value};
use std::sync::Arc;

use super::{Mailer, MailerState};
use crate::args::MessageArgs;
use crate::defaults::MailerClass;
use crate::error::MailError;
use crate::format::to_merge_vars;

/// Sends a stored Mandrill template through `messages/send-template`.
///
/// ```
/// use mandrill_mailer::{Config, Mailer, MailerClass, MessageArgs, TemplateMailer};
/// use std::sync::Arc;
///
/// let class = MailerClass::new("InvitationMailer");
///
/// let mailer = TemplateMailer::new(&class)
///     .with_config(Arc::new(Config::new()))
///     .mandrill_mail(
///         MessageArgs::new()
///             .template("invitation")
///             .subject("You're invited")
///             .to("ann@example.com")
///             .var("EVENT", "Launch party"),
///     )
///     .unwrap();
///
/// assert_eq!(mailer.template_name(), Some("invitation"));
/// ```
#[derive(Debug, Clone)]
pub struct TemplateMailer {
    state: MailerState,
}

impl TemplateMailer {
    pub fn new(class: &Arc<MailerClass>) -> Self {
        Self {
            state: MailerState::new(class),
        }
    }

    /// Assemble a template send.
    ///
    /// `template` names the stored template and is required.
    /// `template_content` fills editable regions and defaults to a single
    /// empty `blank` region, which the API requires.
    pub fn mandrill_mail(mut self, args: MessageArgs) -> Result<Self, MailError> {
        let name = args
            .template
            .clone()
            .ok_or(MailError::MissingField("template"))?;

        let content = match &args.template_content {
            Some(regions) if !regions.is_empty() => to_merge_vars(Some(regions)),
            _ => {
                let mut blank = Map::new();
                blank.insert("blank".into(), Value::String(String::new()));
                to_merge_vars(Some(&blank))
            }
        };

        let delivery = self.state.prepare(&args)?.template(name, content);
        self.state.delivery = Some(delivery);
        Ok(self)
    }

    pub fn template_name(&self) -> Option<&str> {
        self.delivery().and_then(|d| d.template_name.as_deref())
    }
}

impl Mailer for TemplateMailer {
    fn state(&self) -> &MailerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut MailerState {
        &mut self.state
    }
}

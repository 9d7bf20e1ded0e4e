use std::sync::Arc;

use super::{Mailer, MailerState};
use crate::args::MessageArgs;
use crate::defaults::MailerClass;
use crate::error::MailError;

/// Sends a fully specified message (HTML and/or text) through `messages/send`.
///
/// ```
/// use mandrill_mailer::{Config, Mailer, MailerClass, MessageArgs, MessageMailer};
/// use std::sync::Arc;
///
/// let class = MailerClass::new("InvitationMailer");
/// class.default("from", "no-reply@example.com");
///
/// let mailer = MessageMailer::new(&class)
///     .with_config(Arc::new(Config::new()))
///     .mandrill_mail(
///         MessageArgs::new()
///             .subject("You're invited")
///             .to(("Ann", "ann@example.com"))
///             .html("<p>Join us</p>"),
///     )
///     .unwrap();
///
/// assert_eq!(mailer.from(), Some("no-reply@example.com"));
/// ```
#[derive(Debug, Clone)]
pub struct MessageMailer {
    state: MailerState,
}

impl MessageMailer {
    pub fn new(class: &Arc<MailerClass>) -> Self {
        Self {
            state: MailerState::new(class),
        }
    }

    /// Assemble a message from `args` and the class defaults.
    ///
    /// `async`, `ip_pool` and `send_at` are carried beside the message.
    /// `template` and `template_content` are ignored.
    pub fn mandrill_mail(mut self, args: MessageArgs) -> Result<Self, MailError> {
        let delivery = self.state.prepare(&args)?;
        self.state.delivery = Some(delivery);
        Ok(self)
    }
}

impl Mailer for MessageMailer {
    fn state(&self) -> &MailerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut MailerState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Recipient;
    use crate::config::Config;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;

    fn class() -> Arc<MailerClass> {
        let class = MailerClass::new("TestMailer");
        class.default("from", "default@example.com");
        class.default("from_name", "Default");
        class
    }

    fn mailer() -> MessageMailer {
        MessageMailer::new(&class()).with_config(Arc::new(Config::new().api_key("KEY")))
    }

    #[test]
    fn test_unprepared_mailer_has_no_message() {
        let mailer = mailer();
        assert!(mailer.message().is_none());
        assert!(matches!(mailer.data(), Err(MailError::MissingField("message"))));
    }

    #[test]
    fn test_send_flags_are_pulled_out() {
        let at = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2030, 1, 1, 11, 30, 0)
            .unwrap();
        let mailer = mailer()
            .mandrill_mail(
                MessageArgs::new()
                    .subject("Hi")
                    .async_send(true)
                    .ip_pool("Main Pool")
                    .send_at(at),
            )
            .unwrap();

        let delivery = mailer.delivery().unwrap();
        assert_eq!(delivery.async_send, Some(true));
        assert_eq!(delivery.ip_pool.as_deref(), Some("Main Pool"));
        assert_eq!(delivery.send_at.as_deref(), Some("2030-01-01 09:30:00"));
        assert!(delivery.message.get("async").is_none());
        assert!(delivery.message.get("send_at").is_none());
    }

    #[test]
    fn test_loose_async_flag_is_coerced() {
        let args = MessageArgs::from_value(json!({"subject": "Hi", "async": 1})).unwrap();
        let mailer = mailer().mandrill_mail(args).unwrap();
        assert_eq!(mailer.delivery().unwrap().async_send, Some(true));
        assert_eq!(mailer.data().unwrap()["async"], json!(true));
    }

    #[test]
    fn test_data_payload() {
        let mailer = mailer()
            .mandrill_mail(MessageArgs::new().subject("Hi").to("a@example.com"))
            .unwrap();
        let data = mailer.data().unwrap();

        assert_eq!(data["key"], json!("KEY"));
        assert_eq!(data["message"]["subject"], json!("Hi"));
        assert_eq!(data["message"]["from_name"], json!("Default"));
        assert_eq!(data["async"], json!(null));
        assert!(data.get("template_name").is_none());
    }

    #[test]
    fn test_accessors_and_set_to() {
        let mut mailer = mailer()
            .mandrill_mail(
                MessageArgs::new()
                    .to("a@example.com")
                    .bcc("audit@example.com"),
            )
            .unwrap();

        assert_eq!(mailer.from(), Some("default@example.com"));
        assert_eq!(mailer.bcc(), Some("audit@example.com"));
        assert_eq!(
            mailer.to(),
            Some(&json!([{"email": "a@example.com", "name": "a@example.com"}]))
        );

        mailer
            .set_to(Recipient::with_name("Bea", "b@example.com"))
            .unwrap();
        assert_eq!(
            mailer.to(),
            Some(&json!([{"email": "b@example.com", "name": "Bea"}]))
        );
    }

    #[test]
    fn test_interceptor_runs_after_assembly() {
        let config = Config::new().interceptor_params(json!({"to": "x@y.com"}));
        let mailer = MessageMailer::new(&class())
            .with_config(Arc::new(config))
            .mandrill_mail(MessageArgs::new().to("a@example.com"))
            .unwrap();
        assert_eq!(mailer.to(), Some(&json!("x@y.com")));
    }

    #[test]
    fn test_bad_interceptor_fails_mail() {
        let config = Config::new().interceptor_params("nope");
        let result = MessageMailer::new(&class())
            .with_config(Arc::new(config))
            .mandrill_mail(MessageArgs::new());
        assert!(matches!(result, Err(MailError::InvalidInterceptorConfig(_))));
    }
}

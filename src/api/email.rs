//! Outbound mail delivery abstractions.
//!
//! The verification service hands an [`EmailMessage`] to an [`EmailSender`]
//! and treats the outcome as a plain success/failure; a failure never touches
//! the already-persisted code record and retrying delivery is always safe.
//!
//! Senders:
//! - [`SmtpEmailSender`] delivers through an SMTP relay with short connect
//!   timeouts so a stalled provider cannot block the caller.
//! - [`FailoverEmailSender`] tries providers in a fixed priority order and
//!   returns on the first success.
//! - [`LogEmailSender`] logs instead of sending; the default for local dev.

use anyhow::{anyhow, Context, Result};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::handlers::auth::models::Scene;
use crate::cli::globals::{GlobalArgs, SmtpConfig};

/// Bounded so a stalled provider fails over instead of hanging the caller.
const SMTP_TIMEOUT_SECONDS: u64 = 5;

pub type SharedEmailSender = Arc<dyn EmailSender>;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub html_body: String,
}

/// Email delivery abstraction used by the verification service.
pub trait EmailSender: Send + Sync {
    /// Short provider label for logs.
    fn name(&self) -> &str;

    /// Deliver a message or return an error; retrying is always safe.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the envelope instead of sending real email.
/// The body is not logged; it carries the verification code.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            "email send stub"
        );
        Ok(())
    }
}

/// Delivers through a single SMTP relay (STARTTLS + credentials).
pub struct SmtpEmailSender {
    label: String,
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpEmailSender {
    /// # Errors
    ///
    /// Returns an error when the relay host or from mailbox is invalid.
    pub fn new(config: &SmtpConfig, from: &str) -> Result<Self> {
        let from = from
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid from mailbox: {from}"))?;
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::starttls_relay(&config.host)
            .with_context(|| format!("Invalid SMTP relay host: {}", config.host))?
            .port(config.port)
            .credentials(credentials)
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECONDS)))
            .build();

        Ok(Self {
            label: config.host.clone(),
            from,
            transport,
        })
    }
}

impl EmailSender for SmtpEmailSender {
    fn name(&self) -> &str {
        &self.label
    }

    fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(message
                .to_email
                .parse::<Mailbox>()
                .with_context(|| format!("Invalid recipient: {}", message.to_email))?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone())
            .context("failed to build email message")?;

        self.transport
            .send(&email)
            .with_context(|| format!("SMTP delivery via {} failed", self.label))?;
        Ok(())
    }
}

/// Tries each configured provider in order and succeeds on the first that
/// delivers; fails only when all providers fail.
pub struct FailoverEmailSender {
    senders: Vec<Arc<dyn EmailSender>>,
}

impl FailoverEmailSender {
    #[must_use]
    pub fn new(senders: Vec<Arc<dyn EmailSender>>) -> Self {
        Self { senders }
    }
}

impl EmailSender for FailoverEmailSender {
    fn name(&self) -> &str {
        "failover"
    }

    fn send(&self, message: &EmailMessage) -> Result<()> {
        let mut last_error = None;
        for sender in &self.senders {
            match sender.send(message) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(
                        provider = sender.name(),
                        "email delivery failed, trying next provider: {err}"
                    );
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("no email providers configured")))
    }
}

/// Build the process-wide sender from the configured SMTP providers.
///
/// # Errors
///
/// Returns an error when a provider host or the from mailbox is invalid.
pub(crate) fn build_sender(globals: &GlobalArgs) -> Result<SharedEmailSender> {
    let mut senders: Vec<Arc<dyn EmailSender>> = Vec::new();
    for config in &globals.smtp {
        senders.push(Arc::new(SmtpEmailSender::new(config, &globals.mail_from)?));
    }

    match senders.len() {
        0 => {
            warn!("no SMTP provider configured, outbound mail will be logged only");
            Ok(Arc::new(LogEmailSender))
        }
        1 => Ok(senders.remove(0)),
        _ => Ok(Arc::new(FailoverEmailSender::new(senders))),
    }
}

/// Render the verification email carrying a freshly issued code.
pub(crate) fn verification_email(to_email: &str, code: &str, scene: Scene) -> EmailMessage {
    let purpose = match scene {
        Scene::Register => "Email verification",
        Scene::ResetPassword => "Password reset",
    };
    let subject = format!("[Student Records] {purpose} code");
    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
      <h2>Student Records</h2>
      <p>{purpose} requested. Your verification code is:</p>
      <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px;">{code}</p>
      <p>The code is valid for <strong>5 minutes</strong>. Do not share it with anyone.</p>
      <p>If you did not request this, ignore this email.</p>
    </div>
  </body>
</html>
"#
    );

    EmailMessage {
        to_email: to_email.to_string(),
        subject,
        html_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FailingSender;

    impl EmailSender for FailingSender {
        fn name(&self) -> &str {
            "failing"
        }

        fn send(&self, _message: &EmailMessage) -> Result<()> {
            Err(anyhow!("provider down"))
        }
    }

    struct RecordingSender {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingSender {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl EmailSender for RecordingSender {
        fn name(&self) -> &str {
            "recording"
        }

        fn send(&self, message: &EmailMessage) -> Result<()> {
            self.sent
                .lock()
                .map_err(|_| anyhow!("poisoned"))?
                .push(message.to_email.clone());
            Ok(())
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            to_email: "alice@example.com".to_string(),
            subject: "subject".to_string(),
            html_body: "<p>body</p>".to_string(),
        }
    }

    #[test]
    fn log_sender_accepts_messages() -> Result<()> {
        LogEmailSender.send(&message())
    }

    #[test]
    fn failover_falls_through_to_working_provider() -> Result<()> {
        let recording = Arc::new(RecordingSender::new());
        let sender = FailoverEmailSender::new(vec![Arc::new(FailingSender), recording.clone()]);

        sender.send(&message())?;

        let sent = recording.sent.lock().map_err(|_| anyhow!("poisoned"))?;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], "alice@example.com");
        Ok(())
    }

    #[test]
    fn failover_stops_at_first_success() -> Result<()> {
        let first = Arc::new(RecordingSender::new());
        let second = Arc::new(RecordingSender::new());
        let sender = FailoverEmailSender::new(vec![first.clone(), second.clone()]);

        sender.send(&message())?;

        assert_eq!(
            first.sent.lock().map_err(|_| anyhow!("poisoned"))?.len(),
            1
        );
        assert!(second.sent.lock().map_err(|_| anyhow!("poisoned"))?.is_empty());
        Ok(())
    }

    #[test]
    fn failover_errors_when_all_providers_fail() {
        let sender =
            FailoverEmailSender::new(vec![Arc::new(FailingSender), Arc::new(FailingSender)]);
        assert!(sender.send(&message()).is_err());
    }

    #[test]
    fn failover_errors_when_empty() {
        let sender = FailoverEmailSender::new(Vec::new());
        assert!(sender.send(&message()).is_err());
    }

    #[test]
    fn verification_email_carries_code_and_purpose() {
        let message = verification_email("alice@example.com", "042137", Scene::Register);
        assert_eq!(message.to_email, "alice@example.com");
        assert!(message.subject.contains("Email verification"));
        assert!(message.html_body.contains("042137"));

        let message = verification_email("alice@example.com", "042137", Scene::ResetPassword);
        assert!(message.subject.contains("Password reset"));
    }
}

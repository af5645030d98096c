//! services/api/src/adapters/mail.rs
//!
//! SMTP implementation of the `MailService` port using `lettre`.
//!
//! The transport is optional: when the EMAIL_* variables are not
//! configured the mailer stays disabled and every send returns false
//! with a warning, so the reminder pipeline keeps running as a no-op.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use organizer_core::ports::MailService;
use tracing::{error, info, warn};

use crate::config::SmtpConfig;

/// A mail adapter that implements the `MailService` port over SMTP.
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Option<Mailbox>,
}

impl SmtpMailer {
    /// Builds the mailer from the optional SMTP config block. Any
    /// problem constructing the transport disables the mailer instead
    /// of failing startup.
    pub fn new(config: Option<&SmtpConfig>) -> Self {
        let Some(config) = config else {
            warn!("Email service not configured, reminders will not be delivered");
            return Self { transport: None, from: None };
        };

        let relay = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        };

        let transport = match relay {
            Ok(builder) => builder
                .port(config.port)
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .build(),
            Err(e) => {
                error!("Failed to build SMTP transport for {}: {e}", config.host);
                return Self { transport: None, from: None };
            }
        };

        let from = match format!("Academic Organizer <{}>", config.username).parse::<Mailbox>() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                error!("EMAIL_USER is not a valid sender address: {e}");
                return Self { transport: None, from: None };
            }
        };

        Self {
            transport: Some(transport),
            from: Some(from),
        }
    }

    fn render_body(assignment_title: &str, deadline: DateTime<Utc>) -> String {
        let deadline_formatted = deadline.format("%A, %B %-d, %Y at %H:%M UTC");
        format!(
            "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
               <h2>Assignment Deadline Reminder</h2>\
               <p>Hello!</p>\
               <p>This is a friendly reminder that your assignment \
                  <strong>\"{assignment_title}\"</strong> is due <strong>tomorrow</strong>.</p>\
               <p><strong>Assignment:</strong> {assignment_title}<br>\
                  <strong>Deadline:</strong> {deadline_formatted}</p>\
               <p>Please make sure to submit your assignment on time!</p>\
               <p>Best regards,<br>Academic Organizer</p>\
             </div>"
        )
    }
}

#[async_trait]
impl MailService for SmtpMailer {
    async fn send_deadline_reminder(
        &self,
        to_address: &str,
        assignment_title: &str,
        deadline: DateTime<Utc>,
    ) -> bool {
        let (Some(transport), Some(from)) = (&self.transport, &self.from) else {
            warn!("Email service not configured, skipping reminder");
            return false;
        };

        let to_mailbox: Mailbox = match to_address.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                error!("Invalid recipient address {to_address}: {e}");
                return false;
            }
        };

        let message = Message::builder()
            .from(from.clone())
            .to(to_mailbox)
            .subject(format!("Deadline Reminder: {assignment_title}"))
            .header(ContentType::TEXT_HTML)
            .body(Self::render_body(assignment_title, deadline));

        let message = match message {
            Ok(message) => message,
            Err(e) => {
                error!("Failed to build reminder email: {e}");
                return false;
            }
        };

        match transport.send(message).await {
            Ok(_) => {
                info!("Reminder email sent to {to_address}");
                true
            }
            Err(e) => {
                error!("Failed to send reminder email: {e}");
                false
            }
        }
    }

    async fn test_connection(&self) -> bool {
        let Some(transport) = &self.transport else {
            warn!("Email service not configured");
            return false;
        };
        match transport.test_connection().await {
            Ok(ok) => ok,
            Err(e) => {
                error!("Email service connection failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unconfigured_mailer_is_disabled() {
        let mailer = SmtpMailer::new(None);
        assert!(mailer.transport.is_none());
    }

    #[tokio::test]
    async fn unconfigured_mailer_reports_failure_without_erroring() {
        let mailer = SmtpMailer::new(None);
        let deadline = Utc.with_ymd_and_hms(2025, 6, 11, 23, 59, 0).unwrap();
        assert!(!mailer.send_deadline_reminder("a@b.com", "Essay", deadline).await);
        assert!(!mailer.test_connection().await);
    }

    #[test]
    fn body_mentions_title_and_deadline() {
        let deadline = Utc.with_ymd_and_hms(2025, 6, 11, 23, 59, 0).unwrap();
        let body = SmtpMailer::render_body("Essay", deadline);
        assert!(body.contains("\"Essay\""));
        assert!(body.contains("Wednesday, June 11, 2025"));
        assert!(body.contains("23:59 UTC"));
    }
}

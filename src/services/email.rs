//! Email service for circulation notices

use std::{
    str::FromStr,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// Runtime-reloadable SMTP settings shared by every sender
#[derive(Clone)]
pub struct MailSettings {
    inner: Arc<RwLock<EmailConfig>>,
}

impl MailSettings {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Snapshot of the current settings
    pub fn current(&self) -> EmailConfig {
        match self.inner.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in new credentials. The sender address follows the account.
    pub fn reload(&self, username: &str, password: &str) {
        let mut config = match self.inner.write() {
            Ok(config) => config,
            Err(poisoned) => poisoned.into_inner(),
        };
        config.smtp_username = Some(username.to_string());
        config.smtp_password = Some(password.to_string());
        config.smtp_from = Some(username.to_string());
        tracing::info!(account = %username, "Mail credentials reloaded");
    }

    pub fn has_credentials(&self) -> bool {
        let config = self.current();
        config.smtp_username.is_some() && config.smtp_password.is_some()
    }
}

/// A message ready to hand to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// How a message left the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No credentials configured; the message was only logged
    Logged,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, settings: &EmailConfig, mail: &OutgoingMail) -> AppResult<()>;
}

/// SMTP delivery through lettre
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpMailTransport;

impl SmtpMailTransport {
    fn build_message(settings: &EmailConfig, mail: &OutgoingMail) -> AppResult<Message> {
        let from_address = settings
            .smtp_from
            .as_deref()
            .or(settings.smtp_username.as_deref())
            .ok_or_else(|| AppError::Internal("No sender address configured".to_string()))?;
        let from_name = settings.smtp_from_name.as_deref().unwrap_or("Athenaeum Library");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, from_address))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(&mail.to)
            .map_err(|e| AppError::Validation(format!("Invalid recipient address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(mail.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(mail.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body style="font-family: Arial, sans-serif;"><p>{}</p></body></html>"#,
                                mail.text.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, settings: &EmailConfig, mail: &OutgoingMail) -> AppResult<()> {
        let email = Self::build_message(settings, mail)?;

        let builder = if settings.smtp_use_tls {
            SmtpTransport::starttls_relay(&settings.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&settings.smtp_host)
        }
        .port(settings.smtp_port);

        let builder = match (&settings.smtp_username, &settings.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };
        let mailer = builder.build();

        // lettre's SMTP transport blocks
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Mail task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

#[derive(Clone)]
pub struct EmailService {
    settings: MailSettings,
    transport: Arc<dyn MailTransport>,
}

impl EmailService {
    pub fn new(settings: MailSettings, transport: Arc<dyn MailTransport>) -> Self {
        Self { settings, transport }
    }

    pub fn settings(&self) -> &MailSettings {
        &self.settings
    }

    /// Send a message, or log it when no SMTP account is configured
    pub async fn send(&self, mail: OutgoingMail) -> AppResult<Delivery> {
        if !self.settings.has_credentials() {
            tracing::info!(
                to = %mail.to,
                subject = %mail.subject,
                body = %mail.text,
                "[Mock Email] SMTP credentials not configured"
            );
            return Ok(Delivery::Logged);
        }

        let settings = self.settings.current();
        self.transport.deliver(&settings, &mail).await?;
        tracing::info!(to = %mail.to, subject = %mail.subject, "Email sent");
        Ok(Delivery::Sent)
    }

    /// Overdue notice for one borrow record
    pub async fn send_overdue_notice(
        &self,
        to: &str,
        student_name: &str,
        book_title: &str,
        due_date: DateTime<Utc>,
        days_overdue: i64,
    ) -> AppResult<Delivery> {
        let text = format!(
            "Dear {name},\n\n\
             This is a reminder that the book \"{title}\" was due on {due}.\n\
             It is currently {days} days overdue.\n\n\
             Please return it as soon as possible to avoid further fines.\n\n\
             Regards,\nLibrary Admin",
            name = student_name,
            title = book_title,
            due = due_date.format("%a %b %d %Y"),
            days = days_overdue,
        );
        self.send(OutgoingMail {
            to: to.to_string(),
            subject: format!("Overdue Book Alert: {}", book_title),
            text,
        })
        .await
    }

    /// Reminder sent ahead of the due date
    pub async fn send_due_soon_reminder(
        &self,
        to: &str,
        student_name: &str,
        book_title: &str,
        due_date: DateTime<Utc>,
    ) -> AppResult<Delivery> {
        let text = format!(
            "Dear {name},\n\n\
             The book \"{title}\" is due on {due}.\n\
             Please return or renew it before then to avoid a fine.\n\n\
             Regards,\nLibrary Admin",
            name = student_name,
            title = book_title,
            due = due_date.format("%a %b %d %Y"),
        );
        self.send(OutgoingMail {
            to: to.to_string(),
            subject: format!("Reminder: {} is due soon", book_title),
            text,
        })
        .await
    }

    /// Tell a reservation holder their book is back
    pub async fn send_reservation_ready(
        &self,
        to: &str,
        student_name: &str,
        book_title: &str,
    ) -> AppResult<Delivery> {
        let text = format!(
            "Dear {name},\n\n\
             Good news! The book \"{title}\" you reserved has been returned and is now available.\n\
             Please visit the library to borrow it.\n\n\
             Regards,\nLibrary Admin",
            name = student_name,
            title = book_title,
        );
        self.send(OutgoingMail {
            to: to.to_string(),
            subject: format!("Book Available: {}", book_title),
            text,
        })
        .await
    }

    /// Check the SMTP setup end to end
    pub async fn send_test(&self, to: &str) -> AppResult<Delivery> {
        self.send(OutgoingMail {
            to: to.to_string(),
            subject: "Athenaeum System Test".to_string(),
            text: "This is a test email from your Library Management System.\n\
                   If you are reading this, your email configuration (SMTP) is working correctly!"
                .to_string(),
        })
        .await
    }
}

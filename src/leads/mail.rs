//! Email delivery of the scored report: SMTP via lettre.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info};

use super::export::{XLSX_MIME, render_workbook};
use super::record::RecordSet;
use crate::error::DistributionError;

pub const REPORT_SUBJECT: &str = "Lead Scoring Report";
pub const REPORT_BODY: &str = "Please find attached the lead scoring report.";
pub const ATTACHMENT_NAME: &str = "report.xlsx";

/// Port on which the relay speaks TLS from the first byte; anything else uses STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Outbound mail settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
    pub timeout: Duration,
}

/// Something that can deliver a fully built message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), DistributionError>;
}

/// SMTP relay transport. Each send opens its own connection.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<SmtpTransport, DistributionError> {
        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose_secret().to_string(),
        );

        let relay = if self.config.smtp_port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&self.config.smtp_host)
        } else {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
        };
        let builder = relay.map_err(|e| DistributionError::Delivery(format!("SMTP relay error: {e}")))?;

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(creds)
            .timeout(Some(self.config.timeout))
            .build())
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), DistributionError> {
        let transport = self.transport()?;
        let send = tokio::task::spawn_blocking(move || transport.send(&message));

        match tokio::time::timeout(self.config.timeout, send).await {
            Ok(Ok(Ok(_response))) => Ok(()),
            Ok(Ok(Err(e))) => Err(DistributionError::Delivery(format!("SMTP send failed: {e}"))),
            Ok(Err(e)) => Err(DistributionError::Delivery(format!("SMTP task failed: {e}"))),
            Err(_) => Err(DistributionError::Timeout(self.config.timeout)),
        }
    }
}

/// Renders a record set to xlsx and mails it as an attachment.
pub struct ReportMailer {
    from: Mailbox,
    transport: Arc<dyn MailTransport>,
}

impl ReportMailer {
    pub fn new(
        from_address: &str,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self, DistributionError> {
        let from = parse_mailbox(from_address)?;
        Ok(Self { from, transport })
    }

    /// Build the report message without sending it.
    pub fn compose(&self, recipient: &str, set: &RecordSet) -> Result<Message, DistributionError> {
        let to = parse_mailbox(recipient)?;
        let workbook = render_workbook(set)?;
        let content_type = ContentType::parse(XLSX_MIME)
            .map_err(|e| DistributionError::Message(format!("Bad attachment type: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(REPORT_SUBJECT)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(REPORT_BODY.to_string()))
                    .singlepart(
                        Attachment::new(ATTACHMENT_NAME.to_string()).body(workbook, content_type),
                    ),
            )
            .map_err(|e| DistributionError::Message(e.to_string()))
    }

    /// Compose and deliver the report. Failures are logged and returned.
    pub async fn dispatch(&self, recipient: &str, set: &RecordSet) -> Result<(), DistributionError> {
        info!(to = %recipient, records = set.len(), "Preparing report email");
        let message = self.compose(recipient, set)?;

        match self.transport.send(message).await {
            Ok(()) => {
                info!(to = %recipient, "Report email sent");
                Ok(())
            }
            Err(e) => {
                error!(to = %recipient, error = %e, "Failed to send report email");
                Err(e)
            }
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DistributionError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| DistributionError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

//! Outbound notifications. Strictly fire-and-forget: a failed send is
//! logged and never fails the transition that triggered it.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info, instrument, warn};

use crate::config::{ConfigError, EmailConfig};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("SMTP error: {0}")]
    SmtpError(String),

    #[error("Message building error: {0}")]
    MessageError(String),

    #[error("Address error: {0}")]
    AddressError(String),
}

impl From<ConfigError> for EmailError {
    fn from(err: ConfigError) -> Self {
        EmailError::ConfigError(err.to_string())
    }
}

/// Lifecycle events that produce a templated message.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    ProposalAccepted { quote_number: String, tier: String, deposit: f64 },
    ProposalDeclined { quote_number: String, reason: String },
    DepositVerified { quote_number: String, portal_closes_at: String },
    SelectionsComplete { quote_number: String },
    PortalExpired { quote_number: String },
}

impl NotificationEvent {
    pub fn subject(&self) -> String {
        match self {
            NotificationEvent::ProposalAccepted { quote_number, .. } => {
                format!("Proposal {} accepted", quote_number)
            }
            NotificationEvent::ProposalDeclined { quote_number, .. } => {
                format!("Proposal {} declined", quote_number)
            }
            NotificationEvent::DepositVerified { quote_number, .. } => {
                format!("Deposit received for {}", quote_number)
            }
            NotificationEvent::SelectionsComplete { quote_number } => {
                format!("Selections complete for {}", quote_number)
            }
            NotificationEvent::PortalExpired { quote_number } => {
                format!("Selection portal expired for {}", quote_number)
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            NotificationEvent::ProposalAccepted { quote_number, tier, deposit } => format!(
                "Quote {} was accepted at the {} tier. Deposit due: ${:.2}.",
                quote_number, tier, deposit
            ),
            NotificationEvent::ProposalDeclined { quote_number, reason } => {
                format!("Quote {} was declined. Reason: {}", quote_number, reason)
            }
            NotificationEvent::DepositVerified { quote_number, portal_closes_at } => format!(
                "Deposit for quote {} was verified. The selection portal is open until {}.",
                quote_number, portal_closes_at
            ),
            NotificationEvent::SelectionsComplete { quote_number } => format!(
                "All color and product selections for quote {} were submitted.",
                quote_number
            ),
            NotificationEvent::PortalExpired { quote_number } => format!(
                "The selection portal for quote {} expired before selections were submitted.",
                quote_number
            ),
        }
    }
}

/// Notification collaborator seen by the services.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Best effort; implementations log failures and never return them.
    async fn notify(&self, to: &str, event: NotificationEvent);
}

/// SMTP notifier over lettre.
pub struct SmtpNotifier {
    pub config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    #[instrument(skip(config), fields(host = %config.smtp_host, port = config.smtp_port))]
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        info!("Initializing SMTP notifier");
        config.validate().map_err(EmailError::from)?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .timeout(Some(std::time::Duration::from_secs(config.connection_timeout_secs)));

        if config.use_tls {
            let tls = TlsParameters::new(config.smtp_host.clone())
                .map_err(|e| EmailError::ConfigError(format!("TLS configuration error: {}", e)))?;
            if config.use_starttls {
                builder = builder.tls(Tls::Required(tls));
            } else {
                builder = builder.tls(Tls::Wrapper(tls));
            }
        } else {
            builder = builder.tls(Tls::None);
        }

        if !config.smtp_username.is_empty() && !config.smtp_password.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        let transport = builder.build();
        info!("SMTP notifier initialized successfully");
        Ok(SmtpNotifier { config, transport })
    }

    async fn send(&self, to: &str, subject: String, body: String) -> Result<(), EmailError> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| EmailError::AddressError(format!("invalid from address: {}", e)))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| EmailError::AddressError(format!("invalid to address: {}", e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::MessageError(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| EmailError::SmtpError(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[instrument(skip(self, event), fields(to = %to))]
    async fn notify(&self, to: &str, event: NotificationEvent) {
        let subject = event.subject();
        info!("Sending notification: {}", subject);
        if let Err(e) = self.send(to, subject, event.body()).await {
            // best effort only
            error!("Failed to send notification: {}", e);
        }
    }
}

/// Notifier that only logs, for deployments without SMTP configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, to: &str, event: NotificationEvent) {
        warn!(to = %to, "SMTP not configured, notification logged only: {}", event.subject());
    }
}

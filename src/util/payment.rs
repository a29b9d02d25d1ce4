//! Payment gateway collaborator. The service layer only sees the trait;
//! the Stripe implementation speaks the payment-intent HTTP API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::config::stripe_conf::StripeConfig;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Gateway request error: {0}")]
    RequestError(String),

    #[error("Gateway request timed out")]
    Timeout,

    #[error("Gateway response could not be parsed: {0}")]
    ResponseError(String),

    #[error("Gateway rejected the request: {0}")]
    ApiError(String),
}

/// Gateway status vocabulary consumed by deposit verification. Anything the
/// gateway reports outside the known set lands in `Other` and is rejected
/// with a manual-support message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentIntentStatus {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    Canceled,
    Other(String),
}

impl From<&str> for PaymentIntentStatus {
    fn from(s: &str) -> Self {
        match s {
            "succeeded" => PaymentIntentStatus::Succeeded,
            "processing" => PaymentIntentStatus::Processing,
            "requires_payment_method" => PaymentIntentStatus::RequiresPaymentMethod,
            "canceled" => PaymentIntentStatus::Canceled,
            other => PaymentIntentStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: PaymentIntentStatus,
    /// Minor currency units (cents).
    pub amount: i64,
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError>;
}

#[derive(Debug, Deserialize)]
struct StripeIntentBody {
    id: String,
    client_secret: Option<String>,
    status: String,
    amount: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Stripe payment-intent client over HTTPS.
pub struct StripeGateway {
    config: StripeConfig,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        info!("Initializing Stripe payment gateway");
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PaymentError::RequestError(format!("client build error: {}", e)))?;
        Ok(StripeGateway { config, client })
    }

    fn map_send_error(e: reqwest::Error) -> PaymentError {
        if e.is_timeout() {
            PaymentError::Timeout
        } else {
            PaymentError::RequestError(e.to_string())
        }
    }

    async fn parse_intent(resp: reqwest::Response) -> Result<PaymentIntent, PaymentError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PaymentError::ResponseError(e.to_string()))?;
        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            error!(status = %status, "Gateway returned an error: {}", message);
            return Err(PaymentError::ApiError(message));
        }
        let intent: StripeIntentBody = serde_json::from_str(&body)
            .map_err(|e| PaymentError::ResponseError(e.to_string()))?;
        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            status: PaymentIntentStatus::from(intent.status.as_str()),
            amount: intent.amount,
            metadata: intent.metadata,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, metadata), fields(amount_cents, currency))]
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError> {
        info!("Creating payment intent for {} {}", amount_cents, currency);
        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), amount_cents.to_string()),
            ("currency".to_string(), currency.to_string()),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{}]", key), value));
        }
        let resp = self
            .client
            .post(format!("{}/v1/payment_intents", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::parse_intent(resp).await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        info!("Retrieving payment intent");
        let resp = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.config.api_base, id))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::parse_intent(resp).await
    }
}

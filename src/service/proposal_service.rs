//! Customer-facing proposal flow: tier choice, accept/decline, deposit
//! verification and the selection portal. Every lifecycle transition is a
//! compare-and-set write in the repository; this layer sequences the
//! gateway calls around them and fires notifications after the commit.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use tracing::{error, info, instrument, warn};

use crate::dto::proposal_dto::{
    AcceptProposalRequest, AreaSelectionRequest, DepositIntentResponse, DocumentResponse,
    PortalStatusResponse, RequestTierChangeRequest, TierOptionsResponse, VerifyDepositRequest,
};
use crate::model::quote::{AreaSelection, Quote, QuoteStatus, TierChangeRequest};
use crate::model::pricing::Tier;
use crate::model::settings::ContractorSettings;
use crate::pricing::tier::TierPricer;
use crate::repository::quote_repo::QuoteRepository;
use crate::repository::settings_repo::SettingsRepository;
use crate::util::documents::{DocumentKind, DocumentRenderer};
use crate::util::email::{NotificationEvent, Notifier};
use crate::util::error::ServiceError;
use crate::util::payment::{PaymentError, PaymentGateway, PaymentIntentStatus};

#[async_trait]
pub trait ProposalService: Send + Sync {
    async fn tier_options(&self, id: ObjectId) -> Result<TierOptionsResponse, ServiceError>;
    async fn accept(
        &self,
        id: ObjectId,
        request: AcceptProposalRequest,
    ) -> Result<Quote, ServiceError>;
    async fn decline(&self, id: ObjectId, reason: &str) -> Result<Quote, ServiceError>;

    async fn create_deposit_intent(
        &self,
        id: ObjectId,
    ) -> Result<DepositIntentResponse, ServiceError>;
    /// Confirm the payment with the gateway and record it. Idempotent for
    /// the same payment reference; a second, different payment conflicts.
    async fn verify_deposit(
        &self,
        id: ObjectId,
        request: VerifyDepositRequest,
    ) -> Result<Quote, ServiceError>;

    async fn portal_status(&self, id: ObjectId) -> Result<PortalStatusResponse, ServiceError>;
    async fn set_area_selection(
        &self,
        id: ObjectId,
        request: AreaSelectionRequest,
    ) -> Result<Quote, ServiceError>;
    async fn submit_selections(&self, id: ObjectId) -> Result<Quote, ServiceError>;

    async fn request_tier_change(
        &self,
        id: ObjectId,
        request: RequestTierChangeRequest,
    ) -> Result<Quote, ServiceError>;

    async fn render_document(
        &self,
        id: ObjectId,
        kind: &str,
    ) -> Result<DocumentResponse, ServiceError>;
}

pub struct ProposalServiceImpl {
    pub quote_repo: Arc<dyn QuoteRepository>,
    pub settings_repo: Arc<dyn SettingsRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub currency: String,
}

impl ProposalServiceImpl {
    pub fn new(
        quote_repo: Arc<dyn QuoteRepository>,
        settings_repo: Arc<dyn SettingsRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn DocumentRenderer>,
        currency: String,
    ) -> Self {
        ProposalServiceImpl { quote_repo, settings_repo, gateway, notifier, renderer, currency }
    }

    /// Fire a notification after the state change has committed. The send
    /// runs detached; its outcome never affects the response.
    fn notify_later(&self, to: Option<String>, event: NotificationEvent) {
        let Some(to) = to else { return };
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            notifier.notify(&to, event).await;
        });
    }

    fn quote_number(quote: &Quote) -> String {
        quote.quote_number.clone().unwrap_or_else(|| "(unnumbered)".to_string())
    }

    fn deposit_cents(quote: &Quote) -> i64 {
        (quote.totals.deposit * 100.0).round() as i64
    }

    async fn settings_for(&self, quote: &Quote) -> Result<ContractorSettings, ServiceError> {
        let settings = self.settings_repo.get_for_tenant(&quote.tenant_id).await?;
        Ok(settings)
    }

    fn map_gateway_error(e: PaymentError) -> ServiceError {
        match e {
            PaymentError::Timeout => ServiceError::PaymentPending(
                "the payment gateway timed out, retry verification shortly".to_string(),
            ),
            PaymentError::ApiError(msg) => ServiceError::PaymentFailed(msg),
            PaymentError::RequestError(msg) | PaymentError::ResponseError(msg) => {
                ServiceError::InternalError(msg)
            }
        }
    }

    /// Lazy portal lock: called from every portal read/write path. Returns
    /// the refreshed quote and whether the portal is usable now.
    async fn enforce_portal_window(
        &self,
        quote: Quote,
        settings: &ContractorSettings,
    ) -> Result<(Quote, bool), ServiceError> {
        let now = Utc::now();
        if !quote.portal_lapsed(now) {
            let open = quote.portal_open;
            return Ok((quote, open));
        }
        if !settings.portal_auto_lock {
            warn!("Portal window lapsed but auto-lock is disabled for tenant");
            return Ok((quote, true));
        }
        let id = quote.id.ok_or_else(|| {
            ServiceError::InternalError("stored quote is missing its id".to_string())
        })?;
        info!("Portal window lapsed, locking portal");
        match self.quote_repo.close_portal(id, now).await {
            Ok(locked) => {
                self.notify_later(
                    settings.owner_email.clone(),
                    NotificationEvent::PortalExpired { quote_number: Self::quote_number(&locked) },
                );
                Ok((locked, false))
            }
            // A concurrent access already performed the lock.
            Err(e) => {
                warn!("Portal lock raced with another access: {}", e);
                let refreshed = self.quote_repo.get_by_id(id).await?;
                Ok((refreshed, false))
            }
        }
    }
}

#[async_trait]
impl ProposalService for ProposalServiceImpl {
    #[instrument(skip(self), fields(id = %id))]
    async fn tier_options(&self, id: ObjectId) -> Result<TierOptionsResponse, ServiceError> {
        let quote = self.quote_repo.get_by_id(id).await?;
        if !matches!(quote.status, QuoteStatus::Sent | QuoteStatus::Accepted) {
            return Err(ServiceError::Conflict(format!(
                "tier options are only available once the quote is sent, quote is {}",
                quote.status
            )));
        }
        let settings = self.settings_for(&quote).await?;
        // An accepted quote is already repriced for its chosen tier; undo that
        // multiplier so the preview stays anchored to the base total.
        let base = quote.totals.total
            / TierPricer::multiplier(quote.selected_tier.unwrap_or(Tier::Better));
        let options = TierPricer::tier_options(base, settings.deposit_percent);
        Ok(TierOptionsResponse { quote_number: quote.quote_number, options })
    }

    #[instrument(skip(self), fields(id = %id, tier = %request.tier))]
    async fn accept(
        &self,
        id: ObjectId,
        request: AcceptProposalRequest,
    ) -> Result<Quote, ServiceError> {
        info!("Accepting proposal");
        let quote = self.quote_repo.get_by_id(id).await?;
        if quote.status != QuoteStatus::Sent {
            return Err(ServiceError::Conflict(format!(
                "only sent quotes can be accepted, quote is {}",
                quote.status
            )));
        }
        let now = Utc::now();
        if quote.is_expired(now) {
            return Err(ServiceError::Conflict(format!(
                "quote expired on {}",
                quote.valid_until.map(|d| d.to_rfc3339()).unwrap_or_default()
            )));
        }

        let settings = self.settings_for(&quote).await?;
        let totals = TierPricer::reprice(&quote.totals, request.tier, settings.deposit_percent);
        let accepted = self.quote_repo.mark_accepted(id, request.tier, totals).await?;

        let event = NotificationEvent::ProposalAccepted {
            quote_number: Self::quote_number(&accepted),
            tier: request.tier.to_string(),
            deposit: accepted.totals.deposit,
        };
        self.notify_later(accepted.client_email.clone(), event.clone());
        self.notify_later(settings.owner_email.clone(), event);
        Ok(accepted)
    }

    #[instrument(skip(self, reason), fields(id = %id))]
    async fn decline(&self, id: ObjectId, reason: &str) -> Result<Quote, ServiceError> {
        info!("Declining proposal");
        if reason.trim().is_empty() {
            return Err(ServiceError::InvalidInput("a decline reason is required".to_string()));
        }
        let declined = self.quote_repo.mark_declined(id, reason.trim()).await?;
        let settings = self.settings_for(&declined).await?;
        self.notify_later(
            settings.owner_email,
            NotificationEvent::ProposalDeclined {
                quote_number: Self::quote_number(&declined),
                reason: reason.trim().to_string(),
            },
        );
        Ok(declined)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn create_deposit_intent(
        &self,
        id: ObjectId,
    ) -> Result<DepositIntentResponse, ServiceError> {
        info!("Creating deposit payment intent");
        let quote = self.quote_repo.get_by_id(id).await?;
        if quote.status != QuoteStatus::Accepted {
            return Err(ServiceError::Conflict(format!(
                "deposit is only payable on accepted quotes, quote is {}",
                quote.status
            )));
        }
        let amount_cents = Self::deposit_cents(&quote);
        if amount_cents <= 0 {
            return Err(ServiceError::InvalidInput(
                "quote has no deposit amount to collect".to_string(),
            ));
        }

        let mut metadata = HashMap::new();
        metadata.insert("quote_id".to_string(), id.to_hex());
        metadata.insert("tenant_id".to_string(), quote.tenant_id.clone());
        if let Some(tier) = quote.selected_tier {
            metadata.insert("tier".to_string(), tier.to_string());
        }
        if let Some(number) = &quote.quote_number {
            metadata.insert("quote_number".to_string(), number.clone());
        }

        let intent = self
            .gateway
            .create_payment_intent(amount_cents, &self.currency, metadata)
            .await
            .map_err(Self::map_gateway_error)?;
        Ok(DepositIntentResponse {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            amount_cents: intent.amount,
            currency: self.currency.clone(),
        })
    }

    #[instrument(skip(self, request), fields(id = %id))]
    async fn verify_deposit(
        &self,
        id: ObjectId,
        request: VerifyDepositRequest,
    ) -> Result<Quote, ServiceError> {
        info!("Verifying deposit payment");
        let reference = request.payment_intent_id.as_str();
        let quote = self.quote_repo.get_by_id(id).await?;

        // Idempotent replay of an already-verified payment.
        if let Some(existing) = &quote.deposit_transaction_id {
            if existing == reference {
                info!("Deposit already verified with this reference, replaying result");
                return Ok(quote);
            }
            return Err(ServiceError::Conflict(
                "a deposit is already recorded for a different payment".to_string(),
            ));
        }
        if quote.status != QuoteStatus::Accepted {
            return Err(ServiceError::Conflict(format!(
                "deposit can only be verified on accepted quotes, quote is {}",
                quote.status
            )));
        }

        let intent = self
            .gateway
            .retrieve_payment_intent(reference)
            .await
            .map_err(Self::map_gateway_error)?;

        match intent.status {
            PaymentIntentStatus::Succeeded => {}
            PaymentIntentStatus::Processing => {
                return Err(ServiceError::PaymentPending(
                    "the payment is still processing, retry verification shortly".to_string(),
                ));
            }
            PaymentIntentStatus::RequiresPaymentMethod | PaymentIntentStatus::Canceled => {
                return Err(ServiceError::PaymentFailed(
                    "the payment was not completed".to_string(),
                ));
            }
            PaymentIntentStatus::Other(status) => {
                error!("Gateway reported unrecognized payment status: {}", status);
                return Err(ServiceError::PaymentFailed(format!(
                    "the payment is in an unrecognized state ({}), contact support",
                    status
                )));
            }
        }

        let expected = Self::deposit_cents(&quote);
        if intent.amount != expected {
            error!(expected, actual = intent.amount, "Deposit amount mismatch");
            return Err(ServiceError::PaymentFailed(format!(
                "payment amount {} does not match the required deposit {}",
                intent.amount, expected
            )));
        }
        if intent.metadata.get("quote_id").map(String::as_str) != Some(id.to_hex().as_str()) {
            error!("Payment intent does not reference this quote");
            return Err(ServiceError::PaymentFailed(
                "the payment does not reference this quote".to_string(),
            ));
        }

        let settings = self.settings_for(&quote).await?;
        let now = Utc::now();
        let closes_at = now + Duration::days(settings.portal_duration_days);

        let recorded = match self.quote_repo.record_deposit(id, reference, now, closes_at).await {
            Ok(q) => q,
            Err(e) => {
                // The charge already went through; distinguish a concurrent
                // identical verification from a genuine inconsistency.
                let refreshed = self.quote_repo.get_by_id(id).await.map_err(|fetch| {
                    error!("Deposit recorded at gateway but state is unreadable: {}", fetch);
                    ServiceError::ConsistencyFailure {
                        message: "payment succeeded but the quote could not be updated"
                            .to_string(),
                        reference: reference.to_string(),
                    }
                })?;
                if refreshed.deposit_transaction_id.as_deref() == Some(reference) {
                    info!("Concurrent verification recorded the same payment");
                    refreshed
                } else if refreshed.deposit_transaction_id.is_some() {
                    return Err(ServiceError::Conflict(
                        "a deposit is already recorded for a different payment".to_string(),
                    ));
                } else {
                    error!("Deposit verified at gateway but local write failed: {}", e);
                    return Err(ServiceError::ConsistencyFailure {
                        message: "payment succeeded but the quote could not be updated"
                            .to_string(),
                        reference: reference.to_string(),
                    });
                }
            }
        };

        let event = NotificationEvent::DepositVerified {
            quote_number: Self::quote_number(&recorded),
            portal_closes_at: closes_at.to_rfc3339(),
        };
        self.notify_later(recorded.client_email.clone(), event.clone());
        self.notify_later(settings.owner_email.clone(), event);
        info!("Deposit verified, selection portal open until {}", closes_at);
        Ok(recorded)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn portal_status(&self, id: ObjectId) -> Result<PortalStatusResponse, ServiceError> {
        let quote = self.quote_repo.get_by_id(id).await?;
        let settings = self.settings_for(&quote).await?;
        let (quote, open) = self.enforce_portal_window(quote, &settings).await?;
        let expired = quote.portal_closes_at.is_some_and(|c| Utc::now() > c);
        Ok(PortalStatusResponse {
            open,
            expired,
            closes_at: quote.portal_closes_at.map(|d| d.to_rfc3339()),
            closed_at: quote.portal_closed_at.map(|d| d.to_rfc3339()),
            selections_complete: quote.selections_complete(),
            incomplete_areas: quote.incomplete_areas(),
        })
    }

    #[instrument(skip(self, request), fields(id = %id, area_index = request.area_index))]
    async fn set_area_selection(
        &self,
        id: ObjectId,
        request: AreaSelectionRequest,
    ) -> Result<Quote, ServiceError> {
        let quote = self.quote_repo.get_by_id(id).await?;
        if quote.status != QuoteStatus::DepositPaid {
            return Err(ServiceError::Conflict(format!(
                "selections require a paid deposit, quote is {}",
                quote.status
            )));
        }
        let settings = self.settings_for(&quote).await?;
        let (quote, open) = self.enforce_portal_window(quote, &settings).await?;
        if !open {
            return Err(ServiceError::Conflict("the selection portal has closed".to_string()));
        }
        if request.area_index >= quote.areas.len() {
            return Err(ServiceError::InvalidInput(format!(
                "area index {} is out of range, quote has {} areas",
                request.area_index,
                quote.areas.len()
            )));
        }

        let selection = AreaSelection {
            brand: request.brand,
            product: request.product,
            color: request.color,
            sheen: request.sheen,
            custom_color: request.custom_color,
            other_brand: request.other_brand,
        };
        let updated =
            self.quote_repo.set_area_selection(id, request.area_index, selection).await?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn submit_selections(&self, id: ObjectId) -> Result<Quote, ServiceError> {
        info!("Submitting portal selections");
        let quote = self.quote_repo.get_by_id(id).await?;
        if quote.status != QuoteStatus::DepositPaid {
            return Err(ServiceError::Conflict(format!(
                "selections require a paid deposit, quote is {}",
                quote.status
            )));
        }
        let settings = self.settings_for(&quote).await?;
        let (quote, open) = self.enforce_portal_window(quote, &settings).await?;
        if !open {
            return Err(ServiceError::Conflict("the selection portal has closed".to_string()));
        }

        let incomplete = quote.incomplete_areas();
        if !incomplete.is_empty() {
            return Err(ServiceError::InvalidInput(format!(
                "selections are incomplete for {} area(s): {}",
                incomplete.len(),
                incomplete.join(", ")
            )));
        }

        let completed = self.quote_repo.complete_selections(id, Utc::now()).await?;
        let event = NotificationEvent::SelectionsComplete {
            quote_number: Self::quote_number(&completed),
        };
        self.notify_later(completed.client_email.clone(), event.clone());
        self.notify_later(settings.owner_email.clone(), event);
        Ok(completed)
    }

    #[instrument(skip(self), fields(id = %id, tier = %request.requested_tier))]
    async fn request_tier_change(
        &self,
        id: ObjectId,
        request: RequestTierChangeRequest,
    ) -> Result<Quote, ServiceError> {
        info!("Recording tier change request");
        let quote = self.quote_repo.get_by_id(id).await?;
        if quote.status != QuoteStatus::DepositPaid {
            return Err(ServiceError::Conflict(format!(
                "tier changes can only be requested after the deposit, quote is {}",
                quote.status
            )));
        }
        if quote.selected_tier == Some(request.requested_tier) {
            return Err(ServiceError::InvalidInput(format!(
                "quote is already at the {} tier",
                request.requested_tier
            )));
        }
        let updated = self
            .quote_repo
            .set_tier_change_request(
                id,
                TierChangeRequest {
                    requested_tier: request.requested_tier,
                    requested_at: Utc::now(),
                },
            )
            .await?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(id = %id, kind = %kind))]
    async fn render_document(
        &self,
        id: ObjectId,
        kind: &str,
    ) -> Result<DocumentResponse, ServiceError> {
        let kind = DocumentKind::from_str(kind)
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        let quote = self.quote_repo.get_by_id(id).await?;
        if !quote.selections_complete() {
            return Err(ServiceError::Conflict(
                "documents are only available once selections are complete".to_string(),
            ));
        }
        let content = self
            .renderer
            .render(&quote, kind)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        Ok(DocumentResponse { kind: kind_label(kind).to_string(), content })
    }
}

fn kind_label(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::WorkOrder => "work-order",
        DocumentKind::MaterialList => "material-list",
        DocumentKind::StoreOrder => "store-order",
    }
}

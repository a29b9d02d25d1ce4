use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use tracing::{error, info, instrument};

use crate::dto::quote_dto::{
    ApproveTierChangeRequest, CreateQuoteRequest, QuoteResponseDto, UpdateQuoteRequest,
    UpdateSettingsRequest,
};
use crate::model::pricing::Tier;
use crate::model::quote::{Quote, QuoteStatus, QuoteTotals};
use crate::model::settings::ContractorSettings;
use crate::pricing::calculator::PricingCalculator;
use crate::pricing::markup::MarkupEngine;
use crate::pricing::tier::TierPricer;
use crate::repository::quote_repo::QuoteRepository;
use crate::repository::settings_repo::SettingsRepository;
use crate::util::error::ServiceError;

/// Staff-facing operations: drafting, editing, sending and settings.
#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn create_quote(&self, request: CreateQuoteRequest) -> Result<Quote, ServiceError>;
    async fn get_quote(&self, id: ObjectId) -> Result<QuoteResponseDto, ServiceError>;
    async fn update_quote(
        &self,
        id: ObjectId,
        request: UpdateQuoteRequest,
    ) -> Result<Quote, ServiceError>;
    async fn deactivate_quote(&self, id: ObjectId) -> Result<(), ServiceError>;
    async fn list_quotes(
        &self,
        tenant_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<QuoteResponseDto>, ServiceError>;
    /// draft → sent, stamping the validity window from the tenant settings.
    async fn send_quote(&self, id: ObjectId) -> Result<Quote, ServiceError>;

    async fn get_settings(&self, tenant_id: &str) -> Result<ContractorSettings, ServiceError>;
    async fn update_settings(
        &self,
        tenant_id: &str,
        request: UpdateSettingsRequest,
    ) -> Result<ContractorSettings, ServiceError>;

    /// Resolve a pending post-deposit tier change request.
    async fn resolve_tier_change(
        &self,
        id: ObjectId,
        request: ApproveTierChangeRequest,
    ) -> Result<Quote, ServiceError>;
}

pub struct QuoteServiceImpl {
    pub quote_repo: Arc<dyn QuoteRepository>,
    pub settings_repo: Arc<dyn SettingsRepository>,
}

impl QuoteServiceImpl {
    pub fn new(
        quote_repo: Arc<dyn QuoteRepository>,
        settings_repo: Arc<dyn SettingsRepository>,
    ) -> Self {
        QuoteServiceImpl { quote_repo, settings_repo }
    }

    /// Drafts are priced at the base tier; accept-time tier choice rescales.
    fn price(quote: &Quote, settings: &ContractorSettings) -> QuoteTotals {
        let raw = PricingCalculator::calculate_with_fallback(
            &quote.pricing_scheme,
            &quote.areas,
            quote.turnkey.as_ref(),
            &quote.product_sets,
            Tier::Better,
        );
        MarkupEngine::apply(&raw, settings)
    }
}

#[async_trait]
impl QuoteService for QuoteServiceImpl {
    #[instrument(skip(self, request), fields(tenant_id = %request.tenant_id))]
    async fn create_quote(&self, request: CreateQuoteRequest) -> Result<Quote, ServiceError> {
        info!("Creating new quote draft");
        let settings = self.settings_repo.get_for_tenant(&request.tenant_id).await?;

        let mut quote = Quote {
            id: None,
            quote_number: None,
            tenant_id: request.tenant_id,
            client_id: request.client_id,
            client_email: request.client_email,
            pricing_scheme: request.pricing_scheme,
            turnkey: request.turnkey,
            areas: request.areas,
            product_sets: request.product_sets,
            totals: QuoteTotals::default(),
            status: QuoteStatus::Draft,
            selected_tier: None,
            decline_reason: None,
            deposit_transaction_id: None,
            tier_change_request: None,
            portal_open: false,
            portal_opened_at: None,
            portal_closes_at: None,
            portal_closed_at: None,
            valid_until: None,
            active: true,
            created_at: None,
            updated_at: None,
        };
        quote.totals = Self::price(&quote, &settings);

        let created = self.quote_repo.create(quote).await?;
        info!(quote_number = ?created.quote_number, "Quote draft created");
        Ok(created)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_quote(&self, id: ObjectId) -> Result<QuoteResponseDto, ServiceError> {
        let quote = self.quote_repo.get_by_id(id).await?;
        Ok(QuoteResponseDto::from(quote))
    }

    #[instrument(skip(self, request), fields(id = %id))]
    async fn update_quote(
        &self,
        id: ObjectId,
        request: UpdateQuoteRequest,
    ) -> Result<Quote, ServiceError> {
        info!("Updating quote draft");
        let mut quote = self.quote_repo.get_by_id(id).await?;
        if quote.status != QuoteStatus::Draft {
            error!("Rejected edit of non-draft quote in status {}", quote.status);
            return Err(ServiceError::Conflict(format!(
                "only draft quotes can be edited, quote is {}",
                quote.status
            )));
        }

        quote.pricing_scheme = request.pricing_scheme;
        quote.turnkey = request.turnkey;
        quote.areas = request.areas;
        quote.product_sets = request.product_sets;
        quote.client_email = request.client_email;

        let settings = self.settings_repo.get_for_tenant(&quote.tenant_id).await?;
        quote.totals = Self::price(&quote, &settings);

        let updated = self.quote_repo.update(id, quote).await?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn deactivate_quote(&self, id: ObjectId) -> Result<(), ServiceError> {
        let quote = self.quote_repo.get_by_id(id).await?;
        // A verified payment references this quote; it must stay queryable.
        if quote.deposit_verified() {
            return Err(ServiceError::Conflict(
                "quotes with a recorded deposit cannot be deactivated".to_string(),
            ));
        }
        self.quote_repo.deactivate(id).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, page, limit))]
    async fn list_quotes(
        &self,
        tenant_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<QuoteResponseDto>, ServiceError> {
        let quotes = self.quote_repo.list(tenant_id, page, limit.min(100)).await?;
        Ok(quotes.into_iter().map(QuoteResponseDto::from).collect())
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn send_quote(&self, id: ObjectId) -> Result<Quote, ServiceError> {
        info!("Sending quote to client");
        let quote = self.quote_repo.get_by_id(id).await?;
        let settings = self.settings_repo.get_for_tenant(&quote.tenant_id).await?;
        let valid_until = Utc::now() + Duration::days(settings.quote_valid_days);
        let sent = self.quote_repo.mark_sent(id, valid_until).await?;
        info!(quote_number = ?sent.quote_number, "Quote sent");
        Ok(sent)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    async fn get_settings(&self, tenant_id: &str) -> Result<ContractorSettings, ServiceError> {
        let settings = self.settings_repo.get_for_tenant(tenant_id).await?;
        Ok(settings)
    }

    #[instrument(skip(self, request), fields(tenant_id = %tenant_id))]
    async fn update_settings(
        &self,
        tenant_id: &str,
        request: UpdateSettingsRequest,
    ) -> Result<ContractorSettings, ServiceError> {
        info!("Updating contractor settings");
        let existing = self.settings_repo.get_for_tenant(tenant_id).await?;
        let settings = ContractorSettings {
            id: existing.id,
            tenant_id: tenant_id.to_string(),
            labor_markup_percent: request.labor_markup_percent,
            material_markup_percent: request.material_markup_percent,
            overhead_percent: request.overhead_percent,
            profit_margin_percent: request.profit_margin_percent,
            tax_percent: request.tax_percent,
            deposit_percent: request.deposit_percent,
            quote_valid_days: request.quote_valid_days,
            portal_duration_days: request.portal_duration_days,
            owner_email: request.owner_email,
            portal_auto_lock: request.portal_auto_lock,
        };
        settings.validate().map_err(ServiceError::InvalidInput)?;
        let saved = self.settings_repo.upsert(settings).await?;
        Ok(saved)
    }

    #[instrument(skip(self), fields(id = %id, approve = request.approve))]
    async fn resolve_tier_change(
        &self,
        id: ObjectId,
        request: ApproveTierChangeRequest,
    ) -> Result<Quote, ServiceError> {
        let quote = self.quote_repo.get_by_id(id).await?;
        let pending = quote.tier_change_request.as_ref().ok_or_else(|| {
            ServiceError::Conflict("no pending tier change request".to_string())
        })?;

        if !request.approve {
            info!("Rejecting tier change request");
            let cleared = self.quote_repo.clear_tier_change_request(id).await?;
            return Ok(cleared);
        }

        let settings = self.settings_repo.get_for_tenant(&quote.tenant_id).await?;
        let current = quote.selected_tier.unwrap_or(Tier::Better);
        let totals = TierPricer::rescale(
            &quote.totals,
            current,
            pending.requested_tier,
            settings.deposit_percent,
        );
        info!(
            from = %current,
            to = %pending.requested_tier,
            "Approving tier change and re-pricing"
        );
        let updated = self.quote_repo.apply_tier_change(id, pending.requested_tier, totals).await?;
        Ok(updated)
    }
}

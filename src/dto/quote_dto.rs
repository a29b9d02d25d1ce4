use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::pricing::{PricingScheme, ProductSet, Tier};
use crate::model::quote::{
    Area, Quote, QuoteStatus, QuoteTotals, TierChangeRequest, TurnkeyDetails,
};

// --- Validated DTOs for request validation ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuoteRequest {
    #[validate(length(min = 1, max = 100))]
    pub tenant_id: String,

    #[validate(length(min = 1, max = 100))]
    pub client_id: String,

    #[validate(email)]
    pub client_email: Option<String>,

    pub pricing_scheme: PricingScheme,

    pub turnkey: Option<TurnkeyDetails>,

    #[validate(length(min = 1, message = "quote needs at least one area"))]
    pub areas: Vec<Area>,

    #[serde(default)]
    pub product_sets: Vec<ProductSet>,
}

/// Staff edit while drafting; the full measured content may be replaced.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateQuoteRequest {
    pub pricing_scheme: PricingScheme,

    pub turnkey: Option<TurnkeyDetails>,

    #[validate(length(min = 1, message = "quote needs at least one area"))]
    pub areas: Vec<Area>,

    #[serde(default)]
    pub product_sets: Vec<ProductSet>,

    #[validate(email)]
    pub client_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListQuotesQuery {
    pub tenant_id: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(range(min = 0.0, max = 100.0))]
    pub labor_markup_percent: f64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub material_markup_percent: f64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub overhead_percent: f64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub profit_margin_percent: f64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub tax_percent: f64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub deposit_percent: f64,

    #[validate(range(min = 1, max = 365))]
    pub quote_valid_days: i64,

    #[validate(range(min = 1, max = 365))]
    pub portal_duration_days: i64,

    #[validate(email)]
    pub owner_email: Option<String>,

    #[serde(default = "default_auto_lock")]
    pub portal_auto_lock: bool,
}

fn default_auto_lock() -> bool {
    true
}

/// Staff decision on a pending tier change request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApproveTierChangeRequest {
    pub approve: bool,
}

/// Quote projection returned to clients. Lifecycle booleans are derived
/// from the stored status at response time, never stored separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponseDto {
    pub id: String,
    pub quote_number: Option<String>,
    pub tenant_id: String,
    pub client_id: String,
    pub client_email: Option<String>,
    pub status: QuoteStatus,
    pub selected_tier: Option<Tier>,
    pub decline_reason: Option<String>,
    pub totals: QuoteTotals,
    pub areas: Vec<Area>,
    pub deposit_verified: bool,
    pub selections_complete: bool,
    pub tier_change_request: Option<TierChangeRequest>,
    pub portal_open: bool,
    pub portal_closes_at: Option<String>,
    pub valid_until: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Quote> for QuoteResponseDto {
    fn from(quote: Quote) -> Self {
        QuoteResponseDto {
            id: quote.id.map(|id| id.to_hex()).unwrap_or_default(),
            quote_number: quote.quote_number.clone(),
            tenant_id: quote.tenant_id.clone(),
            client_id: quote.client_id.clone(),
            client_email: quote.client_email.clone(),
            status: quote.status,
            selected_tier: quote.selected_tier,
            decline_reason: quote.decline_reason.clone(),
            totals: quote.totals.clone(),
            areas: quote.areas.clone(),
            deposit_verified: quote.deposit_verified(),
            selections_complete: quote.selections_complete(),
            tier_change_request: quote.tier_change_request.clone(),
            portal_open: quote.portal_open,
            portal_closes_at: quote.portal_closes_at.map(|d| d.to_rfc3339()),
            valid_until: quote.valid_until.map(|d| d.to_rfc3339()),
            created_at: quote.created_at.map(|d| d.to_rfc3339()),
            updated_at: quote.updated_at.map(|d| d.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_create_request_rejects_empty_areas() {
        let json = r#"{
            "tenant_id": "t1",
            "client_id": "c1",
            "client_email": null,
            "pricing_scheme": {
                "model": "rate_sqft",
                "rules": {},
                "default_rate": 1.5,
                "materials_included": true,
                "coverage_sqft_per_gallon": 350.0,
                "waste_factor": 1.1,
                "turnkey_interior_rate": null,
                "turnkey_exterior_rate": null
            },
            "turnkey": null,
            "areas": []
        }"#;
        let req: CreateQuoteRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_settings_request_rejects_out_of_range_percent() {
        let req = UpdateSettingsRequest {
            labor_markup_percent: 0.0,
            material_markup_percent: 25.0,
            overhead_percent: 10.0,
            profit_margin_percent: 130.0,
            tax_percent: 8.25,
            deposit_percent: 50.0,
            quote_valid_days: 30,
            portal_duration_days: 14,
            owner_email: None,
            portal_auto_lock: true,
        };
        assert!(req.validate().is_err());
    }
}

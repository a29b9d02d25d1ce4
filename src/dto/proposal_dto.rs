//! Request and response shapes for the customer-facing proposal and
//! selection-portal endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::pricing::Tier;
use crate::pricing::tier::TierQuote;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptProposalRequest {
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeclineProposalRequest {
    #[validate(length(min = 1, max = 1000, message = "a decline reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyDepositRequest {
    #[validate(length(min = 1, max = 200))]
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AreaSelectionRequest {
    pub area_index: usize,

    #[validate(length(max = 100))]
    pub brand: Option<String>,

    #[validate(length(max = 200))]
    pub product: Option<String>,

    #[validate(length(max = 100))]
    pub color: Option<String>,

    #[validate(length(max = 50))]
    pub sheen: Option<String>,

    #[serde(default)]
    pub custom_color: bool,

    #[serde(default)]
    pub other_brand: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTierChangeRequest {
    pub requested_tier: Tier,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierOptionsResponse {
    pub quote_number: Option<String>,
    pub options: Vec<TierQuote>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositIntentResponse {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    /// Minor currency units (cents).
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalStatusResponse {
    pub open: bool,
    /// True once the access window has elapsed, whether or not the lazy
    /// lock has already run. A portal closed by completing selections
    /// before the deadline reports false here.
    pub expired: bool,
    pub closes_at: Option<String>,
    pub closed_at: Option<String>,
    pub selections_complete: bool,
    /// Names of areas still missing a color or sheen choice.
    pub incomplete_areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub kind: String,
    pub content: String,
}

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::pricing::{Category, PricingScheme, ProductSet, Tier};

/// Lifecycle status of a quote. The portal/deposit/selection booleans the
/// API exposes are derived from this plus a handful of fields, never stored
/// as independent flags that could contradict each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Declined,
    DepositPaid,
    SelectionsComplete,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Declined => "declined",
            QuoteStatus::DepositPaid => "deposit_paid",
            QuoteStatus::SelectionsComplete => "selections_complete",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuoteStatus::Declined | QuoteStatus::SelectionsComplete)
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementUnit {
    Sqft,
    LinearFoot,
    Hour,
    Unit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationMethod {
    Brush,
    #[default]
    Roll,
    Spray,
}

/// Raw measured dimensions in feet, from which a quantity can be derived
/// when the estimator did not enter one directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborItem {
    pub category: Category,
    pub unit: MeasurementUnit,
    /// Direct quantity; when absent it is derived from `dimensions`.
    pub quantity: Option<f64>,
    pub dimensions: Option<Dimensions>,
    pub coats: u32,
    /// Per-item rate override; falls back to the scheme's rules when absent.
    pub labor_rate: Option<f64>,
    pub selected: bool,
    pub gallons_override: Option<f64>,
    #[serde(default)]
    pub application: ApplicationMethod,
}

/// Customer color/product choice for one area, captured through the portal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AreaSelection {
    pub brand: Option<String>,
    pub product: Option<String>,
    pub color: Option<String>,
    pub sheen: Option<String>,
    #[serde(default)]
    pub custom_color: bool,
    #[serde(default)]
    pub other_brand: bool,
}

impl AreaSelection {
    /// A selection is complete when a color choice exists (a named color or
    /// brand, or an explicit custom/other-brand flag) and a sheen is chosen.
    pub fn is_complete(&self) -> bool {
        let color_chosen = self.color.as_deref().is_some_and(|c| !c.is_empty())
            || self.brand.as_deref().is_some_and(|b| !b.is_empty())
            || self.custom_color
            || self.other_brand;
        let sheen_chosen = self.sheen.as_deref().is_some_and(|s| !s.is_empty());
        color_chosen && sheen_chosen
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub name: String,
    pub items: Vec<LaborItem>,
    pub selection: Option<AreaSelection>,
}

impl Area {
    pub fn selection_complete(&self) -> bool {
        self.selection.as_ref().is_some_and(|s| s.is_complete())
    }
}

/// Turnkey-model inputs that live on the quote rather than on an area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnkeyDetails {
    pub home_sqft: f64,
    pub scope: JobScope,
    pub condition: SurfaceCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobScope {
    Interior,
    Exterior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceCondition {
    Excellent,
    Good,
    Average,
    Fair,
    Poor,
}

/// Per-area slice of the pre-markup pricing result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaBreakdown {
    pub area_name: String,
    pub labor: f64,
    pub material: f64,
    pub sqft: f64,
}

/// Stored totals. Every amount is rounded to 2 digits at the time it is
/// written here; intermediate cascade math is carried at full precision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub labor_total: f64,
    pub material_total: f64,
    pub total_sqft: f64,
    pub labor_markup_amount: f64,
    pub material_markup_amount: f64,
    pub overhead_amount: f64,
    pub profit_amount: f64,
    pub tax: f64,
    pub total: f64,
    pub deposit: f64,
    pub balance: f64,
    pub breakdown: Vec<AreaBreakdown>,
}

/// Pending customer request to move to a different tier after the deposit
/// was paid. Never mutates the price until staff approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierChangeRequest {
    pub requested_tier: Tier,
    pub requested_at: DateTime<Utc>,
}

/// The central aggregate. One Mongo document per quote, so every
/// multi-field lifecycle transition is a single atomic write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub quote_number: Option<String>,
    pub tenant_id: String,
    pub client_id: String,
    pub client_email: Option<String>,

    pub pricing_scheme: PricingScheme,
    pub turnkey: Option<TurnkeyDetails>,
    pub areas: Vec<Area>,
    pub product_sets: Vec<ProductSet>,

    #[serde(default)]
    pub totals: QuoteTotals,

    pub status: QuoteStatus,
    pub selected_tier: Option<Tier>,
    pub decline_reason: Option<String>,

    pub deposit_transaction_id: Option<String>,
    pub tier_change_request: Option<TierChangeRequest>,

    pub portal_open: bool,
    pub portal_opened_at: Option<DateTime<Utc>>,
    pub portal_closes_at: Option<DateTime<Utc>>,
    pub portal_closed_at: Option<DateTime<Utc>>,

    pub valid_until: Option<DateTime<Utc>>,

    /// Soft-deactivation flag; quotes are never hard-deleted once a
    /// transaction references them.
    pub active: bool,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quote {
    /// Derived, never stored independently of `deposit_transaction_id`.
    pub fn deposit_verified(&self) -> bool {
        self.deposit_transaction_id.is_some()
    }

    pub fn selections_complete(&self) -> bool {
        self.status == QuoteStatus::SelectionsComplete
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|v| now > v)
    }

    /// Whether the portal window has lapsed. The stored `portal_open` flag
    /// lags this until the next access performs the lazy lock.
    pub fn portal_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.portal_open && self.portal_closes_at.is_some_and(|c| now > c)
    }

    pub fn incomplete_areas(&self) -> Vec<String> {
        self.areas
            .iter()
            .filter(|a| !a.selection_complete())
            .map(|a| a.name.clone())
            .collect()
    }
}

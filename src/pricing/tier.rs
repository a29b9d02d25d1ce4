//! Good/better/best tier derivation from a base-priced quote.

use serde::Serialize;

use crate::model::pricing::Tier;
use crate::model::quote::QuoteTotals;
use crate::pricing::markup::round2;

pub struct TierPricer;

#[derive(Debug, Clone, Serialize)]
pub struct TierQuote {
    pub tier: Tier,
    pub total: f64,
    pub deposit: f64,
    pub balance: f64,
}

impl TierPricer {
    pub fn multiplier(tier: Tier) -> f64 {
        match tier {
            Tier::Good => 0.85,
            Tier::Better => 1.00,
            Tier::Best => 1.15,
        }
    }

    /// Tier price points for the customer-facing proposal, derived from the
    /// engine's base total.
    pub fn tier_options(base_total: f64, deposit_percent: f64) -> Vec<TierQuote> {
        [Tier::Good, Tier::Better, Tier::Best]
            .into_iter()
            .map(|tier| {
                let total = round2(base_total * Self::multiplier(tier));
                let deposit = round2(total * deposit_percent / 100.0);
                TierQuote { tier, total, deposit, balance: round2(total - deposit) }
            })
            .collect()
    }

    /// Move already-tier-priced totals from one tier to another, e.g. when
    /// staff approve a post-deposit tier change.
    pub fn rescale(
        totals: &QuoteTotals,
        from: Tier,
        to: Tier,
        deposit_percent: f64,
    ) -> QuoteTotals {
        let ratio = Self::multiplier(to) / Self::multiplier(from);
        Self::scale(totals, ratio, deposit_percent)
    }

    /// Re-price base (better-tier) totals for the chosen tier. All monetary
    /// components scale by the tier multiplier so the cascade stays
    /// self-consistent; deposit and balance are recomputed from the new total.
    pub fn reprice(totals: &QuoteTotals, tier: Tier, deposit_percent: f64) -> QuoteTotals {
        Self::scale(totals, Self::multiplier(tier), deposit_percent)
    }

    fn scale(totals: &QuoteTotals, m: f64, deposit_percent: f64) -> QuoteTotals {
        let total = round2(totals.total * m);
        let deposit = round2(total * deposit_percent / 100.0);
        QuoteTotals {
            labor_total: round2(totals.labor_total * m),
            material_total: round2(totals.material_total * m),
            total_sqft: totals.total_sqft,
            labor_markup_amount: round2(totals.labor_markup_amount * m),
            material_markup_amount: round2(totals.material_markup_amount * m),
            overhead_amount: round2(totals.overhead_amount * m),
            profit_amount: round2(totals.profit_amount * m),
            tax: round2(totals.tax * m),
            total,
            deposit,
            balance: round2(total - deposit),
            breakdown: totals.breakdown.clone(),
        }
    }
}

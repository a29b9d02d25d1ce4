//! The universal markup cascade. Each step builds on the previous
//! subtotal, full precision carried throughout, rounding only on the
//! stored fields.

use crate::model::quote::QuoteTotals;
use crate::model::settings::ContractorSettings;
use crate::pricing::calculator::RawPricing;

/// Round to 2 fractional digits at a reporting/storage boundary.
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub struct MarkupEngine;

impl MarkupEngine {
    /// labor markup → material markup → overhead → profit → tax → deposit.
    pub fn apply(raw: &RawPricing, settings: &ContractorSettings) -> QuoteTotals {
        let labor_with_markup = raw.labor_total * (1.0 + settings.labor_markup_percent / 100.0);
        let material_with_markup =
            raw.material_total * (1.0 + settings.material_markup_percent / 100.0);
        let subtotal_before_overhead = labor_with_markup + material_with_markup;
        let subtotal_before_profit =
            subtotal_before_overhead * (1.0 + settings.overhead_percent / 100.0);
        let subtotal = subtotal_before_profit * (1.0 + settings.profit_margin_percent / 100.0);
        let tax = subtotal * settings.tax_percent / 100.0;
        let total = subtotal + tax;
        let deposit = total * settings.deposit_percent / 100.0;
        let balance = total - deposit;

        QuoteTotals {
            labor_total: round2(raw.labor_total),
            material_total: round2(raw.material_total),
            total_sqft: raw.total_sqft,
            labor_markup_amount: round2(labor_with_markup - raw.labor_total),
            material_markup_amount: round2(material_with_markup - raw.material_total),
            overhead_amount: round2(subtotal_before_profit - subtotal_before_overhead),
            profit_amount: round2(subtotal - subtotal_before_profit),
            tax: round2(tax),
            total: round2(total),
            deposit: round2(deposit),
            balance: round2(balance),
            breakdown: raw
                .breakdown
                .iter()
                .map(|b| crate::model::quote::AreaBreakdown {
                    area_name: b.area_name.clone(),
                    labor: round2(b.labor),
                    material: round2(b.material),
                    sqft: b.sqft,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::settings::ContractorSettings;

    fn raw(labor: f64, material: f64) -> RawPricing {
        RawPricing { labor_total: labor, material_total: material, total_sqft: 0.0, breakdown: vec![] }
    }

    #[test]
    fn test_cascade_order_matters() {
        let mut s = ContractorSettings::defaults_for("t1");
        s.labor_markup_percent = 10.0;
        s.material_markup_percent = 20.0;
        s.overhead_percent = 10.0;
        s.profit_margin_percent = 20.0;
        s.tax_percent = 10.0;
        s.deposit_percent = 50.0;

        let totals = MarkupEngine::apply(&raw(1000.0, 500.0), &s);
        // labor 1100, material 600, overhead on 1700 -> 1870,
        // profit -> 2244, tax -> 224.40, total 2468.40
        assert_eq!(totals.total, 2468.40);
        assert_eq!(totals.tax, 224.40);
        assert_eq!(totals.deposit, 1234.20);
        assert_eq!(totals.balance, 1234.20);
        assert_eq!(totals.overhead_amount, 170.0);
        assert_eq!(totals.profit_amount, 374.0);
    }

    #[test]
    fn test_monotone_cascade() {
        let s = ContractorSettings::defaults_for("t1");
        let totals = MarkupEngine::apply(&raw(1234.56, 789.01), &s);
        let labor_and_material_with_markup = totals.labor_total
            + totals.labor_markup_amount
            + totals.material_total
            + totals.material_markup_amount;
        let subtotal_before_profit = labor_and_material_with_markup + totals.overhead_amount;
        let subtotal = subtotal_before_profit + totals.profit_amount;
        assert!(totals.total >= subtotal - 0.01);
        assert!(subtotal >= subtotal_before_profit - 0.01);
        assert!(subtotal_before_profit >= labor_and_material_with_markup - 0.01);
    }

    #[test]
    fn test_zero_percentages_pass_raw_through() {
        let mut s = ContractorSettings::defaults_for("t1");
        s.labor_markup_percent = 0.0;
        s.material_markup_percent = 0.0;
        s.overhead_percent = 0.0;
        s.profit_margin_percent = 0.0;
        s.tax_percent = 0.0;
        s.deposit_percent = 0.0;
        let totals = MarkupEngine::apply(&raw(100.0, 50.0), &s);
        assert_eq!(totals.total, 150.0);
        assert_eq!(totals.deposit, 0.0);
        assert_eq!(totals.balance, 150.0);
    }

    #[test]
    fn test_deposit_and_balance_sum_to_total() {
        let s = ContractorSettings::defaults_for("t1");
        let totals = MarkupEngine::apply(&raw(3333.33, 1111.11), &s);
        assert!((totals.deposit + totals.balance - totals.total).abs() < 0.011);
    }
}

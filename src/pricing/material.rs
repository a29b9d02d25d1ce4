//! Paint quantity estimation.

use crate::model::quote::ApplicationMethod;

/// Flat per-gallon price used when no product set covers an item.
pub const DEFAULT_PRICE_PER_GALLON: f64 = 35.0;

/// Practical coverage bounds in sqft per gallon per coat.
const COVERAGE_MIN: f64 = 250.0;
const COVERAGE_MAX: f64 = 450.0;
/// Spraying loses paint to overspray; effective coverage is capped lower.
const SPRAY_COVERAGE_CAP: f64 = 300.0;

/// Round up to the nearest quarter gallon, the smallest quantity a crew
/// actually buys.
pub fn round_up_to_quarter(gallons: f64) -> f64 {
    (gallons / 0.25).ceil() * 0.25
}

/// Gallons required for `quantity` sqft at `coats` coats.
pub fn estimate_gallons(
    quantity: f64,
    coats: u32,
    coverage_sqft_per_gallon: f64,
    waste_factor: f64,
    application: ApplicationMethod,
) -> f64 {
    if quantity <= 0.0 || coats == 0 {
        return 0.0;
    }
    let mut effective = coverage_sqft_per_gallon.clamp(COVERAGE_MIN, COVERAGE_MAX);
    if application == ApplicationMethod::Spray {
        effective = effective.min(SPRAY_COVERAGE_CAP);
    }
    let raw = quantity * coats as f64 / effective * waste_factor;
    round_up_to_quarter(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_coat_estimate_rounds_to_six_fifty() {
        // 1000 sqft, 2 coats, 350 coverage, 10% waste
        let gallons = estimate_gallons(1000.0, 2, 350.0, 1.10, ApplicationMethod::Roll);
        assert_eq!(gallons, 6.50);
    }

    #[test]
    fn test_coverage_clamped_to_practical_range() {
        // 100 sqft/gal is unrealistically low; clamped up to 250
        let low = estimate_gallons(1000.0, 1, 100.0, 1.0, ApplicationMethod::Roll);
        let at_min = estimate_gallons(1000.0, 1, 250.0, 1.0, ApplicationMethod::Roll);
        assert_eq!(low, at_min);

        let high = estimate_gallons(1000.0, 1, 900.0, 1.0, ApplicationMethod::Roll);
        let at_max = estimate_gallons(1000.0, 1, 450.0, 1.0, ApplicationMethod::Roll);
        assert_eq!(high, at_max);
    }

    #[test]
    fn test_spray_caps_effective_coverage() {
        let rolled = estimate_gallons(1200.0, 1, 400.0, 1.0, ApplicationMethod::Roll);
        let sprayed = estimate_gallons(1200.0, 1, 400.0, 1.0, ApplicationMethod::Spray);
        assert!(sprayed > rolled);
        // sprayed uses 300 sqft/gal: 1200/300 = 4.0
        assert_eq!(sprayed, 4.0);
    }

    #[test]
    fn test_zero_inputs_need_no_paint() {
        assert_eq!(estimate_gallons(0.0, 2, 350.0, 1.1, ApplicationMethod::Roll), 0.0);
        assert_eq!(estimate_gallons(500.0, 0, 350.0, 1.1, ApplicationMethod::Roll), 0.0);
    }

    #[test]
    fn test_quarter_rounding_always_rounds_up() {
        assert_eq!(round_up_to_quarter(6.26), 6.50);
        assert_eq!(round_up_to_quarter(6.01), 6.25);
        assert_eq!(round_up_to_quarter(6.0), 6.0);
    }
}

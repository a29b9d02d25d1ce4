//! Per-item labor cost resolution, by pricing model.

use crate::model::pricing::{Category, PricingModel, PricingScheme};
use crate::model::quote::{Dimensions, LaborItem};

/// Productivity assumed when a production-model rule omits one.
const DEFAULT_PRODUCTIVITY_SQFT_PER_HOUR: f64 = 150.0;
/// Hourly rate assumed when a production-model rule omits one.
const DEFAULT_HOURLY_RATE: f64 = 45.0;

/// Derive a quantity from raw dimensions using the shape rules for the
/// category, rounded up to the next whole unit.
pub fn derive_quantity(category: Category, dims: &Dimensions) -> f64 {
    let raw = match category {
        Category::Walls => 2.0 * (dims.length + dims.width) * dims.height,
        Category::Ceiling => dims.length * dims.width,
        Category::Trim => 2.0 * (dims.length + dims.width),
        _ => dims.length * dims.width,
    };
    raw.ceil()
}

/// The quantity an item prices at: explicit quantity first, then derived
/// from dimensions, else zero.
pub fn resolve_quantity(item: &LaborItem) -> f64 {
    match (item.quantity, &item.dimensions) {
        (Some(q), _) => q,
        (None, Some(dims)) => derive_quantity(item.category, dims),
        (None, None) => 0.0,
    }
}

/// Round crew hours up to the next tenth of an hour.
fn round_up_to_tenth(hours: f64) -> f64 {
    (hours * 10.0).ceil() / 10.0
}

/// Labor cost for one item under the scheme's model. The turnkey model is
/// priced at the quote level and never reaches here.
pub fn labor_cost(scheme: &PricingScheme, item: &LaborItem) -> f64 {
    let quantity = resolve_quantity(item);
    if quantity <= 0.0 {
        return 0.0;
    }
    match scheme.model {
        PricingModel::RateSqft | PricingModel::FlatRate => {
            let rate = item.labor_rate.unwrap_or_else(|| scheme.rate_for(item.category));
            quantity * rate
        }
        PricingModel::Production => {
            let rule = scheme.rule_for(item.category);
            let productivity = rule
                .and_then(|r| r.productivity_sqft_per_hour)
                .unwrap_or(DEFAULT_PRODUCTIVITY_SQFT_PER_HOUR);
            let hourly = rule
                .and_then(|r| r.hourly_rate)
                .or(item.labor_rate)
                .unwrap_or(DEFAULT_HOURLY_RATE);
            let crew = rule.and_then(|r| r.crew_size).unwrap_or(1) as f64;
            let hours = round_up_to_tenth(quantity / productivity);
            hours * hourly * crew
        }
        PricingModel::Turnkey => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::pricing::CategoryRule;
    use crate::model::quote::{ApplicationMethod, MeasurementUnit};
    use std::collections::HashMap;

    fn item(category: Category, quantity: Option<f64>, dims: Option<Dimensions>) -> LaborItem {
        LaborItem {
            category,
            unit: MeasurementUnit::Sqft,
            quantity,
            dimensions: dims,
            coats: 2,
            labor_rate: None,
            selected: true,
            gallons_override: None,
            application: ApplicationMethod::Roll,
        }
    }

    fn scheme(model: PricingModel, rules: HashMap<Category, CategoryRule>) -> PricingScheme {
        PricingScheme {
            model,
            rules,
            default_rate: 1.50,
            materials_included: true,
            coverage_sqft_per_gallon: 350.0,
            waste_factor: 1.10,
            turnkey_interior_rate: None,
            turnkey_exterior_rate: None,
        }
    }

    #[test]
    fn test_wall_quantity_from_dimensions() {
        // 12x10 room, 8ft ceilings: 2*(12+10)*8 = 352
        let dims = Dimensions { length: 12.0, width: 10.0, height: 8.0 };
        assert_eq!(derive_quantity(Category::Walls, &dims), 352.0);
        assert_eq!(derive_quantity(Category::Ceiling, &dims), 120.0);
        assert_eq!(derive_quantity(Category::Trim, &dims), 44.0);
        // default shape
        assert_eq!(derive_quantity(Category::Doors, &dims), 120.0);
    }

    #[test]
    fn test_derived_quantity_rounds_up() {
        let dims = Dimensions { length: 10.5, width: 10.2, height: 8.0 };
        // 2*(10.5+10.2)*8 = 331.2 -> 332
        assert_eq!(derive_quantity(Category::Walls, &dims), 332.0);
    }

    #[test]
    fn test_explicit_quantity_wins_over_dimensions() {
        let dims = Dimensions { length: 10.0, width: 10.0, height: 8.0 };
        let it = item(Category::Walls, Some(200.0), Some(dims));
        assert_eq!(resolve_quantity(&it), 200.0);
    }

    #[test]
    fn test_rate_based_cost() {
        let mut rules = HashMap::new();
        rules.insert(Category::Walls, CategoryRule { rate: 0.55, ..Default::default() });
        let s = scheme(PricingModel::RateSqft, rules);
        let it = item(Category::Walls, Some(200.0), None);
        assert!((labor_cost(&s, &it) - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_production_hours_round_up_to_tenth() {
        let mut rules = HashMap::new();
        rules.insert(
            Category::Walls,
            CategoryRule {
                rate: 0.0,
                productivity_sqft_per_hour: Some(175.0),
                hourly_rate: Some(50.0),
                crew_size: Some(2),
                room_flat_rate: None,
            },
        );
        let s = scheme(PricingModel::Production, rules);
        let it = item(Category::Walls, Some(400.0), None);
        // 400/175 = 2.2857 -> 2.3 hours; 2.3 * 50 * 2 = 230
        assert!((labor_cost(&s, &it) - 230.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_quantity_costs_nothing() {
        let s = scheme(PricingModel::RateSqft, HashMap::new());
        let it = item(Category::Walls, None, None);
        assert_eq!(labor_cost(&s, &it), 0.0);
    }
}

//! Orchestrates labor and material estimation across all areas of a quote,
//! producing raw (pre-markup) totals and a per-area breakdown.

use tracing::{error, warn};

use crate::model::pricing::{Category, PricingModel, PricingScheme, ProductSet, Tier};
use crate::model::quote::{Area, AreaBreakdown, LaborItem, MeasurementUnit, SurfaceCondition, TurnkeyDetails};
use crate::pricing::labor;
use crate::pricing::material::{self, DEFAULT_PRICE_PER_GALLON};

/// Pre-markup pricing result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPricing {
    pub labor_total: f64,
    pub material_total: f64,
    pub total_sqft: f64,
    pub breakdown: Vec<AreaBreakdown>,
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("turnkey model requires home sqft and job scope details")]
    MissingTurnkeyDetails,
    #[error("turnkey model has no {0} rate configured")]
    MissingTurnkeyRate(&'static str),
    #[error("invalid pricing input: {0}")]
    InvalidInput(String),
}

fn condition_multiplier(condition: SurfaceCondition) -> f64 {
    match condition {
        SurfaceCondition::Excellent => 0.90,
        SurfaceCondition::Good => 0.95,
        SurfaceCondition::Average => 1.00,
        SurfaceCondition::Fair => 1.10,
        SurfaceCondition::Poor => 1.25,
    }
}

/// Turnkey split of the base figure when materials are included.
const TURNKEY_LABOR_SHARE: f64 = 0.60;

pub struct PricingCalculator;

impl PricingCalculator {
    /// Price the quote under its scheme. `tier` selects which product-set
    /// price feeds material costs (drafts price at `Better`).
    pub fn calculate(
        scheme: &PricingScheme,
        areas: &[Area],
        turnkey: Option<&TurnkeyDetails>,
        product_sets: &[ProductSet],
        tier: Tier,
    ) -> Result<RawPricing, PricingError> {
        match scheme.model {
            PricingModel::Turnkey => Self::calculate_turnkey(scheme, turnkey),
            _ => Self::calculate_itemized(scheme, areas, product_sets, tier),
        }
    }

    /// Calculate, falling back to the documented legacy formula on any
    /// error. The fallback is logged but never surfaces to the caller.
    pub fn calculate_with_fallback(
        scheme: &PricingScheme,
        areas: &[Area],
        turnkey: Option<&TurnkeyDetails>,
        product_sets: &[ProductSet],
        tier: Tier,
    ) -> RawPricing {
        match Self::calculate(scheme, areas, turnkey, product_sets, tier) {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "pricing calculator failed, using legacy formula");
                Self::legacy_fallback(scheme, areas)
            }
        }
    }

    fn calculate_turnkey(
        scheme: &PricingScheme,
        turnkey: Option<&TurnkeyDetails>,
    ) -> Result<RawPricing, PricingError> {
        let details = turnkey.ok_or(PricingError::MissingTurnkeyDetails)?;
        if details.home_sqft <= 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "home sqft must be positive, got {}",
                details.home_sqft
            )));
        }
        let scope_rate = match details.scope {
            crate::model::quote::JobScope::Interior => scheme
                .turnkey_interior_rate
                .ok_or(PricingError::MissingTurnkeyRate("interior"))?,
            crate::model::quote::JobScope::Exterior => scheme
                .turnkey_exterior_rate
                .ok_or(PricingError::MissingTurnkeyRate("exterior"))?,
        };
        let rate = scope_rate * condition_multiplier(details.condition);
        let base = details.home_sqft * rate;
        let (labor, mat) = if scheme.materials_included {
            (base * TURNKEY_LABOR_SHARE, base * (1.0 - TURNKEY_LABOR_SHARE))
        } else {
            (base, 0.0)
        };
        Ok(RawPricing {
            labor_total: labor,
            material_total: mat,
            total_sqft: details.home_sqft,
            breakdown: vec![AreaBreakdown {
                area_name: "whole home".to_string(),
                labor,
                material: mat,
                sqft: details.home_sqft,
            }],
        })
    }

    fn calculate_itemized(
        scheme: &PricingScheme,
        areas: &[Area],
        product_sets: &[ProductSet],
        tier: Tier,
    ) -> Result<RawPricing, PricingError> {
        let mut raw = RawPricing::default();
        let room_flat = scheme
            .rules
            .get(&Category::Rooms)
            .and_then(|r| r.room_flat_rate)
            .filter(|_| scheme.model == PricingModel::FlatRate);

        for area in areas {
            let selected: Vec<&LaborItem> = area.items.iter().filter(|i| i.selected).collect();
            if selected.is_empty() {
                continue;
            }

            let mut area_labor = 0.0;
            let mut area_material = 0.0;
            let mut area_sqft = 0.0;

            // Room-flat variant: one fixed charge per area, item count
            // notwithstanding. Materials still estimate per item.
            if let Some(flat) = room_flat {
                area_labor = flat;
            } else {
                for item in &selected {
                    area_labor += labor::labor_cost(scheme, item);
                }
            }

            for item in &selected {
                let quantity = labor::resolve_quantity(item);
                if item.unit == MeasurementUnit::Sqft {
                    area_sqft += quantity;
                }
                if scheme.materials_included {
                    area_material += Self::material_cost(scheme, product_sets, item, quantity, tier);
                }
            }

            raw.labor_total += area_labor;
            raw.material_total += area_material;
            raw.total_sqft += area_sqft;
            raw.breakdown.push(AreaBreakdown {
                area_name: area.name.clone(),
                labor: area_labor,
                material: area_material,
                sqft: area_sqft,
            });
        }
        Ok(raw)
    }

    fn material_cost(
        scheme: &PricingScheme,
        product_sets: &[ProductSet],
        item: &LaborItem,
        quantity: f64,
        tier: Tier,
    ) -> f64 {
        let gallons = match item.gallons_override {
            Some(g) => g,
            None => material::estimate_gallons(
                quantity,
                item.coats,
                scheme.coverage_sqft_per_gallon,
                scheme.waste_factor,
                item.application,
            ),
        };
        if gallons <= 0.0 {
            return 0.0;
        }
        gallons * Self::price_per_gallon(product_sets, item.category, tier)
    }

    /// Category-scoped set first, then an unscoped set, then the flat default.
    fn price_per_gallon(product_sets: &[ProductSet], category: Category, tier: Tier) -> f64 {
        product_sets
            .iter()
            .find(|s| s.category == Some(category))
            .or_else(|| product_sets.iter().find(|s| s.category.is_none()))
            .and_then(|s| s.price_per_gallon(tier))
            .unwrap_or(DEFAULT_PRICE_PER_GALLON)
    }

    /// Legacy formula: flat labor-rate times quantity and a flat 25% markup
    /// on raw gallon cost. Same constants as the canonical defaults.
    fn legacy_fallback(scheme: &PricingScheme, areas: &[Area]) -> RawPricing {
        warn!("pricing via legacy fallback formula");
        let mut raw = RawPricing::default();
        for area in areas {
            let mut area_labor = 0.0;
            let mut area_material = 0.0;
            let mut area_sqft = 0.0;
            for item in area.items.iter().filter(|i| i.selected) {
                let quantity = labor::resolve_quantity(item);
                area_labor += quantity * item.labor_rate.unwrap_or(scheme.default_rate);
                if item.unit == MeasurementUnit::Sqft {
                    area_sqft += quantity;
                }
                if scheme.materials_included {
                    let gallons = material::estimate_gallons(
                        quantity,
                        item.coats,
                        scheme.coverage_sqft_per_gallon,
                        scheme.waste_factor,
                        item.application,
                    );
                    area_material += gallons * DEFAULT_PRICE_PER_GALLON * 1.25;
                }
            }
            raw.labor_total += area_labor;
            raw.material_total += area_material;
            raw.total_sqft += area_sqft;
            raw.breakdown.push(AreaBreakdown {
                area_name: area.name.clone(),
                labor: area_labor,
                material: area_material,
                sqft: area_sqft,
            });
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::pricing::CategoryRule;
    use crate::model::quote::{ApplicationMethod, JobScope};
    use std::collections::HashMap;

    fn wall_item(sqft: f64, rate: Option<f64>) -> LaborItem {
        LaborItem {
            category: Category::Walls,
            unit: MeasurementUnit::Sqft,
            quantity: Some(sqft),
            dimensions: None,
            coats: 2,
            labor_rate: rate,
            selected: true,
            gallons_override: None,
            application: ApplicationMethod::Roll,
        }
    }

    fn rate_scheme(rate: f64) -> PricingScheme {
        let mut rules = HashMap::new();
        rules.insert(Category::Walls, CategoryRule { rate, ..Default::default() });
        PricingScheme {
            model: PricingModel::RateSqft,
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
    fn test_rate_based_quote_with_materials() {
        let scheme = rate_scheme(0.55);
        let areas = vec![Area {
            name: "Living Room".to_string(),
            items: vec![wall_item(200.0, None)],
            selection: None,
        }];
        let raw = PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).unwrap();
        assert!((raw.labor_total - 110.0).abs() < 1e-9);
        // 200*2/350*1.1 = 1.257 -> 1.5 gal * $35
        assert!((raw.material_total - 52.5).abs() < 1e-9);
        assert_eq!(raw.total_sqft, 200.0);
        assert_eq!(raw.breakdown.len(), 1);
        assert_eq!(raw.breakdown[0].area_name, "Living Room");
    }

    #[test]
    fn test_same_inputs_price_identically() {
        let scheme = rate_scheme(0.55);
        let areas = vec![Area {
            name: "Living Room".to_string(),
            items: vec![wall_item(200.0, None)],
            selection: None,
        }];
        let first = PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).unwrap();
        let second = PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unselected_items_are_skipped() {
        let scheme = rate_scheme(0.55);
        let mut not_selected = wall_item(500.0, None);
        not_selected.selected = false;
        let areas = vec![Area {
            name: "Hall".to_string(),
            items: vec![wall_item(200.0, None), not_selected],
            selection: None,
        }];
        let raw = PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).unwrap();
        assert_eq!(raw.total_sqft, 200.0);
    }

    #[test]
    fn test_turnkey_split_with_materials() {
        let mut scheme = rate_scheme(0.0);
        scheme.model = PricingModel::Turnkey;
        scheme.turnkey_interior_rate = Some(3.00);
        let turnkey = TurnkeyDetails {
            home_sqft: 2000.0,
            scope: JobScope::Interior,
            condition: SurfaceCondition::Fair,
        };
        let raw =
            PricingCalculator::calculate(&scheme, &[], Some(&turnkey), &[], Tier::Better).unwrap();
        // rate 3.00 * 1.10 = 3.30; base = 6600; 60/40 split
        assert!((raw.labor_total - 3960.0).abs() < 1e-9);
        assert!((raw.material_total - 2640.0).abs() < 1e-9);
    }

    #[test]
    fn test_turnkey_without_materials_is_all_labor() {
        let mut scheme = rate_scheme(0.0);
        scheme.model = PricingModel::Turnkey;
        scheme.materials_included = false;
        scheme.turnkey_exterior_rate = Some(2.50);
        let turnkey = TurnkeyDetails {
            home_sqft: 1000.0,
            scope: JobScope::Exterior,
            condition: SurfaceCondition::Average,
        };
        let raw =
            PricingCalculator::calculate(&scheme, &[], Some(&turnkey), &[], Tier::Better).unwrap();
        assert!((raw.labor_total - 2500.0).abs() < 1e-9);
        assert_eq!(raw.material_total, 0.0);
    }

    #[test]
    fn test_room_flat_rate_charges_once_per_area() {
        let mut scheme = rate_scheme(0.55);
        scheme.model = PricingModel::FlatRate;
        scheme.materials_included = false;
        scheme.rules.insert(
            Category::Rooms,
            CategoryRule { rate: 0.0, room_flat_rate: Some(450.0), ..Default::default() },
        );
        let areas = vec![Area {
            name: "Bedroom".to_string(),
            items: vec![wall_item(200.0, None), wall_item(120.0, None)],
            selection: None,
        }];
        let raw = PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).unwrap();
        assert!((raw.labor_total - 450.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_turnkey_details_triggers_fallback() {
        let mut scheme = rate_scheme(0.55);
        scheme.model = PricingModel::Turnkey;
        let areas = vec![Area {
            name: "Living Room".to_string(),
            items: vec![wall_item(100.0, Some(2.0))],
            selection: None,
        }];
        assert!(PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).is_err());
        // fallback prices with the legacy flat formula instead of aborting
        let raw =
            PricingCalculator::calculate_with_fallback(&scheme, &areas, None, &[], Tier::Better);
        assert!((raw.labor_total - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_product_set_price_beats_default() {
        let mut products = HashMap::new();
        products.insert(
            Tier::Better,
            crate::model::pricing::TierProduct {
                brand: "Sherwin-Williams".to_string(),
                product_name: "SuperPaint".to_string(),
                price_per_gallon: 55.0,
            },
        );
        let sets = vec![ProductSet { name: "Interior".to_string(), category: None, products }];
        let scheme = rate_scheme(0.55);
        let areas = vec![Area {
            name: "Room".to_string(),
            items: vec![wall_item(200.0, None)],
            selection: None,
        }];
        let raw = PricingCalculator::calculate(&scheme, &areas, None, &sets, Tier::Better).unwrap();
        // 1.5 gal at $55
        assert!((raw.material_total - 82.5).abs() < 1e-9);
    }
}

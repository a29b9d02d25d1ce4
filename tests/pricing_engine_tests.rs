//! End-to-end pricing: measured areas through the calculator, the markup
//! cascade and tier derivation, using the canonical default settings.

use std::collections::HashMap;

use brushline_backend::model::pricing::{
    Category, CategoryRule, PricingModel, PricingScheme, Tier,
};
use brushline_backend::model::quote::{
    ApplicationMethod, Area, Dimensions, LaborItem, MeasurementUnit,
};
use brushline_backend::model::settings::ContractorSettings;
use brushline_backend::pricing::calculator::PricingCalculator;
use brushline_backend::pricing::markup::MarkupEngine;
use brushline_backend::pricing::tier::TierPricer;

fn wall_item(sqft: f64) -> LaborItem {
    LaborItem {
        category: Category::Walls,
        unit: MeasurementUnit::Sqft,
        quantity: Some(sqft),
        dimensions: None,
        coats: 2,
        labor_rate: None,
        selected: true,
        gallons_override: None,
        application: ApplicationMethod::Roll,
    }
}

fn rate_scheme(wall_rate: f64) -> PricingScheme {
    let mut rules = HashMap::new();
    rules.insert(Category::Walls, CategoryRule { rate: wall_rate, ..Default::default() });
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
fn test_living_room_quote_with_default_settings() {
    let scheme = rate_scheme(0.55);
    let areas = vec![Area {
        name: "Living Room".to_string(),
        items: vec![wall_item(200.0)],
        selection: None,
    }];
    let settings = ContractorSettings::defaults_for("t1");

    let raw = PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).unwrap();
    assert!((raw.labor_total - 110.0).abs() < 1e-9);
    // 200 sqft x 2 coats / 350 coverage x 1.10 waste -> 1.5 gal at $35
    assert!((raw.material_total - 52.5).abs() < 1e-9);

    let totals = MarkupEngine::apply(&raw, &settings);
    // material +25% -> 65.625, overhead +10%, profit +30%, tax 8.25%
    assert_eq!(totals.labor_markup_amount, 0.0);
    assert_eq!(totals.material_markup_amount, 13.13);
    assert_eq!(totals.total, 271.86);
    assert_eq!(totals.deposit, 135.93);
    assert_eq!(totals.deposit + totals.balance, totals.total);
    assert_eq!(totals.breakdown.len(), 1);
    assert_eq!(totals.breakdown[0].area_name, "Living Room");
}

#[test]
fn test_tier_options_bracket_the_base_total() {
    let scheme = rate_scheme(0.55);
    let areas = vec![Area {
        name: "Living Room".to_string(),
        items: vec![wall_item(200.0)],
        selection: None,
    }];
    let settings = ContractorSettings::defaults_for("t1");
    let raw = PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).unwrap();
    let totals = MarkupEngine::apply(&raw, &settings);

    let options = TierPricer::tier_options(totals.total, settings.deposit_percent);
    assert_eq!(options[0].tier, Tier::Good);
    assert_eq!(options[0].total, 231.08);
    assert_eq!(options[1].total, totals.total);
    assert_eq!(options[2].tier, Tier::Best);
    assert_eq!(options[2].total, 312.64);
    for option in &options {
        assert_eq!(option.deposit + option.balance, option.total);
    }
}

#[test]
fn test_quantity_derivation_from_dimensions() {
    let scheme = rate_scheme(1.00);
    let mut item = wall_item(0.0);
    item.quantity = None;
    item.dimensions = Some(Dimensions { length: 15.0, width: 12.0, height: 9.0 });
    item.coats = 1;
    let areas =
        vec![Area { name: "Bedroom".to_string(), items: vec![item], selection: None }];

    let raw = PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).unwrap();
    // 2 * (15 + 12) * 9 = 486 sqft of wall
    assert_eq!(raw.total_sqft, 486.0);
    assert!((raw.labor_total - 486.0).abs() < 1e-9);
}

#[test]
fn test_production_model_prices_by_crew_hours() {
    let mut rules = HashMap::new();
    rules.insert(
        Category::Walls,
        CategoryRule {
            rate: 0.0,
            productivity_sqft_per_hour: Some(200.0),
            hourly_rate: Some(50.0),
            crew_size: Some(2),
            room_flat_rate: None,
        },
    );
    let scheme = PricingScheme {
        model: PricingModel::Production,
        rules,
        default_rate: 1.50,
        materials_included: false,
        coverage_sqft_per_gallon: 350.0,
        waste_factor: 1.10,
        turnkey_interior_rate: None,
        turnkey_exterior_rate: None,
    };
    let mut item = wall_item(450.0);
    item.coats = 1;
    let areas = vec![Area { name: "Great Room".to_string(), items: vec![item], selection: None }];

    let raw = PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).unwrap();
    // 450 / 200 = 2.25 -> 2.3 crew-hours, x $50 x 2 painters
    assert!((raw.labor_total - 230.0).abs() < 1e-9);
    assert_eq!(raw.material_total, 0.0);
}

#[test]
fn test_spray_application_needs_more_paint_than_roll() {
    let scheme = rate_scheme(0.55);
    let mut sprayed = wall_item(1000.0);
    sprayed.application = ApplicationMethod::Spray;
    let rolled = wall_item(1000.0);

    let spray_raw = PricingCalculator::calculate(
        &scheme,
        &[Area { name: "A".to_string(), items: vec![sprayed], selection: None }],
        None,
        &[],
        Tier::Better,
    )
    .unwrap();
    let roll_raw = PricingCalculator::calculate(
        &scheme,
        &[Area { name: "A".to_string(), items: vec![rolled], selection: None }],
        None,
        &[],
        Tier::Better,
    )
    .unwrap();
    assert!(spray_raw.material_total > roll_raw.material_total);
}

#[test]
fn test_rescale_moves_totals_between_tiers() {
    let settings = ContractorSettings::defaults_for("t1");
    let scheme = rate_scheme(0.55);
    let areas = vec![Area {
        name: "Living Room".to_string(),
        items: vec![wall_item(200.0)],
        selection: None,
    }];
    let raw = PricingCalculator::calculate(&scheme, &areas, None, &[], Tier::Better).unwrap();
    let base = MarkupEngine::apply(&raw, &settings);

    let best = TierPricer::reprice(&base, Tier::Best, settings.deposit_percent);
    let back = TierPricer::rescale(&best, Tier::Best, Tier::Better, settings.deposit_percent);
    assert!((back.total - base.total).abs() <= 0.01);
    assert!((back.deposit - base.deposit).abs() <= 0.01);
}

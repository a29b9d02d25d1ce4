use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Commercial tiers derived from the base total by fixed multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Good,
    Better,
    Best,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Good => "good",
            Tier::Better => "better",
            Tier::Best => "best",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(Tier::Good),
            "better" => Ok(Tier::Better),
            "best" => Ok(Tier::Best),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

/// Closed set of work categories. Rules are keyed by this enum instead of
/// free-form strings; lookups that miss fall back Walls → scheme default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Walls,
    Ceiling,
    Trim,
    Doors,
    Windows,
    Cabinets,
    Rooms,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Walls => "walls",
            Category::Ceiling => "ceiling",
            Category::Trim => "trim",
            Category::Doors => "doors",
            Category::Windows => "windows",
            Category::Cabinets => "cabinets",
            Category::Rooms => "rooms",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The formula family used to turn measured work into labor cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Whole-home rate by scope and surface condition.
    Turnkey,
    /// Quantity times a per-category rate.
    RateSqft,
    /// Quantity converted to crew hours via a productivity rate.
    Production,
    /// Fixed price per discrete unit, or a flat charge per room.
    FlatRate,
}

/// Per-category pricing inputs. Which fields matter depends on the model:
/// `rate` for rate-based and flat-per-unit, the productivity trio for the
/// production model, `room_flat_rate` for the room-flat variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRule {
    pub rate: f64,
    pub productivity_sqft_per_hour: Option<f64>,
    pub hourly_rate: Option<f64>,
    pub crew_size: Option<u32>,
    pub room_flat_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingScheme {
    pub model: PricingModel,
    pub rules: HashMap<Category, CategoryRule>,
    /// Last resort of the rate fallback chain (category → walls → this).
    pub default_rate: f64,
    pub materials_included: bool,
    pub coverage_sqft_per_gallon: f64,
    pub waste_factor: f64,
    /// Whole-home rates for the turnkey model, per job scope.
    pub turnkey_interior_rate: Option<f64>,
    pub turnkey_exterior_rate: Option<f64>,
}

impl PricingScheme {
    /// Fallback chain for rule resolution: the item's category, then
    /// the walls rule, then the scheme-wide default rate.
    pub fn rule_for(&self, category: Category) -> Option<&CategoryRule> {
        self.rules
            .get(&category)
            .or_else(|| self.rules.get(&Category::Walls))
    }

    pub fn rate_for(&self, category: Category) -> f64 {
        self.rule_for(category).map_or(self.default_rate, |r| r.rate)
    }
}

/// One tier's product choice inside a product set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierProduct {
    pub brand: String,
    pub product_name: String,
    pub price_per_gallon: f64,
}

/// A named group of paint products, one per tier, optionally scoped to a
/// category (e.g. a trim enamel set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSet {
    pub name: String,
    pub category: Option<Category>,
    pub products: HashMap<Tier, TierProduct>,
}

impl ProductSet {
    pub fn price_per_gallon(&self, tier: Tier) -> Option<f64> {
        self.products.get(&tier).map(|p| p.price_per_gallon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme_with_rules(rules: Vec<(Category, f64)>) -> PricingScheme {
        PricingScheme {
            model: PricingModel::RateSqft,
            rules: rules
                .into_iter()
                .map(|(c, rate)| (c, CategoryRule { rate, ..Default::default() }))
                .collect(),
            default_rate: 1.50,
            materials_included: true,
            coverage_sqft_per_gallon: 350.0,
            waste_factor: 1.10,
            turnkey_interior_rate: None,
            turnkey_exterior_rate: None,
        }
    }

    #[test]
    fn test_rate_fallback_chain() {
        let scheme = scheme_with_rules(vec![(Category::Walls, 0.55), (Category::Trim, 1.25)]);
        // direct hit
        assert_eq!(scheme.rate_for(Category::Trim), 1.25);
        // unmapped category falls back to walls
        assert_eq!(scheme.rate_for(Category::Ceiling), 0.55);

        // no walls rule either: global default
        let scheme = scheme_with_rules(vec![(Category::Trim, 1.25)]);
        assert_eq!(scheme.rate_for(Category::Ceiling), 1.50);
    }

    #[test]
    fn test_tier_parse_roundtrip() {
        for tier in [Tier::Good, Tier::Better, Tier::Best] {
            assert_eq!(tier.as_str().parse::<Tier>().unwrap(), tier);
        }
        assert!("premium".parse::<Tier>().is_err());
    }
}

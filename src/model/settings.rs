use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Tenant-scoped commercial settings. Always passed explicitly into the
/// pricing engine so a calculation never reads ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractorSettings {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tenant_id: String,

    pub labor_markup_percent: f64,
    pub material_markup_percent: f64,
    pub overhead_percent: f64,
    pub profit_margin_percent: f64,
    pub tax_percent: f64,
    pub deposit_percent: f64,

    pub quote_valid_days: i64,
    pub portal_duration_days: i64,
    /// Staff address for lifecycle notifications (portal expiry, accepts).
    pub owner_email: Option<String>,
    /// When false the portal window is informational only and access is
    /// never locked on expiry.
    pub portal_auto_lock: bool,
}

impl ContractorSettings {
    /// Canonical defaults. There is exactly one set; the legacy pricing
    /// fallback reuses these same constants.
    pub fn defaults_for(tenant_id: impl Into<String>) -> Self {
        ContractorSettings {
            id: None,
            tenant_id: tenant_id.into(),
            labor_markup_percent: 0.0,
            material_markup_percent: 25.0,
            overhead_percent: 10.0,
            profit_margin_percent: 30.0,
            tax_percent: 8.25,
            deposit_percent: 50.0,
            quote_valid_days: 30,
            portal_duration_days: 14,
            owner_email: None,
            portal_auto_lock: true,
        }
    }

    /// All percentages must lie in [0, 100] before persistence.
    pub fn validate(&self) -> Result<(), String> {
        let percentages = [
            ("labor_markup_percent", self.labor_markup_percent),
            ("material_markup_percent", self.material_markup_percent),
            ("overhead_percent", self.overhead_percent),
            ("profit_margin_percent", self.profit_margin_percent),
            ("tax_percent", self.tax_percent),
            ("deposit_percent", self.deposit_percent),
        ];
        for (name, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{} must be between 0 and 100, got {}", name, value));
            }
        }
        if self.quote_valid_days <= 0 {
            return Err("quote_valid_days must be positive".to_string());
        }
        if self.portal_duration_days <= 0 {
            return Err("portal_duration_days must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = ContractorSettings::defaults_for("t1");
        assert!(settings.validate().is_ok());
        assert_eq!(settings.material_markup_percent, 25.0);
        assert_eq!(settings.tax_percent, 8.25);
        assert_eq!(settings.deposit_percent, 50.0);
        assert_eq!(settings.portal_duration_days, 14);
    }

    #[test]
    fn test_out_of_range_percentage_rejected() {
        let mut settings = ContractorSettings::defaults_for("t1");
        settings.profit_margin_percent = 140.0;
        assert!(settings.validate().is_err());

        settings.profit_margin_percent = -1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_nonpositive_windows_rejected() {
        let mut settings = ContractorSettings::defaults_for("t1");
        settings.portal_duration_days = 0;
        assert!(settings.validate().is_err());
    }
}

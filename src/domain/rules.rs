use crate::error::{CommissionError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// How a sale's commission is derived from its price.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Rate applied to the whole sale; selling under redline halves the commission.
    #[default]
    PercentOfSale,
    /// Rate applied to the margin over redline; at or under redline pays nothing.
    MarginAboveRedline,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VolumeBonus {
    pub enabled: bool,
    pub monthly_threshold: u32,
    pub bonus_rate_percent: Decimal,
}

impl Default for VolumeBonus {
    fn default() -> Self {
        Self {
            enabled: false,
            monthly_threshold: 10,
            bonus_rate_percent: dec!(0.5),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Sharing {
    pub enabled: bool,
    pub shared_percent: Decimal,
    pub reason: String,
}

impl Default for Sharing {
    fn default() -> Self {
        Self {
            enabled: false,
            shared_percent: dec!(50),
            reason: DEFAULT_SHARING_REASON.to_string(),
        }
    }
}

pub const DEFAULT_SHARING_REASON: &str = "Split with partner";

/// The configured commission rules for one category.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleSet {
    pub price_per_unit: Decimal,
    pub base_rate_percent: Decimal,
    pub redline_price: Decimal,
    pub volume_bonus: VolumeBonus,
    pub sharing: Sharing,
    #[serde(default)]
    pub mode: PricingMode,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            price_per_unit: dec!(3.20),
            base_rate_percent: dec!(3.5),
            redline_price: dec!(2.80),
            volume_bonus: VolumeBonus::default(),
            sharing: Sharing::default(),
            mode: PricingMode::default(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PriceStatus {
    BelowRedline,
    GoodPrice,
}

impl PriceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PriceStatus::BelowRedline => "Below Redline",
            PriceStatus::GoodPrice => "Good Price",
        }
    }
}

impl RuleSet {
    /// Whether `unit_price` triggers the redline branch of the active mode.
    pub fn is_below_redline(&self, unit_price: Decimal) -> bool {
        match self.mode {
            PricingMode::PercentOfSale => unit_price < self.redline_price,
            PricingMode::MarginAboveRedline => unit_price <= self.redline_price,
        }
    }

    pub fn price_status(&self, unit_price: Decimal) -> PriceStatus {
        if self.is_below_redline(unit_price) {
            PriceStatus::BelowRedline
        } else {
            PriceStatus::GoodPrice
        }
    }

    /// Range checks applied when rules are saved or imported.
    ///
    /// The engine accepts any values; this is the only place they are bounded.
    pub fn validate(&self) -> Result<()> {
        check_non_negative("price per unit", self.price_per_unit)?;
        check_non_negative("redline price", self.redline_price)?;
        check_percent("base rate", self.base_rate_percent)?;
        check_percent("volume bonus rate", self.volume_bonus.bonus_rate_percent)?;
        check_percent("shared percentage", self.sharing.shared_percent)?;
        Ok(())
    }
}

fn check_non_negative(name: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(CommissionError::Validation(format!(
            "{name} must not be negative (got {value})"
        )));
    }
    Ok(())
}

fn check_percent(name: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(CommissionError::Validation(format!(
            "{name} must be between 0 and 100 (got {value})"
        )));
    }
    Ok(())
}

/// Flat settings blob written by earlier releases.
///
/// Zero, empty and missing values fall back to the defaults, matching how
/// those releases read their own settings.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LegacySettings {
    price_per_kw: Option<Decimal>,
    base_rate: Option<Decimal>,
    redline_price: Option<Decimal>,
    has_volume_bonus: Option<bool>,
    volume_threshold: Option<u32>,
    volume_bonus_rate: Option<Decimal>,
    is_shared_commission: Option<bool>,
    shared_percentage: Option<Decimal>,
    sharing_reason: Option<String>,
}

fn non_zero(value: Option<Decimal>, default: Decimal) -> Decimal {
    value.filter(|v| !v.is_zero()).unwrap_or(default)
}

impl From<LegacySettings> for RuleSet {
    fn from(legacy: LegacySettings) -> Self {
        let defaults = RuleSet::default();
        RuleSet {
            price_per_unit: non_zero(legacy.price_per_kw, defaults.price_per_unit),
            base_rate_percent: non_zero(legacy.base_rate, defaults.base_rate_percent),
            redline_price: non_zero(legacy.redline_price, defaults.redline_price),
            volume_bonus: VolumeBonus {
                enabled: legacy.has_volume_bonus.unwrap_or(false),
                monthly_threshold: legacy
                    .volume_threshold
                    .filter(|t| *t != 0)
                    .unwrap_or(defaults.volume_bonus.monthly_threshold),
                bonus_rate_percent: non_zero(
                    legacy.volume_bonus_rate,
                    defaults.volume_bonus.bonus_rate_percent,
                ),
            },
            sharing: Sharing {
                enabled: legacy.is_shared_commission.unwrap_or(false),
                shared_percent: non_zero(
                    legacy.shared_percentage,
                    defaults.sharing.shared_percent,
                ),
                reason: legacy
                    .sharing_reason
                    .filter(|r| !r.is_empty())
                    .unwrap_or(defaults.sharing.reason),
            },
            mode: PricingMode::PercentOfSale,
        }
    }
}

/// Any settings shape this crate knows how to read.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SettingsShape {
    Current(RuleSet),
    Legacy(LegacySettings),
}

impl RuleSet {
    /// Reads a stored or imported settings blob, upgrading legacy shapes.
    ///
    /// Unknown shapes are rejected instead of being passed through.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let shape: SettingsShape = serde_json::from_value(value).map_err(|_| {
            CommissionError::Validation("settings do not match a known format".to_string())
        })?;
        Ok(match shape {
            SettingsShape::Current(rules) => rules,
            SettingsShape::Legacy(legacy) => legacy.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_rules_are_valid() {
        let rules = RuleSet::default();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.mode, PricingMode::PercentOfSale);
        assert_eq!(rules.sharing.reason, "Split with partner");
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut rules = RuleSet::default();
        rules.sharing.shared_percent = dec!(120);
        assert!(matches!(
            rules.validate(),
            Err(CommissionError::Validation(_))
        ));

        let mut rules = RuleSet::default();
        rules.redline_price = dec!(-1);
        assert!(rules.validate().is_err());

        let mut rules = RuleSet::default();
        rules.base_rate_percent = dec!(-0.5);
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_current_shape_round_trips_through_value() {
        let mut rules = RuleSet::default();
        rules.mode = PricingMode::MarginAboveRedline;
        rules.volume_bonus.enabled = true;
        let value = serde_json::to_value(&rules).unwrap();
        assert_eq!(value["mode"], "margin_above_redline");
        assert_eq!(RuleSet::from_value(value).unwrap(), rules);
    }

    #[test]
    fn test_legacy_shape_is_upgraded() {
        let value = json!({
            "pricePerKw": 3.1,
            "baseRate": 4,
            "redlinePrice": 0,
            "hasVolumeBonus": true,
            "volumeThreshold": 5,
            "volumeBonusRate": 1.5,
            "isSharedCommission": true,
            "sharedPercentage": 25,
            "sharingReason": ""
        });
        let rules = RuleSet::from_value(value).unwrap();
        assert_eq!(rules.price_per_unit, dec!(3.1));
        assert_eq!(rules.base_rate_percent, dec!(4));
        // zero falls back to the default
        assert_eq!(rules.redline_price, dec!(2.80));
        assert!(rules.volume_bonus.enabled);
        assert_eq!(rules.volume_bonus.monthly_threshold, 5);
        assert_eq!(rules.sharing.shared_percent, dec!(25));
        assert_eq!(rules.sharing.reason, DEFAULT_SHARING_REASON);
    }

    #[test]
    fn test_unknown_shape_is_rejected() {
        let value = json!({ "pricePerKw": 3.2, "favoriteColor": "blue" });
        assert!(matches!(
            RuleSet::from_value(value),
            Err(CommissionError::Validation(_))
        ));
    }

    #[test]
    fn test_redline_boundary_depends_on_mode() {
        let mut rules = RuleSet::default();
        assert_eq!(rules.price_status(dec!(2.80)), PriceStatus::GoodPrice);
        rules.mode = PricingMode::MarginAboveRedline;
        assert_eq!(rules.price_status(dec!(2.80)), PriceStatus::BelowRedline);
        assert_eq!(rules.price_status(dec!(2.81)).label(), "Good Price");
    }
}

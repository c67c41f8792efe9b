use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The sales industry a rule set or sale record belongs to.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Solar,
    Lighting,
    Pest,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Solar, Category::Lighting, Category::Pest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Solar => "solar",
            Category::Lighting => "lighting",
            Category::Pest => "pest",
        }
    }

    /// Unit the sale size is entered in.
    pub fn unit_label(&self) -> &'static str {
        match self {
            Category::Solar => "kW",
            Category::Lighting => "ft",
            Category::Pest => "service",
        }
    }

    /// Factor turning entered units into the units the redline is quoted in
    /// (kW to W for solar).
    pub fn base_unit_factor(&self) -> Decimal {
        match self {
            Category::Solar => dec!(1000),
            Category::Lighting | Category::Pest => Decimal::ONE,
        }
    }

    /// Only solar has a working calculator; the others track history only.
    pub fn has_calculator(&self) -> bool {
        matches!(self, Category::Solar)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solar" => Ok(Category::Solar),
            "lighting" => Ok(Category::Lighting),
            "pest" => Ok(Category::Pest),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The per-sale numbers entered by the seller.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct SaleInput {
    /// Size of the sale in the category's entry unit (kW for solar).
    pub unit_count: Decimal,
    pub unit_price: Decimal,
}

impl SaleInput {
    pub fn new(unit_count: Decimal, unit_price: Decimal) -> Self {
        Self {
            unit_count,
            unit_price,
        }
    }

    /// Parses raw form fields. `None` means the form is not ready yet.
    pub fn parse(unit_count: &str, unit_price: &str) -> Option<Self> {
        let unit_count = Decimal::from_str(unit_count.trim()).ok()?;
        let unit_price = Decimal::from_str(unit_price.trim()).ok()?;
        let input = Self::new(unit_count, unit_price);
        input.is_ready().then_some(input)
    }

    /// A calculation needs a strictly positive unit count.
    pub fn is_ready(&self) -> bool {
        self.unit_count > Decimal::ZERO
    }

    /// `None` when the product does not fit in a `Decimal`.
    pub fn sale_amount(&self) -> Option<Decimal> {
        self.unit_count.checked_mul(self.unit_price)
    }
}

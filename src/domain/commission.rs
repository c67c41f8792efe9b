use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LineItemKind {
    Base,
    Bonus,
    Penalty,
    Shared,
}

/// One step of a commission calculation, kept for display.
///
/// `amount` is a magnitude; whether it adds or subtracts follows from `kind`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CommissionLineItem {
    pub label: String,
    pub amount: Decimal,
    pub kind: LineItemKind,
}

impl CommissionLineItem {
    pub fn new(label: impl Into<String>, amount: Decimal, kind: LineItemKind) -> Self {
        Self {
            label: label.into(),
            amount,
            kind,
        }
    }
}

/// Outcome of one calculation. Line items are in computation order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommissionResult {
    pub sale_amount: Decimal,
    /// Commission before the sharing deduction.
    pub gross_commission: Decimal,
    /// Payable amount, never below zero.
    pub total_commission: Decimal,
    pub breakdown: Vec<CommissionLineItem>,
}

impl CommissionResult {
    pub fn kinds(&self) -> Vec<LineItemKind> {
        self.breakdown.iter().map(|item| item.kind).collect()
    }

    pub fn item(&self, kind: LineItemKind) -> Option<&CommissionLineItem> {
        self.breakdown.iter().find(|item| item.kind == kind)
    }
}

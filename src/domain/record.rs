use super::category::Category;
use super::clock::MonthWindow;
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque per-category details kept alongside a sale.
pub type IndustryData = Map<String, Value>;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SaleId(pub String);

impl SaleId {
    /// Random 128-bit identifier rendered in the usual UUID v4 layout.
    pub fn generate() -> Self {
        let mut bytes: [u8; 16] = rand::thread_rng().r#gen();
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(format!(
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SaleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SaleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(SaleStatus::Pending),
            "completed" => Ok(SaleStatus::Completed),
            "cancelled" => Ok(SaleStatus::Cancelled),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// A persisted sale, owned by the sale history store.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub id: SaleId,
    pub industry: Category,
    pub customer_name: String,
    pub sale_amount: Decimal,
    pub commission: Decimal,
    pub status: SaleStatus,
    pub date_created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub industry_data: IndustryData,
}

/// Partial changes to an existing sale. `None` leaves a field untouched.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SaleUpdate {
    pub customer_name: Option<String>,
    pub sale_amount: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub status: Option<SaleStatus>,
    pub date_completed: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub industry_data: Option<IndustryData>,
}

impl SaleUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl SaleRecord {
    pub fn apply(&mut self, update: SaleUpdate) {
        if let Some(customer_name) = update.customer_name {
            self.customer_name = customer_name;
        }
        if let Some(sale_amount) = update.sale_amount {
            self.sale_amount = sale_amount;
        }
        if let Some(commission) = update.commission {
            self.commission = commission;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(date_completed) = update.date_completed {
            self.date_completed = Some(date_completed);
        }
        if let Some(notes) = update.notes {
            self.notes = Some(notes);
        }
        if let Some(industry_data) = update.industry_data {
            self.industry_data = industry_data;
        }
    }
}

/// Narrows a category's history by status and/or calendar month.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub month: Option<MonthWindow>,
}

impl SaleFilter {
    pub fn completed_in(month: MonthWindow) -> Self {
        Self {
            status: Some(SaleStatus::Completed),
            month: Some(month),
        }
    }

    pub fn with_status(status: SaleStatus) -> Self {
        Self {
            status: Some(status),
            month: None,
        }
    }

    pub fn matches(&self, category: Category, record: &SaleRecord) -> bool {
        record.industry == category
            && self.status.is_none_or(|status| record.status == status)
            && self
                .month
                .is_none_or(|month| month.contains(&record.date_created))
    }
}

/// Summary figures for a category's sales.
///
/// Totals and the average cover completed sales only.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub total_sales: usize,
    pub total_commission: Decimal,
    pub pending_sales: usize,
    pub completed_sales: usize,
    pub average_sale_amount: Decimal,
}

impl SalesStats {
    pub fn from_records(records: &[SaleRecord]) -> Self {
        let completed: Vec<&SaleRecord> = records
            .iter()
            .filter(|r| r.status == SaleStatus::Completed)
            .collect();
        let pending_sales = records
            .iter()
            .filter(|r| r.status == SaleStatus::Pending)
            .count();
        let total_commission = completed.iter().map(|r| r.commission).sum();
        let average_sale_amount = if completed.is_empty() {
            Decimal::ZERO
        } else {
            let total: Decimal = completed.iter().map(|r| r.sale_amount).sum();
            total / Decimal::from(completed.len())
        };

        Self {
            total_sales: completed.len(),
            total_commission,
            pending_sales,
            completed_sales: completed.len(),
            average_sale_amount,
        }
    }
}

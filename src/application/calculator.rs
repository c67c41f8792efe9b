use crate::domain::category::Category;
use crate::domain::clock::ClockBox;
use crate::domain::commission::CommissionResult;
use crate::domain::engine::CommissionEngine;
use crate::domain::ports::{SaleHistoryStoreBox, SettingsStoreBox};
use crate::domain::record::{
    IndustryData, SaleFilter, SaleId, SaleRecord, SaleStatus, SaleUpdate, SalesStats,
};
use crate::domain::rules::RuleSet;
use crate::domain::sale::SaleInput;
use crate::error::{CommissionError, Result};
use crate::interfaces::format::currency;
use rust_decimal::Decimal;
use serde_json::{Value, json};

pub const UNKNOWN_CUSTOMER: &str = "Unknown Customer";

/// A finished calculation together with everything that went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub category: Category,
    pub input: SaleInput,
    pub rules: RuleSet,
    pub monthly_completed_count: u32,
    pub result: CommissionResult,
}

impl Calculation {
    /// Summary kept in the notes of a saved sale.
    pub fn notes(&self) -> String {
        let items: Vec<String> = self
            .result
            .breakdown
            .iter()
            .map(|item| format!("{}: {}", item.label, currency(item.amount)))
            .collect();
        format!("Commission breakdown: {}", items.join(", "))
    }

    fn industry_data(&self) -> Result<IndustryData> {
        let data = json!({
            "unitCount": self.input.unit_count,
            "unitPrice": self.input.unit_price,
            "unitLabel": self.category.unit_label(),
            "monthlyCompletedCount": self.monthly_completed_count,
            "rules": serde_json::to_value(&self.rules)?,
        });
        Ok(into_map(data))
    }
}

/// A sale entered by hand in the history tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualSale {
    pub category: Category,
    pub customer_name: String,
    /// System size, linear feet, or service count depending on category.
    pub unit_count: Decimal,
    pub sale_amount: Decimal,
    pub commission: Decimal,
    pub status: SaleStatus,
    pub notes: Option<String>,
}

impl ManualSale {
    fn validate(&self) -> Result<()> {
        if self.customer_name.trim().is_empty() {
            return Err(CommissionError::Validation(
                "customer name is required".to_string(),
            ));
        }
        if self.unit_count <= Decimal::ZERO {
            return Err(CommissionError::Validation(format!(
                "{} must be greater than zero",
                self.category.unit_label()
            )));
        }
        Ok(())
    }

    /// Price per base unit, or `None` when it cannot be represented.
    fn unit_price(&self) -> Option<Decimal> {
        self.unit_count
            .checked_mul(self.category.base_unit_factor())
            .and_then(|units| self.sale_amount.checked_div(units))
            .map(|price| price.normalize())
    }

    fn industry_data(&self) -> IndustryData {
        let data = match self.category {
            Category::Solar => json!({
                "systemSize": self.unit_count,
                "pricePerWatt": self.unit_price(),
            }),
            Category::Lighting => json!({
                "linearFeet": self.unit_count,
                "pricePerFoot": self.unit_price(),
            }),
            Category::Pest => json!({ "systemSize": self.unit_count }),
        };
        into_map(data)
    }
}

fn into_map(value: Value) -> IndustryData {
    match value {
        Value::Object(map) => map,
        _ => IndustryData::new(),
    }
}

/// Orchestrates calculations and sale history over injected stores.
///
/// Holds no state of its own beyond the store handles and the clock, so any
/// number of calculations can run against one service.
pub struct CommissionService {
    sales: SaleHistoryStoreBox,
    settings: SettingsStoreBox,
    clock: ClockBox,
}

impl CommissionService {
    /// Creates a new `CommissionService`.
    ///
    /// # Arguments
    ///
    /// * `sales` - The sale history store.
    /// * `settings` - The per-category rule store.
    /// * `clock` - Source of "now" for record dates and the bonus window.
    pub fn new(sales: SaleHistoryStoreBox, settings: SettingsStoreBox, clock: ClockBox) -> Self {
        Self {
            sales,
            settings,
            clock,
        }
    }

    pub fn clock(&self) -> &ClockBox {
        &self.clock
    }

    /// Stored rules for `category`, or the defaults when none are saved.
    pub async fn rules(&self, category: Category) -> Result<RuleSet> {
        Ok(self.settings.get(category).await?.unwrap_or_default())
    }

    /// Validates and stores `rules`, replacing whatever was there.
    pub async fn save_rules(&self, category: Category, rules: RuleSet) -> Result<()> {
        rules.validate()?;
        self.settings.put(category, rules).await?;
        log::debug!("saved {category} settings");
        Ok(())
    }

    pub async fn reset_rules(&self, category: Category) -> Result<()> {
        self.settings.delete(category).await
    }

    /// Completed sales in `category` created during the clock's current month.
    pub async fn monthly_completed_count(&self, category: Category) -> Result<u32> {
        let filter = SaleFilter::completed_in(self.clock.current_month());
        let completed = self.sales.query(category, &filter).await?;
        let count = u32::try_from(completed.len()).unwrap_or(u32::MAX);
        log::debug!("{count} completed {category} sales this month");
        Ok(count)
    }

    /// Calculates with the stored rules. `Ok(None)` means the input is not ready.
    pub async fn calculate(
        &self,
        category: Category,
        input: SaleInput,
    ) -> Result<Option<Calculation>> {
        let rules = self.rules(category).await?;
        self.calculate_with(category, input, rules).await
    }

    /// Calculates with explicit rules. The history is only consulted when the
    /// volume bonus is enabled.
    pub async fn calculate_with(
        &self,
        category: Category,
        input: SaleInput,
        rules: RuleSet,
    ) -> Result<Option<Calculation>> {
        if !category.has_calculator() {
            return Err(CommissionError::CategoryUnavailable(category));
        }
        if !input.is_ready() {
            return Ok(None);
        }

        let monthly_completed_count = if rules.volume_bonus.enabled {
            self.monthly_completed_count(category).await?
        } else {
            0
        };

        let engine = CommissionEngine::new(category);
        Ok(engine
            .compute(&input, &rules, monthly_completed_count)?
            .map(|result| Calculation {
                category,
                input,
                rules,
                monthly_completed_count,
                result,
            }))
    }

    /// Persists a calculation as a new pending sale.
    pub async fn save_calculation(
        &self,
        calculation: &Calculation,
        customer_name: Option<&str>,
    ) -> Result<SaleId> {
        let customer_name = customer_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_CUSTOMER);

        let record = SaleRecord {
            id: SaleId::generate(),
            industry: calculation.category,
            customer_name: customer_name.to_string(),
            sale_amount: calculation.result.sale_amount,
            commission: calculation.result.total_commission,
            status: SaleStatus::Pending,
            date_created: self.clock.now_utc(),
            date_completed: None,
            notes: Some(calculation.notes()),
            industry_data: calculation.industry_data()?,
        };
        let id = self.sales.insert(record).await?;
        log::info!("saved {} sale {id}", calculation.category);
        Ok(id)
    }

    /// Records a sale entered by hand.
    pub async fn add_sale(&self, sale: ManualSale) -> Result<SaleId> {
        sale.validate()?;
        let now = self.clock.now_utc();
        let record = SaleRecord {
            id: SaleId::generate(),
            industry: sale.category,
            customer_name: sale.customer_name.trim().to_string(),
            sale_amount: sale.sale_amount,
            commission: sale.commission,
            status: sale.status,
            date_created: now,
            date_completed: (sale.status == SaleStatus::Completed).then_some(now),
            notes: sale.notes.clone().filter(|n| !n.is_empty()),
            industry_data: sale.industry_data(),
        };
        self.sales.insert(record).await
    }

    pub async fn update_sale(&self, id: &SaleId, mut update: SaleUpdate) -> Result<SaleRecord> {
        if update.status == Some(SaleStatus::Completed) && update.date_completed.is_none() {
            update.date_completed = Some(self.clock.now_utc());
        }
        self.sales.update(id, update).await
    }

    /// Changes a sale's status; completing it stamps the completion date.
    pub async fn set_status(&self, id: &SaleId, status: SaleStatus) -> Result<SaleRecord> {
        self.update_sale(
            id,
            SaleUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete_sale(&self, id: &SaleId) -> Result<()> {
        self.sales.delete(id).await?;
        log::info!("deleted sale {id}");
        Ok(())
    }

    pub async fn get_sale(&self, id: &SaleId) -> Result<Option<SaleRecord>> {
        self.sales.get(id).await
    }

    /// Sales in `category` matching `filter`, newest first.
    pub async fn list_sales(&self, category: Category, filter: &SaleFilter) -> Result<Vec<SaleRecord>> {
        let mut sales = self.sales.query(category, filter).await?;
        sales.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        Ok(sales)
    }

    pub async fn stats(&self, category: Category) -> Result<SalesStats> {
        let sales = self.sales.query(category, &SaleFilter::default()).await?;
        Ok(SalesStats::from_records(&sales))
    }

    pub(crate) async fn insert_records(&self, records: Vec<SaleRecord>) -> Result<Vec<SaleId>> {
        self.sales.insert_many(records).await
    }

    pub(crate) async fn stored_rules(&self, category: Category) -> Result<Option<RuleSet>> {
        self.settings.get(category).await
    }

    pub(crate) async fn put_rules(&self, category: Category, rules: RuleSet) -> Result<()> {
        self.settings.put(category, rules).await
    }
}

use crate::domain::category::Category;
use crate::domain::ports::{SaleHistoryStore, SettingsStore};
use crate::domain::record::{SaleFilter, SaleId, SaleRecord, SaleUpdate};
use crate::domain::rules::RuleSet;
use crate::error::{CommissionError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory sale history.
///
/// Uses `Arc<RwLock<HashMap<SaleId, SaleRecord>>>` so clones share the same data.
/// Nothing survives the process; meant for tests and dry runs.
#[derive(Default, Clone)]
pub struct InMemorySaleStore {
    sales: Arc<RwLock<HashMap<SaleId, SaleRecord>>>,
}

impl InMemorySaleStore {
    /// Creates a new, empty in-memory sale store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SaleHistoryStore for InMemorySaleStore {
    async fn insert(&self, record: SaleRecord) -> Result<SaleId> {
        let mut sales = self.sales.write().await;
        if sales.contains_key(&record.id) {
            return Err(CommissionError::Validation(format!(
                "sale {} already exists",
                record.id
            )));
        }
        let id = record.id.clone();
        sales.insert(id.clone(), record);
        Ok(id)
    }

    async fn get(&self, id: &SaleId) -> Result<Option<SaleRecord>> {
        let sales = self.sales.read().await;
        Ok(sales.get(id).cloned())
    }

    async fn query(&self, category: Category, filter: &SaleFilter) -> Result<Vec<SaleRecord>> {
        let sales = self.sales.read().await;
        Ok(sales
            .values()
            .filter(|record| filter.matches(category, record))
            .cloned()
            .collect())
    }

    async fn update(&self, id: &SaleId, update: SaleUpdate) -> Result<SaleRecord> {
        let mut sales = self.sales.write().await;
        let record = sales
            .get_mut(id)
            .ok_or_else(|| CommissionError::NotFound(id.to_string()))?;
        record.apply(update);
        Ok(record.clone())
    }

    async fn delete(&self, id: &SaleId) -> Result<()> {
        let mut sales = self.sales.write().await;
        sales.remove(id);
        Ok(())
    }
}

/// A thread-safe in-memory settings store, one rule set per category.
#[derive(Default, Clone)]
pub struct InMemorySettingsStore {
    settings: Arc<RwLock<HashMap<Category, RuleSet>>>,
}

impl InMemorySettingsStore {
    /// Creates a new, empty in-memory settings store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get(&self, category: Category) -> Result<Option<RuleSet>> {
        let settings = self.settings.read().await;
        Ok(settings.get(&category).cloned())
    }

    async fn put(&self, category: Category, rules: RuleSet) -> Result<()> {
        let mut settings = self.settings.write().await;
        settings.insert(category, rules);
        Ok(())
    }

    async fn delete(&self, category: Category) -> Result<()> {
        let mut settings = self.settings.write().await;
        settings.remove(&category);
        Ok(())
    }
}

use super::category::Category;
use super::record::{SaleFilter, SaleId, SaleRecord, SaleUpdate};
use super::rules::RuleSet;
use crate::error::Result;
use async_trait::async_trait;

/// Durable history of sale records.
#[async_trait]
pub trait SaleHistoryStore: Send + Sync {
    /// Persists a new record and returns its id. Existing ids are rejected.
    async fn insert(&self, record: SaleRecord) -> Result<SaleId>;
    /// Persists several new records. Stores that can write them in one step
    /// override this; the fallback inserts one at a time and may stop part way.
    async fn insert_many(&self, records: Vec<SaleRecord>) -> Result<Vec<SaleId>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.insert(record).await?);
        }
        Ok(ids)
    }
    async fn get(&self, id: &SaleId) -> Result<Option<SaleRecord>>;
    async fn query(&self, category: Category, filter: &SaleFilter) -> Result<Vec<SaleRecord>>;
    /// Fails with `NotFound` when no record has this id.
    async fn update(&self, id: &SaleId, update: SaleUpdate) -> Result<SaleRecord>;
    async fn delete(&self, id: &SaleId) -> Result<()>;
}

/// Durable rule set per category.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, category: Category) -> Result<Option<RuleSet>>;
    async fn put(&self, category: Category, rules: RuleSet) -> Result<()>;
    async fn delete(&self, category: Category) -> Result<()>;
}

pub type SaleHistoryStoreBox = Box<dyn SaleHistoryStore>;
pub type SettingsStoreBox = Box<dyn SettingsStore>;

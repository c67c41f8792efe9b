use crate::domain::category::Category;
use crate::domain::ports::{SaleHistoryStore, SettingsStore};
use crate::domain::record::{SaleFilter, SaleId, SaleRecord, SaleUpdate};
use crate::domain::rules::RuleSet;
use crate::error::{CommissionError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing sale records.
pub const CF_SALES: &str = "sales";
/// Column Family for storing one rule set per category.
pub const CF_SETTINGS: &str = "settings";

/// A persistent store implementation using RocksDB.
///
/// Sales are keyed by id, settings by category name, each in its own
/// Column Family. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

fn missing_cf(name: &str) -> CommissionError {
    CommissionError::InternalError(Box::new(std::io::Error::other(format!(
        "{name} column family not found"
    ))))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "sales" and "settings" column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_sales = ColumnFamilyDescriptor::new(CF_SALES, Options::default());
        let cf_settings = ColumnFamilyDescriptor::new(CF_SETTINGS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_sales, cf_settings])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn put_sale(&self, record: &SaleRecord) -> Result<()> {
        let cf = self.db.cf_handle(CF_SALES).ok_or_else(|| missing_cf(CF_SALES))?;
        let value = serde_json::to_vec(record)?;
        self.db.put_cf(cf, record.id.as_str().as_bytes(), value)?;
        Ok(())
    }
}

#[async_trait]
impl SaleHistoryStore for RocksDBStore {
    async fn insert(&self, record: SaleRecord) -> Result<SaleId> {
        let cf = self.db.cf_handle(CF_SALES).ok_or_else(|| missing_cf(CF_SALES))?;
        if self.db.get_pinned_cf(cf, record.id.as_str().as_bytes())?.is_some() {
            return Err(CommissionError::Validation(format!(
                "sale {} already exists",
                record.id
            )));
        }
        self.put_sale(&record)?;
        Ok(record.id)
    }

    async fn get(&self, id: &SaleId) -> Result<Option<SaleRecord>> {
        let cf = self.db.cf_handle(CF_SALES).ok_or_else(|| missing_cf(CF_SALES))?;
        match self.db.get_cf(cf, id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn query(&self, category: Category, filter: &SaleFilter) -> Result<Vec<SaleRecord>> {
        let cf = self.db.cf_handle(CF_SALES).ok_or_else(|| missing_cf(CF_SALES))?;

        let mut sales = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let record: SaleRecord = serde_json::from_slice(&value)?;
            if filter.matches(category, &record) {
                sales.push(record);
            }
        }
        Ok(sales)
    }

    async fn update(&self, id: &SaleId, update: SaleUpdate) -> Result<SaleRecord> {
        let mut record = SaleHistoryStore::get(self, id)
            .await?
            .ok_or_else(|| CommissionError::NotFound(id.to_string()))?;
        record.apply(update);
        self.put_sale(&record)?;
        Ok(record)
    }

    async fn delete(&self, id: &SaleId) -> Result<()> {
        let cf = self.db.cf_handle(CF_SALES).ok_or_else(|| missing_cf(CF_SALES))?;
        self.db.delete_cf(cf, id.as_str().as_bytes())?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for RocksDBStore {
    async fn get(&self, category: Category) -> Result<Option<RuleSet>> {
        let cf = self
            .db
            .cf_handle(CF_SETTINGS)
            .ok_or_else(|| missing_cf(CF_SETTINGS))?;
        match self.db.get_cf(cf, category.as_str().as_bytes())? {
            Some(bytes) => {
                let value: serde_json::Value = serde_json::from_slice(&bytes)?;
                Ok(Some(RuleSet::from_value(value)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, category: Category, rules: RuleSet) -> Result<()> {
        let cf = self
            .db
            .cf_handle(CF_SETTINGS)
            .ok_or_else(|| missing_cf(CF_SETTINGS))?;
        let value = serde_json::to_vec(&rules)?;
        self.db.put_cf(cf, category.as_str().as_bytes(), value)?;
        Ok(())
    }

    async fn delete(&self, category: Category) -> Result<()> {
        let cf = self
            .db
            .cf_handle(CF_SETTINGS)
            .ok_or_else(|| missing_cf(CF_SETTINGS))?;
        self.db.delete_cf(cf, category.as_str().as_bytes())?;
        Ok(())
    }
}

use crate::domain::category::Category;
use crate::domain::ports::{SaleHistoryStore, SettingsStore};
use crate::domain::record::{SaleFilter, SaleId, SaleRecord, SaleUpdate};
use crate::domain::rules::RuleSet;
use crate::error::{CommissionError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const SALES_FILE: &str = "sales.json";
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsEntry {
    settings: serde_json::Value,
    last_updated: DateTime<Utc>,
}

/// Durable store keeping sales and settings as JSON documents in a directory.
///
/// Every write replaces the whole file through a temporary file in the same
/// directory, so a crash leaves either the old or the new document. Clones
/// share one lock, serializing read-modify-write cycles within the process.
#[derive(Clone)]
pub struct JsonFileStore {
    root: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_json<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T> {
        let path = self.root.join(file);
        if !path.exists() {
            return Ok(T::default());
        }
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.root.join(file))
            .map_err(|e| CommissionError::Storage(e.error))?;
        Ok(())
    }

    fn read_sales(&self) -> Result<Vec<SaleRecord>> {
        self.read_json(SALES_FILE)
    }

    fn read_settings(&self) -> Result<BTreeMap<Category, SettingsEntry>> {
        self.read_json(SETTINGS_FILE)
    }
}

#[async_trait]
impl SaleHistoryStore for JsonFileStore {
    async fn insert(&self, record: SaleRecord) -> Result<SaleId> {
        let _guard = self.lock.lock().await;
        let mut sales = self.read_sales()?;
        if sales.iter().any(|s| s.id == record.id) {
            return Err(CommissionError::Validation(format!(
                "sale {} already exists",
                record.id
            )));
        }
        let id = record.id.clone();
        sales.push(record);
        self.write_json(SALES_FILE, &sales)?;
        Ok(id)
    }

    async fn insert_many(&self, records: Vec<SaleRecord>) -> Result<Vec<SaleId>> {
        let _guard = self.lock.lock().await;
        let mut sales = self.read_sales()?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            if ids.contains(&record.id) || sales.iter().any(|s| s.id == record.id) {
                return Err(CommissionError::Validation(format!(
                    "sale {} already exists",
                    record.id
                )));
            }
            ids.push(record.id.clone());
            sales.push(record);
        }
        self.write_json(SALES_FILE, &sales)?;
        Ok(ids)
    }

    async fn get(&self, id: &SaleId) -> Result<Option<SaleRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_sales()?.into_iter().find(|s| &s.id == id))
    }

    async fn query(&self, category: Category, filter: &SaleFilter) -> Result<Vec<SaleRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .read_sales()?
            .into_iter()
            .filter(|record| filter.matches(category, record))
            .collect())
    }

    async fn update(&self, id: &SaleId, update: SaleUpdate) -> Result<SaleRecord> {
        let _guard = self.lock.lock().await;
        let mut sales = self.read_sales()?;
        let record = sales
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| CommissionError::NotFound(id.to_string()))?;
        record.apply(update);
        let updated = record.clone();
        self.write_json(SALES_FILE, &sales)?;
        Ok(updated)
    }

    async fn delete(&self, id: &SaleId) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut sales = self.read_sales()?;
        let before = sales.len();
        sales.retain(|s| &s.id != id);
        if sales.len() != before {
            self.write_json(SALES_FILE, &sales)?;
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn get(&self, category: Category) -> Result<Option<RuleSet>> {
        let _guard = self.lock.lock().await;
        match self.read_settings()?.remove(&category) {
            Some(entry) => Ok(Some(RuleSet::from_value(entry.settings)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, category: Category, rules: RuleSet) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut settings = self.read_settings()?;
        settings.insert(
            category,
            SettingsEntry {
                settings: serde_json::to_value(&rules)?,
                last_updated: Utc::now(),
            },
        );
        self.write_json(SETTINGS_FILE, &settings)
    }

    async fn delete(&self, category: Category) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut settings = self.read_settings()?;
        if settings.remove(&category).is_some() {
            self.write_json(SETTINGS_FILE, &settings)?;
        }
        Ok(())
    }
}

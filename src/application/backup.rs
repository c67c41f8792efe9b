use super::calculator::CommissionService;
use crate::domain::category::Category;
use crate::domain::record::{IndustryData, SaleFilter, SaleId, SaleRecord, SaleStatus};
use crate::domain::rules::RuleSet;
use crate::error::{ImportError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const BACKUP_VERSION: &str = "1.0";

/// On-disk backup of one category's settings and sales.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BackupFile {
    pub version: String,
    pub industry: Category,
    pub export_date: DateTime<Utc>,
    /// The category's rule set, or an empty object when none was saved.
    pub settings: Value,
    pub sales: Vec<SaleRecord>,
}

/// A sale as accepted from a backup. Ids are never trusted; the industry is
/// taken from the backup header.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImportedSale {
    pub customer_name: String,
    pub sale_amount: Decimal,
    pub commission: Decimal,
    #[serde(default)]
    pub status: SaleStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub industry_data: IndustryData,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_completed: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<IndustryData, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<IndustryData>::deserialize(deserializer)?.unwrap_or_default())
}

/// A backup that passed every check and can be applied without surprises.
#[derive(Debug, PartialEq, Clone)]
pub struct ValidatedImport {
    pub category: Category,
    pub export_date: Option<DateTime<Utc>>,
    pub settings: Option<RuleSet>,
    pub sales: Vec<ImportedSale>,
}

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct ImportSummary {
    pub settings_imported: bool,
    pub sales_imported: usize,
}

/// Checks a backup document against `category` without touching any store.
pub fn validate_backup(
    bytes: &[u8],
    category: Category,
) -> std::result::Result<ValidatedImport, ImportError> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| ImportError::InvalidJson(e.to_string()))?;
    let Value::Object(mut document) = document else {
        return Err(ImportError::InvalidJson("expected a JSON object".to_string()));
    };

    match document.get("version") {
        None | Some(Value::Null) => return Err(ImportError::MissingVersion),
        Some(Value::String(v)) if v.is_empty() => return Err(ImportError::MissingVersion),
        Some(Value::String(v)) if v == BACKUP_VERSION => {}
        Some(other) => {
            let found = other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string());
            return Err(ImportError::UnsupportedVersion(found));
        }
    }

    let industry = document
        .get("industry")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if industry != category.as_str() {
        return Err(ImportError::CategoryMismatch {
            expected: category,
            found: industry.to_string(),
        });
    }

    let export_date = document
        .get("exportDate")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc));

    let settings = match document.remove("settings") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) if map.is_empty() => None,
        Some(value) => {
            let rules = RuleSet::from_value(value)
                .map_err(|e| ImportError::InvalidSettings(e.to_string()))?;
            rules
                .validate()
                .map_err(|e| ImportError::InvalidSettings(e.to_string()))?;
            Some(rules)
        }
    };

    let sales = match document.remove("sales") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<ImportedSale>(item).map_err(|e| ImportError::InvalidSale {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
        Some(_) => return Err(ImportError::InvalidJson("sales must be a list".to_string())),
    };

    Ok(ValidatedImport {
        category,
        export_date,
        settings,
        sales,
    })
}

/// Export and import of a category's data.
pub struct BackupService<'a> {
    service: &'a CommissionService,
    product: String,
}

impl<'a> BackupService<'a> {
    pub fn new(service: &'a CommissionService, product: impl Into<String>) -> Self {
        Self {
            service,
            product: product.into(),
        }
    }

    pub async fn export(&self, category: Category) -> Result<BackupFile> {
        let settings = match self.service.stored_rules(category).await? {
            Some(rules) => serde_json::to_value(&rules)?,
            None => Value::Object(Default::default()),
        };
        let sales = self
            .service
            .list_sales(category, &SaleFilter::default())
            .await?;

        Ok(BackupFile {
            version: BACKUP_VERSION.to_string(),
            industry: category,
            export_date: self.service.clock().now_utc(),
            settings,
            sales,
        })
    }

    /// `<product>-<category>-backup-<YYYY-MM-DD>.json`
    pub fn filename(&self, category: Category, date: NaiveDate) -> String {
        format!(
            "{}-{}-backup-{}.json",
            self.product,
            category,
            date.format("%Y-%m-%d")
        )
    }

    /// Writes a backup into `dir` and returns the file's path.
    pub async fn export_to_dir(&self, category: Category, dir: &Path) -> Result<PathBuf> {
        let backup = self.export(category).await?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.filename(category, backup.export_date.date_naive()));
        std::fs::write(&path, serde_json::to_vec_pretty(&backup)?)?;
        log::info!(
            "exported {} {category} sales to {}",
            backup.sales.len(),
            path.display()
        );
        Ok(path)
    }

    pub fn parse(&self, bytes: &[u8], category: Category) -> Result<ValidatedImport> {
        Ok(validate_backup(bytes, category)?)
    }

    /// Merges a validated backup into the stores.
    ///
    /// Sales are always added under new ids and nothing existing is removed;
    /// they are written in one batch before settings replace the stored rule
    /// set wholesale. A store that cannot batch, or a settings write failing
    /// after the sales landed, can leave the import partly applied.
    pub async fn apply(&self, import: ValidatedImport) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        let now = self.service.clock().now_utc();
        let records: Vec<SaleRecord> = import
            .sales
            .into_iter()
            .map(|sale| SaleRecord {
                id: SaleId::generate(),
                industry: import.category,
                customer_name: sale.customer_name,
                sale_amount: sale.sale_amount,
                commission: sale.commission,
                status: sale.status,
                date_created: sale.date_created.unwrap_or(now),
                date_completed: sale.date_completed,
                notes: sale.notes,
                industry_data: sale.industry_data,
            })
            .collect();
        if !records.is_empty() {
            summary.sales_imported = self.service.insert_records(records).await?.len();
        }

        if let Some(rules) = import.settings {
            self.service.put_rules(import.category, rules).await?;
            summary.settings_imported = true;
        }

        log::info!(
            "imported {} {} sales (settings: {})",
            summary.sales_imported,
            import.category,
            summary.settings_imported
        );
        Ok(summary)
    }

    pub async fn import_file(&self, path: &Path, category: Category) -> Result<ImportSummary> {
        let bytes = std::fs::read(path)?;
        let import = self.parse(&bytes, category)?;
        self.apply(import).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::calculator::ManualSale;
    use crate::domain::clock::FixedClock;
    use crate::domain::sale::SaleInput;
    use crate::error::CommissionError;
    use crate::infrastructure::in_memory::{InMemorySaleStore, InMemorySettingsStore};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn service() -> CommissionService {
        CommissionService::new(
            Box::new(InMemorySaleStore::new()),
            Box::new(InMemorySettingsStore::new()),
            Box::new(FixedClock(
                DateTime::parse_from_rfc3339("2026-10-18T12:00:00+00:00").unwrap(),
            )),
        )
    }

    async fn populated() -> CommissionService {
        let service = service();
        let mut rules = RuleSet::default();
        rules.sharing.enabled = true;
        rules.sharing.shared_percent = dec!(40);
        service.save_rules(Category::Solar, rules).await.unwrap();

        let calc = service
            .calculate(Category::Solar, SaleInput::new(dec!(8.5), dec!(3.20)))
            .await
            .unwrap()
            .unwrap();
        service.save_calculation(&calc, Some("Ann")).await.unwrap();
        service
            .add_sale(ManualSale {
                category: Category::Solar,
                customer_name: "Bo".to_string(),
                unit_count: dec!(6),
                sale_amount: dec!(18000),
                commission: dec!(600),
                status: SaleStatus::Completed,
                notes: None,
            })
            .await
            .unwrap();
        service
    }

    #[tokio::test]
    async fn test_export_then_import_into_empty_store() {
        let source = populated().await;
        let exported = BackupService::new(&source, "commishcrunch")
            .export(Category::Solar)
            .await
            .unwrap();
        assert_eq!(exported.version, "1.0");
        assert_eq!(exported.sales.len(), 2);
        let bytes = serde_json::to_vec_pretty(&exported).unwrap();

        let target = service();
        let backup = BackupService::new(&target, "commishcrunch");
        let validated = backup.parse(&bytes, Category::Solar).unwrap();
        let summary = backup.apply(validated).await.unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                settings_imported: true,
                sales_imported: 2
            }
        );

        assert_eq!(
            target.rules(Category::Solar).await.unwrap(),
            source.rules(Category::Solar).await.unwrap()
        );
        let imported = target
            .list_sales(Category::Solar, &SaleFilter::default())
            .await
            .unwrap();
        assert_eq!(imported.len(), 2);
        for sale in &imported {
            assert!(exported.sales.iter().all(|s| s.id != sale.id));
        }
        let completed = imported
            .iter()
            .find(|s| s.status == SaleStatus::Completed)
            .unwrap();
        assert_eq!(completed.customer_name, "Bo");
        assert!(completed.date_completed.is_some());
    }

    #[tokio::test]
    async fn test_import_is_additive() {
        let source = populated().await;
        let bytes = serde_json::to_vec(
            &BackupService::new(&source, "commishcrunch")
                .export(Category::Solar)
                .await
                .unwrap(),
        )
        .unwrap();

        let backup = BackupService::new(&source, "commishcrunch");
        backup
            .apply(backup.parse(&bytes, Category::Solar).unwrap())
            .await
            .unwrap();
        assert_eq!(source.stats(Category::Solar).await.unwrap().pending_sales, 2);
        let all = source
            .list_sales(Category::Solar, &SaleFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            (json!("just a string"), "object"),
            (json!({ "industry": "solar" }), "version"),
            (json!({ "version": "2.0", "industry": "solar" }), "unsupported"),
            (json!({ "version": "1.0", "industry": "lighting" }), "expected solar"),
            (
                json!({ "version": "1.0", "industry": "solar", "settings": { "baseRate": "high" } }),
                "settings",
            ),
            (
                json!({ "version": "1.0", "industry": "solar", "settings": {
                    "pricePerUnit": 3.2, "baseRatePercent": 250, "redlinePrice": 2.8,
                    "volumeBonus": { "enabled": false, "monthlyThreshold": 10, "bonusRatePercent": 0.5 },
                    "sharing": { "enabled": false, "sharedPercent": 50, "reason": "x" }
                } }),
                "between 0 and 100",
            ),
            (
                json!({ "version": "1.0", "industry": "solar", "sales": [
                    { "customerName": "A", "saleAmount": 1, "commission": 1 },
                    { "customerName": "B", "commission": 1 }
                ] }),
                "sale #1",
            ),
            (json!({ "version": "1.0", "industry": "solar", "sales": 3 }), "list"),
        ];

        for (document, expected) in cases {
            let bytes = serde_json::to_vec(&document).unwrap();
            let err = validate_backup(&bytes, Category::Solar).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "{err} should mention {expected}"
            );
        }
        assert!(matches!(
            validate_backup(b"{not json", Category::Solar),
            Err(ImportError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_legacy_backup_is_accepted() {
        let document = json!({
            "version": "1.0",
            "industry": "solar",
            "exportDate": "2025-06-01T15:00:00.000Z",
            "settings": { "pricePerKw": 3.3, "hasVolumeBonus": true, "volumeThreshold": 4 },
            "sales": [{
                "id": "abc",
                "industry": "solar",
                "customerName": "Old Customer",
                "saleAmount": 27000,
                "commission": 945.5,
                "status": "completed",
                "dateCreated": "2025-05-20T10:00:00.000Z",
                "industryData": { "systemSize": 9 }
            }]
        });
        let bytes = serde_json::to_vec(&document).unwrap();
        let import = validate_backup(&bytes, Category::Solar).unwrap();

        let rules = import.settings.unwrap();
        assert_eq!(rules.price_per_unit, dec!(3.3));
        assert_eq!(rules.volume_bonus.monthly_threshold, 4);
        assert_eq!(import.sales.len(), 1);
        assert_eq!(import.sales[0].commission, dec!(945.5));
        assert_eq!(import.sales[0].status, SaleStatus::Completed);
        assert!(import.export_date.is_some());
    }

    #[tokio::test]
    async fn test_null_industry_data_imports_as_empty() {
        let target = service();
        let document = json!({
            "version": "1.0",
            "industry": "solar",
            "sales": [{
                "customerName": "No Details",
                "saleAmount": 18000,
                "commission": 630,
                "industryData": null
            }]
        });
        let bytes = serde_json::to_vec(&document).unwrap();
        let backup = BackupService::new(&target, "commishcrunch");
        let import = backup.parse(&bytes, Category::Solar).unwrap();
        assert!(import.sales[0].industry_data.is_empty());

        let summary = backup.apply(import).await.unwrap();
        assert_eq!(summary.sales_imported, 1);
        assert!(!summary.settings_imported);
        let sales = target.list_sales(Category::Solar, &SaleFilter::default()).await.unwrap();
        assert!(sales[0].industry_data.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_import_changes_nothing() {
        let target = service();
        let document = json!({
            "version": "1.0",
            "industry": "solar",
            "settings": { "pricePerKw": 9.9 },
            "sales": [{ "customerName": "A", "saleAmount": 1, "commission": 1 }, { "oops": true }]
        });
        let bytes = serde_json::to_vec(&document).unwrap();
        let backup = BackupService::new(&target, "commishcrunch");
        let err = backup.parse(&bytes, Category::Solar).unwrap_err();
        assert!(matches!(
            err,
            CommissionError::Import(ImportError::InvalidSale { index: 1, .. })
        ));
        assert_eq!(target.rules(Category::Solar).await.unwrap(), RuleSet::default());
        assert_eq!(target.stats(Category::Solar).await.unwrap().pending_sales, 0);
    }

    #[test]
    fn test_filename_convention() {
        let service = service();
        let backup = BackupService::new(&service, "commishcrunch");
        let today = service.clock().now_utc().date_naive();
        assert_eq!(
            backup.filename(Category::Solar, today),
            "commishcrunch-solar-backup-2026-10-18.json"
        );
    }

    #[tokio::test]
    async fn test_export_without_settings_has_empty_object() {
        let service = service();
        let exported = BackupService::new(&service, "commishcrunch")
            .export(Category::Pest)
            .await
            .unwrap();
        assert_eq!(exported.settings, json!({}));
        assert!(exported.sales.is_empty());
    }
}

use crate::domain::category::Category;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CommissionError>;

#[derive(Error, Debug)]
pub enum CommissionError {
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Sale not found: {0}")]
    NotFound(String),
    #[error("The {0} calculator is not available yet")]
    CategoryUnavailable(Category),
    #[error("Import rejected: {0}")]
    Import(#[from] ImportError),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl CommissionError {
    /// True for failures of the local store itself, as opposed to bad input.
    pub fn is_storage(&self) -> bool {
        match self {
            Self::Storage(_) | Self::Serialization(_) | Self::InternalError(_) => true,
            #[cfg(feature = "storage-rocksdb")]
            Self::RocksDb(_) => true,
            _ => false,
        }
    }
}

/// Reasons a backup file is refused. Raised before anything is written.
#[derive(Error, Debug, PartialEq)]
pub enum ImportError {
    #[error("file is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("missing version field")]
    MissingVersion,
    #[error("unsupported backup version {0}")]
    UnsupportedVersion(String),
    #[error("backup is for {found}, expected {expected}")]
    CategoryMismatch { expected: Category, found: String },
    #[error("settings are invalid: {0}")]
    InvalidSettings(String),
    #[error("sale #{index} is invalid: {reason}")]
    InvalidSale { index: usize, reason: String },
}

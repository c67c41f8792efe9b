//! Application layer orchestrating the commission engine and the stores.
//!
//! `CommissionService` runs calculations against stored rules and keeps the
//! sale history; `BackupService` moves a category's data in and out as JSON.

pub mod backup;
pub mod calculator;

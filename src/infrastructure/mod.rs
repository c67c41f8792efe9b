//! Store adapters implementing the domain ports.

pub mod in_memory;
pub mod json_file;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::error::{CommissionError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of a batch quote file: `customer, unit_count, unit_price`.
///
/// An empty `unit_price` means "use the configured price per unit".
/// Numbers are parsed from their text so scale and precision are kept.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct QuoteRow {
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_count: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub unit_price: Option<Decimal>,
}

/// Reads batch quotes from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// and yields one `Result` per row so a bad row does not stop the batch.
pub struct QuoteReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> QuoteReader<R> {
    /// Creates a new `QuoteReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes quote rows.
    pub fn quotes(self) -> impl Iterator<Item = Result<QuoteRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(CommissionError::from))
    }
}

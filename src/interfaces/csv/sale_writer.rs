use crate::domain::commission::CommissionResult;
use crate::domain::record::SaleRecord;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct SaleRow<'a> {
    id: &'a str,
    date_created: String,
    customer: &'a str,
    status: &'a str,
    sale_amount: Decimal,
    commission: Decimal,
}

/// Row written for each quote of a batch run.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct QuoteResultRow {
    pub customer: String,
    pub unit_count: Decimal,
    pub unit_price: Decimal,
    pub sale_amount: Decimal,
    pub gross_commission: Decimal,
    pub total_commission: Decimal,
}

impl QuoteResultRow {
    pub fn new(
        customer: impl Into<String>,
        unit_count: Decimal,
        unit_price: Decimal,
        result: &CommissionResult,
    ) -> Self {
        Self {
            customer: customer.into(),
            unit_count,
            unit_price,
            sale_amount: result.sale_amount.normalize(),
            gross_commission: result.gross_commission.normalize(),
            total_commission: result.total_commission.normalize(),
        }
    }
}

/// Writes sale history and batch results as CSV.
pub struct SaleWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SaleWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_sales<'a>(&mut self, sales: impl IntoIterator<Item = &'a SaleRecord>) -> Result<()> {
        for sale in sales {
            self.writer.serialize(SaleRow {
                id: sale.id.as_str(),
                date_created: sale.date_created.format("%Y-%m-%d").to_string(),
                customer: &sale.customer_name,
                status: sale.status.as_str(),
                sale_amount: sale.sale_amount.normalize(),
                commission: sale.commission.normalize(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_quote_result(&mut self, row: &QuoteResultRow) -> Result<()> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }
}

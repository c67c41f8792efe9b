pub mod quote_reader;
pub mod sale_writer;

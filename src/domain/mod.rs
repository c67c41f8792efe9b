//! Domain layer: commission rules, the pure engine, sale records and the
//! ports the application layer drives.

pub mod category;
pub mod clock;
pub mod commission;
pub mod engine;
pub mod ports;
pub mod record;
pub mod rules;
pub mod sale;

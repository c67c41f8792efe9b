#![allow(dead_code)]

use assert_cmd::cargo_bin;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::process::Command;

/// A `commishcrunch` invocation isolated in `data_dir`, ignoring any config
/// file in the working directory.
pub fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("commishcrunch"));
    cmd.arg("--config")
        .arg(data_dir.join("commishcrunch.toml"))
        .arg("--data-dir")
        .arg(data_dir)
        .env_remove("RUST_LOG");
    cmd
}

/// Writes `rows` quotes of 1..=rows kW at $3.20.
pub fn generate_quotes_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["customer", "unit_count", "unit_price"])?;

    for i in 1..=rows {
        wtr.write_record([format!("Customer {i}"), i.to_string(), "3.20".to_string()])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Ids of sales printed by `history list --csv`.
pub fn listed_ids(stdout: &[u8]) -> Vec<String> {
    let mut reader = csv::Reader::from_reader(stdout);
    reader
        .records()
        .map(|record| record.unwrap()[0].to_string())
        .collect()
}

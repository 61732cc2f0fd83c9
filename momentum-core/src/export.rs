//! CSV persistence for momentum tables.
//!
//! Layout: `Ticker,<lookback>,<lookback>,...`, one row per symbol, raw
//! ratios (0.1 = +10%), empty field for an absent value. Only the ratios
//! are persisted; `as_of` and the latest price are not.

use crate::domain::{MomentumTable, SymbolMomentum};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SYMBOL_HEADER: &str = "Ticker";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("missing '{SYMBOL_HEADER}' header column")]
    MissingSymbolHeader,

    #[error("invalid value '{value}' for {symbol}/{column}")]
    InvalidValue {
        symbol: String,
        column: String,
        value: String,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `table` as CSV, rows in `order`. Symbols not in the table are skipped.
pub fn write_csv<W: Write>(
    table: &MomentumTable,
    order: &[String],
    writer: W,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push(SYMBOL_HEADER);
    header.extend(table.columns().iter().map(|c| c.as_str()));
    wtr.write_record(&header)?;

    for symbol in order {
        let Some(row) = table.get(symbol) else {
            continue;
        };
        let mut record = Vec::with_capacity(header.len());
        record.push(row.symbol.clone());
        for column in table.columns() {
            record.push(row.value(column).map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write `table` to `path` in `order`.
pub fn save_csv(table: &MomentumTable, order: &[String], path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_csv(table, order, File::create(path)?)
}

/// Read a table written by [`write_csv`].
pub fn read_csv<R: Read>(reader: R) -> Result<MomentumTable, ExportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let first = headers.get(0).map(str::trim);
    if !first.is_some_and(|h| h.eq_ignore_ascii_case(SYMBOL_HEADER)) {
        return Err(ExportError::MissingSymbolHeader);
    }
    let columns: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

    let mut table = MomentumTable::new(columns.clone());
    for record in rdr.records() {
        let record = record?;
        let symbol = record.get(0).unwrap_or_default().trim().to_string();
        if symbol.is_empty() {
            continue;
        }

        let mut values = std::collections::BTreeMap::new();
        for (i, column) in columns.iter().enumerate() {
            let raw = record.get(i + 1).unwrap_or_default().trim();
            let value = if raw.is_empty() {
                None
            } else {
                let parsed: f64 = raw.parse().map_err(|_| ExportError::InvalidValue {
                    symbol: symbol.clone(),
                    column: column.clone(),
                    value: raw.to_string(),
                })?;
                Some(parsed).filter(|v| v.is_finite())
            };
            values.insert(column.clone(), value);
        }

        table.insert(SymbolMomentum {
            symbol,
            as_of: None,
            latest_price: None,
            values,
        });
    }

    Ok(table)
}

/// Load a table from `path`; a missing file is [`ExportError::NotFound`].
pub fn load_csv(path: &Path) -> Result<MomentumTable, ExportError> {
    match File::open(path) {
        Ok(file) => read_csv(file),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExportError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

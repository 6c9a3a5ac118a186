//! Table import/export: CSV and JSON snapshots.

pub mod csv;
pub mod json;

pub use csv::{CsvOptions, export_csv, import_csv, read_csv, write_csv};
pub use json::{TableSnapshot, read_json, to_snapshot, write_json};

//! Tabulon - in-memory table management.
//!
//! A [`TableContext`] owns tables and their shared defaults and tag
//! catalog; a [`Table`] owns rows, columns, cells and groups. Cell values
//! are validated, transformed and observed through events on their way in;
//! derivation bookkeeping tracks which elements are derived, what they
//! read, and which elements a change affects.
//!
//! ```
//! use tabulon::{Access, Table, Value};
//!
//! let mut table = Table::new(0, 0);
//! let qty = table.add_column(Access::by_label("qty")).unwrap();
//! let row = table.add_row(Access::Last).unwrap();
//! table.set_cell_value(row, qty, Some(Value::Int(3))).unwrap();
//! assert_eq!(table.cell_value(row, qty), Some(&Value::Int(3)));
//! ```

pub use tabulon_core::*;

/// The element substrate: types, properties, values, validators, and
/// computation primitives.
pub use tabulon_engine as engine;

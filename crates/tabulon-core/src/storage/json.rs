//! JSON table snapshots.
//!
//! A snapshot captures a table's shape, labels, datatypes, tags, and cell
//! values; it round-trips through `serde_json`. Runtime-only state
//! (validators, listeners, derivations, cursors) is not part of a
//! snapshot.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tabulon_engine::{Access, DataType, Value};

use crate::error::Result;
use crate::table::Table;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub label: Option<String>,
    pub description: Option<String>,
    pub datatype: Option<DataType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RowSnapshot {
    pub label: Option<String>,
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// 1-based row position.
    pub row: usize,
    /// 1-based column position.
    pub column: usize,
    pub value: Value,
}

/// A serializable capture of a table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub label: Option<String>,
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub columns: Vec<ColumnSnapshot>,
    pub rows: Vec<RowSnapshot>,
    pub cells: Vec<CellSnapshot>,
}

/// Capture a table into a snapshot.
pub fn to_snapshot(table: &Table) -> TableSnapshot {
    let columns = table
        .iter_columns()
        .map(|c| ColumnSnapshot {
            label: c.label().map(str::to_string),
            description: c.description().map(str::to_string),
            datatype: c.datatype(),
            tags: c.tags(),
        })
        .collect();

    let rows: Vec<RowSnapshot> = table
        .iter_rows()
        .map(|r| RowSnapshot {
            label: r.label().map(str::to_string),
            description: r.description().map(str::to_string),
            tags: r.tags(),
        })
        .collect();

    let mut cells = Vec::new();
    for row in table.iter_rows() {
        for col in table.iter_columns() {
            if let Some(value) = table.cell_value(row.ident(), col.ident()) {
                cells.push(CellSnapshot {
                    row: row.index(),
                    column: col.index(),
                    value: value.clone(),
                });
            }
        }
    }

    TableSnapshot {
        label: table.label().map(str::to_string),
        description: table.description().map(str::to_string),
        tags: table.tags(),
        columns,
        rows,
        cells,
    }
}

impl TableSnapshot {
    /// Rebuild a table from this snapshot.
    pub fn into_table(self) -> Result<Table> {
        let mut table = Table::new(self.rows.len(), self.columns.len());
        table.set_label(self.label.as_deref())?;
        table.set_description(self.description.as_deref())?;
        if !self.tags.is_empty() {
            table.tag(self.tags.iter().map(String::as_str));
        }

        let mut col_idents = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            let ident = table.add_column(Access::Last)?;
            table.set_column_label(ident, col.label.as_deref())?;
            let column = table.column_mut(ident)?;
            column.set_description(col.description.as_deref())?;
            column.set_datatype(col.datatype);
            if !col.tags.is_empty() {
                table.tag_element(
                    tabulon_engine::ElementRef::Column(ident),
                    col.tags.iter().map(String::as_str),
                )?;
            }
            col_idents.push(ident);
        }

        let mut row_idents = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let ident = table.add_row(Access::Last)?;
            table.set_row_label(ident, row.label.as_deref())?;
            table.row_mut(ident)?.set_description(row.description.as_deref())?;
            if !row.tags.is_empty() {
                table.tag_element(
                    tabulon_engine::ElementRef::Row(ident),
                    row.tags.iter().map(String::as_str),
                )?;
            }
            row_idents.push(ident);
        }

        for cell in self.cells {
            let (Some(row), Some(col)) = (
                cell.row.checked_sub(1).and_then(|p| row_idents.get(p)),
                cell.column.checked_sub(1).and_then(|p| col_idents.get(p)),
            ) else {
                continue;
            };
            table.set_cell_value(*row, *col, Some(cell.value))?;
        }

        Ok(table)
    }
}

/// Write a table snapshot as pretty JSON.
pub fn write_json(path: &Path, table: &Table) -> Result<()> {
    let snapshot = to_snapshot(table);
    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a table back from a JSON snapshot file.
pub fn read_json(path: &Path) -> Result<Table> {
    let content = std::fs::read_to_string(path)?;
    let snapshot: TableSnapshot = serde_json::from_str(&content)?;
    snapshot.into_table()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabulon_engine::Value;

    #[test]
    fn test_snapshot_round_trip() {
        let mut table = Table::new(0, 0);
        table.set_label(Some("inventory")).unwrap();
        let c1 = table.add_column(Access::by_label("name")).unwrap();
        let c2 = table.add_column(Access::by_label("count")).unwrap();
        table.column_mut(c2).unwrap().set_datatype(Some(DataType::Int));
        let r1 = table.add_row(Access::Last).unwrap();
        let r2 = table.add_row(Access::Last).unwrap();
        table
            .set_cell_value(r1, c1, Some(Value::Text("widget".into())))
            .unwrap();
        table.set_cell_value(r1, c2, Some(Value::Int(3))).unwrap();
        table
            .set_cell_value(r2, c1, Some(Value::Text("gadget".into())))
            .unwrap();

        let json = serde_json::to_string(&to_snapshot(&table)).unwrap();
        let snapshot: TableSnapshot = serde_json::from_str(&json).unwrap();
        let rebuilt = snapshot.into_table().unwrap();

        assert_eq!(rebuilt.label(), Some("inventory"));
        assert_eq!(rebuilt.num_rows(), 2);
        assert_eq!(rebuilt.num_columns(), 2);

        let mut rebuilt = rebuilt;
        let col = rebuilt
            .get_column(Access::by_label("count"))
            .unwrap()
            .unwrap();
        assert_eq!(rebuilt.column(col).unwrap().datatype(), Some(DataType::Int));
        let row = rebuilt.get_row(Access::ByIndex(1)).unwrap().unwrap();
        assert_eq!(rebuilt.cell_value(row, col), Some(&Value::Int(3)));

        // Absent cells stay absent.
        let c2_ident = col;
        let row2 = rebuilt.get_row(Access::ByIndex(2)).unwrap().unwrap();
        assert!(rebuilt.cell_value(row2, c2_ident).is_none());
    }
}

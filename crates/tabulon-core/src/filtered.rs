//! Read-only filtered views over a table.
//!
//! A [`FilteredTable`] selects a subset of rows and columns of a parent
//! table. Reads delegate to the parent; every mutation fails. Views borrow
//! the parent, so a view can never outlive the table it filters.

use tabulon_engine::{ElementType, Value};

use crate::error::{Result, TableError};
use crate::row::Row;
use crate::table::Table;

/// A read-only row/column selection over a parent table.
pub struct FilteredTable<'a> {
    parent: &'a Table,
    rows: Vec<u64>,
    cols: Vec<u64>,
}

impl<'a> FilteredTable<'a> {
    pub(crate) fn new(parent: &'a Table, rows: Vec<u64>, cols: Vec<u64>) -> FilteredTable<'a> {
        FilteredTable { parent, rows, cols }
    }

    pub fn parent(&self) -> &Table {
        self.parent
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.cols.len()
    }

    /// Idents of the selected rows, in parent table order.
    pub fn row_idents(&self) -> &[u64] {
        &self.rows
    }

    pub fn column_idents(&self) -> &[u64] {
        &self.cols
    }

    pub fn contains_row(&self, ident: u64) -> bool {
        self.rows.contains(&ident)
    }

    pub fn contains_column(&self, ident: u64) -> bool {
        self.cols.contains(&ident)
    }

    pub fn row_label(&self, ident: u64) -> Result<Option<String>> {
        self.vet_row(ident)?;
        Ok(self.parent.row(ident)?.label().map(str::to_string))
    }

    pub fn column_label(&self, ident: u64) -> Result<Option<String>> {
        self.vet_column(ident)?;
        Ok(self.parent.column(ident)?.label().map(str::to_string))
    }

    /// The parent's cell value, for cells inside the selection.
    pub fn cell_value(&self, row: u64, col: u64) -> Result<Option<Value>> {
        self.vet_row(row)?;
        self.vet_column(col)?;
        Ok(self.parent.cell_value(row, col).cloned())
    }

    pub fn formatted_cell_value(&self, row: u64, col: u64) -> Result<Option<String>> {
        self.vet_row(row)?;
        self.vet_column(col)?;
        Ok(self.parent.formatted_cell_value(row, col))
    }

    pub fn num_cells(&self) -> usize {
        let mut n = 0;
        for row in &self.rows {
            for col in &self.cols {
                if self.parent.is_cell(*row, *col) {
                    n += 1;
                }
            }
        }
        n
    }

    /// Filtered views are always write-protected.
    pub fn is_write_protected(&self) -> bool {
        true
    }

    /// Writing through a view fails; write to the parent table instead.
    pub fn set_cell_value(&self, _row: u64, _col: u64, _value: Option<Value>) -> Result<bool> {
        Err(TableError::WriteProtected {
            elem: ElementType::Cell,
        })
    }

    pub fn fill(&self, _value: Option<Value>) -> Result<()> {
        Err(TableError::unsupported(
            ElementType::Table,
            "cannot fill a filtered table",
        ))
    }

    pub fn clear(&self) -> Result<()> {
        Err(TableError::unsupported(
            ElementType::Table,
            "cannot clear a filtered table",
        ))
    }

    fn vet_row(&self, ident: u64) -> Result<()> {
        if self.contains_row(ident) {
            Ok(())
        } else {
            Err(TableError::InvalidParent {
                parent: ElementType::Table,
                child: ElementType::Row,
            })
        }
    }

    fn vet_column(&self, ident: u64) -> Result<()> {
        if self.contains_column(ident) {
            Ok(())
        } else {
            Err(TableError::InvalidParent {
                parent: ElementType::Table,
                child: ElementType::Column,
            })
        }
    }
}

impl Table {
    /// A read-only view of the rows matching `predicate`, over all columns.
    pub fn filtered(&self, predicate: impl Fn(&Row) -> bool) -> FilteredTable<'_> {
        let rows = self
            .iter_rows()
            .filter(|r| predicate(r))
            .map(|r| r.ident())
            .collect();
        let cols = self.iter_columns().map(|c| c.ident()).collect();
        FilteredTable::new(self, rows, cols)
    }

    /// A read-only view of an explicit row/column selection. Idents not in
    /// the table are dropped from the selection.
    pub fn filtered_select(&self, rows: &[u64], cols: &[u64]) -> FilteredTable<'_> {
        let rows = self
            .iter_rows()
            .filter(|r| rows.contains(&r.ident()))
            .map(|r| r.ident())
            .collect();
        let cols = self
            .iter_columns()
            .filter(|c| cols.contains(&c.ident()))
            .map(|c| c.ident())
            .collect();
        FilteredTable::new(self, rows, cols)
    }
}

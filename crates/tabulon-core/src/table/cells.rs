//! Cell access and the value-setting pipeline.
//!
//! Setting a value runs: write-protection vetting, the effective
//! validator/transformer (cell's, else column's, else row's), null-support
//! and datatype enforcement, the vetoable before-event, the store, then
//! notification and recalculation of affected derivations.

use tracing::trace;

use tabulon_engine::validate::SharedValidator;
use tabulon_engine::{ElementRef, ElementType, ErrorResult, EventType, Property, Value};

use crate::cell::Cell;
use crate::error::{Result, TableError};
use crate::group::CellKey;

use super::Table;

impl Table {
    /// The cell at (row, col), if it has been materialized.
    pub fn cell(&self, row: u64, col: u64) -> Option<&Cell> {
        let offset = self.row(row).ok()?.cell_offset()?;
        self.column(col).ok()?.cell_at(offset)
    }

    pub fn is_cell(&self, row: u64, col: u64) -> bool {
        self.cell(row, col).is_some()
    }

    /// The cell at (row, col), materializing it on demand. Marks the row
    /// and column in use and moves the cursor.
    pub fn get_cell(&mut self, row: u64, col: u64) -> Result<&mut Cell> {
        self.vet()?;
        let offset = self.ensure_cell_offset(row)?;
        self.row_mut(row)?.set_in_use(true);
        self.cursor.row = Some(row);
        self.cursor.col = Some(col);
        let column = self.column_mut(col)?;
        column.set_in_use(true);
        Ok(column.materialize_cell(offset))
    }

    pub fn cell_value(&self, row: u64, col: u64) -> Option<&Value> {
        self.cell(row, col).and_then(|c| c.value())
    }

    /// The cell's value rendered for display, applying the first of
    /// cell/column/row/table precision, units and display format.
    pub fn formatted_cell_value(&self, row: u64, col: u64) -> Option<String> {
        let cell = self.cell(row, col)?;
        let value = cell.value()?;

        let lookup = |p: Property| -> Option<Value> {
            cell.props()
                .and_then(|props| props.get(p))
                .or_else(|| self.column(col).ok().and_then(|c| c.props().get(p)))
                .or_else(|| self.row(row).ok().and_then(|r| r.props().get(p)))
                .or_else(|| self.props.get(p))
                .cloned()
        };

        let precision = lookup(Property::Precision)
            .and_then(|v| v.as_i64())
            .and_then(|n| u32::try_from(n).ok());
        let units = lookup(Property::Units);
        let display_format = lookup(Property::DisplayFormat);
        Some(value.format(
            precision,
            units.as_ref().and_then(Value::as_text),
            display_format.as_ref().and_then(Value::as_text),
        ))
    }

    /// Set a cell value; returns whether the stored value changed.
    pub fn set_cell_value(&mut self, row: u64, col: u64, value: Option<Value>) -> Result<bool> {
        self.set_cell_value_internal(row, col, value, true, true)
    }

    /// Clear a cell to null; returns whether it held a value.
    pub fn clear_cell(&mut self, row: u64, col: u64) -> Result<bool> {
        self.set_cell_value(row, col, None)
    }

    pub(crate) fn set_cell_value_internal(
        &mut self,
        row: u64,
        col: u64,
        value: Option<Value>,
        fire_events: bool,
        recalculate: bool,
    ) -> Result<bool> {
        self.vet()?;
        let offset = self.ensure_cell_offset(row)?;
        let cell_ref = ElementRef::Cell { column: col, offset };

        {
            let r = self.row(row)?;
            let c = self.column(col)?;
            let cell_read_only = c.cell_at(offset).is_some_and(|cell| cell.is_read_only());
            if self.is_read_only() || r.is_read_only() || c.is_read_only() || cell_read_only {
                return Err(TableError::WriteProtected {
                    elem: ElementType::Cell,
                });
            }
        }

        let value = match self.effective_validator(row, col, offset) {
            Some(validator) => validator.transform(value)?,
            None => value,
        };

        if value.is_none() && !self.effective_supports_null(row, col, offset) {
            return Err(TableError::NullNotSupported {
                elem: ElementType::Cell,
            });
        }

        if let Some(v) = &value
            && self.effective_enforce_datatype(row, col, offset)
            && let Some(expected) = self.column(col)?.datatype()
            && !expected.accepts(v.data_type())
        {
            return Err(TableError::DataTypeMismatch {
                expected,
                actual: v.data_type(),
            });
        }

        if fire_events {
            self.fire_vetoable_with_value(EventType::OnBeforeNewValue, cell_ref, value.clone())?;
        }

        // A manual write replaces any derivation on the cell.
        if self.derivations.contains_key(&cell_ref) {
            self.clear_derivation(cell_ref);
        }

        let changed = {
            let column = self.column_mut(col)?;
            column.set_in_use(true);
            column.materialize_cell(offset).store(value.clone())
        };
        self.row_mut(row)?.set_in_use(true);
        self.cursor.row = Some(row);
        self.cursor.col = Some(col);
        trace!(table = self.ident, row, col, changed, "cell value set");

        if changed && fire_events {
            self.fire_notification(EventType::OnNewValue, cell_ref, value);
        }
        if changed && recalculate && self.is_automatic_recalculate_enabled() {
            self.recalculate_affected(cell_ref);
        }
        Ok(changed)
    }

    /// Post a calculation error to a cell. The value becomes null, the
    /// cell error flag is set, and any pending mark is cleared.
    pub fn post_cell_error(&mut self, row: u64, col: u64, error: ErrorResult) -> Result<()> {
        self.vet()?;
        let offset = self.ensure_cell_offset(row)?;
        let cell_ref = ElementRef::Cell { column: col, offset };
        let was_pending = {
            let cell = self.column_mut(col)?.materialize_cell(offset);
            let was = cell.is_pending();
            cell.set_pending(false);
            cell.post_error(error);
            was
        };
        if was_pending {
            self.pendings = self.pendings.saturating_sub(1);
            if self.pendings == 0 {
                self.fire_notification(EventType::OnNoPendings, cell_ref, None);
            }
        }
        self.fire_notification(EventType::OnNewValue, cell_ref, None);
        Ok(())
    }

    /// Mark or unmark a cell as awaiting a calculation result.
    pub fn set_cell_pending(&mut self, row: u64, col: u64, pending: bool) -> Result<()> {
        self.vet()?;
        let offset = self.ensure_cell_offset(row)?;
        let cell_ref = ElementRef::Cell { column: col, offset };
        let changed = {
            let cell = self.column_mut(col)?.materialize_cell(offset);
            let was = cell.is_pending();
            cell.set_pending(pending);
            was != pending
        };
        if !changed {
            return Ok(());
        }
        if pending {
            self.pendings += 1;
            self.fire_notification(EventType::OnPendings, cell_ref, None);
        } else {
            self.pendings = self.pendings.saturating_sub(1);
            if self.pendings == 0 {
                self.fire_notification(EventType::OnNoPendings, cell_ref, None);
            }
        }
        Ok(())
    }

    /// Whether any cell of the table awaits a calculation result.
    pub fn is_pendings(&self) -> bool {
        self.pendings > 0
    }

    // ------------------------------------------------------------------
    // Fill and clear
    // ------------------------------------------------------------------

    /// Write one value into every cell. Derivations are cleared first (a
    /// full fill overwrites every derived value), automatic recalculation
    /// is suspended for the sweep, and a single `OnNewValue` fires at the
    /// end when anything changed.
    pub fn fill(&mut self, value: Option<Value>) -> Result<()> {
        self.vet()?;
        let saved_cursor = self.cursor;
        self.disable_automatic_recalculation();

        let result = self.fill_all_cells(value.clone());

        self.enable_automatic_recalculation();
        self.cursor = saved_cursor;

        if result? {
            let ident = self.ident;
            self.fire_notification(EventType::OnNewValue, ElementRef::Table(ident), value);
        }
        Ok(())
    }

    fn fill_all_cells(&mut self, value: Option<Value>) -> Result<bool> {
        let targets: Vec<ElementRef> = self.derivations.keys().copied().collect();
        for target in targets {
            self.clear_derivation(target);
        }

        let cols = self.column_idents();
        let rows = self.row_idents();
        let mut any_changed = false;
        for col in cols {
            for row in &rows {
                if self.set_cell_value_internal(*row, col, value.clone(), false, false)? {
                    any_changed = true;
                }
            }
        }
        Ok(any_changed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.fill(None)
    }

    /// Write one value into every cell of a row; fires a single
    /// `OnNewValue` on the row when anything changed.
    pub fn fill_row(&mut self, row: u64, value: Option<Value>) -> Result<bool> {
        self.vet()?;
        let cols = self.column_idents();
        let mut any_changed = false;
        for col in cols {
            if self.set_cell_value_internal(row, col, value.clone(), false, false)? {
                any_changed = true;
            }
        }
        if any_changed {
            self.fire_notification(EventType::OnNewValue, ElementRef::Row(row), value.clone());
            if self.is_automatic_recalculate_enabled() {
                self.recalculate_affected(ElementRef::Row(row));
            }
        }
        Ok(any_changed)
    }

    /// Write one value into every cell of a column; see [`Table::fill_row`].
    pub fn fill_column(&mut self, col: u64, value: Option<Value>) -> Result<bool> {
        self.vet()?;
        let rows = self.row_idents();
        let mut any_changed = false;
        for row in rows {
            if self.set_cell_value_internal(row, col, value.clone(), false, false)? {
                any_changed = true;
            }
        }
        if any_changed {
            self.fire_notification(EventType::OnNewValue, ElementRef::Column(col), value.clone());
            if self.is_automatic_recalculate_enabled() {
                self.recalculate_affected(ElementRef::Column(col));
            }
        }
        Ok(any_changed)
    }

    /// Number of materialized cells in a row.
    pub fn row_num_cells(&self, row: u64) -> Result<usize> {
        let row = self.row(row)?;
        let Some(offset) = row.cell_offset() else {
            return Ok(0);
        };
        Ok(self
            .cols
            .iter()
            .flatten()
            .filter(|c| c.cell_at(offset).is_some())
            .count())
    }

    // ------------------------------------------------------------------
    // Internal plumbing
    // ------------------------------------------------------------------

    /// The stable cell key for (row, col); the row must have touched cells.
    pub fn cell_key(&self, row: u64, col: u64) -> Result<CellKey> {
        let offset = self
            .row(row)?
            .cell_offset()
            .ok_or_else(|| TableError::invalid(ElementType::Cell, "row has no cells"))?;
        self.column(col)?;
        Ok((col, offset))
    }

    /// The row's cell offset, allocating (and recording) one on first use.
    pub(crate) fn ensure_cell_offset(&mut self, row: u64) -> Result<usize> {
        if let Some(offset) = self.row(row)?.cell_offset() {
            return Ok(offset);
        }
        let offset = self.allocate_cell_offset();
        self.row_mut(row)?.set_cell_offset(Some(offset));
        self.map_offset_to_row(offset, row);
        Ok(offset)
    }

    fn effective_validator(&self, row: u64, col: u64, offset: usize) -> Option<SharedValidator> {
        let column = self.column(col).ok()?;
        if let Some(v) = column.cell_at(offset).and_then(|c| c.validator()) {
            return Some(v.clone());
        }
        if let Some(v) = column.validator() {
            return Some(v.clone());
        }
        self.row(row).ok()?.validator().cloned()
    }

    fn effective_supports_null(&self, row: u64, col: u64, offset: usize) -> bool {
        let cell = self
            .column(col)
            .ok()
            .and_then(|c| c.cell_at(offset))
            .is_some_and(|c| c.is_supports_null());
        cell || self.row(row).is_ok_and(|r| r.is_supports_null())
            || self.column(col).is_ok_and(|c| c.is_supports_null())
            || self.is_supports_null()
    }

    fn effective_enforce_datatype(&self, row: u64, col: u64, offset: usize) -> bool {
        let cell = self
            .column(col)
            .ok()
            .and_then(|c| c.cell_at(offset))
            .is_some_and(|c| c.is_enforce_datatype());
        cell || self.row(row).is_ok_and(|r| r.is_enforce_datatype())
            || self.column(col).is_ok_and(|c| c.is_enforce_datatype())
            || self.is_enforce_datatype()
    }
}

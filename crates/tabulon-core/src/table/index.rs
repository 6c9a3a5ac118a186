//! Access resolution: locating and inserting rows and columns.
//!
//! Both axes resolve through [`calc_index`], which turns an [`Access`] mode
//! into a 0-based slot position. Getting from an empty axis always resolves
//! to nothing; adding modes produce an insertion point instead.

use std::collections::HashMap;

use tracing::debug;

use tabulon_engine::{
    Access, ElementRef, ElementState, ElementType, EventType, next_element_ident,
};

use crate::column::Column;
use crate::error::{Result, TableError};
use crate::row::Row;
use crate::slice::Slice;

use super::Table;

/// Resolve an access mode against a slice axis.
///
/// Returns `Ok(None)` when a lookup finds nothing, and an error when the
/// mode cannot be used for the request at all (for example adding by
/// ident).
pub(crate) fn calc_index<S: Slice>(
    slices: &[Option<S>],
    current_pos: Option<usize>,
    is_adding: bool,
    access: &Access,
    label_index: Option<&HashMap<String, u64>>,
) -> Result<Option<usize>> {
    let num_slices = slices.len();

    // Getting anything from an empty axis resolves to nothing.
    if !is_adding && num_slices == 0 {
        return Ok(None);
    }

    let invalid = || TableError::InvalidAccess {
        child: S::element_type(),
        access: access.name(),
        kind: if is_adding { "insert" } else { "get" },
    };

    let pos_of_ident =
        |ident: u64| slices.iter().position(|s| s.as_ref().is_some_and(|s| s.ident() == ident));

    match access {
        Access::ByIndex(index) => {
            let Some(pos) = index.checked_sub(1) else {
                return Ok(None);
            };
            if is_adding || pos < num_slices {
                Ok(Some(pos))
            } else {
                Ok(None)
            }
        }
        Access::ByIdent(ident) => {
            if is_adding {
                return Err(invalid());
            }
            Ok(pos_of_ident(*ident))
        }
        Access::ByLabel(label) => {
            if is_adding {
                return Err(invalid());
            }
            if let Some(index) = label_index {
                let key = label.trim().to_lowercase();
                return Ok(index.get(&key).copied().and_then(pos_of_ident));
            }
            Ok(find_slice(slices, |s| s.label() == Some(label.as_str())))
        }
        Access::ByDescription(description) => {
            if is_adding {
                return Err(invalid());
            }
            Ok(find_slice(slices, |s| {
                s.description() == Some(description.as_str())
            }))
        }
        Access::ByUuid(uuid) => {
            if is_adding {
                return Err(invalid());
            }
            Ok(find_slice(slices, |s| s.uuid() == *uuid))
        }
        Access::ByTags(tags) => {
            if is_adding || tags.is_empty() {
                return Err(invalid());
            }
            let query = tabulon_engine::Tag::as_tags(tags.iter().map(String::as_str));
            if query.is_empty() {
                return Err(invalid());
            }
            Ok(find_slice(slices, |s| query.is_subset(s.tag_set())))
        }
        Access::ByProperty(key, value) => {
            if is_adding {
                return Err(invalid());
            }
            Ok(find_slice(slices, |s| s.props().get(*key) == Some(value)))
        }
        Access::ByUserProperty(key, value) => {
            if is_adding {
                return Err(invalid());
            }
            Ok(find_slice(slices, |s| s.props().get_text(key) == Some(value)))
        }
        Access::ByDataType(dt) => {
            if S::element_type() != ElementType::Column {
                return Err(invalid());
            }
            if is_adding {
                return Err(invalid());
            }
            Ok(find_slice(slices, |s| s.datatype() == Some(*dt)))
        }
        Access::First => Ok(Some(0)),
        Access::Last => {
            if is_adding {
                Ok(Some(num_slices))
            } else if num_slices > 0 {
                Ok(Some(num_slices - 1))
            } else {
                Ok(None)
            }
        }
        Access::Previous => {
            if is_adding && num_slices == 0 {
                return Ok(Some(0));
            }
            let Some(pos) = current_pos else {
                return Ok(None);
            };
            if is_adding {
                // Insert before the current slice.
                Ok(Some(pos))
            } else if pos > 0 {
                Ok(Some(pos - 1))
            } else {
                Ok(None)
            }
        }
        Access::Current => {
            if is_adding && num_slices == 0 {
                return Ok(Some(0));
            }
            Ok(current_pos)
        }
        Access::Next => {
            if is_adding && num_slices == 0 {
                return Ok(Some(0));
            }
            let Some(pos) = current_pos else {
                return Ok(None);
            };
            let next = pos + 1;
            if next < num_slices || (is_adding && next == num_slices) {
                Ok(Some(next))
            } else {
                Ok(None)
            }
        }
    }
}

fn find_slice<S: Slice>(
    slices: &[Option<S>],
    mut pred: impl FnMut(&S) -> bool,
) -> Option<usize> {
    slices
        .iter()
        .position(|s| s.as_ref().is_some_and(|s| pred(s)))
}

impl Table {
    fn current_row_pos(&self) -> Option<usize> {
        self.cursor.row.and_then(|id| self.row_pos(id))
    }

    fn current_col_pos(&self) -> Option<usize> {
        self.cursor.col.and_then(|id| self.col_pos(id))
    }

    /// Resolve a row access without side effects; 0-based position.
    pub(crate) fn resolve_row(&self, access: &Access, is_adding: bool) -> Result<Option<usize>> {
        let label_index = self
            .is_row_labels_indexed()
            .then_some(&self.row_label_index);
        calc_index(
            &self.rows,
            self.current_row_pos(),
            is_adding,
            access,
            label_index,
        )
    }

    /// Resolve a column access without side effects; 0-based position.
    pub(crate) fn resolve_column(&self, access: &Access, is_adding: bool) -> Result<Option<usize>> {
        let label_index = self
            .is_column_labels_indexed()
            .then_some(&self.col_label_index);
        calc_index(
            &self.cols,
            self.current_col_pos(),
            is_adding,
            access,
            label_index,
        )
    }

    // ------------------------------------------------------------------
    // Adding slices
    // ------------------------------------------------------------------

    /// Add a row where `access` points. Lookup modes (`ByLabel`,
    /// `ByDescription`, `ByDataType`) first check for an existing match and
    /// fail the add on a hit; otherwise the new row is appended last and the
    /// property set on it. Returns the new row's ident.
    pub fn add_row(&mut self, access: Access) -> Result<u64> {
        self.vet()?;
        let insert_access = self.vet_add_access::<Row>(&access, |t, a| t.resolve_row(a, false))?;

        let pos = self
            .resolve_row(&insert_access, true)?
            .ok_or(TableError::InvalidAccess {
                child: ElementType::Row,
                access: access.name(),
                kind: "insert",
            })?;

        let ident = next_element_ident();
        self.fire_vetoable(EventType::OnBeforeCreate, ElementRef::Row(ident))?;

        if pos >= self.rows.len() {
            self.rows.resize_with(pos, || None);
            self.rows.push(Some(Row::new(ident, pos + 1, &self.props)));
        } else {
            self.rows.insert(pos, Some(Row::new(ident, pos + 1, &self.props)));
        }
        for (i, row) in self.rows.iter_mut().enumerate().skip(pos + 1) {
            if let Some(row) = row {
                row.set_index(i + 1);
            }
        }

        self.apply_add_post_step(ElementRef::Row(ident), &access)?;
        self.cursor.row = Some(ident);
        for group in &mut self.groups {
            group.mark_dirty();
        }
        debug!(table = self.ident, row = ident, pos, "row added");
        self.fire_notification(EventType::OnCreate, ElementRef::Row(ident), None);
        Ok(ident)
    }

    /// Add a column where `access` points; see [`Table::add_row`].
    pub fn add_column(&mut self, access: Access) -> Result<u64> {
        self.vet()?;
        let insert_access =
            self.vet_add_access::<Column>(&access, |t, a| t.resolve_column(a, false))?;

        let pos = self
            .resolve_column(&insert_access, true)?
            .ok_or(TableError::InvalidAccess {
                child: ElementType::Column,
                access: access.name(),
                kind: "insert",
            })?;

        let ident = next_element_ident();
        self.fire_vetoable(EventType::OnBeforeCreate, ElementRef::Column(ident))?;

        if pos >= self.cols.len() {
            self.cols.resize_with(pos, || None);
            self.cols
                .push(Some(Column::new(ident, pos + 1, &self.props)));
        } else {
            self.cols
                .insert(pos, Some(Column::new(ident, pos + 1, &self.props)));
        }
        for (i, col) in self.cols.iter_mut().enumerate().skip(pos + 1) {
            if let Some(col) = col {
                col.set_index(i + 1);
            }
        }

        self.apply_add_post_step(ElementRef::Column(ident), &access)?;
        self.cursor.col = Some(ident);
        for group in &mut self.groups {
            group.mark_dirty();
        }
        debug!(table = self.ident, column = ident, pos, "column added");
        self.fire_notification(EventType::OnCreate, ElementRef::Column(ident), None);
        Ok(ident)
    }

    /// For lookup modes, fail the add when a match already exists and turn
    /// the insertion into an append.
    fn vet_add_access<S: Slice>(
        &self,
        access: &Access,
        resolve: impl Fn(&Table, &Access) -> Result<Option<usize>>,
    ) -> Result<Access> {
        match access {
            Access::ByLabel(_) | Access::ByDescription(_) | Access::ByDataType(_) => {
                if resolve(self, access)?.is_some() {
                    return Err(TableError::invalid(
                        S::element_type(),
                        format!("{} with {} already exists", S::element_type(), access.name()),
                    ));
                }
                Ok(Access::Last)
            }
            other if other.supports_adding() => Ok(other.clone()),
            _ => Err(TableError::InvalidAccess {
                child: S::element_type(),
                access: access.name(),
                kind: "insert",
            }),
        }
    }

    /// Apply the property a lookup-mode add carried to the new slice.
    fn apply_add_post_step(&mut self, elem: ElementRef, access: &Access) -> Result<()> {
        match (elem, access) {
            (ElementRef::Row(id), Access::ByLabel(label)) => self.set_row_label(id, Some(label)),
            (ElementRef::Row(id), Access::ByDescription(d)) => {
                self.row_mut(id)?.set_description(Some(d))
            }
            (ElementRef::Column(id), Access::ByLabel(label)) => {
                self.set_column_label(id, Some(label))
            }
            (ElementRef::Column(id), Access::ByDescription(d)) => {
                self.column_mut(id)?.set_description(Some(d))
            }
            (ElementRef::Column(id), Access::ByDataType(dt)) => {
                self.column_mut(id)?.set_datatype(Some(*dt));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Getting slices
    // ------------------------------------------------------------------

    /// Get a row by access mode, materializing sparse slots and moving the
    /// cursor. `Ok(None)` means the lookup found nothing; errors mean the
    /// mode cannot be used for a get at all.
    pub fn get_row(&mut self, access: Access) -> Result<Option<u64>> {
        self.vet()?;
        let Some(pos) = self.resolve_row(&access, false)? else {
            return Ok(None);
        };
        let Some(ident) = self.materialize_row(pos) else {
            return Ok(None);
        };
        self.cursor.row = Some(ident);
        Ok(Some(ident))
    }

    /// Get a column by access mode; see [`Table::get_row`].
    pub fn get_column(&mut self, access: Access) -> Result<Option<u64>> {
        self.vet()?;
        let Some(pos) = self.resolve_column(&access, false)? else {
            return Ok(None);
        };
        let Some(ident) = self.materialize_column(pos) else {
            return Ok(None);
        };
        self.cursor.col = Some(ident);
        Ok(Some(ident))
    }

    pub(crate) fn materialize_row(&mut self, pos: usize) -> Option<u64> {
        if pos >= self.rows.len() {
            return None;
        }
        if self.rows[pos].is_none() {
            let ident = next_element_ident();
            self.rows[pos] = Some(Row::new(ident, pos + 1, &self.props));
        }
        self.rows[pos].as_ref().map(|r| r.ident())
    }

    pub(crate) fn materialize_column(&mut self, pos: usize) -> Option<u64> {
        if pos >= self.cols.len() {
            return None;
        }
        if self.cols[pos].is_none() {
            let ident = next_element_ident();
            self.cols[pos] = Some(Column::new(ident, pos + 1, &self.props));
        }
        self.cols[pos].as_ref().map(|c| c.ident())
    }

    pub(crate) fn ensure_rows_exist(&mut self) {
        for pos in 0..self.rows.len() {
            self.materialize_row(pos);
        }
    }

    pub(crate) fn ensure_columns_exist(&mut self) {
        for pos in 0..self.cols.len() {
            self.materialize_column(pos);
        }
    }

    // ------------------------------------------------------------------
    // Label indexing
    // ------------------------------------------------------------------

    pub fn is_row_labels_indexed(&self) -> bool {
        self.state.is_set(ElementState::ROW_LABELS_INDEXED)
    }

    pub fn is_column_labels_indexed(&self) -> bool {
        self.state.is_set(ElementState::COLUMN_LABELS_INDEXED)
    }

    pub fn is_group_labels_indexed(&self) -> bool {
        self.state.is_set(ElementState::GROUP_LABELS_INDEXED)
    }

    /// Build or drop the row label index. Enabling fails on duplicate
    /// labels; the flag is left unset and the index empty.
    pub fn set_row_labels_indexed(&mut self, on: bool) -> Result<()> {
        if !on {
            self.row_label_index.clear();
            self.state.remove(ElementState::ROW_LABELS_INDEXED);
            return Ok(());
        }
        let index = build_label_index(&self.rows).map_err(|label| {
            self.state.remove(ElementState::ROW_LABELS_INDEXED);
            TableError::LabelNotUnique(ElementType::Row, label)
        })?;
        self.row_label_index = index;
        self.state.insert(ElementState::ROW_LABELS_INDEXED);
        Ok(())
    }

    pub fn set_column_labels_indexed(&mut self, on: bool) -> Result<()> {
        if !on {
            self.col_label_index.clear();
            self.state.remove(ElementState::COLUMN_LABELS_INDEXED);
            return Ok(());
        }
        let index = build_label_index(&self.cols).map_err(|label| {
            self.state.remove(ElementState::COLUMN_LABELS_INDEXED);
            TableError::LabelNotUnique(ElementType::Column, label)
        })?;
        self.col_label_index = index;
        self.state.insert(ElementState::COLUMN_LABELS_INDEXED);
        Ok(())
    }

    pub fn set_group_labels_indexed(&mut self, on: bool) -> Result<()> {
        if !on {
            self.group_label_index.clear();
            self.state.remove(ElementState::GROUP_LABELS_INDEXED);
            return Ok(());
        }
        let mut index = HashMap::new();
        for group in &self.groups {
            if let Some(label) = group.label() {
                let key = label.trim().to_lowercase();
                if index.insert(key, group.ident()).is_some() {
                    self.state.remove(ElementState::GROUP_LABELS_INDEXED);
                    return Err(TableError::LabelNotUnique(
                        ElementType::Group,
                        label.to_string(),
                    ));
                }
            }
        }
        self.group_label_index = index;
        self.state.insert(ElementState::GROUP_LABELS_INDEXED);
        Ok(())
    }

    /// Set a row's label, keeping the label index consistent when indexing
    /// is on (duplicate labels are rejected).
    pub fn set_row_label(&mut self, ident: u64, label: Option<&str>) -> Result<()> {
        let old = self.row(ident)?.label().map(str::to_string);
        if self.is_row_labels_indexed()
            && let Some(label) = label
        {
            let key = label.trim().to_lowercase();
            if self
                .row_label_index
                .get(&key)
                .is_some_and(|existing| *existing != ident)
            {
                return Err(TableError::LabelNotUnique(
                    ElementType::Row,
                    label.to_string(),
                ));
            }
        }
        self.row_mut(ident)?.set_label(label)?;
        if self.is_row_labels_indexed() {
            if let Some(old) = old {
                self.row_label_index.remove(&old.to_lowercase());
            }
            if let Some(label) = label {
                self.row_label_index
                    .insert(label.trim().to_lowercase(), ident);
            }
        }
        Ok(())
    }

    /// Set a column's label; see [`Table::set_row_label`].
    pub fn set_column_label(&mut self, ident: u64, label: Option<&str>) -> Result<()> {
        let old = self.column(ident)?.label().map(str::to_string);
        if self.is_column_labels_indexed()
            && let Some(label) = label
        {
            let key = label.trim().to_lowercase();
            if self
                .col_label_index
                .get(&key)
                .is_some_and(|existing| *existing != ident)
            {
                return Err(TableError::LabelNotUnique(
                    ElementType::Column,
                    label.to_string(),
                ));
            }
        }
        self.column_mut(ident)?.set_label(label)?;
        if self.is_column_labels_indexed() {
            if let Some(old) = old {
                self.col_label_index.remove(&old.to_lowercase());
            }
            if let Some(label) = label {
                self.col_label_index
                    .insert(label.trim().to_lowercase(), ident);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------

    /// Sort rows by label (unlabeled rows last), reindexing. Cells travel
    /// with their row because cells are addressed by offset, not position.
    pub fn sort_rows_by_label(&mut self) {
        self.ensure_rows_exist();
        let mut rows: Vec<Row> = self.rows.drain(..).flatten().collect();
        rows.sort_by(|a, b| {
            match (a.label(), b.label()) {
                (None, None) => a.index().cmp(&b.index()),
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (Some(_), None) => std::cmp::Ordering::Less,
                (Some(la), Some(lb)) => la.cmp(lb).then(a.index().cmp(&b.index())),
            }
        });
        for (i, row) in rows.iter_mut().enumerate() {
            row.set_index(i + 1);
        }
        self.rows = rows.into_iter().map(Some).collect();
    }

    /// Sort columns by label (unlabeled columns last), reindexing.
    pub fn sort_columns_by_label(&mut self) {
        self.ensure_columns_exist();
        let mut cols: Vec<Column> = self.cols.drain(..).flatten().collect();
        cols.sort_by(|a, b| {
            match (a.label(), b.label()) {
                (None, None) => a.index().cmp(&b.index()),
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (Some(_), None) => std::cmp::Ordering::Less,
                (Some(la), Some(lb)) => la.cmp(lb).then(a.index().cmp(&b.index())),
            }
        });
        for (i, col) in cols.iter_mut().enumerate() {
            col.set_index(i + 1);
        }
        self.cols = cols.into_iter().map(Some).collect();
    }

    // ------------------------------------------------------------------
    // Property-based find over tables (used by contexts)
    // ------------------------------------------------------------------

    /// Whether this table matches a lookup access mode.
    pub(crate) fn matches(&self, access: &Access) -> bool {
        match access {
            Access::ByLabel(label) => self.label() == Some(label.as_str()),
            Access::ByDescription(d) => self.description() == Some(d.as_str()),
            Access::ByIdent(id) => self.ident() == *id,
            Access::ByUuid(u) => self.uuid() == *u,
            Access::ByTags(tags) => {
                let query = tabulon_engine::Tag::as_tags(tags.iter().map(String::as_str));
                !query.is_empty() && query.is_subset(self.tag_set())
            }
            Access::ByProperty(key, value) => self.props().get(*key) == Some(value),
            Access::ByUserProperty(key, value) => self.props().get_text(key) == Some(value),
            _ => false,
        }
    }
}

fn build_label_index<S: Slice>(slices: &[Option<S>]) -> std::result::Result<HashMap<String, u64>, String> {
    let mut index = HashMap::new();
    for slice in slices.iter().flatten() {
        if let Some(label) = slice.label() {
            let key = label.trim().to_lowercase();
            if index.insert(key, slice.ident()).is_some() {
                return Err(label.to_string());
            }
        }
    }
    Ok(index)
}

//! The table: rows, columns, cells, groups, and their bookkeeping.

mod cells;
mod derive;
mod events;
mod groups;
mod index;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use tracing::debug;
use uuid::Uuid;

use tabulon_engine::{
    Derivation, ElementRef, ElementState, ElementType, EventType, Property, PropertyMap, Tag,
    Value, next_element_ident,
};

use crate::column::Column;
use crate::context::{TagRegistry, builtin_default};
use crate::error::{Result, TableError};
use crate::group::{CellKey, Group};
use crate::row::{Row, normalize_text};

pub use events::ListenerId;

/// The current-cell cursor: the row/column most recently touched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct CellCursor {
    pub(crate) row: Option<u64>,
    pub(crate) col: Option<u64>,
}

pub(crate) struct ListenerEntry {
    pub(crate) id: u64,
    pub(crate) event_type: EventType,
    pub(crate) listener: Box<dyn tabulon_engine::TableEventListener>,
}

/// A data table: rows, columns, cells, and groups.
///
/// Rows and columns live in slot vectors; a slot may be `None` until first
/// touched (sparse axes). Cells live inside columns, addressed by the owning
/// row's cell offset. All elements are handled by stable ident.
pub struct Table {
    ident: u64,
    state: ElementState,
    props: PropertyMap,
    tags: HashSet<Tag>,
    uuid: OnceLock<Uuid>,
    registry: TagRegistry,

    rows: Vec<Option<Row>>,
    cols: Vec<Option<Column>>,
    groups: Vec<Group>,

    row_label_index: HashMap<String, u64>,
    col_label_index: HashMap<String, u64>,
    group_label_index: HashMap<String, u64>,

    unused_cell_offsets: VecDeque<usize>,
    next_cell_offset: usize,
    offset_row_map: HashMap<usize, u64>,

    cursor: CellCursor,
    cursor_stack: Vec<CellCursor>,

    listeners: Vec<ListenerEntry>,
    next_listener_id: u64,

    /// Reverse dependency edges: element -> elements whose derivations read it.
    affects: HashMap<ElementRef, HashSet<ElementRef>>,
    /// Forward edges: derived element -> elements its derivation reads.
    derivation_reads: HashMap<ElementRef, Vec<ElementRef>>,
    derivations: HashMap<ElementRef, Derivation>,

    pendings: usize,
}

impl Table {
    /// Create a standalone table using built-in defaults.
    ///
    /// `num_rows`/`num_cols` are capacity hints, not initial sizes; the new
    /// table is empty either way.
    pub fn new(num_rows: usize, num_cols: usize) -> Table {
        let mut seed = PropertyMap::new(ElementType::TableContext);
        for p in ElementType::TableContext.initializable_properties() {
            if let Some(v) = builtin_default(p) {
                let _ = seed.initialize(p, v);
            }
        }
        Table::with_defaults(num_rows, num_cols, &seed, TagRegistry::default())
    }

    pub(crate) fn with_defaults(
        num_rows: usize,
        num_cols: usize,
        seed: &PropertyMap,
        registry: TagRegistry,
    ) -> Table {
        let ident = next_element_ident();
        let mut props = PropertyMap::new(ElementType::Table);
        let mut state = ElementState::default();

        for p in ElementType::Table.initializable_properties() {
            let Some(value) = seed.get(p) else { continue };
            let value = value.clone();
            if let (Some(flag), Some(on)) = (p.state_flag(), value.as_bool()) {
                state.assign(flag, on);
            }
            let _ = props.initialize(p, value);
        }
        props
            .initialize(Property::Ident, Value::Int(ident as i64))
            .expect("tables implement the ident property");

        let mut table = Table {
            ident,
            state,
            props,
            tags: HashSet::new(),
            uuid: OnceLock::new(),
            registry,
            rows: Vec::new(),
            cols: Vec::new(),
            groups: Vec::new(),
            row_label_index: HashMap::new(),
            col_label_index: HashMap::new(),
            group_label_index: HashMap::new(),
            unused_cell_offsets: VecDeque::new(),
            next_cell_offset: 0,
            offset_row_map: HashMap::new(),
            cursor: CellCursor::default(),
            cursor_stack: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            affects: HashMap::new(),
            derivation_reads: HashMap::new(),
            derivations: HashMap::new(),
            pendings: 0,
        };

        table
            .rows
            .reserve(table.calculate_rows_capacity(num_rows));
        table
            .cols
            .reserve(table.calculate_columns_capacity(num_cols));
        debug!(ident, num_rows, num_cols, "table created");
        table
    }

    pub fn ident(&self) -> u64 {
        self.ident
    }

    pub fn element_type(&self) -> ElementType {
        ElementType::Table
    }

    pub fn uuid(&self) -> Uuid {
        *self.uuid.get_or_init(Uuid::new_v4)
    }

    pub fn is_valid(&self) -> bool {
        !self.state.is_set(ElementState::IS_INVALID)
    }

    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    pub(crate) fn vet(&self) -> Result<()> {
        if self.is_invalid() {
            return Err(TableError::DeletedElement(ElementType::Table));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub fn label(&self) -> Option<&str> {
        self.props.get(Property::Label).and_then(Value::as_text)
    }

    pub fn set_label(&mut self, label: Option<&str>) -> Result<()> {
        match normalize_text(label) {
            Some(label) => {
                self.props.set(Property::Label, Value::Text(label))?;
            }
            None => {
                self.props.clear(Property::Label)?;
            }
        }
        Ok(())
    }

    pub fn description(&self) -> Option<&str> {
        self.props
            .get(Property::Description)
            .and_then(Value::as_text)
    }

    pub fn set_description(&mut self, description: Option<&str>) -> Result<()> {
        match normalize_text(description) {
            Some(d) => {
                self.props.set(Property::Description, Value::Text(d))?;
            }
            None => {
                self.props.clear(Property::Description)?;
            }
        }
        Ok(())
    }

    pub fn props(&self) -> &PropertyMap {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut PropertyMap {
        &mut self.props
    }

    pub fn row_capacity_incr(&self) -> usize {
        self.props
            .get(Property::RowCapacityIncr)
            .and_then(Value::as_usize)
            .unwrap_or(256)
    }

    pub fn column_capacity_incr(&self) -> usize {
        self.props
            .get(Property::ColumnCapacityIncr)
            .and_then(Value::as_usize)
            .unwrap_or(256)
    }

    pub fn free_space_threshold(&self) -> f64 {
        self.props
            .get(Property::FreeSpaceThreshold)
            .and_then(Value::as_f64)
            .unwrap_or(2.0)
    }

    pub fn precision(&self) -> Option<u32> {
        self.props
            .get(Property::Precision)
            .and_then(Value::as_i64)
            .and_then(|n| u32::try_from(n).ok())
    }

    pub fn units(&self) -> Option<&str> {
        self.props.get(Property::Units).and_then(Value::as_text)
    }

    pub fn display_format(&self) -> Option<&str> {
        self.props
            .get(Property::DisplayFormat)
            .and_then(Value::as_text)
    }

    // ------------------------------------------------------------------
    // State flags
    // ------------------------------------------------------------------

    pub fn is_read_only(&self) -> bool {
        self.state.is_set(ElementState::READ_ONLY)
    }

    pub fn set_read_only(&mut self, on: bool) {
        self.state.assign(ElementState::READ_ONLY, on);
    }

    pub fn is_supports_null(&self) -> bool {
        self.state.is_set(ElementState::SUPPORTS_NULL)
    }

    pub fn set_supports_null(&mut self, on: bool) {
        self.state.assign(ElementState::SUPPORTS_NULL, on);
    }

    pub fn is_enforce_datatype(&self) -> bool {
        self.state.is_set(ElementState::ENFORCE_DATATYPE)
    }

    pub fn set_enforce_datatype(&mut self, on: bool) {
        self.state.assign(ElementState::ENFORCE_DATATYPE, on);
    }

    pub fn is_persistent(&self) -> bool {
        self.state.is_set(ElementState::IS_PERSISTENT)
    }

    pub fn set_persistent(&mut self, on: bool) {
        self.state.assign(ElementState::IS_PERSISTENT, on);
    }

    /// Whether automatic recalculation is configured on.
    pub fn is_automatic_recalculation(&self) -> bool {
        self.state.is_set(ElementState::AUTO_RECALCULATE)
    }

    pub fn set_automatic_recalculation(&mut self, on: bool) {
        self.state.assign(ElementState::AUTO_RECALCULATE, on);
    }

    /// Whether automatic recalculation is configured on and not suspended.
    pub fn is_automatic_recalculate_enabled(&self) -> bool {
        self.is_automatic_recalculation()
            && !self.state.is_set(ElementState::AUTO_RECALCULATE_DISABLED)
    }

    /// Suspend automatic recalculation without changing configuration.
    pub fn disable_automatic_recalculation(&mut self) {
        self.state.insert(ElementState::AUTO_RECALCULATE_DISABLED);
    }

    pub fn enable_automatic_recalculation(&mut self) {
        self.state.remove(ElementState::AUTO_RECALCULATE_DISABLED);
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Apply tags to the table; returns whether any tag was new.
    pub fn tag<'a>(&mut self, labels: impl IntoIterator<Item = &'a str>) -> bool {
        let mut added = false;
        for label in labels {
            if let Some(tag) = self.registry.canonical(label) {
                added |= self.tags.insert(tag);
            }
        }
        added
    }

    pub fn untag<'a>(&mut self, labels: impl IntoIterator<Item = &'a str>) -> bool {
        let query = Tag::as_tags(labels);
        let before = self.tags.len();
        for t in &query {
            self.tags.remove(t);
        }
        self.tags.len() != before
    }

    pub fn tags(&self) -> Vec<String> {
        Tag::as_labels(&self.tags)
    }

    pub fn has_all_tags<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> bool {
        let query = Tag::as_tags(labels);
        !query.is_empty() && query.is_subset(&self.tags)
    }

    pub fn has_any_tags<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> bool {
        let query = Tag::as_tags(labels);
        query.iter().any(|t| self.tags.contains(t))
    }

    pub(crate) fn tag_set(&self) -> &HashSet<Tag> {
        &self.tags
    }

    // ------------------------------------------------------------------
    // Shape
    // ------------------------------------------------------------------

    /// Number of rows, counting unmaterialized slots.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns, counting unmaterialized slots.
    pub fn num_columns(&self) -> usize {
        self.cols.len()
    }

    /// Number of materialized cells across all columns.
    pub fn num_cells(&self) -> usize {
        self.cols
            .iter()
            .flatten()
            .map(|c| c.num_cells())
            .sum()
    }

    pub fn is_null(&self) -> bool {
        self.num_rows() == 0 || self.num_columns() == 0 || self.num_cells() == 0
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    // ------------------------------------------------------------------
    // Element lookup by ident
    // ------------------------------------------------------------------

    pub(crate) fn row_pos(&self, ident: u64) -> Option<usize> {
        self.rows
            .iter()
            .position(|r| r.as_ref().is_some_and(|r| r.ident() == ident))
    }

    pub(crate) fn col_pos(&self, ident: u64) -> Option<usize> {
        self.cols
            .iter()
            .position(|c| c.as_ref().is_some_and(|c| c.ident() == ident))
    }

    pub fn row(&self, ident: u64) -> Result<&Row> {
        self.row_pos(ident)
            .and_then(|p| self.rows[p].as_ref())
            .ok_or(TableError::DeletedElement(ElementType::Row))
    }

    pub fn row_mut(&mut self, ident: u64) -> Result<&mut Row> {
        let pos = self
            .row_pos(ident)
            .ok_or(TableError::DeletedElement(ElementType::Row))?;
        Ok(self.rows[pos].as_mut().expect("position points at a row"))
    }

    pub fn column(&self, ident: u64) -> Result<&Column> {
        self.col_pos(ident)
            .and_then(|p| self.cols[p].as_ref())
            .ok_or(TableError::DeletedElement(ElementType::Column))
    }

    pub fn column_mut(&mut self, ident: u64) -> Result<&mut Column> {
        let pos = self
            .col_pos(ident)
            .ok_or(TableError::DeletedElement(ElementType::Column))?;
        Ok(self.cols[pos].as_mut().expect("position points at a column"))
    }

    /// The row at a 1-based position, if materialized.
    pub fn row_at(&self, index: usize) -> Option<&Row> {
        index
            .checked_sub(1)
            .and_then(|p| self.rows.get(p))
            .and_then(|r| r.as_ref())
    }

    /// The column at a 1-based position, if materialized.
    pub fn column_at(&self, index: usize) -> Option<&Column> {
        index
            .checked_sub(1)
            .and_then(|p| self.cols.get(p))
            .and_then(|c| c.as_ref())
    }

    /// Materialized rows, in table order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().flatten()
    }

    /// Materialized columns, in table order.
    pub fn iter_columns(&self) -> impl Iterator<Item = &Column> {
        self.cols.iter().flatten()
    }

    /// Idents of all rows, in table order, materializing sparse slots.
    pub fn row_idents(&mut self) -> Vec<u64> {
        self.ensure_rows_exist();
        self.rows
            .iter()
            .flatten()
            .map(|r| r.ident())
            .collect()
    }

    /// Idents of all columns, in table order, materializing sparse slots.
    pub fn column_idents(&mut self) -> Vec<u64> {
        self.ensure_columns_exist();
        self.cols
            .iter()
            .flatten()
            .map(|c| c.ident())
            .collect()
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    pub fn current_row(&self) -> Option<u64> {
        self.cursor.row
    }

    pub fn current_column(&self) -> Option<u64> {
        self.cursor.col
    }

    pub fn set_current_row(&mut self, ident: Option<u64>) -> Result<()> {
        if let Some(ident) = ident {
            self.row(ident)?;
        }
        self.cursor.row = ident;
        Ok(())
    }

    pub fn set_current_column(&mut self, ident: Option<u64>) -> Result<()> {
        if let Some(ident) = ident {
            self.column(ident)?;
        }
        self.cursor.col = ident;
        Ok(())
    }

    /// Save the current-cell cursor for a later [`Table::pop_current_cell`].
    pub fn push_current_cell(&mut self) {
        self.cursor_stack.push(self.cursor);
    }

    /// Restore the most recently pushed cursor; no-op on an empty stack.
    pub fn pop_current_cell(&mut self) {
        if let Some(cursor) = self.cursor_stack.pop() {
            self.cursor = cursor;
        }
    }

    pub(crate) fn purge_cursor(&mut self, elem: ElementRef) {
        let purge = |cursor: &mut CellCursor| match elem {
            ElementRef::Row(id) => {
                if cursor.row == Some(id) {
                    cursor.row = None;
                }
            }
            ElementRef::Column(id) => {
                if cursor.col == Some(id) {
                    cursor.col = None;
                }
            }
            _ => {}
        };
        purge(&mut self.cursor);
        for cursor in &mut self.cursor_stack {
            purge(cursor);
        }
    }

    /// Whether the table as a whole refuses writes.
    pub fn is_write_protected(&self) -> bool {
        self.is_read_only()
    }

    // ------------------------------------------------------------------
    // Cell offsets
    // ------------------------------------------------------------------

    pub(crate) fn allocate_cell_offset(&mut self) -> usize {
        if let Some(offset) = self.unused_cell_offsets.pop_front() {
            return offset;
        }
        let offset = self.next_cell_offset;
        self.next_cell_offset += 1;
        offset
    }

    /// Return a freed offset to the pool and drop its cells in every column.
    pub(crate) fn recycle_cell_offset(&mut self, offset: usize) {
        self.offset_row_map.remove(&offset);
        for col in self.cols.iter_mut().flatten() {
            col.drop_cell(offset);
        }
        self.unused_cell_offsets.push_back(offset);
    }

    pub(crate) fn row_ident_by_offset(&self, offset: usize) -> Option<u64> {
        self.offset_row_map.get(&offset).copied()
    }

    pub(crate) fn map_offset_to_row(&mut self, offset: usize, row_ident: u64) {
        self.offset_row_map.insert(offset, row_ident);
    }

    // ------------------------------------------------------------------
    // Capacity management
    // ------------------------------------------------------------------

    pub(crate) fn calculate_rows_capacity(&self, num_required: usize) -> usize {
        round_to_increment(num_required, self.row_capacity_incr())
    }

    pub(crate) fn calculate_columns_capacity(&self, num_required: usize) -> usize {
        round_to_increment(num_required, self.column_capacity_incr())
    }

    /// Shrink row slot storage when the free-space threshold is exceeded.
    pub(crate) fn reclaim_row_space(&mut self) {
        if self.rows.is_empty() {
            self.offset_row_map.clear();
            self.unused_cell_offsets.clear();
            self.next_cell_offset = 0;
            for col in self.cols.iter_mut().flatten() {
                col.clear_cells();
            }
        }
        let threshold = self.free_space_threshold();
        if threshold > 0.0 {
            let incr = self.row_capacity_incr().max(1);
            let free = self.rows.capacity().saturating_sub(self.rows.len());
            if free as f64 / incr as f64 > threshold || self.rows.is_empty() {
                self.rows.shrink_to_fit();
                self.rows.reserve(incr - self.rows.len() % incr);
                for col in self.cols.iter_mut().flatten() {
                    col.reclaim_cell_space();
                }
            }
        }
    }

    pub(crate) fn reclaim_column_space(&mut self) {
        if self.cols.is_empty() {
            self.offset_row_map.clear();
            self.unused_cell_offsets.clear();
            self.next_cell_offset = 0;
            for row in self.rows.iter_mut().flatten() {
                row.set_cell_offset(None);
            }
        }
        let threshold = self.free_space_threshold();
        if threshold > 0.0 {
            let incr = self.column_capacity_incr().max(1);
            let free = self.cols.capacity().saturating_sub(self.cols.len());
            if free as f64 / incr as f64 > threshold || self.cols.is_empty() {
                self.cols.shrink_to_fit();
                self.cols.reserve(incr - self.cols.len() % incr);
            }
        }
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Delete a row: remove it from groups, clear its derivations and
    /// affects edges, recycle its cell offset, reindex the remainder.
    pub fn delete_row(&mut self, ident: u64) -> Result<()> {
        self.vet()?;
        let pos = self
            .row_pos(ident)
            .ok_or(TableError::DeletedElement(ElementType::Row))?;

        self.fire_vetoable(EventType::OnBeforeDelete, ElementRef::Row(ident))?;

        let row = self.rows[pos].take().expect("position points at a row");
        let offset = row.cell_offset();

        // Drop derivations and affects edges touching the row or its cells.
        self.forget_element(ElementRef::Row(ident));
        if let Some(offset) = offset {
            let cell_refs: Vec<ElementRef> = self
                .cols
                .iter()
                .flatten()
                .filter(|c| c.cell_at(offset).is_some())
                .map(|c| ElementRef::Cell {
                    column: c.ident(),
                    offset,
                })
                .collect();
            for cell_ref in cell_refs {
                self.forget_element(cell_ref);
            }
        }

        for group in &mut self.groups {
            group.purge_row(ident, offset);
        }

        if let Some(offset) = offset {
            self.recycle_cell_offset(offset);
        }

        self.rows.remove(pos);
        for (i, row) in self.rows.iter_mut().enumerate() {
            if let Some(row) = row {
                row.set_index(i + 1);
            }
        }

        if let Some(label) = row.label() {
            self.row_label_index.remove(&label.to_lowercase());
        }
        self.purge_cursor(ElementRef::Row(ident));
        self.reclaim_row_space();
        for group in &mut self.groups {
            group.mark_dirty();
        }

        debug!(table = self.ident, row = ident, "row deleted");
        self.fire_notification(EventType::OnDelete, ElementRef::Row(ident), None);
        Ok(())
    }

    /// Delete a column and every cell it holds.
    pub fn delete_column(&mut self, ident: u64) -> Result<()> {
        self.vet()?;
        let pos = self
            .col_pos(ident)
            .ok_or(TableError::DeletedElement(ElementType::Column))?;

        self.fire_vetoable(EventType::OnBeforeDelete, ElementRef::Column(ident))?;

        let col = self.cols[pos].take().expect("position points at a column");

        self.forget_element(ElementRef::Column(ident));
        let cell_refs: Vec<ElementRef> = col
            .cell_offsets()
            .map(|offset| ElementRef::Cell {
                column: ident,
                offset,
            })
            .collect();
        for cell_ref in cell_refs {
            self.forget_element(cell_ref);
        }

        for group in &mut self.groups {
            group.purge_column(ident);
        }

        self.cols.remove(pos);
        for (i, col) in self.cols.iter_mut().enumerate() {
            if let Some(col) = col {
                col.set_index(i + 1);
            }
        }

        if let Some(label) = col.label() {
            self.col_label_index.remove(&label.to_lowercase());
        }
        self.purge_cursor(ElementRef::Column(ident));
        self.reclaim_column_space();
        for group in &mut self.groups {
            group.mark_dirty();
        }

        debug!(table = self.ident, column = ident, "column deleted");
        self.fire_notification(EventType::OnDelete, ElementRef::Column(ident), None);
        Ok(())
    }

    /// Delete all contents and mark the table invalid. Contexts call this
    /// before dropping a table; afterwards every operation fails.
    pub(crate) fn delete_contents(&mut self) {
        let ident = self.ident;
        self.fire_notification(EventType::OnDelete, ElementRef::Table(ident), None);
        self.rows.clear();
        self.cols.clear();
        self.groups.clear();
        self.row_label_index.clear();
        self.col_label_index.clear();
        self.group_label_index.clear();
        self.unused_cell_offsets.clear();
        self.offset_row_map.clear();
        self.next_cell_offset = 0;
        self.cursor = CellCursor::default();
        self.cursor_stack.clear();
        self.affects.clear();
        self.derivation_reads.clear();
        self.derivations.clear();
        self.props.reset();
        self.state.insert(ElementState::IS_INVALID);
        debug!(table = ident, "table deleted");
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_invalid() {
            return write!(f, "[Deleted Table]");
        }
        match self.label() {
            Some(label) => write!(f, "[Table: {}]", label),
            None => write!(f, "[Table#{}]", self.ident),
        }
    }
}

fn round_to_increment(num_required: usize, increment: usize) -> usize {
    let increment = increment.max(1);
    if num_required == 0 {
        return increment;
    }
    let remainder = num_required % increment;
    if remainder > 0 {
        num_required + (increment - remainder)
    } else {
        num_required
    }
}

pub(crate) fn group_key(key: CellKey) -> ElementRef {
    ElementRef::Cell {
        column: key.0,
        offset: key.1,
    }
}

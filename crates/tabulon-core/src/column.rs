//! Table columns.
//!
//! Columns own the cell storage: a sparse, offset-addressed vector. A cell
//! for row `r` lives at `cells[r.cell_offset]`; unmaterialized positions
//! hold `None`. Offsets survive row reordering, so sorting rows never moves
//! a cell.

use std::collections::HashSet;
use std::sync::OnceLock;

use uuid::Uuid;

use tabulon_engine::validate::SharedValidator;
use tabulon_engine::{DataType, ElementState, ElementType, Property, PropertyMap, Tag, Value};

use crate::cell::Cell;
use crate::error::Result;
use crate::row::normalize_text;
use crate::slice::{Slice, seed_slice_properties};

/// A table column.
pub struct Column {
    ident: u64,
    index: usize,
    state: ElementState,
    props: PropertyMap,
    tags: HashSet<Tag>,
    uuid: OnceLock<Uuid>,
    datatype: Option<DataType>,
    cells: Vec<Option<Cell>>,
    validator: Option<SharedValidator>,
}

impl Column {
    pub(crate) fn new(ident: u64, index: usize, seed: &PropertyMap) -> Column {
        let mut props = PropertyMap::new(ElementType::Column);
        let mut state = ElementState::default();
        seed_slice_properties(&mut props, &mut state, seed);
        props
            .initialize(Property::Ident, Value::Int(ident as i64))
            .expect("columns implement the ident property");
        Column {
            ident,
            index,
            state,
            props,
            tags: HashSet::new(),
            uuid: OnceLock::new(),
            datatype: None,
            cells: Vec::new(),
            validator: None,
        }
    }

    pub fn ident(&self) -> u64 {
        self.ident
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("ident", &self.ident)
            .field("index", &self.index)
            .field("state", &self.state)
            .field("props", &self.props)
            .field("tags", &self.tags)
            .field("uuid", &self.uuid)
            .field("datatype", &self.datatype)
            .field("cells", &self.cells)
            .finish_non_exhaustive()
    }
}

impl Column {
    /// 1-based position within the table.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn uuid(&self) -> Uuid {
        *self.uuid.get_or_init(Uuid::new_v4)
    }

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

    /// Declared datatype; enforced against new values when datatype
    /// enforcement is active on the write path.
    pub fn datatype(&self) -> Option<DataType> {
        self.datatype
    }

    pub fn set_datatype(&mut self, datatype: Option<DataType>) {
        self.datatype = datatype;
    }

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

    pub fn is_in_use(&self) -> bool {
        self.state.is_set(ElementState::IN_USE)
    }

    pub fn is_derived(&self) -> bool {
        self.state.is_set(ElementState::IS_DERIVED)
    }

    /// The validator applied to cells in this column when the cell itself
    /// declares none. Takes precedence over the row validator.
    pub fn validator(&self) -> Option<&SharedValidator> {
        self.validator.as_ref()
    }

    pub fn set_validator(&mut self, validator: Option<SharedValidator>) {
        self.state
            .assign(ElementState::HAS_CELL_VALIDATOR, validator.is_some());
        self.validator = validator;
    }

    pub fn props(&self) -> &PropertyMap {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut PropertyMap {
        &mut self.props
    }

    pub fn tags(&self) -> Vec<String> {
        Tag::as_labels(&self.tags)
    }

    pub fn has_all_tags<'a>(&self, tags: impl IntoIterator<Item = &'a str>) -> bool {
        let query = Tag::as_tags(tags);
        !query.is_empty() && query.is_subset(&self.tags)
    }

    pub fn has_any_tags<'a>(&self, tags: impl IntoIterator<Item = &'a str>) -> bool {
        let query = Tag::as_tags(tags);
        query.iter().any(|t| self.tags.contains(t))
    }

    /// Number of materialized (non-null slot) cells.
    pub fn num_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_null(&self) -> bool {
        self.num_cells() == 0
    }

    pub(crate) fn tag_set(&self) -> &HashSet<Tag> {
        &self.tags
    }

    pub(crate) fn tag_set_mut(&mut self) -> &mut HashSet<Tag> {
        &mut self.tags
    }

    pub(crate) fn cell_at(&self, offset: usize) -> Option<&Cell> {
        self.cells.get(offset).and_then(|c| c.as_ref())
    }

    /// Get the cell at `offset`, materializing it (and any slots before it)
    /// on demand.
    pub(crate) fn materialize_cell(&mut self, offset: usize) -> &mut Cell {
        if self.cells.len() <= offset {
            self.cells.resize_with(offset + 1, || None);
        }
        self.cells[offset].get_or_insert_with(Cell::default)
    }

    pub(crate) fn drop_cell(&mut self, offset: usize) {
        if let Some(slot) = self.cells.get_mut(offset) {
            *slot = None;
        }
    }

    /// Shrink cell storage to the highest live offset.
    pub(crate) fn reclaim_cell_space(&mut self) {
        let live = self
            .cells
            .iter()
            .rposition(|c| c.is_some())
            .map_or(0, |p| p + 1);
        self.cells.truncate(live);
        self.cells.shrink_to_fit();
    }

    pub(crate) fn clear_cells(&mut self) {
        self.cells.clear();
        self.cells.shrink_to_fit();
    }

    /// Offsets of materialized cells.
    pub(crate) fn cell_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(offset, c)| c.as_ref().map(|_| offset))
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn set_in_use(&mut self, on: bool) {
        self.state.assign(ElementState::IN_USE, on);
    }

    pub(crate) fn set_derived(&mut self, on: bool) {
        self.state.assign(ElementState::IS_DERIVED, on);
    }

}

impl Slice for Column {
    fn element_type() -> ElementType {
        ElementType::Column
    }

    fn ident(&self) -> u64 {
        self.ident
    }

    fn index(&self) -> usize {
        self.index
    }

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    fn label(&self) -> Option<&str> {
        self.label()
    }

    fn description(&self) -> Option<&str> {
        self.description()
    }

    fn uuid(&self) -> Uuid {
        self.uuid()
    }

    fn props(&self) -> &PropertyMap {
        &self.props
    }

    fn tag_set(&self) -> &HashSet<Tag> {
        &self.tags
    }

    fn datatype(&self) -> Option<DataType> {
        self.datatype
    }
}

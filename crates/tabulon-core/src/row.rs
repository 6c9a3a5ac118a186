//! Table rows.

use std::collections::HashSet;
use std::sync::OnceLock;

use uuid::Uuid;

use tabulon_engine::validate::SharedValidator;
use tabulon_engine::{ElementState, ElementType, Property, PropertyMap, Tag, Value};

use crate::error::Result;
use crate::slice::{Slice, seed_slice_properties};

/// A table row.
///
/// Rows do not own cells; a row carries the *cell offset* addressing its
/// cells inside each column's storage. Offsets are allocated on first touch
/// and recycled when the row is deleted.
pub struct Row {
    ident: u64,
    index: usize,
    state: ElementState,
    props: PropertyMap,
    tags: HashSet<Tag>,
    uuid: OnceLock<Uuid>,
    cell_offset: Option<usize>,
    validator: Option<SharedValidator>,
}

impl Row {
    pub(crate) fn new(ident: u64, index: usize, seed: &PropertyMap) -> Row {
        let mut props = PropertyMap::new(ElementType::Row);
        let mut state = ElementState::default();
        seed_slice_properties(&mut props, &mut state, seed);
        props
            .initialize(Property::Ident, Value::Int(ident as i64))
            .expect("rows implement the ident property");
        Row {
            ident,
            index,
            state,
            props,
            tags: HashSet::new(),
            uuid: OnceLock::new(),
            cell_offset: None,
            validator: None,
        }
    }

    pub fn ident(&self) -> u64 {
        self.ident
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row")
            .field("ident", &self.ident)
            .field("index", &self.index)
            .field("state", &self.state)
            .field("props", &self.props)
            .field("tags", &self.tags)
            .field("uuid", &self.uuid)
            .field("cell_offset", &self.cell_offset)
            .finish_non_exhaustive()
    }
}

impl Row {
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

    /// The validator applied to cells in this row when neither the cell nor
    /// its column declares one.
    pub fn validator(&self) -> Option<&SharedValidator> {
        self.validator.as_ref()
    }

    pub fn set_validator(&mut self, validator: Option<SharedValidator>) {
        self.state
            .assign(ElementState::HAS_CELL_VALIDATOR, validator.is_some());
        self.validator = validator;
    }

    pub fn cell_offset(&self) -> Option<usize> {
        self.cell_offset
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

    pub(crate) fn tag_set(&self) -> &HashSet<Tag> {
        &self.tags
    }

    pub(crate) fn tag_set_mut(&mut self) -> &mut HashSet<Tag> {
        &mut self.tags
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn set_cell_offset(&mut self, offset: Option<usize>) {
        self.cell_offset = offset;
    }

    pub(crate) fn set_in_use(&mut self, on: bool) {
        self.state.assign(ElementState::IN_USE, on);
    }

    pub(crate) fn set_derived(&mut self, on: bool) {
        self.state.assign(ElementState::IS_DERIVED, on);
    }

}

impl Slice for Row {
    fn element_type() -> ElementType {
        ElementType::Row
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
}

pub(crate) fn normalize_text(text: Option<&str>) -> Option<String> {
    let text = text?;
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

//! Groups of table elements.
//!
//! A group collects rows, columns, cells and other groups of one table.
//! Members are held by stable reference (ident / cell key); the owning
//! table prunes memberships when elements are deleted and answers the
//! questions that need table shape (effective rows/columns, cell counts).

use std::collections::BTreeSet;
use std::collections::HashSet;
use std::sync::OnceLock;

use uuid::Uuid;

use tabulon_engine::{ElementState, ElementType, Property, PropertyMap, Tag, Value};

use crate::error::Result;
use crate::row::normalize_text;

/// Stable address of a cell: owning column ident + row cell offset.
pub type CellKey = (u64, usize);

/// A named collection of table elements.
#[derive(Debug)]
pub struct Group {
    ident: u64,
    state: ElementState,
    props: PropertyMap,
    tags: HashSet<Tag>,
    uuid: OnceLock<Uuid>,
    rows: BTreeSet<u64>,
    cols: BTreeSet<u64>,
    cells: BTreeSet<CellKey>,
    groups: BTreeSet<u64>,
    cached_num_cells: Option<usize>,
}

impl Group {
    pub(crate) fn new(ident: u64) -> Group {
        let mut props = PropertyMap::new(ElementType::Group);
        props
            .initialize(Property::Ident, Value::Int(ident as i64))
            .expect("groups implement the ident property");
        Group {
            ident,
            state: ElementState::default(),
            props,
            tags: HashSet::new(),
            uuid: OnceLock::new(),
            rows: BTreeSet::new(),
            cols: BTreeSet::new(),
            cells: BTreeSet::new(),
            groups: BTreeSet::new(),
            cached_num_cells: None,
        }
    }

    pub fn ident(&self) -> u64 {
        self.ident
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

    /// Whether the group is persistent (kept across `purge` operations on
    /// its table's group set).
    pub fn is_persistent(&self) -> bool {
        self.state.is_set(ElementState::IS_PERSISTENT)
    }

    pub fn set_persistent(&mut self, on: bool) {
        self.state.assign(ElementState::IS_PERSISTENT, on);
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.cols.len()
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn num_explicit_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn row_members(&self) -> impl Iterator<Item = u64> + '_ {
        self.rows.iter().copied()
    }

    pub fn column_members(&self) -> impl Iterator<Item = u64> + '_ {
        self.cols.iter().copied()
    }

    pub fn group_members(&self) -> impl Iterator<Item = u64> + '_ {
        self.groups.iter().copied()
    }

    pub fn cell_members(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.cells.iter().copied()
    }

    pub fn contains_row(&self, ident: u64) -> bool {
        self.rows.contains(&ident)
    }

    pub fn contains_column(&self, ident: u64) -> bool {
        self.cols.contains(&ident)
    }

    pub fn contains_group(&self, ident: u64) -> bool {
        self.groups.contains(&ident)
    }

    pub fn contains_cell(&self, key: CellKey) -> bool {
        self.cells.contains(&key)
    }

    pub(crate) fn add_row(&mut self, ident: u64) -> bool {
        let added = self.rows.insert(ident);
        if added {
            self.mark_dirty();
        }
        added
    }

    pub(crate) fn add_column(&mut self, ident: u64) -> bool {
        let added = self.cols.insert(ident);
        if added {
            self.mark_dirty();
        }
        added
    }

    pub(crate) fn add_group(&mut self, ident: u64) -> bool {
        let added = self.groups.insert(ident);
        if added {
            self.mark_dirty();
        }
        added
    }

    pub(crate) fn add_cell(&mut self, key: CellKey) -> bool {
        let added = self.cells.insert(key);
        if added {
            self.mark_dirty();
        }
        added
    }

    pub(crate) fn remove_row(&mut self, ident: u64) -> bool {
        let removed = self.rows.remove(&ident);
        if removed {
            self.mark_dirty();
        }
        removed
    }

    pub(crate) fn remove_column(&mut self, ident: u64) -> bool {
        let removed = self.cols.remove(&ident);
        if removed {
            self.mark_dirty();
        }
        removed
    }

    pub(crate) fn remove_group(&mut self, ident: u64) -> bool {
        let removed = self.groups.remove(&ident);
        if removed {
            self.mark_dirty();
        }
        removed
    }

    pub(crate) fn remove_cell(&mut self, key: CellKey) -> bool {
        let removed = self.cells.remove(&key);
        if removed {
            self.mark_dirty();
        }
        removed
    }

    /// Drop all cell members of a column and the column itself.
    pub(crate) fn purge_column(&mut self, ident: u64) {
        self.cols.remove(&ident);
        let before = self.cells.len();
        self.cells.retain(|(col, _)| *col != ident);
        if before != self.cells.len() {
            self.mark_dirty();
        }
    }

    /// Drop all cell members at a row's offset and the row itself.
    pub(crate) fn purge_row(&mut self, ident: u64, offset: Option<usize>) {
        self.rows.remove(&ident);
        if let Some(offset) = offset {
            let before = self.cells.len();
            self.cells.retain(|(_, o)| *o != offset);
            if before != self.cells.len() {
                self.mark_dirty();
            }
        }
        self.mark_dirty();
    }

    /// Invalidate the cached cell count; called on membership changes and
    /// whenever the owning table changes shape.
    pub(crate) fn mark_dirty(&mut self) {
        self.cached_num_cells = None;
        self.state.insert(ElementState::IS_DIRTY);
    }

    pub(crate) fn cached_num_cells(&self) -> Option<usize> {
        self.cached_num_cells
    }

    pub(crate) fn cache_num_cells(&mut self, n: usize) {
        self.cached_num_cells = Some(n);
        self.state.remove(ElementState::IS_DIRTY);
    }

    pub(crate) fn tag_set_mut(&mut self) -> &mut HashSet<Tag> {
        &mut self.tags
    }

    pub(crate) fn tag_set(&self) -> &HashSet<Tag> {
        &self.tags
    }
}

//! Table contexts: shared defaults, table registration, canonical tags.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use tabulon_engine::{
    Access, ElementState, ElementType, Property, PropertyMap, Tag, Value, next_element_ident,
};

use crate::error::{Result, TableError};
use crate::table::Table;

/// Canonical tag registry shared between a context and its tables.
///
/// The registry hands out one canonical [`Tag`] per normalized label, so a
/// context and all of its tables agree on the tag catalog. Clones share the
/// underlying map.
#[derive(Clone, Debug, Default)]
pub struct TagRegistry {
    tags: Arc<DashMap<String, Tag>>,
}

impl TagRegistry {
    /// The canonical tag for a label, creating it on first use. Labels
    /// that normalize to nothing yield no tag.
    pub fn canonical(&self, label: &str) -> Option<Tag> {
        let key = Tag::normalize_label(label)?;
        let entry = self
            .tags
            .entry(key.clone())
            .or_insert_with(|| Tag::new(&key).expect("normalized label is non-empty"));
        Some(entry.value().clone())
    }

    /// Look up a tag without creating it.
    pub fn get(&self, label: &str) -> Option<Tag> {
        let key = Tag::normalize_label(label)?;
        self.tags.get(&key).map(|t| t.value().clone())
    }

    /// Sorted labels of every known tag.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.tags.iter().map(|e| e.key().clone()).collect();
        labels.sort();
        labels
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Built-in default for an initializable context property.
pub(crate) fn builtin_default(p: Property) -> Option<Value> {
    match p {
        Property::RowCapacityIncr | Property::ColumnCapacityIncr => Some(Value::Int(256)),
        Property::FreeSpaceThreshold => Some(Value::Float(2.0)),
        Property::IsAutoRecalculateDefault => Some(Value::Bool(true)),
        Property::IsReadOnlyDefault => Some(Value::Bool(false)),
        Property::IsSupportsNullsDefault => Some(Value::Bool(true)),
        Property::IsEnforceDataTypeDefault => Some(Value::Bool(false)),
        Property::IsTableLabelsIndexedDefault
        | Property::IsRowLabelsIndexedDefault
        | Property::IsColumnLabelsIndexedDefault
        | Property::IsCellLabelsIndexedDefault
        | Property::IsGroupLabelsIndexedDefault => Some(Value::Bool(false)),
        Property::IsTablesPersistentDefault => Some(Value::Bool(false)),
        // Precision, Units and DisplayFormat default to unset.
        _ => None,
    }
}

/// A collection of tables sharing defaults and a tag catalog.
///
/// Contexts own their tables. Tables are addressed by ident; whether a
/// table is persistent or transient is its own state, consulted by
/// [`TableContext::purge_transients`].
pub struct TableContext {
    ident: u64,
    state: ElementState,
    props: PropertyMap,
    registry: TagRegistry,
    tables: Vec<Table>,
}

impl TableContext {
    /// Create a context with built-in defaults.
    pub fn new() -> TableContext {
        Self::build(None)
    }

    /// Create a context inheriting another context's current defaults.
    pub fn from_template(template: &TableContext) -> TableContext {
        Self::build(Some(template))
    }

    fn build(template: Option<&TableContext>) -> TableContext {
        let mut props = PropertyMap::new(ElementType::TableContext);
        let mut state = ElementState::default();
        state.assign(ElementState::IS_DEFAULT, template.is_none());

        for p in ElementType::TableContext.initializable_properties() {
            let value = template
                .and_then(|t| t.props.get(p).cloned())
                .or_else(|| builtin_default(p));
            if let Some(value) = value {
                if let (Some(flag), Some(on)) = (p.state_flag(), value.as_bool()) {
                    state.assign(flag, on);
                }
                let _ = props.initialize(p, value);
            }
        }

        TableContext {
            ident: next_element_ident(),
            state,
            props,
            registry: TagRegistry::default(),
            tables: Vec::new(),
        }
    }

    pub fn ident(&self) -> u64 {
        self.ident
    }

    pub fn element_type(&self) -> ElementType {
        ElementType::TableContext
    }

    /// Whether this context was built from built-in defaults rather than a
    /// template.
    pub fn is_default(&self) -> bool {
        self.state.is_set(ElementState::IS_DEFAULT)
    }

    pub fn props(&self) -> &PropertyMap {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut PropertyMap {
        &mut self.props
    }

    pub fn get_property(&self, p: Property) -> Option<&Value> {
        self.props.get(p)
    }

    pub fn has_property(&self, p: Property) -> bool {
        self.props.has(p)
    }

    pub fn set_property(&mut self, p: Property, value: Value) -> Result<Option<Value>> {
        Ok(self.props.set(p, value)?)
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

    pub fn is_auto_recalculate(&self) -> bool {
        self.props
            .get(Property::IsAutoRecalculateDefault)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn is_tables_persistent_default(&self) -> bool {
        self.props
            .get(Property::IsTablesPersistentDefault)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// The canonical tag for a label, creating it on demand.
    pub fn to_canonical_tag(&self, label: &str) -> Option<Tag> {
        self.registry.canonical(label)
    }

    /// Sorted labels of every tag known to this context.
    pub fn tags(&self) -> Vec<String> {
        self.registry.labels()
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    /// Create a table from this context's defaults and register it.
    /// Returns the table's ident.
    pub fn create_table(&mut self, num_rows: usize, num_cols: usize) -> u64 {
        let mut table =
            Table::with_defaults(num_rows, num_cols, &self.props, self.registry.clone());
        if self.is_tables_persistent_default() {
            table.set_persistent(true);
        }
        let ident = table.ident();
        self.tables.push(table);
        debug!(context = self.ident, table = ident, "table registered");
        ident
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn is_null(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_idents(&self) -> Vec<u64> {
        self.tables.iter().map(|t| t.ident()).collect()
    }

    pub fn is_registered(&self, ident: u64) -> bool {
        self.tables.iter().any(|t| t.ident() == ident)
    }

    pub fn table(&self, ident: u64) -> Result<&Table> {
        self.tables
            .iter()
            .find(|t| t.ident() == ident)
            .ok_or(TableError::DeletedElement(ElementType::Table))
    }

    pub fn table_mut(&mut self, ident: u64) -> Result<&mut Table> {
        self.tables
            .iter_mut()
            .find(|t| t.ident() == ident)
            .ok_or(TableError::DeletedElement(ElementType::Table))
    }

    /// Resolve a table by a lookup access mode.
    pub fn get_table(&self, access: &Access) -> Result<Option<u64>> {
        match access {
            Access::ByLabel(_)
            | Access::ByDescription(_)
            | Access::ByIdent(_)
            | Access::ByUuid(_)
            | Access::ByTags(_)
            | Access::ByProperty(_, _)
            | Access::ByUserProperty(_, _) => Ok(self
                .tables
                .iter()
                .find(|t| t.matches(access))
                .map(|t| t.ident())),
            _ => Err(TableError::InvalidAccess {
                child: ElementType::Table,
                access: access.name(),
                kind: "get",
            }),
        }
    }

    /// Delete one table: contents are deleted, listeners notified, the
    /// table dropped from the context.
    pub fn delete_table(&mut self, ident: u64) -> Result<()> {
        let pos = self
            .tables
            .iter()
            .position(|t| t.ident() == ident)
            .ok_or(TableError::DeletedElement(ElementType::Table))?;
        let mut table = self.tables.remove(pos);
        table.delete_contents();
        debug!(context = self.ident, table = ident, "table deleted");
        Ok(())
    }

    /// Drop every non-persistent table. The owner-managed analog of weak
    /// registration: transient tables live only until the next purge.
    pub fn purge_transients(&mut self) {
        let before = self.tables.len();
        let mut kept = Vec::with_capacity(before);
        for mut table in self.tables.drain(..) {
            if table.is_persistent() {
                kept.push(table);
            } else {
                table.delete_contents();
            }
        }
        self.tables = kept;
        if self.tables.len() != before {
            debug!(
                context = self.ident,
                purged = before - self.tables.len(),
                "transient tables purged"
            );
        }
    }

    /// Delete every table, persistent or not.
    pub fn clear(&mut self) {
        for mut table in self.tables.drain(..) {
            table.delete_contents();
        }
        debug!(context = self.ident, "context cleared");
    }
}

impl Default for TableContext {
    fn default() -> Self {
        TableContext::new()
    }
}

impl std::fmt::Debug for TableContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[TableContext#{} tables={}]",
            self.ident,
            self.tables.len()
        )
    }
}

//! Element taxonomy.
//!
//! Every component of the table model is one of the [`ElementType`]s below.
//! Property metadata in [`crate::property`] is keyed by element type, so the
//! helpers here answer "which properties does a Row support?" style
//! questions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::property::Property;

/// The kinds of elements that make up the table model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    /// A collection of tables sharing defaults and a tag registry.
    TableContext,
    /// A data table, consisting of rows, columns, cells, and groups.
    Table,
    /// A table row.
    Row,
    /// A table column.
    Column,
    /// A table cell containing a single value.
    Cell,
    /// A group of table rows, columns, cells, or other groups.
    Group,
    /// A registered calculation that fills a derived element.
    Derivation,
}

impl ElementType {
    pub const ALL: [ElementType; 7] = [
        ElementType::TableContext,
        ElementType::Table,
        ElementType::Row,
        ElementType::Column,
        ElementType::Cell,
        ElementType::Group,
        ElementType::Derivation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::TableContext => "TableContext",
            ElementType::Table => "Table",
            ElementType::Row => "Row",
            ElementType::Column => "Column",
            ElementType::Cell => "Cell",
            ElementType::Group => "Group",
            ElementType::Derivation => "Derivation",
        }
    }

    /// Short form used in references and error messages.
    pub fn nickname(&self) -> &'static str {
        match self {
            ElementType::Column => "Col",
            other => other.name(),
        }
    }

    /// All properties implemented by this element type.
    pub fn properties(&self) -> Vec<Property> {
        Property::ALL
            .iter()
            .copied()
            .filter(|p| p.is_implemented_by(*self))
            .collect()
    }

    pub fn required_properties(&self) -> Vec<Property> {
        self.properties()
            .into_iter()
            .filter(|p| p.is_required())
            .collect()
    }

    pub fn optional_properties(&self) -> Vec<Property> {
        self.properties()
            .into_iter()
            .filter(|p| p.is_optional())
            .collect()
    }

    pub fn initializable_properties(&self) -> Vec<Property> {
        self.properties()
            .into_iter()
            .filter(|p| p.is_initializable())
            .collect()
    }

    pub fn read_only_properties(&self) -> Vec<Property> {
        self.properties()
            .into_iter()
            .filter(|p| p.is_read_only())
            .collect()
    }

    pub fn mutable_properties(&self) -> Vec<Property> {
        self.properties()
            .into_iter()
            .filter(|p| !p.is_read_only())
            .collect()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stable handle to an element of a table.
///
/// Rows, columns and groups are addressed by their ident; cells by their
/// column's ident plus the owning row's cell offset (both survive
/// reindexing, so references stay valid across inserts, deletes and sorts
/// of unrelated slices).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementRef {
    Table(u64),
    Row(u64),
    Column(u64),
    Group(u64),
    Cell { column: u64, offset: usize },
}

impl ElementRef {
    pub fn element_type(&self) -> ElementType {
        match self {
            ElementRef::Table(_) => ElementType::Table,
            ElementRef::Row(_) => ElementType::Row,
            ElementRef::Column(_) => ElementType::Column,
            ElementRef::Group(_) => ElementType::Group,
            ElementRef::Cell { .. } => ElementType::Cell,
        }
    }

    /// Whether a derivation may target this element.
    pub fn is_derivable(&self) -> bool {
        matches!(
            self,
            ElementRef::Row(_) | ElementRef::Column(_) | ElementRef::Cell { .. }
        )
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Table(id) => write!(f, "Table#{}", id),
            ElementRef::Row(id) => write!(f, "Row#{}", id),
            ElementRef::Column(id) => write!(f, "Col#{}", id),
            ElementRef::Group(id) => write!(f, "Group#{}", id),
            ElementRef::Cell { column, offset } => write!(f, "Cell#{}@{}", column, offset),
        }
    }
}

// Idents start above a recognizable floor so they are never mistaken for
// row/column indexes in logs and error messages.
static ELEMENT_IDENTS: AtomicU64 = AtomicU64::new(1000);

/// Hand out the next process-wide element ident.
///
/// Idents are unique across all tables and contexts for the life of the
/// process, which lets them serve as stable element handles.
pub fn next_element_ident() -> u64 {
    ELEMENT_IDENTS.fetch_add(1, Ordering::Relaxed)
}

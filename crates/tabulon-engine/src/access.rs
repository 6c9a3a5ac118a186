//! Access modes for resolving rows, columns, groups, and tables.

use uuid::Uuid;

use crate::property::Property;
use crate::value::{DataType, Value};

/// How to locate (or place) an element along a table axis.
///
/// Positional modes (`First`, `Last`, `Next`, `Previous`, `Current`,
/// `ByIndex`) resolve against the axis and the table's current-cell cursor;
/// lookup modes resolve through indexes or scans. Indexes are 1-based at
/// this boundary, matching the element `index` property.
#[derive(Clone, Debug, PartialEq)]
pub enum Access {
    First,
    Last,
    Next,
    Previous,
    Current,
    /// 1-based position.
    ByIndex(usize),
    ByIdent(u64),
    ByLabel(String),
    ByDescription(String),
    ByUuid(Uuid),
    /// All listed tags must be present.
    ByTags(Vec<String>),
    ByProperty(Property, Value),
    /// Lookup through a user (string-keyed) property.
    ByUserProperty(String, Value),
    /// Columns only.
    ByDataType(DataType),
}

impl Access {
    pub fn by_label(label: impl Into<String>) -> Access {
        Access::ByLabel(label.into())
    }

    pub fn by_description(description: impl Into<String>) -> Access {
        Access::ByDescription(description.into())
    }

    pub fn by_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Access {
        Access::ByTags(tags.into_iter().map(str::to_string).collect())
    }

    /// The property a lookup mode searches on, if any.
    pub fn associated_property(&self) -> Option<Property> {
        match self {
            Access::ByIdent(_) => Some(Property::Ident),
            Access::ByLabel(_) => Some(Property::Label),
            Access::ByDescription(_) => Some(Property::Description),
            Access::ByUuid(_) => Some(Property::Uuid),
            Access::ByTags(_) => Some(Property::Tags),
            Access::ByDataType(_) => Some(Property::DataType),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Access::First => "First",
            Access::Last => "Last",
            Access::Next => "Next",
            Access::Previous => "Previous",
            Access::Current => "Current",
            Access::ByIndex(_) => "ByIndex",
            Access::ByIdent(_) => "ByIdent",
            Access::ByLabel(_) => "ByLabel",
            Access::ByDescription(_) => "ByDescription",
            Access::ByUuid(_) => "ByUuid",
            Access::ByTags(_) => "ByTags",
            Access::ByProperty(_, _) => "ByProperty",
            Access::ByUserProperty(_, _) => "ByUserProperty",
            Access::ByDataType(_) => "ByDataType",
        }
    }

    /// Whether the mode can pick an insertion point when adding a slice.
    /// `ByUuid` cannot: element uuids are minted, never assigned.
    pub fn supports_adding(&self) -> bool {
        matches!(
            self,
            Access::First
                | Access::Last
                | Access::Next
                | Access::Previous
                | Access::Current
                | Access::ByIndex(_)
                | Access::ByLabel(_)
                | Access::ByDescription(_)
                | Access::ByDataType(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_associated_properties() {
        assert_eq!(
            Access::by_label("x").associated_property(),
            Some(Property::Label)
        );
        assert_eq!(Access::First.associated_property(), None);
        assert_eq!(
            Access::ByDataType(DataType::Int).associated_property(),
            Some(Property::DataType)
        );
    }

    #[test]
    fn test_adding_support() {
        assert!(Access::Last.supports_adding());
        assert!(Access::ByIndex(1).supports_adding());
        assert!(!Access::ByIdent(7).supports_adding());
        assert!(!Access::by_tags(["a"]).supports_adding());
    }
}

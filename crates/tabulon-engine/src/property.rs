//! Property metadata and per-element property stores.
//!
//! Every element characteristic the model exposes is declared here as a
//! [`Property`] with static metadata: whether it is optional, read-only,
//! initializable from context defaults, its nickname, the state flag it
//! seeds (if any), and the element types that implement it. The
//! [`PropertyMap`] is the per-element store that enforces that metadata.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;

use crate::element::ElementType;
use crate::state::ElementState;
use crate::value::Value;

/// Errors raised by property stores.
#[derive(Debug, Error, PartialEq)]
pub enum PropertyError {
    #[error("unimplemented: {elem}->{key}")]
    Unimplemented { elem: ElementType, key: Property },

    #[error("read-only: {elem}->{key}")]
    ReadOnly { elem: ElementType, key: Property },

    #[error("invalid property key: '{0}'")]
    InvalidKey(String),
}

/// Static characteristics of a property.
struct PropertyInfo {
    optional: bool,
    read_only: bool,
    initializable: bool,
    nickname: Option<&'static str>,
    state: Option<ElementState>,
    /// Implementing element types; empty means "all".
    implemented_by: &'static [ElementType],
}

use crate::element::ElementType::{Cell, Column, Group, Row, Table, TableContext};

const CONTEXT_AND_TABLE: &[ElementType] = &[TableContext, Table];
const VALUE_HOLDERS: &[ElementType] = &[TableContext, Table, Row, Column, Cell];

/// Characteristics controlling and describing table elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    // Base element properties supported by all table elements
    Label,
    Description,
    Tags,
    Uuid,
    Ident,

    // Context/table structural defaults
    Precision,
    RowCapacityIncr,
    ColumnCapacityIncr,
    FreeSpaceThreshold,
    IsAutoRecalculateDefault,
    IsTableLabelsIndexedDefault,
    IsRowLabelsIndexedDefault,
    IsColumnLabelsIndexedDefault,
    IsCellLabelsIndexedDefault,
    IsGroupLabelsIndexedDefault,
    IsTablesPersistentDefault,

    // Element behavior defaults
    IsReadOnlyDefault,
    IsSupportsNullsDefault,
    IsEnforceDataTypeDefault,

    // Derivable element properties
    Derivation,

    // Cell/column properties
    DataType,
    CellValue,
    ErrorMessage,
    Units,
    DisplayFormat,
    CellValidator,
}

impl Property {
    pub const ALL: [Property; 26] = [
        Property::Label,
        Property::Description,
        Property::Tags,
        Property::Uuid,
        Property::Ident,
        Property::Precision,
        Property::RowCapacityIncr,
        Property::ColumnCapacityIncr,
        Property::FreeSpaceThreshold,
        Property::IsAutoRecalculateDefault,
        Property::IsTableLabelsIndexedDefault,
        Property::IsRowLabelsIndexedDefault,
        Property::IsColumnLabelsIndexedDefault,
        Property::IsCellLabelsIndexedDefault,
        Property::IsGroupLabelsIndexedDefault,
        Property::IsTablesPersistentDefault,
        Property::IsReadOnlyDefault,
        Property::IsSupportsNullsDefault,
        Property::IsEnforceDataTypeDefault,
        Property::Derivation,
        Property::DataType,
        Property::CellValue,
        Property::ErrorMessage,
        Property::Units,
        Property::DisplayFormat,
        Property::CellValidator,
    ];

    fn info(&self) -> PropertyInfo {
        // (optional, read_only, initializable, nickname, state, implemented_by)
        let (optional, read_only, initializable, nickname, state, implemented_by): (
            bool,
            bool,
            bool,
            Option<&'static str>,
            Option<ElementState>,
            &'static [ElementType],
        ) = match self {
            Property::Label => (true, false, false, Some("lb"), None, &[]),
            Property::Description => (true, false, false, Some("desc"), None, &[]),
            Property::Tags => (true, true, false, Some("tags"), None, &[]),
            Property::Uuid => (
                true,
                true,
                false,
                Some("uuid"),
                None,
                &[Table, Row, Column, Group, Cell],
            ),
            Property::Ident => (true, true, false, Some("id"), None, &[Table, Row, Column, Group]),
            Property::Precision => (true, false, true, Some("pr"), None, CONTEXT_AND_TABLE),
            Property::RowCapacityIncr => (false, false, true, Some("rci"), None, CONTEXT_AND_TABLE),
            Property::ColumnCapacityIncr => {
                (false, false, true, Some("cci"), None, CONTEXT_AND_TABLE)
            }
            Property::FreeSpaceThreshold => {
                (false, false, true, Some("fst"), None, CONTEXT_AND_TABLE)
            }
            Property::IsAutoRecalculateDefault => (
                false,
                false,
                true,
                Some("recalc"),
                Some(ElementState::AUTO_RECALCULATE),
                CONTEXT_AND_TABLE,
            ),
            Property::IsTableLabelsIndexedDefault => (
                false,
                false,
                true,
                Some("isTLbX"),
                Some(ElementState::TABLE_LABELS_INDEXED),
                &[TableContext],
            ),
            Property::IsRowLabelsIndexedDefault => (
                false,
                false,
                true,
                Some("isRLbX"),
                Some(ElementState::ROW_LABELS_INDEXED),
                CONTEXT_AND_TABLE,
            ),
            Property::IsColumnLabelsIndexedDefault => (
                false,
                false,
                true,
                Some("isCLbX"),
                Some(ElementState::COLUMN_LABELS_INDEXED),
                CONTEXT_AND_TABLE,
            ),
            Property::IsCellLabelsIndexedDefault => (
                false,
                false,
                true,
                Some("isClLbX"),
                Some(ElementState::CELL_LABELS_INDEXED),
                CONTEXT_AND_TABLE,
            ),
            Property::IsGroupLabelsIndexedDefault => (
                false,
                false,
                true,
                Some("isGLbX"),
                Some(ElementState::GROUP_LABELS_INDEXED),
                CONTEXT_AND_TABLE,
            ),
            Property::IsTablesPersistentDefault => (
                false,
                false,
                true,
                Some("isP"),
                Some(ElementState::IS_PERSISTENT),
                CONTEXT_AND_TABLE,
            ),
            Property::IsReadOnlyDefault => (
                true,
                false,
                true,
                Some("rod"),
                Some(ElementState::READ_ONLY),
                VALUE_HOLDERS,
            ),
            Property::IsSupportsNullsDefault => (
                true,
                false,
                true,
                Some("snd"),
                Some(ElementState::SUPPORTS_NULL),
                VALUE_HOLDERS,
            ),
            Property::IsEnforceDataTypeDefault => (
                true,
                false,
                true,
                Some("edt"),
                Some(ElementState::ENFORCE_DATATYPE),
                VALUE_HOLDERS,
            ),
            Property::Derivation => (false, false, false, Some("fx"), None, &[Row, Column, Cell]),
            Property::DataType => (false, false, false, Some("dt"), None, &[Column, Cell]),
            Property::CellValue => (false, false, false, Some("v"), None, &[Cell]),
            Property::ErrorMessage => (true, false, false, Some("e"), None, &[Cell]),
            Property::Units => (true, false, true, Some("u"), None, VALUE_HOLDERS),
            Property::DisplayFormat => (true, false, true, Some("f"), None, VALUE_HOLDERS),
            Property::CellValidator => (true, false, false, Some("cv"), None, &[Row, Column, Cell]),
        };
        PropertyInfo {
            optional,
            read_only,
            initializable,
            nickname,
            state,
            implemented_by,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Property::Label => "Label",
            Property::Description => "Description",
            Property::Tags => "Tags",
            Property::Uuid => "Uuid",
            Property::Ident => "Ident",
            Property::Precision => "Precision",
            Property::RowCapacityIncr => "RowCapacityIncr",
            Property::ColumnCapacityIncr => "ColumnCapacityIncr",
            Property::FreeSpaceThreshold => "FreeSpaceThreshold",
            Property::IsAutoRecalculateDefault => "IsAutoRecalculateDefault",
            Property::IsTableLabelsIndexedDefault => "IsTableLabelsIndexedDefault",
            Property::IsRowLabelsIndexedDefault => "IsRowLabelsIndexedDefault",
            Property::IsColumnLabelsIndexedDefault => "IsColumnLabelsIndexedDefault",
            Property::IsCellLabelsIndexedDefault => "IsCellLabelsIndexedDefault",
            Property::IsGroupLabelsIndexedDefault => "IsGroupLabelsIndexedDefault",
            Property::IsTablesPersistentDefault => "IsTablesPersistentDefault",
            Property::IsReadOnlyDefault => "IsReadOnlyDefault",
            Property::IsSupportsNullsDefault => "IsSupportsNullsDefault",
            Property::IsEnforceDataTypeDefault => "IsEnforceDataTypeDefault",
            Property::Derivation => "Derivation",
            Property::DataType => "DataType",
            Property::CellValue => "CellValue",
            Property::ErrorMessage => "ErrorMessage",
            Property::Units => "Units",
            Property::DisplayFormat => "DisplayFormat",
            Property::CellValidator => "CellValidator",
        }
    }

    /// Short form used in compact serializations and logs.
    pub fn nickname(&self) -> &'static str {
        self.info().nickname.unwrap_or_else(|| self.name())
    }

    pub fn is_optional(&self) -> bool {
        self.info().optional
    }

    pub fn is_required(&self) -> bool {
        !self.is_optional()
    }

    pub fn is_read_only(&self) -> bool {
        self.info().read_only
    }

    pub fn is_mutable(&self) -> bool {
        !self.is_read_only()
    }

    pub fn is_initializable(&self) -> bool {
        self.info().initializable
    }

    /// The state flag this property seeds on initialization, if any.
    pub fn state_flag(&self) -> Option<ElementState> {
        self.info().state
    }

    pub fn is_implemented_by(&self, et: ElementType) -> bool {
        let implemented_by = self.info().implemented_by;
        implemented_by.is_empty() || implemented_by.contains(&et)
    }

    pub fn is_boolean(&self) -> bool {
        self.name().starts_with("Is")
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Property::Precision
                | Property::RowCapacityIncr
                | Property::ColumnCapacityIncr
                | Property::FreeSpaceThreshold
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Property::Label | Property::Description | Property::Units | Property::DisplayFormat
        )
    }

    /// Case-insensitive lookup by property name.
    pub fn by_name(name: &str) -> Option<Property> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let lower = name.to_ascii_lowercase();
        Property::ALL
            .iter()
            .copied()
            .find(|p| p.name().to_ascii_lowercase() == lower)
    }

    /// Case-insensitive lookup by nickname (falls back to full names).
    pub fn by_nickname(nickname: &str) -> Option<Property> {
        static BY_NICKNAME: OnceLock<HashMap<String, Property>> = OnceLock::new();
        let map = BY_NICKNAME.get_or_init(|| {
            Property::ALL
                .iter()
                .map(|p| (p.nickname().to_ascii_lowercase(), *p))
                .collect()
        });
        let key = nickname.trim().to_ascii_lowercase();
        map.get(&key).copied().or_else(|| Property::by_name(nickname))
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalize a user-supplied text property key: trim, lower-case, collapse
/// internal whitespace. Returns `None` for keys that normalize to nothing.
pub fn normalize_key(key: &str) -> Option<String> {
    let normalized = key
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    if normalized.is_empty() { None } else { Some(normalized) }
}

/// Per-element property store.
///
/// Holds typed values keyed by [`Property`] plus a user map keyed by
/// normalized strings. The typed side enforces property metadata for the
/// owning element type: unimplemented keys are rejected on every path,
/// read-only keys are rejected on the mutable path but writable through
/// [`PropertyMap::initialize`].
#[derive(Debug, Clone)]
pub struct PropertyMap {
    element_type: ElementType,
    known: HashMap<Property, Value>,
    custom: HashMap<String, Value>,
}

impl PropertyMap {
    pub fn new(element_type: ElementType) -> Self {
        PropertyMap {
            element_type,
            known: HashMap::new(),
            custom: HashMap::new(),
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn implements(&self, key: Property) -> bool {
        key.is_implemented_by(self.element_type)
    }

    fn vet(&self, key: Property, for_mutable_op: bool) -> Result<(), PropertyError> {
        if !self.implements(key) {
            return Err(PropertyError::Unimplemented {
                elem: self.element_type,
                key,
            });
        }
        if for_mutable_op && key.is_read_only() {
            return Err(PropertyError::ReadOnly {
                elem: self.element_type,
                key,
            });
        }
        Ok(())
    }

    /// Set a mutable property, returning the previous value.
    pub fn set(&mut self, key: Property, value: Value) -> Result<Option<Value>, PropertyError> {
        self.vet(key, true)?;
        Ok(self.known.insert(key, value))
    }

    /// Set a property on the initialization path (read-only keys allowed).
    pub fn initialize(
        &mut self,
        key: Property,
        value: Value,
    ) -> Result<Option<Value>, PropertyError> {
        self.vet(key, false)?;
        Ok(self.known.insert(key, value))
    }

    /// Remove a mutable property; true if it was present.
    pub fn clear(&mut self, key: Property) -> Result<bool, PropertyError> {
        self.vet(key, true)?;
        Ok(self.known.remove(&key).is_some())
    }

    pub fn get(&self, key: Property) -> Option<&Value> {
        self.known.get(&key)
    }

    /// Whether the property is present. Required properties of the element
    /// type count as present even before they are set.
    pub fn has(&self, key: Property) -> bool {
        if !self.implements(key) {
            return false;
        }
        key.is_required() || self.known.contains_key(&key)
    }

    pub fn set_text(&mut self, key: &str, value: Value) -> Result<Option<Value>, PropertyError> {
        let key = normalize_key(key).ok_or_else(|| PropertyError::InvalidKey(key.to_string()))?;
        Ok(self.custom.insert(key, value))
    }

    pub fn get_text(&self, key: &str) -> Option<&Value> {
        let key = normalize_key(key)?;
        self.custom.get(&key)
    }

    pub fn clear_text(&mut self, key: &str) -> bool {
        match normalize_key(key) {
            Some(key) => self.custom.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn has_text(&self, key: &str) -> bool {
        self.get_text(key).is_some()
    }

    /// Drop every stored value. Called when the owning element is deleted.
    pub fn reset(&mut self) {
        self.known.clear();
        self.custom.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_falls_back_to_name() {
        assert_eq!(Property::Label.nickname(), "lb");
        assert_eq!(Property::RowCapacityIncr.nickname(), "rci");
    }

    #[test]
    fn test_by_name_is_case_insensitive() {
        assert_eq!(Property::by_name("label"), Some(Property::Label));
        assert_eq!(Property::by_name("  DATATYPE "), Some(Property::DataType));
        assert_eq!(Property::by_name("nope"), None);
        assert_eq!(Property::by_name(""), None);
    }

    #[test]
    fn test_by_nickname_accepts_full_names_too() {
        assert_eq!(Property::by_nickname("fx"), Some(Property::Derivation));
        assert_eq!(Property::by_nickname("RCI"), Some(Property::RowCapacityIncr));
        assert_eq!(Property::by_nickname("Units"), Some(Property::Units));
    }

    #[test]
    fn test_classifications() {
        assert!(Property::IsReadOnlyDefault.is_boolean());
        assert!(!Property::Label.is_boolean());
        assert!(Property::FreeSpaceThreshold.is_numeric());
        assert!(Property::DisplayFormat.is_string());
    }

    #[test]
    fn test_implemented_by() {
        assert!(Property::Label.is_implemented_by(ElementType::Cell));
        assert!(Property::CellValue.is_implemented_by(ElementType::Cell));
        assert!(!Property::CellValue.is_implemented_by(ElementType::Row));
        assert!(!Property::Ident.is_implemented_by(ElementType::Cell));
    }

    #[test]
    fn test_map_rejects_unimplemented_and_read_only() {
        let mut props = PropertyMap::new(ElementType::Row);

        let err = props.set(Property::CellValue, Value::Int(1)).unwrap_err();
        assert!(matches!(err, PropertyError::Unimplemented { .. }));

        let err = props.set(Property::Uuid, Value::Int(1)).unwrap_err();
        assert!(matches!(err, PropertyError::ReadOnly { .. }));

        // The initialization path may write read-only keys.
        assert!(props.initialize(Property::Ident, Value::Int(1001)).is_ok());
    }

    #[test]
    fn test_required_properties_count_as_present() {
        let props = PropertyMap::new(ElementType::Table);
        assert!(props.has(Property::RowCapacityIncr));
        assert!(!props.has(Property::Label));
        assert!(!props.has(Property::CellValue)); // not implemented by Table
    }

    #[test]
    fn test_text_keys_are_normalized() {
        let mut props = PropertyMap::new(ElementType::Table);
        props
            .set_text("  My   Key ", Value::Text("v".into()))
            .unwrap();
        assert_eq!(
            props.get_text("my key"),
            Some(&Value::Text("v".into()))
        );
        assert!(props.clear_text("MY  KEY"));
        assert!(!props.has_text("my key"));

        assert!(matches!(
            props.set_text("   ", Value::Int(0)),
            Err(PropertyError::InvalidKey(_))
        ));
    }
}

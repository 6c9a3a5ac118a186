//! Table cells.
//!
//! Cells are deliberately small: most cells only ever hold a value, so the
//! property map is boxed and created on first use, and cells carry no ident.

use tabulon_engine::validate::SharedValidator;
use tabulon_engine::{ElementState, ElementType, ErrorResult, Property, PropertyMap, Value};

/// A single table cell.
#[derive(Default)]
pub struct Cell {
    state: ElementState,
    value: Option<Value>,
    error: Option<ErrorResult>,
    validator: Option<SharedValidator>,
    props: Option<Box<PropertyMap>>,
}

impl Cell {
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// The calculation error posted to this cell, if any.
    pub fn error(&self) -> Option<&ErrorResult> {
        self.error.as_ref()
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

    pub fn is_derived(&self) -> bool {
        self.state.is_set(ElementState::IS_DERIVED)
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_set(ElementState::IS_PENDING)
    }

    pub fn validator(&self) -> Option<&SharedValidator> {
        self.validator.as_ref()
    }

    pub fn set_validator(&mut self, validator: Option<SharedValidator>) {
        self.state
            .assign(ElementState::HAS_CELL_VALIDATOR, validator.is_some());
        self.validator = validator;
    }

    pub fn label(&self) -> Option<&str> {
        self.props
            .as_ref()
            .and_then(|p| p.get(Property::Label))
            .and_then(Value::as_text)
    }

    /// The cell's property map, created on first use.
    pub fn props_mut(&mut self) -> &mut PropertyMap {
        self.props
            .get_or_insert_with(|| Box::new(PropertyMap::new(ElementType::Cell)))
    }

    pub fn props(&self) -> Option<&PropertyMap> {
        self.props.as_deref()
    }

    /// Store a new value, clearing any posted error. Returns whether the
    /// stored value actually changed.
    pub(crate) fn store(&mut self, value: Option<Value>) -> bool {
        let changed = self.value != value;
        self.value = value;
        self.error = None;
        self.state.remove(ElementState::HAS_CELL_ERROR);
        changed
    }

    /// Post a calculation error; the value becomes null.
    pub(crate) fn post_error(&mut self, error: ErrorResult) {
        self.value = None;
        self.state.insert(ElementState::HAS_CELL_ERROR);
        if let Some(props) = self.props.as_deref_mut() {
            let _ = props.set(
                Property::ErrorMessage,
                Value::Text(error.to_string()),
            );
        }
        self.error = Some(error);
    }

    pub(crate) fn set_derived(&mut self, on: bool) {
        self.state.assign(ElementState::IS_DERIVED, on);
    }

    pub(crate) fn set_pending(&mut self, on: bool) {
        self.state.assign(ElementState::IS_PENDING, on);
    }

}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("value", &self.value)
            .field("error", &self.error)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

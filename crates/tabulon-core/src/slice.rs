//! Shared behavior of row/column slices.
//!
//! Rows and columns are distinct types with identical addressing behavior;
//! this internal trait lets the table resolve either axis through one code
//! path.

use std::collections::HashSet;

use uuid::Uuid;

use tabulon_engine::{DataType, ElementState, ElementType, PropertyMap, Tag};

pub(crate) trait Slice {
    fn element_type() -> ElementType;
    fn ident(&self) -> u64;
    /// 1-based position within the table.
    fn index(&self) -> usize;
    fn set_index(&mut self, index: usize);
    fn label(&self) -> Option<&str>;
    fn description(&self) -> Option<&str>;
    fn uuid(&self) -> Uuid;
    fn props(&self) -> &PropertyMap;
    fn tag_set(&self) -> &HashSet<Tag>;

    /// Declared datatype; only columns have one.
    fn datatype(&self) -> Option<DataType> {
        None
    }
}

/// Copy the initializable properties a new slice inherits from its table,
/// seeding state flags for the boolean defaults.
pub(crate) fn seed_slice_properties(
    props: &mut PropertyMap,
    state: &mut ElementState,
    seed: &PropertyMap,
) {
    for p in props.element_type().initializable_properties() {
        let Some(value) = seed.get(p) else { continue };
        let value = value.clone();
        if let (Some(flag), Some(on)) = (p.state_flag(), value.as_bool()) {
            state.assign(flag, on);
        }
        let _ = props.initialize(p, value);
    }
}

//! tabulon-engine - element substrate for the Tabulon table model.
//!
//! This crate defines everything the document model in `tabulon-core` is
//! built from:
//!
//! - [`ElementType`], [`ElementState`] - element taxonomy and state flags
//! - [`Property`], [`PropertyMap`] - property metadata and per-element stores
//! - [`Value`], [`DataType`] - cell values and their datatypes
//! - [`Tag`] - normalized tag labels
//! - [`Access`] - row/column/group/table resolution modes
//! - [`EventType`], [`TableEventListener`] - the event taxonomy
//! - [`CellValidator`], [`CellTransformer`] - value validation/transformation
//! - [`ErrorCode`], [`ErrorResult`], [`Derivation`] - computation primitives

pub mod access;
pub mod compute;
pub mod element;
pub mod event;
pub mod property;
pub mod state;
pub mod tag;
pub mod validate;
pub mod value;

pub use access::Access;
pub use compute::{Derivation, ErrorCode, ErrorResult};
pub use element::{ElementRef, ElementType, next_element_ident};
pub use event::{BlockedRequest, EventType, TableElementEvent, TableEventListener, listener};
pub use property::PropertyError;
pub use property::{Property, PropertyMap};
pub use state::ElementState;
pub use tag::Tag;
pub use validate::{
    CellTransformer, CellValidator, ConstraintViolation, NumericRange, NumericRangeRequired,
    SharedValidator,
};
pub use value::{DataType, Value};

pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;

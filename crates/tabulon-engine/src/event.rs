//! Event taxonomy and listener interface.
//!
//! Before-events (`OnBefore*`) fire while a request is still revocable: a
//! listener may veto by returning [`BlockedRequest`], and the triggering
//! operation then fails without changing state. All other events are
//! notifications after the fact.

use std::fmt;

use thiserror::Error;

use crate::element::{ElementRef, ElementType};
use crate::value::Value;

/// Raised by a listener to veto a before-event.
#[derive(Debug, Error, Clone, Default, PartialEq)]
#[error("request blocked by event listener")]
pub struct BlockedRequest;

/// The kinds of events elements emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    OnBeforeCreate,
    OnBeforeDelete,
    OnBeforeNewValue,
    OnNewValue,
    OnCreate,
    OnDelete,
    OnPendings,
    OnNoPendings,
    OnRecalculate,
}

impl EventType {
    pub const ALL: [EventType; 9] = [
        EventType::OnBeforeCreate,
        EventType::OnBeforeDelete,
        EventType::OnBeforeNewValue,
        EventType::OnNewValue,
        EventType::OnCreate,
        EventType::OnDelete,
        EventType::OnPendings,
        EventType::OnNoPendings,
        EventType::OnRecalculate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventType::OnBeforeCreate => "OnBeforeCreate",
            EventType::OnBeforeDelete => "OnBeforeDelete",
            EventType::OnBeforeNewValue => "OnBeforeNewValue",
            EventType::OnNewValue => "OnNewValue",
            EventType::OnCreate => "OnCreate",
            EventType::OnDelete => "OnDelete",
            EventType::OnPendings => "OnPendings",
            EventType::OnNoPendings => "OnNoPendings",
            EventType::OnRecalculate => "OnRecalculate",
        }
    }

    /// Before-events may veto the triggering request.
    pub fn is_vetoable(&self) -> bool {
        matches!(
            self,
            EventType::OnBeforeCreate | EventType::OnBeforeDelete | EventType::OnBeforeNewValue
        )
    }

    /// Whether the event also notifies listeners on the parent element.
    pub fn is_notify_parent(&self) -> bool {
        !matches!(self, EventType::OnBeforeCreate)
    }

    pub fn is_implemented_by(&self, et: ElementType) -> bool {
        use ElementType::{Cell, Column, Group, Row, Table};
        let implemented: &[ElementType] = match self {
            EventType::OnBeforeCreate | EventType::OnBeforeDelete => {
                &[Table, Group, Row, Column]
            }
            EventType::OnCreate | EventType::OnDelete => &[Table, Group, Row, Column],
            EventType::OnBeforeNewValue | EventType::OnNewValue => &[Table, Row, Column, Cell],
            EventType::OnPendings | EventType::OnNoPendings | EventType::OnRecalculate => {
                &[Table, Row, Column, Cell]
            }
        };
        implemented.contains(&et)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single event raised by a table element.
#[derive(Clone, Debug, PartialEq)]
pub struct TableElementEvent {
    pub event_type: EventType,
    /// The element the event concerns.
    pub source: ElementRef,
    /// New value for value events, otherwise `None`.
    pub value: Option<Value>,
}

impl TableElementEvent {
    pub fn new(event_type: EventType, source: ElementRef) -> Self {
        TableElementEvent {
            event_type,
            source,
            value: None,
        }
    }

    pub fn with_value(event_type: EventType, source: ElementRef, value: Option<Value>) -> Self {
        TableElementEvent {
            event_type,
            source,
            value,
        }
    }
}

/// Receives events from table elements.
///
/// `event_occurred` returns `Err(BlockedRequest)` to veto a vetoable event;
/// the return value is ignored for notification events.
pub trait TableEventListener {
    fn event_occurred(&self, event: &TableElementEvent) -> Result<(), BlockedRequest>;
}

impl<F> TableEventListener for F
where
    F: Fn(&TableElementEvent) -> Result<(), BlockedRequest>,
{
    fn event_occurred(&self, event: &TableElementEvent) -> Result<(), BlockedRequest> {
        self(event)
    }
}

/// Box a closure as an event listener.
pub fn listener<F>(f: F) -> Box<dyn TableEventListener>
where
    F: Fn(&TableElementEvent) -> Result<(), BlockedRequest> + 'static,
{
    Box::new(f)
}

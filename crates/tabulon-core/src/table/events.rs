//! Event listener registration and dispatch.
//!
//! Dispatch is synchronous in the mutating caller. Listeners registered for
//! a vetoable event type can block the request; blocking a notification
//! event has no effect.

use tabulon_engine::{ElementRef, EventType, TableElementEvent, TableEventListener, Value};

use crate::error::{Result, TableError};

use super::{ListenerEntry, Table};

/// Handle returned by [`Table::add_event_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl Table {
    /// Register a listener for one event type; returns a handle for
    /// [`Table::remove_event_listener`].
    pub fn add_event_listener(
        &mut self,
        event_type: EventType,
        listener: Box<dyn TableEventListener>,
    ) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push(ListenerEntry {
            id,
            event_type,
            listener,
        });
        ListenerId(id)
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id.0);
        self.listeners.len() != before
    }

    pub fn has_event_listeners(&self, event_type: EventType) -> bool {
        self.listeners
            .iter()
            .any(|entry| entry.event_type == event_type)
    }

    /// Fire a vetoable before-event; a blocking listener fails the request.
    pub(crate) fn fire_vetoable(&self, event_type: EventType, source: ElementRef) -> Result<()> {
        self.fire_vetoable_with_value(event_type, source, None)
    }

    pub(crate) fn fire_vetoable_with_value(
        &self,
        event_type: EventType,
        source: ElementRef,
        value: Option<Value>,
    ) -> Result<()> {
        let event = TableElementEvent::with_value(event_type, source, value);
        for entry in &self.listeners {
            if entry.event_type == event_type
                && entry.listener.event_occurred(&event).is_err()
            {
                return Err(TableError::Blocked);
            }
        }
        Ok(())
    }

    /// Fire a notification event; listener results are ignored.
    pub(crate) fn fire_notification(
        &self,
        event_type: EventType,
        source: ElementRef,
        value: Option<Value>,
    ) {
        if self.listeners.is_empty() {
            return;
        }
        let event = TableElementEvent::with_value(event_type, source, value);
        for entry in &self.listeners {
            if entry.event_type == event_type {
                let _ = entry.listener.event_occurred(&event);
            }
        }
    }
}

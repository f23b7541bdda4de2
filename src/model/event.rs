//! Events: specialization and passive listening
//!
//! The event source hands out generic `Event` handles; the concrete event
//! class is named by the event's own `type` property. [`Event::specialize`]
//! reinterprets the handle accordingly, restricted to event interfaces.

use std::ops::Deref;

use serde_json::Value;

use crate::error::{BridgeError, Result};
use crate::model::{property_string, Model, Property};

/// A generic event model
#[derive(Clone, Debug)]
pub struct Event {
    model: Model,
}

impl Event {
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The wire name of the event's concrete type.
    pub fn event_type(&self) -> Result<String> {
        property_string(&self.model, "type")
    }

    /// Reinterpret this event as the concrete class named by its `type`.
    ///
    /// Only event interfaces are acceptable targets; a `type` value that
    /// resolves outside the event namespace is an error.
    pub fn specialize(&self) -> Result<Model> {
        let model = self.model.reinterpret_by("type")?;
        if !model.class().name().ends_with("Event") {
            return Err(BridgeError::UnknownInterface(
                model.class().name().to_string(),
            ));
        }
        Ok(model)
    }
}

impl From<Model> for Event {
    fn from(model: Model) -> Self {
        Self { model }
    }
}

impl Deref for Event {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

/// An event source that can hand out listeners and events
#[derive(Clone, Debug)]
pub struct EventSource {
    model: Model,
}

impl EventSource {
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Create a new listener object on this source.
    pub fn create_listener(&self) -> Result<Model> {
        match self.model.call("create_listener", &[])? {
            Property::Model(listener) => Ok(listener),
            _ => Err(BridgeError::UnexpectedValue {
                model: "EventSource".to_string(),
                property: "create_listener".to_string(),
                expected: "a listener handle",
            }),
        }
    }

    /// Create and register a passive listener for the given event types.
    pub fn passive_listener(&self, event_types: &[&str]) -> Result<PassiveEventListener> {
        let listener = self.create_listener()?;
        let listener_handle = listener.handle().ok_or(BridgeError::Unbound {
            model: "EventListener".to_string(),
        })?;
        let types: Vec<Value> = event_types.iter().map(|t| Value::from(*t)).collect();
        self.model.call(
            "register_listener",
            &[listener_handle.to_value(), Value::Array(types), Value::Bool(false)],
        )?;
        Ok(PassiveEventListener {
            source: self.clone(),
            model: listener,
        })
    }
}

impl From<Model> for EventSource {
    fn from(model: Model) -> Self {
        Self { model }
    }
}

impl Deref for EventSource {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

/// A registered passive listener, polled through its source
#[derive(Clone, Debug)]
pub struct PassiveEventListener {
    source: EventSource,
    model: Model,
}

impl PassiveEventListener {
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The next pending event, or `None` when the wait times out.
    ///
    /// A negative timeout blocks until an event arrives.
    pub fn get_event(&self, timeout_ms: i64) -> Result<Option<Event>> {
        let listener_handle = self.model.handle().ok_or(BridgeError::Unbound {
            model: "EventListener".to_string(),
        })?;
        match self.source.model.call(
            "get_event",
            &[listener_handle.to_value(), Value::from(timeout_ms)],
        )? {
            Property::Model(event) => Ok(Some(Event::from(event))),
            _ => Ok(None),
        }
    }

    /// Block until an event of one of the given types arrives.
    ///
    /// Events of other types are consumed and discarded along the way.
    pub fn wait_for(&self, event_types: &[&str]) -> Result<Event> {
        loop {
            if let Some(event) = self.get_event(-1)? {
                let event_type = event.event_type()?;
                if event_types.iter().any(|t| *t == event_type) {
                    return Ok(event);
                }
            }
        }
    }
}

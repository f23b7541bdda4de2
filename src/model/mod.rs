//! Lazily bound models over remote objects
//!
//! A [`Model`] gives attribute-style access to one remote object: property
//! reads and writes resolve against the verb-classified operations of the
//! class's backing interface, and handle-shaped results are wrapped into
//! further models whenever the property name resolves to a known interface.
//! Instances are shared through the per-context weak cache, so resolving the
//! same (class, handle) pair twice yields the same instance for as long as
//! the first one is alive.

pub mod event;
pub mod machine;
pub mod medium;
pub mod network;
pub mod registry;
pub mod session;
pub mod unattended;
pub mod virtualbox;
pub mod vrde;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::catalog::{Operation, ProxyInterface};
use crate::context::Context;
use crate::error::{BridgeError, Result};
use crate::handle::Handle;
use crate::naming;
use registry::ModelClass;

/// Shared state of one model instance; the unit the weak cache stores.
pub(crate) struct ModelShared {
    class: ModelClass,
    ctx: Context,
    interface: Option<Arc<ProxyInterface>>,
    handle: RwLock<Option<Handle>>,
}

impl ModelShared {
    fn new(class: ModelClass, ctx: Context, handle: Option<Handle>) -> Self {
        let interface = ctx
            .catalog()
            .interface(class.interface_name())
            .or_else(|| ctx.catalog().find_interface(class.interface_name()))
            .cloned();
        if interface.is_none() {
            debug!(
                class = class.name(),
                "no catalog interface resolved; attribute access will fail"
            );
        }
        Self {
            class,
            ctx,
            interface,
            handle: RwLock::new(handle),
        }
    }
}

/// Attribute-accessible wrapper around one remote object
#[derive(Clone)]
pub struct Model {
    shared: Arc<ModelShared>,
}

impl Model {
    /// Create or reuse the model for (class, handle).
    ///
    /// A model without a handle is always a fresh, uncached instance; bound
    /// models are shared through the context's weak cache.
    pub(crate) fn get_or_create(class: ModelClass, ctx: Context, handle: Option<Handle>) -> Model {
        let shared = match handle {
            None => Arc::new(ModelShared::new(class, ctx, None)),
            Some(handle) => {
                let raw = handle.as_str().to_string();
                ctx.cache().get_or_insert(&class, &raw, || {
                    Arc::new(ModelShared::new(
                        class.clone(),
                        ctx.clone(),
                        Some(handle.clone()),
                    ))
                })
            }
        };
        Model { shared }
    }

    pub fn class(&self) -> &ModelClass {
        &self.shared.class
    }

    pub fn ctx(&self) -> &Context {
        &self.shared.ctx
    }

    /// The backing interface, if the class name resolved against the catalog.
    pub fn interface(&self) -> Option<&Arc<ProxyInterface>> {
        self.shared.interface.as_ref()
    }

    /// The currently bound handle, if any.
    pub fn handle(&self) -> Option<Handle> {
        self.shared.handle.read().unwrap().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.shared.handle.read().unwrap().is_some()
    }

    /// Rebind the model to a new handle (or unbind it with `None`).
    ///
    /// All operations are resolved against the current handle at call time,
    /// so reassignment takes effect for every subsequent call.
    pub fn set_handle(&self, handle: Option<Handle>) {
        *self.shared.handle.write().unwrap() = handle;
    }

    /// Whether two models are the same cached instance.
    pub fn same_instance(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn attribute_error(&self, attribute: &str) -> BridgeError {
        BridgeError::AttributeNotFound {
            model: self.shared.class.name().to_string(),
            attribute: attribute.to_string(),
        }
    }

    fn require_interface(&self, attribute: &str) -> Result<&Arc<ProxyInterface>> {
        self.shared
            .interface
            .as_ref()
            .ok_or_else(|| self.attribute_error(attribute))
    }

    fn require_handle(&self) -> Result<Handle> {
        self.handle().ok_or_else(|| BridgeError::Unbound {
            model: self.shared.class.name().to_string(),
        })
    }

    fn invoke(&self, operation: &Operation, args: &[Value]) -> Result<Value> {
        let handle = self.require_handle()?;
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(handle.to_value());
        call_args.extend_from_slice(args);
        self.shared.ctx.invoke_operation(operation, &call_args)
    }

    /// Read a property through its getter, wrapping the parsed result.
    pub fn get(&self, property: &str) -> Result<Property> {
        let interface = self.require_interface(property)?;
        let getters = interface.getters();
        let operation = getters
            .get(property)
            .copied()
            .ok_or_else(|| self.attribute_error(property))?;
        let raw = self.invoke(operation, &[])?;
        Ok(self.parse_property(property, raw))
    }

    /// Write a property through its setter.
    pub fn set(&self, property: &str, value: Value) -> Result<()> {
        let interface = self.require_interface(property)?;
        let setters = interface.setters();
        let operation = setters
            .get(property)
            .copied()
            .ok_or_else(|| self.attribute_error(property))?;
        self.invoke(operation, &[value])?;
        Ok(())
    }

    /// Invoke any operation by local name, passing the handle implicitly.
    ///
    /// Getter, finder and creator results go through property parsing; other
    /// operations return their wire value untouched.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Property> {
        let interface = self.require_interface(method)?;
        let operation = interface
            .operation(method)
            .ok_or_else(|| self.attribute_error(method))?;
        let raw = self.invoke(operation, args)?;
        let parsed = ["get", "find", "create"]
            .iter()
            .any(|prefix| method.starts_with(prefix));
        if parsed {
            Ok(self.parse_property(method, raw))
        } else {
            Ok(Property::Value(raw))
        }
    }

    /// Snapshot every readable property.
    ///
    /// A getter the remote side rejects (a property not valid in the
    /// object's current state) is skipped rather than failing the snapshot.
    pub fn to_map(&self) -> BTreeMap<String, Property> {
        let mut info = BTreeMap::new();
        let Some(interface) = self.shared.interface.as_ref() else {
            return info;
        };
        for (property, operation) in interface.getters() {
            match self.invoke(operation, &[]) {
                Ok(raw) => {
                    let parsed = self.parse_property(&property, raw);
                    info.insert(property, parsed);
                }
                Err(error) => {
                    debug!(
                        class = self.shared.class.name(),
                        property = %property,
                        error = %error,
                        "skipping unreadable property"
                    );
                }
            }
        }
        info
    }

    /// Apply a mapping of property paths to values.
    ///
    /// A key may be a plain property name or a dot-separated path descending
    /// through nested models (`"vrde_server.enabled"`). Plain leaves invoke
    /// the setter; mapping leaves recurse into the nested model. One remote
    /// call is made per leaf; there is no rollback on partial failure.
    pub fn apply(&self, values: &serde_json::Map<String, Value>) -> Result<()> {
        for (path, value) in values {
            self.apply_path(path, value)?;
        }
        Ok(())
    }

    fn apply_path(&self, path: &str, value: &Value) -> Result<()> {
        if let Some((head, rest)) = path.split_once('.') {
            return self.nested_model(head)?.apply_path(rest, value);
        }
        match value {
            Value::Object(map) => self.nested_model(path)?.apply(map),
            other => self.set(path, other.clone()),
        }
    }

    fn nested_model(&self, property: &str) -> Result<Model> {
        match self.get(property)? {
            Property::Model(model) => Ok(model),
            _ => Err(BridgeError::NotAModel {
                model: self.shared.class.name().to_string(),
                property: property.to_string(),
            }),
        }
    }

    /// Reinterpret this model's handle as the class named by the *value* of
    /// one of its properties (an event's `type` names its concrete class).
    pub fn reinterpret_by(&self, property: &str) -> Result<Model> {
        let value = self.get(property)?;
        let Some(type_name) = value.as_str() else {
            return Err(BridgeError::UnexpectedValue {
                model: self.shared.class.name().to_string(),
                property: property.to_string(),
                expected: "an interface-naming string",
            });
        };
        let matched = self
            .shared
            .ctx
            .catalog()
            .match_interface_name(type_name)
            .ok_or_else(|| BridgeError::UnknownInterface(type_name.to_string()))?
            .to_string();
        let class = self.shared.ctx.registry().class(&matched);
        Ok(Model::get_or_create(
            class,
            self.shared.ctx.clone(),
            self.handle(),
        ))
    }

    /// Wrap a raw result: lists element-wise, mappings per key, scalars by
    /// the name/value agreement rule.
    fn parse_property(&self, name: &str, value: Value) -> Property {
        match value {
            Value::Array(items) => Property::List(
                items
                    .into_iter()
                    .map(|element| match element {
                        Value::Object(map) => Property::Map(
                            map.into_iter()
                                .map(|(key, nested)| {
                                    let parsed = self.model_from_key_value(&key, nested);
                                    (key, parsed)
                                })
                                .collect(),
                        ),
                        other => self.model_from_key_value(name, other),
                    })
                    .collect(),
            ),
            other => self.model_from_key_value(name, other),
        }
    }

    /// Promote a scalar to a model only when both signals agree: the key
    /// resolves to a known interface (per-class alias table first, then the
    /// fuzzy name match) AND the value itself is handle-shaped.
    fn model_from_key_value(&self, key: &str, value: Value) -> Property {
        let candidates = naming::get_matches(key);
        let catalog = self.shared.ctx.catalog();
        let resolved = match self.shared.class.property_alias(&candidates) {
            Some(alias) => catalog.match_interface_name(alias),
            None => catalog.match_interface_name(key),
        };

        match (resolved, value) {
            (Some(interface_name), Value::String(raw)) if Handle::matches_format(&raw) => {
                let class = self.shared.ctx.registry().class(interface_name);
                let handle = self.shared.ctx.handle(raw);
                Property::Model(Model::get_or_create(
                    class,
                    self.shared.ctx.clone(),
                    Some(handle),
                ))
            }
            (_, value) => Property::Value(value),
        }
    }
}

/// Read a property expected to carry a string value.
pub(crate) fn property_string(model: &Model, property: &str) -> Result<String> {
    let value = model.get(property)?;
    value
        .as_str()
        .map(String::from)
        .ok_or(BridgeError::UnexpectedValue {
            model: model.class().name().to_string(),
            property: property.to_string(),
            expected: "a string value",
        })
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("class", &self.shared.class.name())
            .field("handle", &self.handle())
            .finish()
    }
}

/// A parsed operation result
#[derive(Debug, Clone)]
pub enum Property {
    /// A handle-valued result promoted to a model
    Model(Model),
    /// A list result, elements parsed individually
    List(Vec<Property>),
    /// A mapping result, values parsed per key
    Map(BTreeMap<String, Property>),
    /// Any other wire value, unchanged
    Value(Value),
}

impl Property {
    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Property::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn into_model(self) -> Option<Model> {
        match self {
            Property::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Property::Value(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Property::Value(value) => value.as_i64(),
            _ => None,
        }
    }

    /// Flatten back to a wire value; models collapse to their handle string.
    pub fn to_value(&self) -> Value {
        match self {
            Property::Model(model) => model
                .handle()
                .map(|handle| handle.to_value())
                .unwrap_or(Value::Null),
            Property::List(items) => Value::Array(items.iter().map(Property::to_value).collect()),
            Property::Map(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_value()))
                    .collect(),
            ),
            Property::Value(value) => value.clone(),
        }
    }
}

impl Serialize for Property {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use serde_json::json;

    const M1: &str = "0000000000000001-000000000000aaaa";
    const M2: &str = "0000000000000002-000000000000aaaa";

    fn machine_context() -> Context {
        let transport = ScriptedTransport::new()
            .returning("IVirtualBox_getMachines", json!([M1, M2]))
            .returning("IMachine_getName", json!("alpha"))
            .returning("IManagedObjectRef_getInterfaceName", json!("IMachine"))
            .returning("IManagedObjectRef_release", json!(null));
        Context::new(Arc::new(transport))
    }

    #[test]
    fn test_cached_instances_are_identical() {
        let ctx = machine_context();
        let class = ctx.registry().class("Machine");
        let handle = ctx.handle(M1);

        let first = Model::get_or_create(class.clone(), ctx.clone(), Some(handle.clone()));
        let second = Model::get_or_create(class, ctx.clone(), Some(handle));
        assert!(first.same_instance(&second));
    }

    #[test]
    fn test_unbound_models_are_never_shared() {
        let ctx = machine_context();
        let class = ctx.registry().class("Machine");

        let first = Model::get_or_create(class.clone(), ctx.clone(), None);
        let second = Model::get_or_create(class, ctx.clone(), None);
        assert!(!first.same_instance(&second));
        assert_eq!(ctx.cache().live(), 0);
    }

    #[test]
    fn test_cache_does_not_keep_models_alive() {
        let ctx = machine_context();
        let class = ctx.registry().class("Machine");

        let model = Model::get_or_create(class.clone(), ctx.clone(), Some(ctx.handle(M1)));
        assert_eq!(ctx.cache().live(), 1);
        drop(model);
        assert_eq!(ctx.cache().live(), 0);

        // A later resolution constructs a fresh instance.
        let again = Model::get_or_create(class, ctx.clone(), Some(ctx.handle(M1)));
        assert!(again.is_bound());
    }

    #[test]
    fn test_parse_property_promotes_matching_handles() {
        let ctx = machine_context();
        let vbox = ctx.model_by_name("VirtualBox", Some(ctx.handle(M1)));

        let parsed = vbox.parse_property("machines", json!([M1, M2]));
        let Property::List(items) = parsed else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 2);
        for item in &items {
            let model = item.as_model().expect("handles must become models");
            assert_eq!(model.class().name(), "Machine");
        }
    }

    #[test]
    fn test_parse_property_leaves_non_handles_alone() {
        let ctx = machine_context();
        let vbox = ctx.model_by_name("VirtualBox", Some(ctx.handle(M1)));

        // Name matches an interface but the value is not handle-shaped.
        let parsed = vbox.parse_property("machines", json!(["just-a-string"]));
        let Property::List(items) = parsed else {
            panic!("expected a list");
        };
        assert!(items[0].as_model().is_none());

        // Value is handle-shaped but the name matches no interface.
        let parsed = vbox.parse_property("recent_ids", json!(M1));
        assert!(parsed.as_model().is_none());
    }

    #[test]
    fn test_parse_property_maps_per_key() {
        let ctx = machine_context();
        let vbox = ctx.model_by_name("VirtualBox", Some(ctx.handle(M1)));

        let parsed = vbox.parse_property(
            "attachments",
            json!([{"machine": M1, "slot": 3}]),
        );
        let Property::List(items) = parsed else {
            panic!("expected a list");
        };
        let Property::Map(entry) = &items[0] else {
            panic!("expected a mapping element");
        };
        assert!(entry["machine"].as_model().is_some());
        assert_eq!(entry["slot"].as_i64(), Some(3));
    }

    #[test]
    fn test_property_to_value_round_trip() {
        let ctx = machine_context();
        let vbox = ctx.model_by_name("VirtualBox", Some(ctx.handle(M1)));

        let parsed = vbox.parse_property("machines", json!([M1, M2]));
        assert_eq!(parsed.to_value(), json!([M1, M2]));
    }
}

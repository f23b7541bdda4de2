//! Session context: the composition root threaded through every operation
//!
//! A [`Context`] ties together one connected transport, the catalog built
//! from it, the model class registry and the weak model cache, plus the
//! top-level handle obtained at login. Every [`Handle`](crate::Handle) and
//! [`Model`](crate::Model) carries a clone, so all objects created under one
//! login share one consistent view of the connection.
//!
//! The model cache lives here rather than in a global, so two contexts can
//! never alias each other's models even when the remote side hands both the
//! same reference string.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::{Catalog, Operation};
use crate::error::{BridgeError, Result};
use crate::handle::Handle;
use crate::model::registry::{ModelCache, ModelClass, ModelRegistry};
use crate::model::session::Session;
use crate::model::Model;
use crate::naming::ResolverConfig;
use crate::transport::Transport;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Shared, value-like state of one connected session
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: u64,
    transport: Arc<dyn Transport>,
    catalog: Catalog,
    registry: ModelRegistry,
    cache: ModelCache,
    api_handle: RwLock<Option<String>>,
}

impl Context {
    /// Connect with the default naming configuration.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, ResolverConfig::default())
    }

    /// Build the catalog from the transport and assemble the context.
    pub fn with_config(transport: Arc<dyn Transport>, config: ResolverConfig) -> Self {
        let catalog = Catalog::from_transport(transport.as_ref(), config);
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            context = id,
            interfaces = catalog.len(),
            "connected to remote catalog"
        );
        Self {
            inner: Arc::new(ContextInner {
                id,
                transport,
                catalog,
                registry: ModelRegistry::new(),
                cache: ModelCache::new(),
                api_handle: RwLock::new(None),
            }),
        }
    }

    /// Identifier distinguishing concurrently connected contexts.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.inner.registry
    }

    pub(crate) fn cache(&self) -> &ModelCache {
        &self.inner.cache
    }

    /// Wrap a raw reference string as a handle bound to this context.
    pub fn handle(&self, raw: impl Into<String>) -> Handle {
        Handle::new(self.clone(), raw.into())
    }

    /// The top-level handle obtained at login, if logged in.
    pub fn api_handle(&self) -> Option<Handle> {
        self.inner
            .api_handle
            .read()
            .unwrap()
            .as_ref()
            .map(|raw| self.handle(raw.clone()))
    }

    pub(crate) fn set_api_handle(&self, raw: Option<String>) {
        *self.inner.api_handle.write().unwrap() = raw;
    }

    /// Invoke `method` on `interface` by local names.
    pub fn invoke(&self, interface: &str, method: &str, args: &[Value]) -> Result<Value> {
        let proxy = self
            .catalog()
            .interface(interface)
            .ok_or_else(|| BridgeError::UnknownInterface(interface.to_string()))?;
        let operation = proxy
            .operation(method)
            .ok_or_else(|| BridgeError::AttributeNotFound {
                model: interface.to_string(),
                attribute: method.to_string(),
            })?;
        self.invoke_operation(operation, args)
    }

    /// Invoke a resolved operation; the single remote-call path.
    pub fn invoke_operation(&self, operation: &Operation, args: &[Value]) -> Result<Value> {
        debug!(
            context = self.inner.id,
            operation = operation.wire_name(),
            "invoking remote operation"
        );
        Ok(self.inner.transport.invoke(operation.wire_name(), args)?)
    }

    /// Ask the remote side which interface a handle was created from.
    ///
    /// Returns `None` for an invalid or unknown handle, or on any remote
    /// failure; the wire-level `I` prefix is stripped.
    pub fn interface_name_for_handle(&self, handle: &Handle) -> Option<String> {
        match self.invoke("ManagedObjectRef", "get_interface_name", &[handle.to_value()]) {
            Ok(Value::String(name)) if !name.is_empty() => {
                Some(name.strip_prefix('I').unwrap_or(&name).to_string())
            }
            _ => None,
        }
    }

    /// The model for (class, handle), cached when a handle is present.
    pub fn model(&self, class: ModelClass, handle: Option<Handle>) -> Model {
        Model::get_or_create(class, self.clone(), handle)
    }

    /// Convenience: resolve the class by name, then the model.
    pub fn model_by_name(&self, class_name: &str, handle: Option<Handle>) -> Model {
        let class = self.registry().class(class_name);
        self.model(class, handle)
    }

    /// A fresh session helper for lock/launch workflows.
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use serde_json::json;

    const H: &str = "00000000000000aa-00000000000000bb";

    #[test]
    fn test_invoke_resolves_local_names() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .returning("IManagedObjectRef_getInterfaceName", json!("IMachine")),
        );
        let ctx = Context::with_config(transport.clone(), ResolverConfig::default());

        let name = ctx.interface_name_for_handle(&ctx.handle(H));
        assert_eq!(name.as_deref(), Some("Machine"));
        assert_eq!(transport.calls_to("IManagedObjectRef_getInterfaceName"), 1);
    }

    #[test]
    fn test_invoke_unknown_interface_errors() {
        let ctx = Context::new(Arc::new(ScriptedTransport::new()));
        assert!(matches!(
            ctx.invoke("Machine", "get_name", &[]),
            Err(BridgeError::UnknownInterface(_))
        ));
    }

    #[test]
    fn test_handle_validity_follows_remote_answer() {
        let transport = ScriptedTransport::new()
            .failing("IManagedObjectRef_getInterfaceName", "invalid object reference");
        let ctx = Context::new(Arc::new(transport));
        assert!(!ctx.handle(H).is_valid());
    }

    #[test]
    fn test_contexts_have_distinct_ids() {
        let a = Context::new(Arc::new(ScriptedTransport::new()));
        let b = Context::new(Arc::new(ScriptedTransport::new()));
        assert_ne!(a.id(), b.id());
    }
}

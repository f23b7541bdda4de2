//! Transport boundary: the injected wire client the bridge drives
//!
//! The bridge never speaks SOAP (or anything else) itself. A [`Transport`]
//! supplies the set of wire operation names discovered at connection time and
//! performs one blocking remote call per [`Transport::invoke`]. Everything
//! above this trait works purely in terms of operation names, handles and
//! [`serde_json::Value`]s.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by a transport implementation
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("remote fault from '{operation}': {message}")]
    Fault { operation: String, message: String },

    #[error("operation '{0}' is not part of the connected service")]
    UnknownOperation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A blocking client for one connected remote service.
///
/// Implementations are expected to be cheap to share behind an `Arc` and to
/// keep whatever connection state they need internally. Timeouts and retry
/// policy belong to the implementation, not to the bridge.
pub trait Transport: Send + Sync {
    /// Wire-level operation names, e.g. `IVirtualBox_getMachines`.
    ///
    /// Called once while building the catalog; the set is treated as fixed
    /// for the lifetime of the connection.
    fn operation_names(&self) -> Vec<String>;

    /// Perform one named remote operation.
    ///
    /// `args` are positional; for instance-level operations the first
    /// argument is the handle of the object the call is directed at.
    fn invoke(&self, operation: &str, args: &[Value]) -> Result<Value, TransportError>;
}

type Handler = Box<dyn Fn(&[Value]) -> Result<Value, TransportError> + Send + Sync>;

/// In-memory transport scripted with canned operation handlers.
///
/// Used by the test suite and handy for demos: each registered operation maps
/// to a closure producing the wire result, and every invocation is recorded
/// so tests can assert on call counts and arguments.
#[derive(Default)]
pub struct ScriptedTransport {
    handlers: BTreeMap<String, Handler>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a wire operation name.
    pub fn operation<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
        self
    }

    /// Register an operation that always returns the same value.
    pub fn returning(self, name: &str, value: Value) -> Self {
        self.operation(name, move |_| Ok(value.clone()))
    }

    /// Register an operation that always fails with a remote fault.
    pub fn failing(self, name: &str, message: &str) -> Self {
        let operation = name.to_string();
        let message = message.to_string();
        self.operation(name, move |_| {
            Err(TransportError::Fault {
                operation: operation.clone(),
                message: message.clone(),
            })
        })
    }

    /// All invocations so far, in order.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }

    /// Number of invocations of one wire operation.
    pub fn calls_to(&self, operation: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == operation)
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn operation_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    fn invoke(&self, operation: &str, args: &[Value]) -> Result<Value, TransportError> {
        self.log
            .lock()
            .unwrap()
            .push((operation.to_string(), args.to_vec()));
        match self.handlers.get(operation) {
            Some(handler) => handler(args),
            None => Err(TransportError::UnknownOperation(operation.to_string())),
        }
    }
}

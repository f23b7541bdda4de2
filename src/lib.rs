/*!
 * vbox-bridge: typed, handle-based access to the VirtualBox web service API
 *
 * The web service exposes hundreds of interfaces whose objects are addressed
 * by opaque reference strings. This crate turns that catalog into a local
 * object model:
 * - naming translation between the wire convention and the local convention,
 *   with fuzzy matching from property names back to interface names
 * - a per-connection catalog classifying operations into getters, setters,
 *   finders and creators
 * - handles that carry their session context and compare by raw value
 * - lazily bound models with identity-stable weak caching, automatic
 *   wrapping of handle-valued results and dotted-path bulk mutation
 *
 * The wire transport itself is injected: anything implementing [`Transport`]
 * (a SOAP client, a test double) drives the bridge.
 */

pub mod catalog;
pub mod context;
pub mod enums;
pub mod error;
pub mod handle;
pub mod model;
pub mod naming;
pub mod transport;

// Re-export commonly used types
pub use catalog::{Catalog, Operation, ProxyInterface};
pub use context::Context;
pub use enums::{AccessMode, LockType, MachineFrontend, MediumDeviceType, SessionState};
pub use error::{BridgeError, Result};
pub use handle::Handle;
pub use model::event::{Event, EventSource, PassiveEventListener};
pub use model::machine::{Machine, MachineLock};
pub use model::medium::Medium;
pub use model::network::NetworkAdapter;
pub use model::registry::{ClassSpec, ModelClass, ModelRegistry};
pub use model::session::Session;
pub use model::unattended::Unattended;
pub use model::virtualbox::VirtualBox;
pub use model::vrde::VRDEServer;
pub use model::{Model, Property};
pub use naming::ResolverConfig;
pub use transport::{ScriptedTransport, Transport, TransportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}

//! Catalog of remote interfaces and their classified operations
//!
//! Built once per connection from the transport's wire operation names. Each
//! `IFoo_barBaz` entry becomes method `bar_baz` on interface `Foo`; the
//! verb-prefixed views (`getters`, `setters`, `finders`, `creators`) are
//! derived from the live method map on every access rather than stored.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::naming::ResolverConfig;
use crate::transport::Transport;

/// One remote operation, addressable by its wire name
#[derive(Debug, Clone)]
pub struct Operation {
    wire_name: String,
}

impl Operation {
    /// Full wire operation name, e.g. `IMachine_getName`.
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }
}

/// The local view of one remote interface: its operations under local names
#[derive(Debug)]
pub struct ProxyInterface {
    name: String,
    wire_name: String,
    methods: BTreeMap<String, Operation>,
}

impl ProxyInterface {
    /// Local interface name, e.g. `Machine`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire interface name, e.g. `IMachine`.
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// All operations, keyed by local method name.
    pub fn methods(&self) -> &BTreeMap<String, Operation> {
        &self.methods
    }

    /// Look up one operation by local method name.
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.methods.get(name)
    }

    /// Property getters, keyed by property name (`get_name` -> `name`).
    pub fn getters(&self) -> BTreeMap<String, &Operation> {
        self.with_prefix("get")
    }

    /// Property setters, keyed by property name.
    pub fn setters(&self) -> BTreeMap<String, &Operation> {
        self.with_prefix("set")
    }

    /// Finder operations, keyed by target name (`find_machine` -> `machine`).
    pub fn finders(&self) -> BTreeMap<String, &Operation> {
        self.with_prefix("find")
    }

    /// Factory operations, keyed by target name.
    pub fn creators(&self) -> BTreeMap<String, &Operation> {
        self.with_prefix("create")
    }

    fn with_prefix(&self, prefix: &str) -> BTreeMap<String, &Operation> {
        self.methods
            .iter()
            .filter_map(|(name, op)| {
                name.strip_prefix(prefix)
                    .map(|rest| (rest.trim_start_matches('_').to_string(), op))
            })
            .collect()
    }
}

/// All interfaces of one connected service
pub struct Catalog {
    interfaces: BTreeMap<String, Arc<ProxyInterface>>,
    config: ResolverConfig,
}

impl Catalog {
    /// Build the catalog by introspecting the transport's operation names.
    ///
    /// Operation names that do not follow the `IInterface_method` shape are
    /// ignored; method names are converted to the local convention using the
    /// configured exclusions.
    pub fn from_transport(transport: &dyn Transport, config: ResolverConfig) -> Self {
        let mut builders: BTreeMap<String, BTreeMap<String, Operation>> = BTreeMap::new();

        for wire_name in transport.operation_names() {
            let Some((interface, method)) = wire_name.split_once('_') else {
                continue;
            };
            let Some(local_interface) = interface.strip_prefix('I') else {
                continue;
            };
            if local_interface.is_empty() {
                continue;
            }
            let local_method = config.wire_to_local(method);
            debug!(
                interface = local_interface,
                method = %local_method,
                "registering interface method"
            );
            builders
                .entry(local_interface.to_string())
                .or_default()
                .insert(local_method, Operation { wire_name });
        }

        let interfaces = builders
            .into_iter()
            .map(|(name, methods)| {
                let proxy = ProxyInterface {
                    wire_name: format!("I{name}"),
                    name: name.clone(),
                    methods,
                };
                (name, Arc::new(proxy))
            })
            .collect();

        let catalog = Self { interfaces, config };
        debug!(interfaces = catalog.interfaces.len(), "catalog built");
        catalog
    }

    /// Exact lookup by local interface name.
    pub fn interface(&self, name: &str) -> Option<&Arc<ProxyInterface>> {
        self.interfaces.get(name)
    }

    /// Fuzzy lookup: resolve `short_name` then return the interface.
    pub fn find_interface(&self, short_name: &str) -> Option<&Arc<ProxyInterface>> {
        let name = self.match_interface_name(short_name)?.to_string();
        self.interfaces.get(&name)
    }

    /// Resolve a short or property-style name to a known interface name.
    pub fn match_interface_name(&self, short_name: &str) -> Option<&str> {
        self.config
            .match_interface_name(self.interfaces.keys().map(String::as_str), short_name)
    }

    /// Names of all known interfaces, in sorted order.
    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use serde_json::json;

    fn widget_catalog() -> Catalog {
        let transport = ScriptedTransport::new()
            .returning("IWidget_getName", json!("gear"))
            .returning("IWidget_setName", json!(null))
            .returning("IWidget_findChild", json!(null))
            .returning("IWidget_createChild", json!(null))
            .returning("IWidget_launch", json!(null))
            .returning("ISprocketEvent_getSource", json!(null))
            .returning("unprefixed", json!(null));
        Catalog::from_transport(&transport, ResolverConfig::default())
    }

    #[test]
    fn test_classification_partition() {
        let catalog = widget_catalog();
        let widget = catalog.interface("Widget").unwrap();

        assert_eq!(widget.methods().len(), 5);

        let getters = widget.getters();
        assert_eq!(getters.len(), 1);
        assert!(getters.contains_key("name"));

        let setters = widget.setters();
        assert_eq!(setters.len(), 1);
        assert!(setters.contains_key("name"));

        let finders = widget.finders();
        assert_eq!(finders.len(), 1);
        assert!(finders.contains_key("child"));

        let creators = widget.creators();
        assert_eq!(creators.len(), 1);
        assert!(creators.contains_key("child"));

        // The unprefixed operation appears only in the full map.
        assert!(widget.operation("launch").is_some());
    }

    #[test]
    fn test_malformed_operation_names_are_skipped() {
        let catalog = widget_catalog();
        // "unprefixed" has no interface part and must not create one.
        assert_eq!(catalog.len(), 2);
        assert!(catalog.interface("Widget").is_some());
        assert!(catalog.interface("SprocketEvent").is_some());
    }

    #[test]
    fn test_fuzzy_interface_lookup() {
        let catalog = widget_catalog();
        assert_eq!(
            catalog.find_interface("widgets").map(|i| i.name()),
            Some("Widget")
        );
        assert_eq!(
            catalog.find_interface("getWidgetByName").map(|i| i.name()),
            Some("Widget")
        );
        assert_eq!(
            catalog.match_interface_name("sprockets"),
            Some("SprocketEvent")
        );
        assert!(catalog.find_interface("cog").is_none());
    }
}

//! Model class registry and the weak instance cache
//!
//! The remote interface catalog is open-ended, so model classes cannot be a
//! closed enum: [`ModelRegistry`] is a name-to-class table that synthesizes a
//! class on first use and guarantees every later request for the same name
//! yields the identical class object. [`ModelCache`] keeps at most one live
//! model per (class, handle) pair without ever being the reason an otherwise
//! unreferenced model stays alive.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock, Weak};

use tracing::trace;

use crate::model::ModelShared;

/// Declaration of one model class
#[derive(Debug, Clone)]
pub struct ClassSpec {
    name: String,
    interface: Option<String>,
    property_aliases: Vec<(String, String)>,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interface: None,
            property_aliases: Vec::new(),
        }
    }

    /// Back the class with a differently-named remote interface.
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Declare that a property resolves against `interface` instead of
    /// whatever its own name would fuzzy-match.
    pub fn with_property_alias(
        mut self,
        property: impl Into<String>,
        interface: impl Into<String>,
    ) -> Self {
        let property: String = property.into();
        self.property_aliases
            .push((property.to_lowercase(), interface.into()));
        self
    }
}

/// An interned model class; clones of one registration compare equal
#[derive(Clone)]
pub struct ModelClass(Arc<ClassSpec>);

impl ModelClass {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The remote interface this class is bound against.
    pub fn interface_name(&self) -> &str {
        self.0.interface.as_deref().unwrap_or(&self.0.name)
    }

    /// First declared alias whose key appears in the candidate set.
    pub(crate) fn property_alias(&self, matches: &HashSet<String>) -> Option<&str> {
        self.0
            .property_aliases
            .iter()
            .find(|(key, _)| matches.contains(key))
            .map(|(_, interface)| interface.as_str())
    }
}

impl PartialEq for ModelClass {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ModelClass {}

impl std::fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ModelClass").field(&self.0.name).finish()
    }
}

/// Name-to-class table guaranteeing class identity
pub struct ModelRegistry {
    classes: RwLock<HashMap<String, ModelClass>>,
}

impl ModelRegistry {
    /// A registry pre-seeded with the built-in class declarations.
    pub fn new() -> Self {
        let registry = Self {
            classes: RwLock::new(HashMap::new()),
        };
        for spec in builtin_specs() {
            registry.register(spec);
        }
        registry
    }

    /// The class registered under `name`, created on first use.
    ///
    /// Creation always succeeds; a class whose name matches no catalog
    /// interface only fails later, on first attribute access.
    pub fn class(&self, name: &str) -> ModelClass {
        if let Some(class) = self.classes.read().unwrap().get(name) {
            return class.clone();
        }
        let mut classes = self.classes.write().unwrap();
        classes
            .entry(name.to_string())
            .or_insert_with(|| {
                trace!(class = name, "synthesizing model class");
                ModelClass(Arc::new(ClassSpec::new(name)))
            })
            .clone()
    }

    /// Register (or replace) a class declaration.
    pub fn register(&self, spec: ClassSpec) -> ModelClass {
        let class = ModelClass(Arc::new(spec));
        self.classes
            .write()
            .unwrap()
            .insert(class.name().to_string(), class.clone());
        class
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-in class declarations, including the property aliases that bridge
/// spellings the fuzzy match cannot derive on its own.
fn builtin_specs() -> Vec<ClassSpec> {
    vec![
        ClassSpec::new("VirtualBox")
            .with_property_alias("harddisks", "Medium")
            .with_property_alias("dvdimages", "Medium")
            .with_property_alias("floppyimages", "Medium")
            .with_property_alias("unattendedinstaller", "Unattended"),
        ClassSpec::new("Machine"),
        ClassSpec::new("Session"),
        ClassSpec::new("Progress"),
        ClassSpec::new("Medium")
            .with_property_alias("base", "Medium")
            .with_property_alias("parent", "Medium")
            .with_property_alias("children", "Medium"),
        ClassSpec::new("AudioSettings").with_property_alias("adapter", "AudioAdapter"),
        ClassSpec::new("NetworkAdapter"),
        ClassSpec::new("VRDEServer"),
        ClassSpec::new("Event"),
        ClassSpec::new("EventSource").with_property_alias("listener", "EventListener"),
        ClassSpec::new("EventListener"),
        ClassSpec::new("Unattended"),
    ]
}

/// Weak-value cache from (class, handle) to the shared model state
pub struct ModelCache {
    entries: Mutex<HashMap<(String, String), Weak<ModelShared>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the live entry for (class, handle) or insert a fresh one.
    ///
    /// Dead entries are evicted lazily whenever a new entry is inserted.
    pub(crate) fn get_or_insert(
        &self,
        class: &ModelClass,
        handle_raw: &str,
        make: impl FnOnce() -> Arc<ModelShared>,
    ) -> Arc<ModelShared> {
        let mut entries = self.entries.lock().unwrap();
        let key = (class.name().to_string(), handle_raw.to_string());
        if let Some(live) = entries.get(&key).and_then(Weak::upgrade) {
            trace!(class = class.name(), handle = handle_raw, "model cache hit");
            return live;
        }
        let fresh = make();
        entries.retain(|_, weak| weak.strong_count() > 0);
        entries.insert(key, Arc::downgrade(&fresh));
        fresh
    }

    /// Number of entries whose model is still alive.
    pub fn live(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_identity_is_stable() {
        let registry = ModelRegistry::new();
        let first = registry.class("GuestSession");
        let second = registry.class("GuestSession");
        assert_eq!(first, second);

        // Built-ins are identical too, and distinct from other names.
        assert_eq!(registry.class("Machine"), registry.class("Machine"));
        assert_ne!(registry.class("Machine"), registry.class("Medium"));
    }

    #[test]
    fn test_interface_override() {
        let registry = ModelRegistry::new();
        let class = registry.register(ClassSpec::new("PassiveListener").with_interface("EventListener"));
        assert_eq!(class.name(), "PassiveListener");
        assert_eq!(class.interface_name(), "EventListener");

        // Without an override the class name doubles as the interface name.
        assert_eq!(registry.class("Machine").interface_name(), "Machine");
    }

    #[test]
    fn test_property_alias_lookup() {
        let registry = ModelRegistry::new();
        let medium = registry.class("Medium");

        let matches = crate::naming::get_matches("parent");
        assert_eq!(medium.property_alias(&matches), Some("Medium"));

        let matches = crate::naming::get_matches("location");
        assert_eq!(medium.property_alias(&matches), None);
    }
}

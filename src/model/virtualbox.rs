//! The top-level entry model
//!
//! `VirtualBox` wraps the service's root object: login/logoff against the
//! web-session manager, generic finder dispatch, and the convenience
//! factories for machines and media.

use std::collections::HashSet;
use std::ops::Deref;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::context::Context;
use crate::enums::{AccessMode, MediumDeviceType};
use crate::error::{BridgeError, Result};
use crate::model::machine::Machine;
use crate::model::medium::Medium;
use crate::model::unattended::Unattended;
use crate::model::{Model, Property};

/// The root object of one connected service
#[derive(Clone, Debug)]
pub struct VirtualBox {
    model: Model,
}

impl VirtualBox {
    /// The entry model for a context, bound to its login handle if present.
    pub fn new(ctx: &Context) -> Self {
        let handle = ctx.api_handle();
        Self {
            model: ctx.model_by_name("VirtualBox", handle),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Log on to the web service.
    ///
    /// Returns `false` on authentication failure rather than an error;
    /// logging in twice without `force` is a hard error.
    pub fn login(&self, username: &str, password: &str, force: bool) -> Result<bool> {
        if self.model.is_bound() && !force {
            return Err(BridgeError::AlreadyLoggedIn);
        }
        let ctx = self.model.ctx();
        match ctx.invoke(
            "WebsessionManager",
            "logon",
            &[Value::from(username), Value::from(password)],
        ) {
            Ok(Value::String(raw)) if !raw.is_empty() => {
                ctx.set_api_handle(Some(raw.clone()));
                self.model.set_handle(Some(ctx.handle(raw)));
                info!(user = username, "logged on to web service");
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(error) => {
                warn!(user = username, error = %error, "logon failed");
                Ok(false)
            }
        }
    }

    /// Log off, invalidating the top-level handle.
    pub fn logoff(&self) -> Result<()> {
        let Some(handle) = self.model.handle() else {
            return Ok(());
        };
        let ctx = self.model.ctx();
        ctx.invoke("WebsessionManager", "logoff", &[handle.to_value()])?;
        ctx.set_api_handle(None);
        self.model.set_handle(None);
        info!("logged off from web service");
        Ok(())
    }

    /// Resolve a human-supplied identifier to a model via whichever finder
    /// the root interface exposes for `model_name`.
    ///
    /// Returns `None` when no finder matches or the underlying call fails.
    pub fn find_model(&self, model_name: &str, name_or_id: &str) -> Option<Model> {
        let wanted = model_name.to_lowercase().replace('_', "");
        let interface = self.model.interface()?;

        for method_name in interface.methods().keys() {
            let base = method_name
                .split("_by_")
                .next()
                .unwrap_or(method_name)
                .replace('_', "");
            let candidate = base.strip_prefix("find").unwrap_or(&base);
            if !candidate.eq_ignore_ascii_case(&wanted) {
                continue;
            }
            return match self.model.call(method_name, &[Value::from(name_or_id)]) {
                Ok(Property::Model(model)) => Some(model),
                _ => None,
            };
        }
        None
    }

    /// All registered machines.
    pub fn machines(&self) -> Result<Vec<Machine>> {
        match self.model.get("machines")? {
            Property::List(items) => Ok(items
                .into_iter()
                .filter_map(Property::into_model)
                .map(Machine::from)
                .collect()),
            _ => Err(BridgeError::UnexpectedValue {
                model: "VirtualBox".to_string(),
                property: "machines".to_string(),
                expected: "a list of machine handles",
            }),
        }
    }

    /// Create a machine with default settings for its OS type, apply the
    /// defaults and register it.
    pub fn create_machine_with_defaults(
        &self,
        name: &str,
        groups: &[&str],
        os_type_id: Option<&str>,
    ) -> Result<Machine> {
        let groups: Vec<Value> = if groups.is_empty() {
            vec![Value::from("/")]
        } else {
            groups.iter().map(|g| Value::from(*g)).collect()
        };
        let created = self.model.call(
            "create_machine",
            &[
                Value::from(""),
                Value::from(name),
                Value::Array(groups),
                Value::from(os_type_id.unwrap_or("")),
                Value::from(""),
                Value::from(""),
                Value::from(""),
                Value::from(""),
            ],
        )?;
        let Property::Model(model) = created else {
            return Err(BridgeError::UnexpectedValue {
                model: "VirtualBox".to_string(),
                property: "create_machine".to_string(),
                expected: "a machine handle",
            });
        };
        let machine = Machine::from(model);
        machine.call("apply_defaults", &[Value::from("")])?;

        let machine_handle = machine.handle().ok_or(BridgeError::Unbound {
            model: "Machine".to_string(),
        })?;
        self.model
            .call("register_machine", &[machine_handle.to_value()])?;
        Ok(machine)
    }

    /// Create a machine ready for unattended installation from an ISO.
    pub fn create_machine_from_iso(
        &self,
        iso_path: &Path,
        name: Option<&str>,
        unattended_options: &Map<String, Value>,
    ) -> Result<Machine> {
        let created = self.model.call("create_unattended_installer", &[])?;
        let Property::Model(model) = created else {
            return Err(BridgeError::UnexpectedValue {
                model: "VirtualBox".to_string(),
                property: "create_unattended_installer".to_string(),
                expected: "an unattended installer handle",
            });
        };
        let unattended = Unattended::from(model);
        unattended.apply(unattended_options)?;
        unattended.set("iso_path", Value::from(iso_path.to_string_lossy().as_ref()))?;
        unattended.call("detect_iso_os", &[])?;

        let os_type_id = unattended.get("detected_os_type_id")?;
        let fallback = iso_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("unattended");
        let machine = self.create_machine_with_defaults(
            name.unwrap_or(fallback),
            &[],
            os_type_id.as_str(),
        )?;

        let machine_handle = machine.handle().ok_or(BridgeError::Unbound {
            model: "Machine".to_string(),
        })?;
        unattended.set("machine", machine_handle.to_value())?;
        unattended.configure()?;
        Ok(machine)
    }

    /// All media regardless of device type, de-duplicated by handle.
    pub fn mediums(&self, include_children: bool) -> Result<Vec<Medium>> {
        let mut mediums: Vec<Medium> = Vec::new();
        for property in ["dvd_images", "floppy_images", "hard_disks"] {
            if let Property::List(items) = self.model.get(property)? {
                mediums.extend(
                    items
                        .into_iter()
                        .filter_map(Property::into_model)
                        .map(Medium::from),
                );
            }
        }
        if include_children {
            let mut children = Vec::new();
            for medium in &mediums {
                children.extend(medium.all_children()?);
            }
            mediums.extend(children);
        }

        let mut seen = HashSet::new();
        mediums.retain(|medium| match medium.handle() {
            Some(handle) => seen.insert(handle.as_str().to_string()),
            None => true,
        });
        Ok(mediums)
    }

    /// A medium matching the given name or identifier, if any.
    pub fn find_medium(&self, name_or_id: &str) -> Result<Option<Medium>> {
        for medium in self.mediums(true)? {
            if medium.name()? == name_or_id || medium.id()? == name_or_id {
                return Ok(Some(medium));
            }
        }
        Ok(None)
    }

    /// Create a medium at `location` and allocate its base storage.
    pub fn create_medium_with_defaults(
        &self,
        location: &Path,
        logical_size: i64,
        format: Option<&str>,
        access_mode: AccessMode,
        device_type: MediumDeviceType,
    ) -> Result<Medium> {
        let created = self.model.call(
            "create_medium",
            &[
                Value::from(format.unwrap_or("")),
                Value::from(location.to_string_lossy().as_ref()),
                Value::from(access_mode.as_str()),
                Value::from(device_type.as_str()),
            ],
        )?;
        let Property::Model(model) = created else {
            return Err(BridgeError::UnexpectedValue {
                model: "VirtualBox".to_string(),
                property: "create_medium".to_string(),
                expected: "a medium handle",
            });
        };
        let medium = Medium::from(model);
        medium.call("create_base_storage", &[Value::from(logical_size)])?;
        Ok(medium)
    }
}

impl From<Model> for VirtualBox {
    fn from(model: Model) -> Self {
        Self { model }
    }
}

impl Deref for VirtualBox {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

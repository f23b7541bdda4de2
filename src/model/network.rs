//! Network adapter helpers

use std::ops::Deref;

use crate::error::{BridgeError, Result};
use crate::model::{property_string, Model};
use crate::naming::split_pascal_case;

/// A network adapter model
#[derive(Clone, Debug)]
pub struct NetworkAdapter {
    model: Model,
}

impl NetworkAdapter {
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The attachment type as a display name (`HostOnly` becomes `Host Only`).
    pub fn attachment_type_name(&self) -> Result<String> {
        Ok(split_pascal_case(&property_string(
            &self.model,
            "attachment_type",
        )?))
    }

    /// The host interface name for the current attachment type, if the
    /// adapter exposes one (`bridged_interface`, `host_only_interface`, ...).
    pub fn attachment_interface(&self) -> Result<Option<String>> {
        let attachment = self
            .attachment_type_name()?
            .to_lowercase()
            .replace(' ', "_");
        match self.model.get(&format!("{attachment}_interface")) {
            Ok(value) => Ok(value.as_str().map(String::from)),
            Err(BridgeError::AttributeNotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

impl From<Model> for NetworkAdapter {
    fn from(model: Model) -> Self {
        Self { model }
    }
}

impl Deref for NetworkAdapter {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

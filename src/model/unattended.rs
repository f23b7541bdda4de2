//! Unattended installer helper

use std::ops::Deref;

use crate::error::Result;
use crate::model::Model;

/// The unattended installer object created by the root model
#[derive(Clone, Debug)]
pub struct Unattended {
    model: Model,
}

impl Unattended {
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Create the required media and reconfigure the target machine.
    pub fn configure(&self) -> Result<()> {
        self.model.call("prepare", &[])?;
        self.model.call("construct_media", &[])?;
        self.model.call("reconfigure_vm", &[])?;
        Ok(())
    }
}

impl From<Model> for Unattended {
    fn from(model: Model) -> Self {
        Self { model }
    }
}

impl Deref for Unattended {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

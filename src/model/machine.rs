//! Machine helpers: launching and locking

use std::ops::Deref;

use serde_json::Value;
use tracing::warn;

use crate::enums::{LockType, MachineFrontend};
use crate::error::{BridgeError, Result};
use crate::model::session::Session;
use crate::model::{property_string, Model, Property};

/// A machine model with launch and lock workflows
#[derive(Clone, Debug)]
pub struct Machine {
    model: Model,
}

impl Machine {
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// The machine's display name.
    pub fn name(&self) -> Result<String> {
        property_string(&self.model, "name")
    }

    /// The machine's identifier.
    pub fn id(&self) -> Result<String> {
        property_string(&self.model, "id")
    }

    /// Launch the machine process with the given front end.
    ///
    /// The launch goes through a session that is opened and closed around
    /// the call.
    pub fn start(&self, frontend: MachineFrontend) -> Result<()> {
        let session = self.model.ctx().session();
        session.scoped(|handle| {
            self.model.call(
                "launch_vm_process",
                &[handle.to_value(), Value::from(frontend.as_str())],
            )?;
            Ok(())
        })
    }

    /// Lock the machine and return a guard over the mutable instance.
    ///
    /// The lock is held until the guard is dropped or explicitly unlocked.
    pub fn lock(&self, lock_type: LockType) -> Result<MachineLock> {
        let session = self.model.ctx().session();
        let handle = session.open()?;

        let locked = self
            .model
            .call(
                "lock_machine",
                &[handle.to_value(), Value::from(lock_type.as_str())],
            )
            .and_then(|_| session.model().get("machine"));

        match locked {
            Ok(Property::Model(model)) => Ok(MachineLock {
                machine: Machine::from(model),
                session,
            }),
            Ok(_) => {
                let _ = session.close();
                Err(BridgeError::NotAModel {
                    model: "Session".to_string(),
                    property: "machine".to_string(),
                })
            }
            Err(error) => {
                let _ = session.close();
                Err(error)
            }
        }
    }
}

impl From<Model> for Machine {
    fn from(model: Model) -> Self {
        Self { model }
    }
}

impl Deref for Machine {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

/// Guard over a locked machine; unlocks and releases the session on drop
pub struct MachineLock {
    machine: Machine,
    session: Session,
}

impl MachineLock {
    /// The mutable machine instance obtained from the locking session.
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Unlock explicitly, surfacing any remote failure.
    pub fn unlock(self) -> Result<()> {
        // Drop runs afterwards; close is a no-op the second time.
        self.session.close()
    }
}

impl Drop for MachineLock {
    fn drop(&mut self) {
        if let Err(error) = self.session.close() {
            warn!(error = %error, "failed to close locking session");
        }
    }
}

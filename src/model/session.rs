//! Session objects and scoped acquisition
//!
//! Locking a machine or launching its process goes through a session object
//! obtained from the web-session manager. [`Session`] wraps that object's
//! model and owns its lifecycle: `open` binds a fresh session handle, `close`
//! unlocks whatever the session holds and releases the handle exactly once,
//! and [`Session::scoped`] guarantees the close on every exit path.

use serde_json::Value;
use tracing::debug;

use crate::context::Context;
use crate::enums::SessionState;
use crate::error::{BridgeError, Result};
use crate::handle::Handle;
use crate::model::Model;

/// A web-service session object and the means to open and close it
pub struct Session {
    model: Model,
}

impl Session {
    pub(crate) fn new(ctx: Context) -> Self {
        let class = ctx.registry().class("Session");
        Self {
            model: ctx.model(class, None),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The session handle, once opened.
    pub fn handle(&self) -> Option<Handle> {
        self.model.handle()
    }

    /// Open the session by obtaining a session object for the current login.
    ///
    /// Opening an already open session returns the existing handle.
    pub fn open(&self) -> Result<Handle> {
        if let Some(handle) = self.model.handle() {
            return Ok(handle);
        }
        let ctx = self.model.ctx();
        let api_handle = ctx.api_handle().ok_or(BridgeError::NotLoggedIn)?;
        let raw = ctx.invoke(
            "WebsessionManager",
            "get_session_object",
            &[api_handle.to_value()],
        )?;
        let Value::String(raw) = raw else {
            return Err(BridgeError::UnexpectedValue {
                model: "Session".to_string(),
                property: "session_object".to_string(),
                expected: "a handle string",
            });
        };
        let handle = ctx.handle(raw);
        self.model.set_handle(Some(handle.clone()));
        debug!(handle = %handle, "session opened");
        Ok(handle)
    }

    /// Whether the session currently holds a machine lock.
    pub fn is_locked(&self) -> Result<bool> {
        let state = self.model.get("state")?;
        Ok(state.as_str() == Some(SessionState::Locked.as_str()))
    }

    /// Close the session: unlock a locked machine, then release the handle.
    ///
    /// Closing an already closed session is a no-op, so the release runs at
    /// most once however many times close is reached.
    pub fn close(&self) -> Result<()> {
        let Some(handle) = self.model.handle() else {
            return Ok(());
        };
        if self.is_locked()? {
            self.model.call("unlock_machine", &[])?;
        }
        handle.release()?;
        self.model.set_handle(None);
        debug!(handle = %handle, "session closed");
        Ok(())
    }

    /// Run `f` with an open session handle, closing on every exit path.
    pub fn scoped<T>(&self, f: impl FnOnce(&Handle) -> Result<T>) -> Result<T> {
        let handle = self.open()?;
        let outcome = f(&handle);
        let closed = self.close();
        match outcome {
            Ok(value) => closed.map(|_| value),
            Err(error) => {
                // The close already ran; the operation's error wins.
                let _ = closed;
                Err(error)
            }
        }
    }
}

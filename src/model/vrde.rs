//! VRDE server helpers
//!
//! The VRDE server stores its settings in a free-form property bag reached
//! through `get_vrde_property`/`set_vrde_property`; these helpers name the
//! handful of keys worth typed access and build the connection URL.

use std::ops::Deref;

use serde_json::Value;

use crate::error::Result;
use crate::model::Model;

/// A VRDE server model
#[derive(Clone, Debug)]
pub struct VRDEServer {
    model: Model,
}

impl VRDEServer {
    pub fn model(&self) -> &Model {
        &self.model
    }

    fn vrde_property(&self, name: &str) -> Result<Option<String>> {
        let value = self.model.call("get_vrde_property", &[Value::from(name)])?;
        Ok(value
            .as_str()
            .filter(|s| !s.is_empty())
            .map(String::from))
    }

    fn set_vrde_property(&self, name: &str, value: Value) -> Result<()> {
        self.model
            .call("set_vrde_property", &[Value::from(name), value])?;
        Ok(())
    }

    /// The TCP port the server listens on, when a single port is set.
    pub fn port(&self) -> Result<Option<u16>> {
        Ok(self
            .vrde_property("TCP/Ports")?
            .and_then(|ports| ports.parse().ok()))
    }

    pub fn address(&self) -> Result<Option<String>> {
        self.vrde_property("TCP/Address")
    }

    pub fn vnc_password(&self) -> Result<Option<String>> {
        self.vrde_property("VNCPassword")
    }

    pub fn set_port(&self, port: u16) -> Result<()> {
        self.set_vrde_property("TCP/Ports", Value::from(port.to_string()))
    }

    pub fn set_address(&self, address: &str) -> Result<()> {
        self.set_vrde_property("TCP/Address", Value::from(address))
    }

    pub fn set_vnc_password(&self, password: &str) -> Result<()> {
        self.set_vrde_property("VNCPassword", Value::from(password))
    }

    /// The URL to reach the server, `rdp://` or `vnc://` depending on the
    /// active extension pack. `None` unless both address and port are set.
    pub fn url(&self) -> Result<Option<String>> {
        let Some(address) = self.address()? else {
            return Ok(None);
        };
        let Some(port) = self.port()? else {
            return Ok(None);
        };
        let ext_pack = self.model.get("vrde_ext_pack")?;
        let protocol = match ext_pack.as_str() {
            Some(pack) if pack.eq_ignore_ascii_case("VNC") => "vnc",
            _ => "rdp",
        };
        Ok(Some(format!("{protocol}://{address}:{port}")))
    }
}

impl From<Model> for VRDEServer {
    fn from(model: Model) -> Self {
        Self { model }
    }
}

impl Deref for VRDEServer {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

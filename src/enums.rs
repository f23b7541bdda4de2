//! Remote enumerations used by the typed model helpers
//!
//! Only the handful of enumerations the wrappers actually consume are carried
//! here; every other remote enum travels through the bridge as its plain wire
//! string. Variants are spelled exactly as the wire spells them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a web-service session object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Null,
    Unlocked,
    Locked,
    Spawning,
    Unlocking,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Null => "Null",
            SessionState::Unlocked => "Unlocked",
            SessionState::Locked => "Locked",
            SessionState::Spawning => "Spawning",
            SessionState::Unlocking => "Unlocking",
        }
    }
}

/// Kind of lock taken on a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockType {
    Null,
    Shared,
    Write,
    #[serde(rename = "VM")]
    Vm,
}

impl LockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::Null => "Null",
            LockType::Shared => "Shared",
            LockType::Write => "Write",
            LockType::Vm => "VM",
        }
    }
}

/// Front end used when launching a machine process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineFrontend {
    Gui,
    Headless,
    Sdl,
    EmergencyStop,
}

impl MachineFrontend {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineFrontend::Gui => "gui",
            MachineFrontend::Headless => "headless",
            MachineFrontend::Sdl => "sdl",
            MachineFrontend::EmergencyStop => "emergencystop",
        }
    }
}

/// Access mode for media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "ReadOnly",
            AccessMode::ReadWrite => "ReadWrite",
        }
    }
}

/// Device type a medium attaches as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediumDeviceType {
    Floppy,
    #[serde(rename = "DVD")]
    Dvd,
    HardDisk,
}

impl MediumDeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediumDeviceType::Floppy => "Floppy",
            MediumDeviceType::Dvd => "DVD",
            MediumDeviceType::HardDisk => "HardDisk",
        }
    }
}

macro_rules! impl_display {
    ($($name:ident),+) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

impl_display!(
    SessionState,
    LockType,
    MachineFrontend,
    AccessMode,
    MediumDeviceType
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_spellings() {
        assert_eq!(LockType::Vm.as_str(), "VM");
        assert_eq!(MediumDeviceType::Dvd.as_str(), "DVD");
        assert_eq!(MachineFrontend::Headless.as_str(), "headless");
        assert_eq!(SessionState::Locked.to_string(), "Locked");
    }

    #[test]
    fn test_serde_matches_as_str() {
        let json = serde_json::to_value(LockType::Vm).unwrap();
        assert_eq!(json, serde_json::json!("VM"));
        let json = serde_json::to_value(MachineFrontend::Gui).unwrap();
        assert_eq!(json, serde_json::json!("gui"));
    }
}

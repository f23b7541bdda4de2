//! Naming translation between the wire convention and the local convention
//!
//! The web service spells operations `IMachine_getSnapshotCount`; the local
//! object model spells them `machine` / `get_snapshot_count`. This module
//! owns both directions: the deterministic wire-to-local rename, and the
//! fuzzy matching that resolves a property or method name back to the
//! interface it most plausibly refers to.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Multi-letter tokens that must not be split at hump boundaries.
pub const METHOD_NAME_EXCLUSIONS: &[&str] = &["2D", "3D", "DnD", "IPv4", "IPv6", "LEDs"];

/// Leading verb prefixes stripped while fuzzy-matching, in stripping order.
const NAME_PREFIXES: &[&str] = &["get", "set", "find", "current", "create", "on", "i"];

/// Trailing qualifiers stripped while fuzzy-matching.
const NAME_SUFFIXES: &[&str] = &["byid", "byname", "bygroups"];

/// Configuration for the naming translator.
///
/// Host applications can load this from their own configuration files; the
/// defaults reproduce the web service's spelling quirks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Atomic tokens excluded from hump splitting.
    #[serde(default = "default_exclusions")]
    pub exclusions: Vec<String>,

    /// Explicit short-name to interface-name mappings, consulted before the
    /// generic fuzzy match. Keys are compared case-insensitively with
    /// underscores and spaces ignored.
    #[serde(default)]
    pub interface_aliases: HashMap<String, String>,
}

fn default_exclusions() -> Vec<String> {
    METHOD_NAME_EXCLUSIONS.iter().map(|s| s.to_string()).collect()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            exclusions: default_exclusions(),
            interface_aliases: HashMap::new(),
        }
    }
}

impl ResolverConfig {
    /// Convert a wire-convention identifier using the configured exclusions.
    pub fn wire_to_local(&self, name: &str) -> String {
        wire_to_local(name, &self.exclusions)
    }

    /// Resolve `short_name` against `known_names`, alias table first.
    ///
    /// Returns the first known name whose case-folded spelling appears in
    /// the candidate set, or `None`. Never fails.
    pub fn match_interface_name<'a, I>(&self, known_names: I, short_name: &str) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: Vec<&'a str> = known_names.into_iter().collect();

        let normalized = normalize(short_name);
        for (key, target) in &self.interface_aliases {
            if normalize(key) == normalized {
                if let Some(name) = known.iter().copied().find(|n| n.eq_ignore_ascii_case(target)) {
                    return Some(name);
                }
            }
        }

        let matches = get_matches(short_name);
        known
            .into_iter()
            .find(|name| matches.contains(&name.to_lowercase()))
    }
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| *c != '_' && *c != ' ')
        .collect()
}

/// Convert a capitalized multi-word identifier to underscore-separated
/// lowercase, treating `exclusions` as atomic tokens.
///
/// A separator is inserted before any uppercase letter that follows a
/// lowercase letter or digit, and before any uppercase letter immediately
/// followed by a lowercase letter. The conversion is idempotent: an already
/// converted name passes through unchanged.
pub fn wire_to_local<S: AsRef<str>>(name: &str, exclusions: &[S]) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        if let Some(token) = exclusions
            .iter()
            .map(AsRef::as_ref)
            .find(|token| starts_with_at(&chars, i, token))
        {
            if i > 0 && chars[i - 1] != '_' {
                out.push('_');
            }
            out.extend(token.chars().flat_map(char::to_lowercase));
            i += token.chars().count();
            continue;
        }

        let c = chars[i];
        if c.is_uppercase() {
            let prev = chars.get(i.wrapping_sub(1));
            let next = chars.get(i + 1);
            let after_word = prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            let before_word = i > 0 && next.is_some_and(|n| n.is_lowercase());
            if (after_word || before_word) && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        i += 1;
    }

    out
}

fn starts_with_at(chars: &[char], index: usize, token: &str) -> bool {
    let mut offset = index;
    for t in token.chars() {
        if chars.get(offset) != Some(&t) {
            return false;
        }
        offset += 1;
    }
    true
}

/// Case-folded candidate spellings `short_name` could refer to.
///
/// Strips underscores, the leading verb prefix pass and trailing qualifiers,
/// then fans out over singular forms, `i`-prefixed forms and `event`-suffixed
/// forms, so that `machines`, `getMachines`, `findMachineByName`, `IMachine`
/// and `MachineEvent` all produce a set containing `machine`.
pub fn get_matches(short_name: &str) -> HashSet<String> {
    let mut name = short_name.to_lowercase().replace('_', "");
    for prefix in NAME_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest.to_string();
        }
    }
    for suffix in NAME_SUFFIXES {
        if let Some(rest) = name.strip_suffix(suffix) {
            name = rest.to_string();
        }
    }

    let mut matches = HashSet::new();
    for base in [Some(name.as_str()), name.strip_suffix("event")] {
        let Some(base) = base else { continue };
        matches.insert(base.to_string());
        matches.insert(base.strip_suffix('s').unwrap_or(base).to_string());
        matches.insert(base.strip_suffix("es").unwrap_or(base).to_string());
    }

    let plain: Vec<String> = matches.iter().cloned().collect();
    matches.extend(plain.iter().map(|m| format!("i{m}")));

    let with_i: Vec<String> = matches.iter().cloned().collect();
    matches.extend(with_i.iter().map(|m| format!("{m}event")));

    matches
}

/// Split a PascalCase identifier into space-separated words.
///
/// Acronym runs stay together: `NATNetwork` becomes `NAT Network`.
pub fn split_pascal_case(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1);
            if prev.is_lowercase() || prev.is_ascii_digit() || next.is_some_and(|n| n.is_lowercase())
            {
                out.push(' ');
            }
        }
        out.push(*c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_to_local_basic() {
        assert_eq!(
            wire_to_local("getSnapshotCount", METHOD_NAME_EXCLUSIONS),
            "get_snapshot_count"
        );
        assert_eq!(
            wire_to_local("launchVMProcess", METHOD_NAME_EXCLUSIONS),
            "launch_vm_process"
        );
        assert_eq!(
            wire_to_local("getVRDEExtPack", METHOD_NAME_EXCLUSIONS),
            "get_vrde_ext_pack"
        );
    }

    #[test]
    fn test_wire_to_local_exclusions() {
        assert_eq!(
            wire_to_local("getDnDMode", METHOD_NAME_EXCLUSIONS),
            "get_dnd_mode"
        );
        assert_eq!(
            wire_to_local("getAccelerate2DVideoEnabled", METHOD_NAME_EXCLUSIONS),
            "get_accelerate_2d_video_enabled"
        );
        assert_eq!(
            wire_to_local("getIPv6Supported", METHOD_NAME_EXCLUSIONS),
            "get_ipv6_supported"
        );
        assert_eq!(
            wire_to_local("getLEDs", METHOD_NAME_EXCLUSIONS),
            "get_leds"
        );
    }

    #[test]
    fn test_wire_to_local_idempotent() {
        for name in [
            "getSnapshotCount",
            "getDnDMode",
            "getIPv4Address",
            "launchVMProcess",
        ] {
            let once = wire_to_local(name, METHOD_NAME_EXCLUSIONS);
            let twice = wire_to_local(&once, METHOD_NAME_EXCLUSIONS);
            assert_eq!(once, twice, "conversion of '{name}' must be stable");
        }
    }

    #[test]
    fn test_get_matches_covers_spellings() {
        for spelling in [
            "machines",
            "getMachines",
            "findMachineByName",
            "IMachine",
            "MachineEvent",
        ] {
            assert!(
                get_matches(spelling).contains("machine"),
                "'{spelling}' must yield candidate 'machine'"
            );
        }
    }

    #[test]
    fn test_match_interface_name_resolves_spellings() {
        let config = ResolverConfig::default();
        let known = ["Machine", "Medium", "NetworkAdapter"];
        for spelling in [
            "machines",
            "getMachines",
            "findMachineByName",
            "IMachine",
            "MachineEvent",
        ] {
            assert_eq!(
                config.match_interface_name(known, spelling),
                Some("Machine"),
                "'{spelling}' must resolve to Machine"
            );
        }
        assert_eq!(config.match_interface_name(known, "floppy_drive"), None);
    }

    #[test]
    fn test_match_interface_name_alias_precedence() {
        let mut config = ResolverConfig::default();
        config
            .interface_aliases
            .insert("non_volatile_store".to_string(), "NvramStore".to_string());

        let known = ["NvramStore", "Machine"];
        assert_eq!(
            config.match_interface_name(known, "NonVolatileStore"),
            Some("NvramStore")
        );
        // Fuzzy matching alone would not have bridged that spelling.
        assert_eq!(
            ResolverConfig::default().match_interface_name(known, "NonVolatileStore"),
            None
        );
    }

    #[test]
    fn test_split_pascal_case() {
        assert_eq!(split_pascal_case("HardDisk"), "Hard Disk");
        assert_eq!(split_pascal_case("NATNetwork"), "NAT Network");
        assert_eq!(split_pascal_case("HostOnly"), "Host Only");
    }
}

//! Managed object references
//!
//! A [`Handle`] is the bridge's view of one remote object reference: the raw
//! sixteen-hex/sixteen-hex string the service hands out, plus the [`Context`]
//! it was obtained under. Equality and hashing follow the raw string alone,
//! so identical remote references compare equal regardless of which model
//! wraps them.
//!
//! The remote side owns the reference count: a handle is only ever released
//! by an explicit [`Handle::release`], never implicitly on drop.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::context::Context;
use crate::error::Result;

static HANDLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{16}-[0-9a-fA-F]{16}$").unwrap());

/// One remote object reference bound to the session that produced it
#[derive(Clone)]
pub struct Handle {
    raw: String,
    ctx: Context,
}

impl Handle {
    pub(crate) fn new(ctx: Context, raw: String) -> Self {
        Self { raw, ctx }
    }

    /// The raw reference string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The session context this handle was obtained under.
    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// The handle as a wire value.
    pub fn to_value(&self) -> Value {
        Value::String(self.raw.clone())
    }

    /// Whether `value` has the shape of a managed object reference.
    ///
    /// Pure format validation: non-string values are simply not handles.
    pub fn is_handle(value: &Value) -> bool {
        match value {
            Value::String(s) => Self::matches_format(s),
            _ => false,
        }
    }

    /// Whether a raw string has the reference shape (16 hex, hyphen, 16 hex).
    pub fn matches_format(raw: &str) -> bool {
        HANDLE_PATTERN.is_match(raw)
    }

    /// Whether the remote side can still resolve this handle.
    ///
    /// Any failure of the remote probe counts as "not valid".
    pub fn is_valid(&self) -> bool {
        self.ctx.interface_name_for_handle(self).is_some()
    }

    /// Release the managed object reference on the remote side.
    ///
    /// Releasing an already-released handle propagates the remote failure;
    /// guarding against double release is the caller's responsibility.
    pub fn release(&self) -> Result<()> {
        self.ctx
            .invoke("ManagedObjectRef", "release", &[self.to_value()])?;
        Ok(())
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Handle {}

impl PartialEq<str> for Handle {
    fn eq(&self, other: &str) -> bool {
        self.raw == other
    }
}

impl PartialEq<&str> for Handle {
    fn eq(&self, other: &&str) -> bool {
        self.raw == *other
    }
}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_handle_accepts_exact_format() {
        assert!(Handle::is_handle(&json!(
            "0123456789abcdef-fedcba9876543210"
        )));
        assert!(Handle::is_handle(&json!(
            "ABCDEF0123456789-0123456789ABCDEF"
        )));
    }

    #[test]
    fn test_is_handle_rejects_non_strings() {
        assert!(!Handle::is_handle(&Value::Null));
        assert!(!Handle::is_handle(&json!(42)));
        assert!(!Handle::is_handle(&json!(["0123456789abcdef-fedcba9876543210"])));
    }

    #[test]
    fn test_is_handle_rejects_wrong_shapes() {
        assert!(!Handle::is_handle(&json!("")));
        assert!(!Handle::is_handle(&json!("0123456789abcdef")));
        assert!(!Handle::is_handle(&json!("0123456789abcde-fedcba9876543210")));
        assert!(!Handle::is_handle(&json!(
            "0123456789abcdef-fedcba98765432100"
        )));
        assert!(!Handle::is_handle(&json!(
            "0123456789abcdeg-fedcba9876543210"
        )));
        assert!(!Handle::is_handle(&json!(
            "0123456789abcdef_fedcba9876543210"
        )));
    }
}

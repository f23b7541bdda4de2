//! Shared fixtures for the integration tests
//!
//! Each test assembles a `ScriptedTransport` with just the wire operations
//! its scenario needs; the helpers here keep handle spelling and the common
//! login plumbing in one place.

use std::sync::Arc;

use serde_json::json;
use vbox_bridge::{Context, ScriptedTransport, VirtualBox};

/// A well-formed managed object reference derived from `n`.
pub fn handle(n: u64) -> String {
    format!("{n:016x}-{n:016x}")
}

/// The reference the fake service hands out at logon.
pub fn api_handle() -> String {
    handle(0xa91)
}

/// Add the logon/logoff operations every login-dependent scenario needs.
pub fn with_web_session(transport: ScriptedTransport) -> ScriptedTransport {
    transport
        .returning("IWebsessionManager_logon", json!(api_handle()))
        .returning("IWebsessionManager_logoff", json!(null))
        .returning("IManagedObjectRef_release", json!(null))
}

/// Connect a context over the transport and log in.
pub fn logged_in(transport: ScriptedTransport) -> (Context, VirtualBox, Arc<ScriptedTransport>) {
    let transport = Arc::new(transport);
    let ctx = Context::new(transport.clone());
    let vbox = VirtualBox::new(&ctx);
    assert!(vbox
        .login("admin", "hunter2", false)
        .expect("login must not error"));
    (ctx, vbox, transport)
}

/// Install a test subscriber so failures come with the bridge's debug logs.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vbox_bridge=debug")),
        )
        .with_test_writer()
        .try_init();
}

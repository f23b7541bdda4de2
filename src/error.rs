//! Error types for the vbox-bridge crate

use thiserror::Error;

use crate::transport::TransportError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("no interface in the catalog matches '{0}'")]
    UnknownInterface(String),

    #[error("model '{model}' has no attribute '{attribute}'")]
    AttributeNotFound { model: String, attribute: String },

    #[error("model '{model}' is not bound to a handle")]
    Unbound { model: String },

    #[error("not logged in to the web service")]
    NotLoggedIn,

    #[error("already logged in; pass force to re-authenticate")]
    AlreadyLoggedIn,

    #[error("property '{property}' of model '{model}' did not resolve to a nested model")]
    NotAModel { model: String, property: String },

    #[error("expected {expected} for property '{property}' of model '{model}'")]
    UnexpectedValue {
        model: String,
        property: String,
        expected: &'static str,
    },
}

//! Error types.
//!
//! Two layers of failure live here. [`Error`] surfaces infrastructure
//! problems — binding a port, accepting a connection — from
//! [`Server::serve`](crate::Server::serve). [`RpcError`] is what a handler
//! (or the dispatcher on its behalf) returns for one call; it is rendered
//! into the uniform `{"error": "<message>"}` envelope by the error
//! responder. Routing misses, authorization denials, and missing ambient
//! state never become `RpcError`s — they terminate the call with their own
//! plain-text status responses before the handler runs.

use thiserror::Error;

use crate::validate::Invalid;

/// Infrastructure error returned by the server's fallible operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket-level failure while binding or serving.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// A per-call failure on the dispatch path.
///
/// Every variant funnels through the server's error responder, which
/// renders `{"error": "<Display of the variant>"}` with status 500. The
/// variants keep a malformed payload distinguishable from a payload that
/// parsed but violated a constraint.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request body was not valid JSON for the handler's request shape.
    #[error("decoding request: {0}")]
    Decode(#[from] serde_json::Error),

    /// The payload parsed but violated one or more field constraints.
    #[error("validating data: {0}")]
    Validation(#[from] Invalid),

    /// The response payload could not be serialized.
    #[error("encoding response: {0}")]
    Encode(serde_json::Error),

    /// Business-logic failure reported by the handler.
    #[error("{0}")]
    Handler(String),
}

impl RpcError {
    /// Wraps an arbitrary business-logic failure.
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}

/// The ambient request record was absent from the call context.
///
/// This means the values interceptor never ran — a host misconfiguration,
/// not a client error. The dispatcher answers it with `406 Not Acceptable`.
#[derive(Debug, Error)]
#[error("request values missing from context")]
pub struct ValuesMissing;

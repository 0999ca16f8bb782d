//! Route table, endpoints, and the handler calling convention.
//!
//! A route key is the exact string `{basepath}{Service}.{Method}` — no
//! pattern matching, no path parameters. Registration is a plain map
//! insert, which gives duplicate keys last-write-wins semantics (kept
//! deliberately; see [`RouteTable::register`]).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::claims::Claims;
use crate::context::RequestValues;
use crate::error::RpcError;
use crate::middleware::BoxFuture;
use crate::validate::{Invalid, Validate};

/// The bundle every handler receives alongside the raw request bytes.
///
/// Owned by the handler for exactly one call. For public endpoints
/// `claims` is the empty default regardless of what the caller presented.
/// Cancellation follows future-drop semantics: when the transport gives up
/// on the call, the handler's future is dropped mid-await.
pub struct RpcRequest {
    pub claims: Claims,
    pub values: Arc<RequestValues>,
}

/// A type-erased response payload: serializable and checkable.
///
/// Blanket-implemented for anything `Serialize + Validate + Send`, so
/// handlers return their concrete response shape and the dispatcher still
/// gets one uniform object to validate and encode. Same erasure pattern as
/// boxed handlers, one vtable call per use.
pub trait Payload: Send {
    fn check(&self) -> Result<(), Invalid>;
    fn to_json(&self) -> Result<Vec<u8>, serde_json::Error>;
}

impl<T: Serialize + Validate + Send> Payload for T {
    fn check(&self) -> Result<(), Invalid> {
        self.validate()
    }

    fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// The stored form of a handler: type-erased, shared across calls.
pub type RpcHandler = Arc<
    dyn Fn(RpcRequest, Bytes) -> BoxFuture<'static, Result<Box<dyn Payload>, RpcError>>
        + Send
        + Sync,
>;

/// An access policy paired with a handler under one routing key.
#[derive(Clone)]
pub struct Endpoint {
    roles: Vec<String>,
    handler: RpcHandler,
}

impl Endpoint {
    /// Builds an endpoint from any
    /// `async fn(RpcRequest, Bytes) -> Result<R, RpcError>`.
    ///
    /// The handler owns deserializing its request shape and validating it
    /// before doing business work; the dispatcher re-validates `R` on the
    /// way out.
    pub fn new<F, Fut, R>(roles: Vec<String>, f: F) -> Self
    where
        F: Fn(RpcRequest, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, RpcError>> + Send + 'static,
        R: Payload + 'static,
    {
        let handler: RpcHandler = Arc::new(
            move |req: RpcRequest,
                  body: Bytes|
                  -> BoxFuture<'static, Result<Box<dyn Payload>, RpcError>> {
                let fut = f(req, body);
                Box::pin(async move { fut.await.map(|r| Box::new(r) as Box<dyn Payload>) })
            },
        );
        Self { roles, handler }
    }

    /// An endpoint anyone may call, with or without a credential.
    pub fn public<F, Fut, R>(f: F) -> Self
    where
        F: Fn(RpcRequest, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, RpcError>> + Send + 'static,
        R: Payload + 'static,
    {
        Self::new(Vec::new(), f)
    }

    /// An endpoint requiring any one of `roles`.
    pub fn restricted<S, F, Fut, R>(roles: impl IntoIterator<Item = S>, f: F) -> Self
    where
        S: Into<String>,
        F: Fn(RpcRequest, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, RpcError>> + Send + 'static,
        R: Payload + 'static,
    {
        Self::new(roles.into_iter().map(Into::into).collect(), f)
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub(crate) fn handler(&self) -> &RpcHandler {
        &self.handler
    }
}

/// Exact-string routing table. Populated during startup, read-only after.
pub(crate) struct RouteTable {
    basepath: String,
    routes: HashMap<String, Endpoint>,
}

impl RouteTable {
    pub(crate) fn new(basepath: impl Into<String>) -> Self {
        Self { basepath: basepath.into(), routes: HashMap::new() }
    }

    /// Stores `endpoint` under `{basepath}{service}.{method}`.
    ///
    /// Registering the same pair twice silently replaces the earlier
    /// endpoint — last write wins.
    pub(crate) fn register(&mut self, service: &str, method: &str, endpoint: Endpoint) {
        let key = format!("{}{service}.{method}", self.basepath);
        self.routes.insert(key, endpoint);
    }

    /// Exact-match lookup; no patterns, no parameters.
    pub(crate) fn lookup(&self, path: &str) -> Option<&Endpoint> {
        self.routes.get(path)
    }
}

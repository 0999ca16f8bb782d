//! Server assembly: registration, composition, and the built application.
//!
//! [`Rpc`] is the startup-phase value: it accumulates interceptors and
//! endpoint registrations through chained calls, single-threaded, before
//! any traffic exists. [`Rpc::build`] folds the interceptor chain around
//! the dispatcher exactly once and yields an immutable [`App`] — nothing
//! mutates while serving, so no locking guards the route table.
//!
//! ```rust,no_run
//! use graft::middleware::{InjectValues, TraceLog};
//! use graft::{Endpoint, Invalid, Rpc, RpcError, RpcRequest, Server, Validate};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Greeting { message: String }
//!
//! impl Validate for Greeting {
//!     fn validate(&self) -> Result<(), Invalid> { Ok(()) }
//! }
//!
//! async fn greet(req: RpcRequest, _body: bytes::Bytes) -> Result<Greeting, RpcError> {
//!     Ok(Greeting { message: format!("hello, it is {}", req.values.begun_at()) })
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Rpc::new()
//!         .intercept(InjectValues)
//!         .intercept(TraceLog)
//!         .register("GreeterService", "Greet", Endpoint::public(greet))
//!         .build();
//!
//!     Server::bind("0.0.0.0:8080").serve(app).await.unwrap();
//! }
//! ```

use std::sync::Arc;

use crate::context::CallContext;
use crate::dispatch::{
    Dispatcher, ErrorResponder, NotFound, default_error_responder, default_not_found,
};
use crate::middleware::{HttpRequest, HttpResponse, Interceptor, PipelineFn, compose};
use crate::routes::{Endpoint, RouteTable};

/// Mounted by service modules: each registers its `(service, method,
/// roles, handler)` tuples during startup and owns its own shapes.
pub trait RpcService {
    fn register(self, rpc: Rpc) -> Rpc;
}

/// The server under construction.
pub struct Rpc {
    basepath: String,
    interceptors: Vec<Arc<dyn Interceptor>>,
    registrations: Vec<(String, String, Endpoint)>,
    not_found: NotFound,
    on_err: ErrorResponder,
}

impl Rpc {
    /// Starts an empty server with basepath `/v1/` and the default
    /// NotFound and error-responder collaborators.
    pub fn new() -> Self {
        Self {
            basepath: "/v1/".to_owned(),
            interceptors: Vec::new(),
            registrations: Vec::new(),
            not_found: default_not_found(),
            on_err: default_error_responder(),
        }
    }

    /// Overrides the path prefix every route key is composed with.
    pub fn basepath(mut self, basepath: impl Into<String>) -> Self {
        self.basepath = basepath.into();
        self
    }

    /// Appends an interceptor. The first appended runs outermost; put
    /// [`InjectValues`](crate::middleware::InjectValues) before anything
    /// that reads ambient values.
    pub fn intercept(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Registers `endpoint` under `{basepath}{service}.{method}`.
    /// Re-registering a pair replaces the earlier endpoint.
    pub fn register(mut self, service: &str, method: &str, endpoint: Endpoint) -> Self {
        self.registrations.push((service.to_owned(), method.to_owned(), endpoint));
        self
    }

    /// Lets a service module mount all of its endpoints.
    pub fn service(self, svc: impl RpcService) -> Self {
        svc.register(self)
    }

    /// Replaces the NotFound collaborator.
    pub fn not_found<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.not_found = Arc::new(f);
        self
    }

    /// Replaces the error responder.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(bool, &crate::RpcError) -> HttpResponse + Send + Sync + 'static,
    {
        self.on_err = Arc::new(f);
        self
    }

    /// Seals registration and composes the pipeline.
    pub fn build(self) -> App {
        for stage in &self.interceptors {
            tracing::debug!(stage = stage.name(), "interceptor mounted");
        }

        let mut routes = RouteTable::new(self.basepath);
        for (service, method, endpoint) in self.registrations {
            routes.register(&service, &method, endpoint);
        }
        let dispatcher = Dispatcher::new(routes, self.not_found, self.on_err);
        App { pipeline: compose(self.interceptors, dispatcher.into_pipeline()) }
    }
}

impl Default for Rpc {
    fn default() -> Self {
        Self::new()
    }
}

/// The built, immutable application. Cloning shares the composed pipeline.
#[derive(Clone)]
pub struct App {
    pipeline: PipelineFn,
}

impl App {
    /// Handles one call end to end: fresh context in, response out.
    ///
    /// This is what [`Server::serve`](crate::Server::serve) drives per
    /// request, and what tests call directly without a socket.
    pub async fn handle(&self, req: HttpRequest) -> HttpResponse {
        (self.pipeline)(CallContext::new(), req).await
    }
}

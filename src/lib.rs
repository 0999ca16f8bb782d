//! # graft
//!
//! A JSON-over-HTTP RPC server. A textual `Service.Method` path maps to a
//! registered handler; every call passes through an ordered chain of
//! interceptors, a role-based authorization gate, and a per-request
//! ambient record (trace id, timestamp, status) that reaches the handler
//! without explicit threading.
//!
//! ## The contract
//!
//! - Routing is exact-string: `POST {basepath}{Service}.{Method}`. No
//!   patterns, no path parameters, no verbs other than what you register.
//! - Interceptors are composed once, at startup, in the order you give
//!   them. The first runs outermost.
//! - The authentication interceptor annotates; it never rejects. The
//!   dispatcher alone decides access, from the endpoint's required roles.
//! - Registration is a synchronous startup phase. The built [`App`] is
//!   immutable, so concurrent calls share it without locks.
//!
//! What graft intentionally leaves to collaborators: token signing and
//! key storage (the [`Authenticator`] trait), field constraint rules (the
//! [`Validate`] trait), and every business service (the [`RpcService`]
//! trait).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use graft::middleware::{InjectValues, TraceLog};
//! use graft::{Endpoint, Invalid, Rpc, RpcError, RpcRequest, Server, Validate, codec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct GreetRequest { name: String }
//!
//! impl Validate for GreetRequest {
//!     fn validate(&self) -> Result<(), Invalid> { Ok(()) }
//! }
//!
//! #[derive(Serialize)]
//! struct GreetResponse { greeting: String }
//!
//! impl Validate for GreetResponse {
//!     fn validate(&self) -> Result<(), Invalid> { Ok(()) }
//! }
//!
//! async fn greet(req: RpcRequest, body: Bytes) -> Result<GreetResponse, RpcError> {
//!     let input: GreetRequest = codec::decode(&body)?;
//!     input.validate()?;
//!     Ok(GreetResponse {
//!         greeting: format!("Hello {}, the current time is {}", input.name, req.values.begun_at()),
//!     })
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

mod authorize;
mod claims;
mod context;
mod dispatch;
mod error;
mod routes;
mod rpc;
mod server;
mod validate;

pub mod codec;
pub mod middleware;

pub use authorize::authorized;
pub use claims::{AuthError, Authenticator, Claims, ROLE_ADMIN, ROLE_USER};
pub use context::{CallContext, RequestValues};
pub use dispatch::{ErrorResponder, NotFound};
pub use error::{Error, RpcError, ValuesMissing};
pub use routes::{Endpoint, Payload, RpcHandler, RpcRequest};
pub use rpc::{App, Rpc, RpcService};
pub use server::Server;
pub use validate::{FieldError, Invalid, Validate};

//! Minimal graft example — a public greeting endpoint.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example greeter
//!
//! Try:
//!   curl -X POST http://localhost:8080/v1/GreeterService.Greet \
//!        -H 'content-type: application/json' \
//!        -d '{"Name":"graft client"}'

use bytes::Bytes;
use graft::middleware::{InjectValues, TraceLog};
use graft::{Endpoint, Invalid, Rpc, RpcError, RpcRequest, RpcService, Server, Validate, codec};
use serde::{Deserialize, Serialize};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Rpc::new()
        .intercept(InjectValues)
        .intercept(TraceLog)
        .service(GreeterService)
        .build();

    Server::bind("0.0.0.0:8080")
        .serve(app)
        .await
        .expect("server error");
}

/// A polite API for greeting people.
struct GreeterService;

impl RpcService for GreeterService {
    fn register(self, rpc: Rpc) -> Rpc {
        rpc.register("GreeterService", "Greet", Endpoint::public(greet))
    }
}

// POST /v1/GreeterService.Greet
//
// The handler owns decoding and validating its request shape; the
// dispatcher owns everything around it.
async fn greet(req: RpcRequest, body: Bytes) -> Result<GreetResponse, RpcError> {
    let input: GreetRequest = codec::decode(&body)?;
    input.validate()?;

    Ok(GreetResponse {
        greeting: format!("Hello {}, the current time is {}", input.name, req.values.begun_at()),
    })
}

#[derive(Deserialize)]
struct GreetRequest {
    /// The person to greet. Required.
    #[serde(rename = "Name")]
    name: String,
}

impl Validate for GreetRequest {
    fn validate(&self) -> Result<(), Invalid> {
        let mut violations = Invalid::new();
        if self.name.is_empty() {
            violations.push("Name", "Name must be at least 1 character in length");
        }
        violations.finish()
    }
}

#[derive(Serialize)]
struct GreetResponse {
    /// A nice message welcoming somebody.
    #[serde(rename = "Greeting")]
    greeting: String,
}

impl Validate for GreetResponse {
    fn validate(&self) -> Result<(), Invalid> {
        Ok(())
    }
}

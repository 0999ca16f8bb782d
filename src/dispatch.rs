//! The request-dispatch pipeline.
//!
//! The dispatcher is the terminal stage of the interceptor chain. For one
//! inbound call it runs, in order and short-circuiting on the first
//! failure: route lookup, the claims requirement, the authorization
//! decision, ambient-value retrieval, the body read, the handler, the
//! defensive response validation, and the final encode. Each call is
//! handled exactly once; a failure terminates that call only.
//!
//! Client-visible failure surface:
//!
//! | Condition | Response |
//! |---|---|
//! | unknown path | NotFound collaborator (default plain 404) |
//! | roles required, no claims | plain `401 Unauthorized` |
//! | role mismatch | plain `401 Unauthorized` |
//! | ambient record missing | plain `406 Not Acceptable` |
//! | body read failure | plain `406 Not Acceptable` |
//! | handler / validation / encode failure | `{"error": "…"}`, status 500 |

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::{BodyExt, Full};
use serde::Serialize;
use tracing::{error, warn};

use crate::authorize::authorized;
use crate::claims::Claims;
use crate::codec;
use crate::context::{CallContext, RequestValues};
use crate::error::RpcError;
use crate::middleware::{HttpRequest, HttpResponse, PipelineFn};
use crate::routes::{RouteTable, RpcRequest};

/// Collaborator answering calls whose path matched nothing.
pub type NotFound = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// Collaborator rendering post-body-read failures into one uniform
/// envelope. The `bool` is the request's gzip acceptance.
pub type ErrorResponder = Arc<dyn Fn(bool, &RpcError) -> HttpResponse + Send + Sync>;

pub(crate) struct Dispatcher {
    routes: RouteTable,
    not_found: NotFound,
    on_err: ErrorResponder,
}

impl Dispatcher {
    pub(crate) fn new(routes: RouteTable, not_found: NotFound, on_err: ErrorResponder) -> Self {
        Self { routes, not_found, on_err }
    }

    /// Wraps the dispatcher as the chain's terminal stage.
    pub(crate) fn into_pipeline(self) -> PipelineFn {
        use crate::middleware::BoxFuture;

        let dispatcher = Arc::new(self);
        Arc::new(
            move |ctx: CallContext, req: HttpRequest| -> BoxFuture<'static, HttpResponse> {
                let dispatcher = Arc::clone(&dispatcher);
                Box::pin(async move { dispatcher.dispatch(ctx, req).await })
            },
        )
    }

    async fn dispatch(&self, ctx: CallContext, req: HttpRequest) -> HttpResponse {
        let path = req.uri().path().to_owned();

        let Some(endpoint) = self.routes.lookup(&path) else {
            let resp = (self.not_found)(&req);
            ctx.set_status_code(resp.status().as_u16()).ok();
            return resp;
        };
        let endpoint = endpoint.clone();

        // An endpoint with required roles insists on verified claims; a
        // public one proceeds with the zero value no matter what the
        // caller presented. "No claims" short-circuits here, "claims with
        // no matching role" falls through to the authorizer below.
        let claims = if endpoint.roles().is_empty() {
            Claims::default()
        } else {
            match ctx.claims().cloned() {
                Some(claims) => claims,
                None => return self.deny(&ctx),
            }
        };

        if !authorized(endpoint.roles(), &claims.roles) {
            return self.deny(&ctx);
        }

        let values = match ctx.values() {
            Ok(values) => Arc::clone(values),
            Err(e) => {
                error!(%path, "{e}");
                return plain(StatusCode::NOT_ACCEPTABLE, "406 Not Acceptable");
            }
        };

        let gzip = codec::accepts_gzip(req.headers());

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(%path, trace_id = %values.trace_id(), "reading request body: {e}");
                values.set_status(StatusCode::NOT_ACCEPTABLE.as_u16());
                return plain(StatusCode::NOT_ACCEPTABLE, "406 Not Acceptable");
            }
        };

        let bundle = RpcRequest { claims, values: Arc::clone(&values) };
        let payload = match (endpoint.handler())(bundle, body).await {
            Ok(payload) => payload,
            Err(e) => return self.fail(&values, gzip, &e),
        };

        // Defensive re-check of the outbound shape; handlers validate their
        // input, the dispatcher vouches for the output.
        if let Err(invalid) = payload.check() {
            return self.fail(&values, gzip, &RpcError::Validation(invalid));
        }

        let json = match payload.to_json() {
            Ok(json) => json,
            Err(e) => return self.fail(&values, gzip, &RpcError::Encode(e)),
        };

        match codec::encode(gzip, StatusCode::OK, json) {
            Ok(resp) => {
                values.set_status(StatusCode::OK.as_u16());
                resp
            }
            Err(e) => self.fail(&values, gzip, &RpcError::Handler(format!("writing response: {e}"))),
        }
    }

    fn deny(&self, ctx: &CallContext) -> HttpResponse {
        ctx.set_status_code(StatusCode::UNAUTHORIZED.as_u16()).ok();
        plain(StatusCode::UNAUTHORIZED, "401 Unauthorized")
    }

    fn fail(&self, values: &RequestValues, gzip: bool, err: &RpcError) -> HttpResponse {
        warn!(trace_id = %values.trace_id(), "rpc call failed: {err}");
        values.set_status(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
        (self.on_err)(gzip, err)
    }
}

/// The default NotFound collaborator.
pub(crate) fn default_not_found() -> NotFound {
    Arc::new(|_req: &HttpRequest| plain(StatusCode::NOT_FOUND, "404 page not found"))
}

/// The default error responder: `{"error": "<message>"}`, status 500.
pub(crate) fn default_error_responder() -> ErrorResponder {
    #[derive(Serialize)]
    struct Envelope<'a> {
        error: &'a str,
    }

    Arc::new(|gzip: bool, err: &RpcError| {
        let msg = err.to_string();
        let json = serde_json::to_vec(&Envelope { error: &msg })
            .unwrap_or_else(|_| br#"{"error":"internal error"}"#.to_vec());
        codec::encode(gzip, StatusCode::INTERNAL_SERVER_ERROR, json).unwrap_or_else(|e| {
            error!("encoding error envelope: {e}");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
        })
    })
}

/// A newline-terminated plain-text terminal response.
fn plain(status: StatusCode, body: &str) -> HttpResponse {
    let mut resp = http::Response::new(Full::new(Bytes::from(format!("{body}\n"))));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}

//! Interceptor chain.
//!
//! An [`Interceptor`] wraps the next stage of the pipeline: it may inspect
//! or modify the call context and the exchange before delegating, and the
//! response after. [`compose`] folds an ordered list `[m1 … mn]` around the
//! terminal dispatcher into one callable `m1(m2(…mn(dispatch)…))` — the
//! first interceptor runs first on the way in and last on the way out.
//! The fold happens exactly once, when the [`Rpc`](crate::Rpc) is built;
//! ordering is caller-specified and fixed thereafter.
//!
//! Three interceptors ship with the crate:
//!
//! | Interceptor | Job |
//! |---|---|
//! | [`TraceLog`] | logs method + path inbound, trace id + status outbound |
//! | [`InjectValues`] | allocates the per-request ambient record |
//! | [`BearerAuth`] | verifies a bearer credential, attaches [`Claims`](crate::Claims) |
//!
//! `InjectValues` must precede anything that reads ambient values,
//! including the dispatcher. `BearerAuth` never rejects a call — a missing
//! or invalid credential just leaves the context unauthenticated, and the
//! access decision stays with the dispatcher.

mod auth;
mod log;
mod values;

pub use auth::BearerAuth;
pub use log::TraceLog;
pub use values::InjectValues;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use http_body_util::combinators::BoxBody;

use crate::context::CallContext;

/// A heap-allocated future, `Send` so tokio may migrate it across threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The inbound exchange: a request whose body is still unread.
///
/// The body is boxed so the same pipeline serves hyper's streaming
/// `Incoming` in production and buffered [`Full`] bodies in tests.
pub type HttpRequest = http::Request<BoxBody<Bytes, hyper::Error>>;

/// The outbound exchange: a fully buffered response.
pub type HttpResponse = http::Response<Full<Bytes>>;

/// One composed pipeline stage: everything from here to the dispatcher.
pub type PipelineFn =
    Arc<dyn Fn(CallContext, HttpRequest) -> BoxFuture<'static, HttpResponse> + Send + Sync>;

/// A cross-cutting wrapper around the dispatch pipeline.
///
/// Implementations must forward to `next` exactly once (or short-circuit
/// deliberately) and must not retain the context beyond the call.
pub trait Interceptor: Send + Sync + 'static {
    /// Stage name, used in logs.
    fn name(&self) -> &'static str;

    /// Processes one call, delegating to `next` for the rest of the chain.
    fn handle<'a>(
        &'a self,
        ctx: CallContext,
        req: HttpRequest,
        next: PipelineFn,
    ) -> BoxFuture<'a, HttpResponse>;
}

/// Folds `stages` around `terminal`, outermost first.
///
/// Called once at server construction; the result is the single handler
/// every inbound call flows through.
pub fn compose(stages: Vec<Arc<dyn Interceptor>>, terminal: PipelineFn) -> PipelineFn {
    stages.into_iter().rev().fold(terminal, |next, stage| {
        Arc::new(
            move |ctx: CallContext, req: HttpRequest| -> BoxFuture<'static, HttpResponse> {
                let stage = Arc::clone(&stage);
                let next = Arc::clone(&next);
                Box::pin(async move { stage.handle(ctx, req, next).await })
            },
        )
    })
}

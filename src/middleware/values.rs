//! Ambient-value injection interceptor.

use crate::context::CallContext;
use crate::middleware::{BoxFuture, HttpRequest, HttpResponse, Interceptor, PipelineFn};

/// Allocates the per-request ambient record — trace id, timestamp, status
/// slot — before delegating.
///
/// Must sit before every stage that reads ambient values. A pipeline built
/// without it still serves requests, but the dispatcher will refuse each
/// one with `406 Not Acceptable` because the record it requires is absent.
pub struct InjectValues;

impl Interceptor for InjectValues {
    fn name(&self) -> &'static str {
        "inject-values"
    }

    fn handle<'a>(
        &'a self,
        ctx: CallContext,
        req: HttpRequest,
        next: PipelineFn,
    ) -> BoxFuture<'a, HttpResponse> {
        next(ctx.with_values(), req)
    }
}

//! Request logging interceptor.

use tracing::{debug, info};

use crate::context::CallContext;
use crate::middleware::{BoxFuture, HttpRequest, HttpResponse, Interceptor, PipelineFn};

/// Logs method and path before delegating.
///
/// After the call, when the ambient record exists, also logs the trace id
/// and the status the dispatcher recorded — place [`TraceLog`] outside
/// [`InjectValues`](crate::middleware::InjectValues) and the outbound line
/// is skipped, not an error.
pub struct TraceLog;

impl Interceptor for TraceLog {
    fn name(&self) -> &'static str {
        "trace-log"
    }

    fn handle<'a>(
        &'a self,
        ctx: CallContext,
        req: HttpRequest,
        next: PipelineFn,
    ) -> BoxFuture<'a, HttpResponse> {
        info!(method = %req.method(), path = %req.uri().path(), "rpc request");

        Box::pin(async move {
            let ctx_view = ctx.clone();
            let resp = next(ctx, req).await;
            if let Ok(values) = ctx_view.values() {
                debug!(
                    trace_id = %values.trace_id(),
                    status = values.status_code(),
                    "rpc response",
                );
            }
            resp
        })
    }
}

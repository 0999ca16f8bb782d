//! Bearer-credential annotation interceptor.

use std::sync::Arc;

use http::HeaderMap;
use http::header::AUTHORIZATION;
use tracing::debug;

use crate::claims::{Authenticator, Claims};
use crate::context::CallContext;
use crate::middleware::{BoxFuture, HttpRequest, HttpResponse, Interceptor, PipelineFn};

/// Parses `Authorization: Bearer <token>`, verifies the token against the
/// wired-in [`Authenticator`], and attaches [`Claims`] on success.
///
/// This interceptor never rejects a call. An absent header, a non-bearer
/// scheme, or a token the authenticator refuses all leave the call
/// unauthenticated and let the dispatcher make the access decision.
pub struct BearerAuth<A> {
    auth: Arc<A>,
}

impl<A: Authenticator> BearerAuth<A> {
    pub fn new(auth: Arc<A>) -> Self {
        Self { auth }
    }

    fn claims_from(&self, headers: &HeaderMap) -> Option<Claims> {
        let token = bearer_token(headers)?;
        match self.auth.validate_token(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!("bearer token rejected: {e}");
                None
            }
        }
    }
}

impl<A: Authenticator> Interceptor for BearerAuth<A> {
    fn name(&self) -> &'static str {
        "bearer-auth"
    }

    fn handle<'a>(
        &'a self,
        mut ctx: CallContext,
        req: HttpRequest,
        next: PipelineFn,
    ) -> BoxFuture<'a, HttpResponse> {
        if let Some(claims) = self.claims_from(req.headers()) {
            ctx.attach_claims(claims);
        }
        next(ctx, req)
    }
}

/// Extracts the token from a `Bearer <token>` header value.
///
/// The scheme comparison is case-insensitive; anything that is not exactly
/// two whitespace-separated parts is ignored.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    let (scheme, token) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

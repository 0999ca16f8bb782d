//! Per-call ambient state.
//!
//! Instead of an opaque, dynamically-keyed context lookup, graft threads a
//! strongly-typed [`CallContext`] by value through the interceptor chain.
//! The values interceptor populates it with one [`RequestValues`] record;
//! everything downstream reads the same record, and the dispatcher writes
//! the final status code back into it so a logging interceptor can report
//! it on the way out.
//!
//! A context without values reaching the dispatcher means the values
//! interceptor was never installed — the dispatcher treats that as a host
//! misconfiguration and answers `406 Not Acceptable`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::claims::Claims;
use crate::error::ValuesMissing;

/// Ambient metadata for exactly one request.
///
/// The trace id and timestamp are captured once at creation so every read
/// during the call observes the same instant. The status code is the only
/// field mutated afterwards.
#[derive(Debug)]
pub struct RequestValues {
    trace_id: Uuid,
    begun_at: DateTime<Utc>,
    status: AtomicU16,
}

impl RequestValues {
    pub(crate) fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            begun_at: Utc::now(),
            status: AtomicU16::new(0),
        }
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    /// The instant the values interceptor admitted the request.
    pub fn begun_at(&self) -> DateTime<Utc> {
        self.begun_at
    }

    /// The status recorded so far; `0` until the dispatcher settles the call.
    pub fn status_code(&self) -> u16 {
        self.status.load(Ordering::Relaxed)
    }

    pub(crate) fn set_status(&self, code: u16) {
        self.status.store(code, Ordering::Relaxed);
    }
}

/// The typed bundle carried through the interceptor chain for one call.
///
/// Cloning is cheap — the values record is shared behind an `Arc` — but in
/// practice the context is moved stage to stage, never aliased across
/// calls.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    pub(crate) claims: Option<Claims>,
    values: Option<Arc<RequestValues>>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a context carrying a freshly allocated values record.
    ///
    /// Must run before any stage that reads the record.
    pub fn with_values(mut self) -> Self {
        self.values = Some(Arc::new(RequestValues::new()));
        self
    }

    /// The ambient record, or [`ValuesMissing`] when no values interceptor ran.
    pub fn values(&self) -> Result<&Arc<RequestValues>, ValuesMissing> {
        self.values.as_ref().ok_or(ValuesMissing)
    }

    /// Records the final status for observability.
    ///
    /// Requires the values record to already exist.
    pub fn set_status_code(&self, code: u16) -> Result<(), ValuesMissing> {
        self.values()?.set_status(code);
        Ok(())
    }

    /// Claims attached by the authentication interceptor, when a presented
    /// credential validated.
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub(crate) fn attach_claims(&mut self, claims: Claims) {
        self.claims = Some(claims);
    }
}

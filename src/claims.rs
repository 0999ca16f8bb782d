//! Caller identity and the authenticator collaborator.
//!
//! graft never signs or verifies tokens itself. The [`BearerAuth`]
//! interceptor hands the raw token string to whatever [`Authenticator`]
//! the application wires in; a successful validation attaches [`Claims`]
//! to the call context and a failed one simply leaves the call
//! unauthenticated. Key storage, rotation, and signature schemes are the
//! implementor's private concern.
//!
//! [`BearerAuth`]: crate::middleware::BearerAuth

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role accepted by administrative endpoints.
pub const ROLE_ADMIN: &str = "ADMIN";
/// Role accepted by ordinary authenticated endpoints.
pub const ROLE_USER: &str = "USER";

/// Authenticated identity and role set derived from a verified credential.
///
/// The `Default` value — empty subject, no roles — is what public endpoints
/// see when no credential was presented. An endpoint that requires roles
/// never observes the default: the dispatcher rejects the call first.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Claims {
    pub subject: String,
    pub issuer: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub roles: Vec<String>,
}

impl Claims {
    /// True when `expires_at` is set and lies in the past.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Credential verification failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("{0}")]
    Other(String),
}

/// Token issuance and verification collaborator.
///
/// Implementations own their signing keys. `validate_token` must reject
/// tokens signed by any key the implementation does not trust.
pub trait Authenticator: Send + Sync + 'static {
    /// Verifies `token` and returns the claims it carries.
    fn validate_token(&self, token: &str) -> Result<Claims, AuthError>;

    /// Issues a token carrying `claims`.
    fn generate_token(&self, claims: Claims) -> Result<String, AuthError>;
}

//! Payload validation surface.
//!
//! Request and response shapes implement [`Validate`] with hand-written
//! constraint checks. Violations accumulate into an [`Invalid`] whose
//! `Display` is a stable JSON array of `{"field": …, "error": …}` records
//! — clients parse that text verbatim, so the shape must not change.
//!
//! ```rust
//! use graft::{Invalid, Validate};
//!
//! struct SignupRequest { email: String }
//!
//! impl Validate for SignupRequest {
//!     fn validate(&self) -> Result<(), Invalid> {
//!         let mut violations = Invalid::new();
//!         if !self.email.contains('@') {
//!             violations.push("email", "email must be a valid email address");
//!         }
//!         violations.finish()
//!     }
//! }
//! ```

use std::fmt;

use serde::Serialize;

/// A constraint check over one payload shape.
///
/// The dispatcher runs this defensively against every response payload;
/// handlers are expected to run it against their decoded request before
/// doing any work.
pub trait Validate {
    fn validate(&self) -> Result<(), Invalid>;
}

/// One violated constraint, tagged with the field it concerns.
#[derive(Clone, Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

/// The accumulated violations of a [`Validate`] check.
#[derive(Clone, Debug, Default)]
pub struct Invalid(Vec<FieldError>);

impl Invalid {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Records a violation for `field` described by `error`.
    pub fn push(&mut self, field: impl Into<String>, error: impl Into<String>) {
        self.0.push(FieldError { field: field.into(), error: error.into() });
    }

    /// Collapses into `Err(self)` when any violation was recorded.
    pub fn finish(self) -> Result<(), Invalid> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }
}

/// Renders the stable wire form: `[{"field":"…","error":"…"}, …]`.
impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("[]"),
        }
    }
}

impl std::error::Error for Invalid {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        alias: String,
    }

    impl Validate for Probe {
        fn validate(&self) -> Result<(), Invalid> {
            let mut violations = Invalid::new();
            if self.alias.is_empty() {
                violations.push("alias", "alias must be at least 1 character in length");
            }
            violations.finish()
        }
    }

    #[test]
    fn violation_renders_stable_json_array() {
        let err = Probe { alias: String::new() }.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"[{"field":"alias","error":"alias must be at least 1 character in length"}]"#
        );
    }

    #[test]
    fn empty_check_passes() {
        assert!(Probe { alias: "x".into() }.validate().is_ok());
        assert!(Invalid::new().finish().is_ok());
    }
}

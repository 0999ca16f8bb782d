//! The authorization decision.
//!
//! Pure, deterministic, side-effect-free. Policy: an endpoint with no
//! required roles is public; otherwise the caller needs *any one* of the
//! required roles, not all of them.

/// Returns whether `caller`'s roles satisfy an endpoint's `required` roles.
pub fn authorized(required: &[String], caller: &[String]) -> bool {
    if required.is_empty() {
        return true;
    }
    required.iter().any(|want| caller.iter().any(|has| has == want))
}

//! Shared error taxonomy for cross-tenant / ownership guards.
//!
//! Component-specific errors (diff rejection, LLM failures, preflight
//! failures, ...) live in their own crates; this only covers the
//! ownership invariant every query in the core must uphold — no result
//! ever crosses the tenant boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OwnerMismatch {
    #[error("resource {resource_id} belongs to a different tenant")]
    WrongTenant { resource_id: String },
}

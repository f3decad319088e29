//! Tenant identity — the isolation boundary for projects, jobs, events, and budgets.

use serde::{Deserialize, Serialize};

/// Opaque tenant identifier.
///
/// Unlike [`crate::JobId`]/[`crate::ProjectId`], tenant IDs are assigned by
/// the external authentication layer (not generated here), so this is a
/// thin newtype over `String` rather than a `define_id!` type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

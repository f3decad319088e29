//! Project — a cached on-disk working tree owned by a tenant.

use crate::job::{JobId, ProjectId};
use crate::tenant::TenantId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub tenant_id: TenantId,
    pub name: String,
    pub remote_url: Option<String>,
    pub local_path: String,
    pub created_at_ms: u64,
    pub published_url: Option<String>,
    pub published_at_ms: Option<u64>,
    pub published_job_id: Option<JobId>,
}

impl Project {
    pub fn new(
        id: ProjectId,
        tenant_id: TenantId,
        name: impl Into<String>,
        remote_url: Option<String>,
        local_path: impl Into<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            tenant_id,
            name: name.into(),
            remote_url,
            local_path: local_path.into(),
            created_at_ms,
            published_url: None,
            published_at_ms: None,
            published_job_id: None,
        }
    }

    pub fn mark_published(&mut self, url: impl Into<String>, job_id: JobId, at_ms: u64) {
        self.published_url = Some(url.into());
        self.published_job_id = Some(job_id);
        self.published_at_ms = Some(at_ms);
    }

    /// Whether the project has a configured remote (governs whether
    /// `PrPublisher` pushes/opens a PR at all).
    pub fn has_remote(&self) -> bool {
        self.remote_url.is_some()
    }
}

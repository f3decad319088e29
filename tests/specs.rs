//! Workspace-level integration specs: black-box scenarios against real
//! on-disk git repositories and a real (in-memory) sqlite store, with
//! fakes only at the genuinely-external boundaries (LLM provider, forge
//! API).

mod prelude;

mod billing {
    mod admission;
    mod cross_tenant;
}

mod diff {
    mod applicability_probe;
}

mod job {
    mod fallback_escalation;
    mod full_lifecycle;
}

mod server {
    mod startup;
}

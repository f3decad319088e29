//! Stage 5 (the dry-run `git apply --check`) needs a real worktree; the
//! crate's own unit tests stub it out with `FakeProbe`, so this exercises
//! [`pf_diff::FsGitProbe`] against an actual repository on disk.

use pf_diff::{validate, FsGitProbe, Stage, ValidatedDiff, DEFAULT_MAX_DIFF_SIZE};

use crate::prelude::init_repo;

#[test]
fn a_diff_against_the_real_checked_out_content_applies() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path(), &[("src/lib.rs", "fn old() {}\n")]);

    let diff = "diff --git a/src/lib.rs b/src/lib.rs\n\
                --- a/src/lib.rs\n\
                +++ b/src/lib.rs\n\
                @@ -1 +1 @@\n\
                -fn old() {}\n\
                +fn new() {}\n";

    let probe = FsGitProbe::new(dir.path());
    let result = validate(diff, "rename old to new", &probe, DEFAULT_MAX_DIFF_SIZE);
    match result {
        Ok(ValidatedDiff::Patch(_)) => {}
        other => panic!("expected the diff to apply cleanly against the real worktree, got {other:?}"),
    }
}

#[test]
fn a_diff_against_stale_content_is_rejected_at_the_probe_stage() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path(), &[("src/lib.rs", "fn completely_different() {}\n")]);

    let diff = "diff --git a/src/lib.rs b/src/lib.rs\n\
                --- a/src/lib.rs\n\
                +++ b/src/lib.rs\n\
                @@ -1 +1 @@\n\
                -fn old() {}\n\
                +fn new() {}\n";

    let probe = FsGitProbe::new(dir.path());
    let result = validate(diff, "rename old to new", &probe, DEFAULT_MAX_DIFF_SIZE);
    match result {
        Err(rejection) => assert_eq!(rejection.stage, Stage::ApplicabilityProbe),
        other => panic!("expected an applicability-probe rejection, got {other:?}"),
    }
}

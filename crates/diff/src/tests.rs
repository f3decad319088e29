//! End-to-end tests for [`validate`], exercising the full five-stage pipeline.

use crate::probe::test_support::FakeProbe;
use crate::{validate, ValidatedDiff, DEFAULT_MAX_DIFF_SIZE};

fn ok_diff() -> String {
    "diff --git a/src/lib.rs b/src/lib.rs\n\
     --- a/src/lib.rs\n\
     +++ b/src/lib.rs\n\
     @@ -1 +1 @@\n\
     -old\n\
     +new\n"
        .to_string()
}

#[test]
fn validates_a_clean_diff_end_to_end() {
    let mut probe = FakeProbe::default();
    probe.existing_files.insert("src/lib.rs".to_string());

    let result = validate(&ok_diff(), "fix the bug in lib.rs", &probe, DEFAULT_MAX_DIFF_SIZE);
    match result {
        Ok(ValidatedDiff::Patch(text)) => assert!(text.ends_with('\n') && !text.ends_with("\n\n")),
        other => panic!("expected a validated patch, got {other:?}"),
    }
}

#[test]
fn recognises_the_no_changes_sentinel() {
    let probe = FakeProbe::default();
    let result = validate("NO_CHANGES", "nothing to do here", &probe, DEFAULT_MAX_DIFF_SIZE);
    assert_eq!(result.unwrap(), ValidatedDiff::NoChanges);
}

#[test]
fn boundary_at_max_diff_size_lines() {
    let probe = {
        let mut p = FakeProbe::default();
        p.existing_files.insert("src/lib.rs".to_string());
        p
    };

    // Build a diff with exactly DEFAULT_MAX_DIFF_SIZE lines by padding the
    // hunk with context lines.
    let header = "diff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1,1 +1,1 @@\n-old\n+new\n";
    let header_lines = header.lines().count();
    let pad_needed = DEFAULT_MAX_DIFF_SIZE - header_lines;
    let mut padded = header.trim_end_matches('\n').to_string();
    padded.push('\n');
    for _ in 0..pad_needed {
        padded.push_str(" context\n");
    }

    assert_eq!(padded.lines().count(), DEFAULT_MAX_DIFF_SIZE);
    assert!(validate(&padded, "pad the file", &probe, DEFAULT_MAX_DIFF_SIZE).is_ok());

    let mut too_long = padded.clone();
    too_long.push_str(" one more\n");
    assert!(validate(&too_long, "pad the file", &probe, DEFAULT_MAX_DIFF_SIZE).is_err());
}

#[test]
fn rejects_commentary_wrapped_around_a_fenced_diff() {
    let probe = FakeProbe::default();
    let raw = format!("Here's the diff:\n```diff\n{}\n```", ok_diff().trim_end());
    assert!(validate(&raw, "fix the bug", &probe, DEFAULT_MAX_DIFF_SIZE).is_err());
}

#[test]
fn rejects_new_file_that_already_exists_in_the_worktree() {
    let diff = "diff --git a/src/new.rs b/src/new.rs\n\
                new file mode 100644\n\
                --- /dev/null\n\
                +++ b/src/new.rs\n\
                @@ -0,0 +1 @@\n\
                +hello\n";
    let mut probe = FakeProbe::default();
    probe.existing_files.insert("src/new.rs".to_string());

    let result = validate(diff, "add a new helper file", &probe, DEFAULT_MAX_DIFF_SIZE);
    assert!(result.is_err());
}

#[test]
fn surfaces_the_applicability_probe_failure_as_feedback() {
    let mut probe = FakeProbe::default();
    probe.existing_files.insert("src/lib.rs".to_string());
    probe.apply_result = Err("error: patch does not apply".to_string());

    let err = validate(&ok_diff(), "fix the bug", &probe, DEFAULT_MAX_DIFF_SIZE).unwrap_err();
    assert!(err.feedback().contains("patch does not apply"));
}

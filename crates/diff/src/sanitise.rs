//! Stages 1-2 of the validator: normalise and sanitise (pure string ops).

use crate::{Rejection, Stage};

pub enum Normalised {
    NoChanges,
    Diff(String),
}

/// Prefixes that flag the text as conversational commentary rather than a
/// bare diff.
const COMMENTARY_PREFIXES: &[&str] = &[
    "Here's", "Sure", "I'll", "Let me", "I've", "I have", "This diff", "This patch",
    "This change", "The diff", "The patch", "The change", "Below is", "Above is",
];

fn starts_with_commentary(line: &str) -> bool {
    let trimmed = line.trim_start();
    COMMENTARY_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

/// Stage 1: normalise.
pub fn normalise(raw: &str) -> Result<Normalised, Rejection> {
    let trimmed = raw.trim();

    if trimmed.contains("NO_CHANGES") {
        return Ok(Normalised::NoChanges);
    }

    let stripped = strip_surrounding_fence(trimmed);

    if !stripped.trim_start().starts_with("diff --git ") {
        return Err(Rejection::single(
            Stage::Normalise,
            "expected output to begin with 'diff --git ' (after stripping a surrounding code fence)",
        ));
    }

    Ok(Normalised::Diff(stripped.to_string()))
}

/// Strip a code fence only when it wraps the *entire* trimmed text: the
/// first line is ``` (optionally followed by a language tag) and the last
/// line is a bare ```. Commentary preceding a fence is deliberately left
/// untouched here — it is either caught by the `starts_with` check above,
/// or (if it ended up *inside* the fence) by stage 2's commentary scan.
fn strip_surrounding_fence(s: &str) -> String {
    let Some(rest) = s.strip_prefix("```") else {
        return s.to_string();
    };
    let after_lang = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => return s.to_string(),
    };
    let trimmed_end = after_lang.trim_end();
    match trimmed_end.strip_suffix("```") {
        Some(body) => body.trim_end_matches('\n').to_string(),
        None => s.to_string(),
    }
}

/// Stage 2: sanitise.
pub fn sanitise(text: &str) -> Result<String, Rejection> {
    let lines: Vec<&str> = text.lines().collect();

    let first_diff_idx = lines
        .iter()
        .position(|l| l.starts_with("diff --git "))
        .ok_or_else(|| Rejection::single(Stage::Sanitise, "no 'diff --git' line found"))?;

    for line in &lines[..first_diff_idx] {
        if starts_with_commentary(line) {
            return Err(Rejection::single(
                Stage::Sanitise,
                format!("commentary line before the diff: {line:?}"),
            ));
        }
        if !line.trim().is_empty() {
            return Err(Rejection::single(
                Stage::Sanitise,
                format!("non-empty content before the first 'diff --git' line: {line:?}"),
            ));
        }
    }

    // A trailing fence marker is tolerated as a defensive double-strip;
    // any *other* occurrence of a fence marker anywhere in the body rejects.
    let mut body_lines: Vec<&str> = lines[first_diff_idx..].to_vec();
    if let Some(last) = body_lines.last() {
        if last.trim() == "```" {
            body_lines.pop();
        }
    }
    for line in &body_lines {
        if line.trim_start().starts_with("```") {
            return Err(Rejection::single(
                Stage::Sanitise,
                "unexpected markdown code fence inside the diff body",
            ));
        }
    }

    // Hunk-body commentary scan: any +/-/space line whose content (after
    // the leading marker) looks conversational is rejected.
    let mut in_hunk = false;
    for line in &body_lines {
        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }
        if line.starts_with("diff --git ") {
            in_hunk = false;
            continue;
        }
        if !in_hunk {
            continue;
        }
        if let Some(content) = line.strip_prefix('+').or_else(|| line.strip_prefix('-')) {
            if starts_with_commentary(content) {
                return Err(Rejection::single(
                    Stage::Sanitise,
                    format!("commentary text found inside a hunk body: {line:?}"),
                ));
            }
        }
    }

    Ok(body_lines.join("\n") + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_changes_token_short_circuits() {
        matches!(normalise("NO_CHANGES").unwrap(), Normalised::NoChanges);
        matches!(normalise("   some NO_CHANGES trailer").unwrap(), Normalised::NoChanges);
    }

    #[test]
    fn rejects_non_diff_text() {
        assert!(normalise("I cannot help with that").is_err());
    }

    #[test]
    fn strips_a_fully_surrounding_fence() {
        let raw = "```diff\ndiff --git a/x b/x\nindex 1..2 100644\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n```";
        match normalise(raw).unwrap() {
            Normalised::Diff(d) => assert!(d.starts_with("diff --git ")),
            Normalised::NoChanges => panic!("expected diff"),
        }
    }

    #[test]
    fn rejects_commentary_before_fenced_diff() {
        let raw = "Here's the diff:\n```diff\ndiff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n```";
        assert!(normalise(raw).is_err());
    }

    #[test]
    fn sanitise_rejects_extra_fence_marker() {
        let text = "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n```\nmore\n";
        assert!(sanitise(text).is_err());
    }

    #[test]
    fn sanitise_tolerates_trailing_fence() {
        let text = "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n```";
        assert!(sanitise(text).is_ok());
    }

    #[test]
    fn sanitise_rejects_commentary_inside_hunk() {
        let text = "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+Here's the fix\n";
        assert!(sanitise(text).is_err());
    }
}

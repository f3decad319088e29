//! Stage 3 (structural) and stage 4 (pre-apply sanity, worktree-aware).

use crate::{Rejection, Stage, WorktreeProbe};

/// One `diff --git a/... b/...` block, with its declared paths and whether
/// it introduces a brand-new file (`--- /dev/null`).
#[derive(Debug, Clone)]
pub struct FileBlock {
    pub old_path: String,
    pub new_path: String,
    pub is_new_file: bool,
    pub is_deleted_file: bool,
    pub has_old_header: bool,
    pub has_new_header: bool,
    pub hunk_count: usize,
    pub body: String,
}

/// Deletion-intent keywords a prompt must contain for a diff to be allowed
/// to delete a file (stage 4 "deletion sanity" rule).
const DELETION_INTENT_WORDS: &[&str] =
    &["delete", "remove", "drop", "eliminate", "get rid of", "take out", "rm ", "unlink"];

pub fn structural_validate(text: &str, max_lines: usize) -> Result<(), Rejection> {
    let line_count = text.lines().count();
    if line_count < 3 {
        return Err(Rejection::single(Stage::Structural, "diff has fewer than 3 lines"));
    }
    if line_count > max_lines {
        return Err(Rejection::single(
            Stage::Structural,
            format!("diff spans {line_count} lines, exceeding the {max_lines}-line limit"),
        ));
    }

    if !text.contains("diff --git ") {
        return Err(Rejection::single(Stage::Structural, "no 'diff --git' header found"));
    }

    for block in parse_file_blocks(text) {
        if !block.has_old_header || !block.has_new_header {
            return Err(Rejection::single(
                Stage::Structural,
                format!("file block for '{}' is missing a '---'/'+++' header pair", block.new_path),
            ));
        }
        if block.hunk_count == 0 {
            return Err(Rejection::single(
                Stage::Structural,
                format!("file block for '{}' has no '@@' hunk marker", block.new_path),
            ));
        }
        validate_hunk_line_prefixes(&block)?;
    }

    Ok(())
}

fn validate_hunk_line_prefixes(block: &FileBlock) -> Result<(), Rejection> {
    let mut in_hunk = false;
    for line in block.body.lines() {
        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }
        if !in_hunk || line.is_empty() {
            continue;
        }
        let first = line.chars().next();
        if !matches!(first, Some('+') | Some('-') | Some(' ') | Some('\\')) {
            return Err(Rejection::single(
                Stage::Structural,
                format!("hunk line in '{}' does not start with +, -, space, or \\: {line:?}", block.new_path),
            ));
        }
    }
    Ok(())
}

/// Split a sanitised diff into per-file blocks.
pub fn parse_file_blocks(text: &str) -> Vec<FileBlock> {
    let mut blocks = Vec::new();
    let lines: Vec<&str> = text.lines().collect();

    let mut starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.starts_with("diff --git "))
        .map(|(i, _)| i)
        .collect();
    starts.push(lines.len());

    for window in starts.windows(2) {
        let (start, end) = (window[0], window[1]);
        let chunk = &lines[start..end];
        blocks.push(parse_one_block(chunk));
    }

    blocks
}

fn parse_one_block(chunk: &[&str]) -> FileBlock {
    let header = chunk.first().copied().unwrap_or_default();
    let (mut old_path, mut new_path) = parse_git_header_paths(header);

    let mut is_new_file = false;
    let mut is_deleted_file = false;
    let mut has_old_header = false;
    let mut has_new_header = false;
    let mut hunk_count = 0;

    for line in chunk.iter().skip(1) {
        if *line == "new file mode" || line.starts_with("new file mode") {
            is_new_file = true;
        } else if line.starts_with("deleted file mode") {
            is_deleted_file = true;
        } else if *line == "--- /dev/null" {
            is_new_file = true;
            has_old_header = true;
        } else if *line == "+++ /dev/null" {
            is_deleted_file = true;
            has_new_header = true;
        } else if let Some(path) = line.strip_prefix("--- a/") {
            old_path = path.to_string();
            has_old_header = true;
        } else if let Some(path) = line.strip_prefix("+++ b/") {
            new_path = path.to_string();
            has_new_header = true;
        } else if line.starts_with("@@") {
            hunk_count += 1;
        }
    }

    FileBlock {
        old_path,
        new_path,
        is_new_file,
        is_deleted_file,
        has_old_header,
        has_new_header,
        hunk_count,
        body: chunk.join("\n"),
    }
}

fn parse_git_header_paths(header: &str) -> (String, String) {
    let rest = header.trim_start_matches("diff --git ");
    let mut parts = rest.splitn(2, " b/");
    let a = parts.next().unwrap_or_default().trim_start_matches("a/");
    let b = parts.next().unwrap_or_default();
    (a.to_string(), b.to_string())
}

/// Stage 4: worktree-aware sanity checks before spending a `git apply`.
pub fn pre_apply_sanity(
    blocks: &[FileBlock],
    prompt: &str,
    probe: &dyn WorktreeProbe,
) -> Result<(), Rejection> {
    let prompt_lower = prompt.to_lowercase();
    let prompt_requests_deletion = DELETION_INTENT_WORDS.iter().any(|w| prompt_lower.contains(w));

    for block in blocks {
        if block.is_new_file && probe.file_exists(&block.new_path) {
            return Err(Rejection::single(
                Stage::PreApplySanity,
                format!("diff creates '{}' as a new file, but it already exists", block.new_path),
            ));
        }
        if block.is_deleted_file {
            if !prompt_requests_deletion {
                return Err(Rejection::single(
                    Stage::PreApplySanity,
                    format!(
                        "diff deletes '{}' but the prompt contains no deletion keyword",
                        block.old_path
                    ),
                ));
            }
            if !probe.file_exists(&block.old_path) {
                return Err(Rejection::single(
                    Stage::PreApplySanity,
                    format!("diff deletes '{}', which does not exist in the worktree", block.old_path),
                ));
            }
        }
    }

    Ok(())
}

/// Normalise trailing newlines so the validated diff ends with exactly one.
pub fn ensure_single_trailing_newline(text: &str) -> String {
    format!("{}\n", text.trim_end_matches('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::test_support::FakeProbe;

    fn sample_diff() -> String {
        "diff --git a/src/lib.rs b/src/lib.rs\n\
         --- a/src/lib.rs\n\
         +++ b/src/lib.rs\n\
         @@ -1 +1 @@\n\
         -old\n\
         +new\n"
            .to_string()
    }

    #[test]
    fn structural_validate_accepts_exactly_max_lines() {
        let diff = sample_diff();
        let line_count = diff.lines().count();
        assert!(structural_validate(&diff, line_count).is_ok());
        assert!(structural_validate(&diff, line_count - 1).is_err());
    }

    #[test]
    fn parses_a_single_file_block() {
        let blocks = parse_file_blocks(&sample_diff());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].new_path, "src/lib.rs");
        assert_eq!(blocks[0].hunk_count, 1);
        assert!(!blocks[0].is_new_file);
    }

    #[test]
    fn pre_apply_sanity_rejects_new_file_that_already_exists() {
        let diff = "diff --git a/src/new.rs b/src/new.rs\n\
                    new file mode 100644\n\
                    --- /dev/null\n\
                    +++ b/src/new.rs\n\
                    @@ -0,0 +1 @@\n\
                    +hello\n";
        let blocks = parse_file_blocks(diff);
        let mut probe = FakeProbe::default();
        probe.existing_files.insert("src/new.rs".to_string());
        let result = pre_apply_sanity(&blocks, "add a new file", &probe);
        assert!(result.is_err());
    }

    #[test]
    fn pre_apply_sanity_rejects_unrequested_deletion() {
        let diff = "diff --git a/src/old.rs b/src/old.rs\n\
                    deleted file mode 100644\n\
                    --- a/src/old.rs\n\
                    +++ /dev/null\n\
                    @@ -1 +0,0 @@\n\
                    -bye\n";
        let blocks = parse_file_blocks(diff);
        let mut probe = FakeProbe::default();
        probe.existing_files.insert("src/old.rs".to_string());
        let result = pre_apply_sanity(&blocks, "fix the off-by-one bug", &probe);
        assert!(result.is_err());
    }

    #[test]
    fn pre_apply_sanity_rejects_deleting_a_file_that_does_not_exist() {
        let diff = "diff --git a/src/gone.rs b/src/gone.rs\n\
                    deleted file mode 100644\n\
                    --- a/src/gone.rs\n\
                    +++ /dev/null\n\
                    @@ -1 +0,0 @@\n\
                    -bye\n";
        let blocks = parse_file_blocks(diff);
        let probe = FakeProbe::default();
        let result = pre_apply_sanity(&blocks, "please remove src/gone.rs", &probe);
        assert!(result.is_err());
    }

    #[test]
    fn ensure_single_trailing_newline_collapses_many() {
        assert_eq!(ensure_single_trailing_newline("abc\n\n\n"), "abc\n");
        assert_eq!(ensure_single_trailing_newline("abc"), "abc\n");
    }
}

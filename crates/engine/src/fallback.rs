//! Fallback-mode directive: extracting the files a failed `git apply`
//! named, and rendering the instruction injected into the next LLM
//! prompt.

use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static PATCH_FAILED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^patch failed: ([^:\n]+):").expect("constant regex pattern is valid")
});
#[allow(clippy::expect_used)]
static DOES_NOT_APPLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([^:\n]+): patch does not apply$").expect("constant regex pattern is valid")
});

/// Parse the file paths named in a `git apply` stderr. Order of first
/// appearance is preserved; duplicates are dropped.
pub fn extract_fallback_files(stderr: &str) -> Vec<String> {
    let mut files = Vec::new();
    for captures in PATCH_FAILED.captures_iter(stderr).chain(DOES_NOT_APPLY.captures_iter(stderr)) {
        let file = captures[1].trim().to_string();
        if !files.contains(&file) {
            files.push(file);
        }
    }
    files
}

/// Render the directive text injected into the next LLM prompt. An empty
/// `files` list means global fallback (no specific file could be parsed
/// out of the error).
pub fn directive(files: &[String]) -> String {
    if files.is_empty() {
        "FALLBACK MODE for all changed files: emit the full replacement contents of every file \
         you change instead of a diff hunk."
            .to_string()
    } else {
        format!("FALLBACK MODE for files: {}", files.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_single_patch_failed_file() {
        let stderr = "error: patch failed: src/a.ts:12\nerror: src/a.ts: patch does not apply";
        assert_eq!(extract_fallback_files(stderr), vec!["src/a.ts".to_string()]);
    }

    #[test]
    fn directive_names_the_extracted_files() {
        assert_eq!(
            directive(&["src/a.ts".to_string()]),
            "FALLBACK MODE for files: src/a.ts".to_string()
        );
    }

    #[test]
    fn empty_extraction_yields_the_global_directive() {
        assert!(directive(&[]).starts_with("FALLBACK MODE for all changed files"));
    }

    #[test]
    fn no_matches_in_an_unrelated_error_yields_empty() {
        assert!(extract_fallback_files("fatal: not a git repository").is_empty());
    }
}

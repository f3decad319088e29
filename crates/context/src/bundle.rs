//! Stage 5-6: size-bounded assembly and formatting of the final bundle.

/// The assembled, LLM-ready snapshot of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBundle {
    pub text: String,
    pub truncated: bool,
    pub files: Vec<String>,
}

/// Assemble `files` (already in the order they should be emitted) into a
/// single formatted string, stopping before any file that would push the
/// cumulative character count past `max_context_size`.
///
/// A file is never partially included: the cap is checked before each
/// file is appended, so reaching it exactly after the last available file
/// is not truncation, but stopping with files still unprocessed is.
pub fn assemble(files: Vec<(String, String)>, max_context_size: usize) -> ContextBundle {
    let mut text = String::new();
    let mut included = Vec::new();
    let mut truncated = false;

    for (path, content) in files {
        if text.len() >= max_context_size {
            truncated = true;
            break;
        }
        text.push_str("--- ");
        text.push_str(&path);
        text.push_str(" ---\n");
        text.push_str(&content);
        text.push('\n');
        included.push(path);
    }

    ContextBundle { text, truncated, files: included }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_file_with_a_path_banner() {
        let bundle = assemble(vec![("a.ts".to_string(), "const a = 1;".to_string())], 10_000);
        assert_eq!(bundle.text, "--- a.ts ---\nconst a = 1;\n");
        assert!(!bundle.truncated);
    }

    #[test]
    fn exactly_at_the_cap_after_the_last_file_is_not_truncated() {
        let content = "x".repeat(10);
        let files = vec![("a.ts".to_string(), content)];
        let bundle = assemble(files, "--- a.ts ---\n".len() + 10 + 1);
        assert!(!bundle.truncated);
    }

    #[test]
    fn one_more_file_past_the_cap_is_truncated() {
        let files = vec![
            ("a.ts".to_string(), "x".repeat(10)),
            ("b.ts".to_string(), "y".repeat(10)),
        ];
        let exact_len_for_first = "--- a.ts ---\n".len() + 10 + 1;
        let bundle = assemble(files, exact_len_for_first);
        assert!(bundle.truncated);
        assert_eq!(bundle.files, vec!["a.ts".to_string()]);
    }
}

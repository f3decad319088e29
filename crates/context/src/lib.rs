// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pf-context: the ContextBuilder — a deterministic, size-bounded
//! repository-to-prompt-context projector.
//!
//! Keyword extraction -> lexical search (with entry-point/README fallback)
//! -> lexicographic ordering -> 1-hop import expansion -> size-bounded
//! assembly. No network or LLM access; pure filesystem reads under `root`.

pub mod bundle;
pub mod imports;
pub mod keywords;
pub mod search;

pub use bundle::ContextBundle;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Default character ceiling for an assembled context bundle
/// (`MAX_CONTEXT_SIZE`).
pub const DEFAULT_MAX_CONTEXT_SIZE: usize = 50_000;

/// Build a context bundle for `prompt` against the repository rooted at
/// `root`, bounded to `max_context_size` characters.
///
/// 1. Extract up to 5 keywords from `prompt`.
/// 2. Lexically search source files for those keywords; if nothing
///    matches, fall back to common entry points, then README/manifest
///    files.
/// 3. Sort matches lexicographically for determinism.
/// 4. For each file (in order), read its content and recursively resolve
///    its 1-hop local imports, adding any newly discovered files to the
///    same sorted set.
/// 5. Assemble into a single formatted string, stopping once the
///    cumulative size would exceed `max_context_size`.
pub fn build_context(root: &Path, prompt: &str, max_context_size: usize) -> ContextBundle {
    let keywords = keywords::extract_keywords(prompt);

    let mut matches = search::lexical_search(root, &keywords);
    if matches.is_empty() {
        matches = search::fallback_entry_points(root);
    }
    if matches.is_empty() {
        matches = search::readme_fallback(root);
    }

    let mut ordered: BTreeSet<PathBuf> = matches.into_iter().collect();
    let mut visited: BTreeSet<PathBuf> = BTreeSet::new();
    let mut queue: Vec<PathBuf> = ordered.iter().cloned().collect();

    let mut files: Vec<(String, String)> = Vec::new();

    // Breadth-first 1-hop expansion: every file's imports are resolved and
    // added to the working set once, in lexicographic order overall.
    while let Some(path) = pop_lexicographically_first(&mut queue, &visited) {
        visited.insert(path.clone());
        let Ok(content) = std::fs::read_to_string(&path) else { continue };

        for specifier in imports::parse_imports(&content, &path) {
            if let Some(resolved) = imports::resolve_import(&path, &specifier, root) {
                if ordered.insert(resolved.clone()) {
                    queue.push(resolved);
                }
            }
        }

        let rel = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
        files.push((rel, content));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    bundle::assemble(files, max_context_size)
}

fn pop_lexicographically_first(queue: &mut Vec<PathBuf>, visited: &BTreeSet<PathBuf>) -> Option<PathBuf> {
    queue.retain(|p| !visited.contains(p));
    if queue.is_empty() {
        return None;
    }
    queue.sort();
    Some(queue.remove(0))
}

//! Stage 2-3: lexical keyword search and entry-point fallback probing.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extensions the lexical search scans.
pub const SOURCE_EXTENSIONS: &[&str] =
    &["js", "jsx", "ts", "tsx", "py", "go", "java", "c", "cpp", "h", "hpp"];

/// Directories never descended into — large, generated, or vendored trees
/// that would dominate a lexical scan without containing anything a
/// keyword search should surface.
const SKIP_DIRS: &[&str] =
    &["node_modules", ".git", "dist", "build", ".next", "coverage", "target", "vendor"];

const ENTRY_POINT_CANDIDATES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.js",
    "index.jsx",
    "main.ts",
    "main.js",
    "app.ts",
    "app.js",
    "src/index.ts",
    "src/index.js",
    "src/main.ts",
    "src/main.js",
    "src/app.ts",
    "src/app.js",
    "apps/web/package.json",
    "apps/web/vite.config.ts",
    "apps/web/vite.config.js",
];

const README_CANDIDATES: &[&str] = &["README.md", "readme.md", "package.json"];

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.file_name().to_str().map(|name| SKIP_DIRS.contains(&name)).unwrap_or(false)
}

/// Walk `root`, returning every file whose extension is a source extension
/// and whose contents contain at least one of `keywords` (case-insensitive).
pub fn lexical_search(root: &Path, keywords: &[String]) -> Vec<PathBuf> {
    if keywords.is_empty() {
        return Vec::new();
    }
    let mut matches = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_skipped_dir(e)).flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let has_source_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if !has_source_extension {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(path) else { continue };
        let lower = content.to_lowercase();
        if keywords.iter().any(|kw| lower.contains(kw.as_str())) {
            matches.push(path.to_path_buf());
        }
    }
    matches
}

/// A fixed set of common entry points, filtered to the ones that exist.
pub fn fallback_entry_points(root: &Path) -> Vec<PathBuf> {
    ENTRY_POINT_CANDIDATES
        .iter()
        .map(|rel| root.join(rel))
        .filter(|p| p.is_file())
        .collect()
}

/// README/manifest fallback, tried only once entry-point probing also
/// turns up nothing.
pub fn readme_fallback(root: &Path) -> Vec<PathBuf> {
    README_CANDIDATES.iter().map(|rel| root.join(rel)).filter(|p| p.is_file()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn lexical_search_matches_keyword_in_content() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/login.ts", "export function login() {}");
        write(dir.path(), "src/other.ts", "export function unrelated() {}");

        let matches = lexical_search(dir.path(), &["login".to_string()]);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].ends_with("login.ts"));
    }

    #[test]
    fn lexical_search_skips_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "node_modules/pkg/login.ts", "login login login");

        let matches = lexical_search(dir.path(), &["login".to_string()]);
        assert!(matches.is_empty());
    }

    #[test]
    fn fallback_entry_points_finds_existing_candidates_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.ts", "// entry");

        let entries = fallback_entry_points(dir.path());
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("src/index.ts"));
    }
}

//! Stage 4: 1-hop import parsing and local-file resolution.
//!
//! Only relative/absolute specifiers are followed (anything starting with
//! `.` or `/`); bare package imports (`react`, `lodash`, `os`) are left
//! alone.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static JS_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\s+(?:[\s\S]*?from\s+)?['"]([^'"]+)['"]"#).expect("constant regex pattern is valid"));
#[allow(clippy::expect_used)]
static JS_REQUIRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).expect("constant regex pattern is valid"));
#[allow(clippy::expect_used)]
static PY_FROM_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*from\s+([.\w]+)\s+import\b").expect("constant regex pattern is valid"));
#[allow(clippy::expect_used)]
static PY_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*import\s+([.\w]+)").expect("constant regex pattern is valid"));

const RESOLUTION_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "py"];
const INDEX_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

enum Language {
    JavaScript,
    Python,
    Other,
}

fn language_for(path: &Path) -> Language {
    match path.extension().and_then(|e| e.to_str()) {
        Some("js") | Some("jsx") | Some("ts") | Some("tsx") => Language::JavaScript,
        Some("py") => Language::Python,
        _ => Language::Other,
    }
}

/// Extract bare import specifiers from `content`, based on `path`'s
/// extension. Only specifiers that look relative/absolute are returned;
/// package-name imports are filtered out here.
pub fn parse_imports(content: &str, path: &Path) -> Vec<String> {
    let specifiers: Vec<String> = match language_for(path) {
        Language::JavaScript => JS_IMPORT
            .captures_iter(content)
            .chain(JS_REQUIRE.captures_iter(content))
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect(),
        Language::Python => PY_FROM_IMPORT
            .captures_iter(content)
            .chain(PY_IMPORT.captures_iter(content))
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect(),
        Language::Other => Vec::new(),
    };

    specifiers.into_iter().filter(|s| is_followable(s)).collect()
}

fn is_followable(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/')
}

/// Resolve a relative import specifier against the file that contains it,
/// trying (in order): the exact path, each resolution extension appended,
/// `<path>/index.{ext}`, then `<path>/__init__.py`.
pub fn resolve_import(from_file: &Path, specifier: &str, root: &Path) -> Option<PathBuf> {
    let dir = from_file.parent()?;
    let candidate = if let Some(rel) = python_relative(specifier) {
        let up_levels = specifier.chars().take_while(|c| *c == '.').count() - 1;
        let mut base = dir.to_path_buf();
        for _ in 0..up_levels {
            base = base.parent()?.to_path_buf();
        }
        if rel.as_os_str().is_empty() { base } else { base.join(rel) }
    } else {
        dir.join(specifier)
    };

    if candidate.is_file() {
        return Some(canonical_within(&candidate, root));
    }
    for ext in RESOLUTION_EXTENSIONS {
        let with_ext = append_extension(&candidate, ext);
        if with_ext.is_file() {
            return Some(canonical_within(&with_ext, root));
        }
    }
    for ext in INDEX_EXTENSIONS {
        let index = candidate.join(format!("index.{ext}"));
        if index.is_file() {
            return Some(canonical_within(&index, root));
        }
    }
    let init_py = candidate.join("__init__.py");
    if init_py.is_file() {
        return Some(canonical_within(&init_py, root));
    }

    None
}

/// Python's `from . import foo` / `from .sub import foo` style specifiers
/// address a module relative to the importing file's *package* directory,
/// not the file itself; treat every leading dot as one directory level up
/// from the file's own directory.
fn python_relative(specifier: &str) -> Option<PathBuf> {
    let leading_dots = specifier.chars().take_while(|c| *c == '.').count();
    if leading_dots == 0 {
        return None;
    }
    let rest = &specifier[leading_dots..];
    Some(PathBuf::from(rest.replace('.', "/")))
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// Normalises `..`/`.` segments so downstream sorting and formatting is
/// stable; paths outside `root` are left as-is for the caller to drop.
fn canonical_within(path: &Path, root: &Path) -> PathBuf {
    let canonical_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    match canonical_path.strip_prefix(&canonical_root) {
        Ok(rel) => root.join(rel),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    #[test]
    fn parses_js_import_and_require_specifiers() {
        let content = "import { foo } from './foo';\nconst bar = require('../bar');\nimport react from 'react';";
        let specifiers = parse_imports(content, Path::new("src/index.js"));
        assert_eq!(specifiers, vec!["./foo".to_string(), "../bar".to_string()]);
    }

    #[test]
    fn parses_python_relative_imports_only() {
        let content = "from .models import User\nimport os\nfrom . import utils\n";
        let specifiers = parse_imports(content, Path::new("app/views.py"));
        assert_eq!(specifiers, vec![".models".to_string(), ".".to_string()]);
    }

    #[test]
    fn resolves_relative_specifier_by_appending_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/foo.ts"), "export const foo = 1;").unwrap();
        fs::write(dir.path().join("src/index.ts"), "import { foo } from './foo';").unwrap();

        let resolved = resolve_import(&dir.path().join("src/index.ts"), "./foo", dir.path());
        assert!(resolved.is_some());
        assert!(resolved.unwrap().ends_with("src/foo.ts"));
    }

    #[test]
    fn resolves_directory_import_via_index_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/widgets")).unwrap();
        fs::write(dir.path().join("src/widgets/index.ts"), "export {};").unwrap();

        let resolved = resolve_import(&dir.path().join("src/app.ts"), "./widgets", dir.path());
        assert!(resolved.unwrap().ends_with("src/widgets/index.ts"));
    }

    #[test]
    fn does_not_resolve_a_package_import() {
        assert!(!is_followable("react"));
        assert!(is_followable("./sibling"));
        assert!(is_followable("/abs/path"));
    }
}

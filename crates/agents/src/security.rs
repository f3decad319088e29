//! Security agent: a fixed-rule-set scanner over the worktree. Finding
//! *details* (file paths, matched values) never leave this crate's return
//! value into the tenant-visible event stream — callers surface only the
//! aggregate counts there, and the details to their own process log.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

const SKIP_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", ".next", "coverage"];
const TEST_FIXTURE_MARKERS: &[&str] = &["__fixtures__", "/fixtures/", ".fixture.", "/testdata/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
}

struct SecurityRule {
    name: &'static str,
    severity: Severity,
    pattern: Lazy<Regex>,
}

macro_rules! rule {
    ($name:expr, $severity:expr, $pattern:expr) => {
        SecurityRule { name: $name, severity: $severity, pattern: Lazy::new(|| Regex::new($pattern).expect("constant regex pattern is valid")) }
    };
}

#[allow(clippy::expect_used)]
static RULES: &[SecurityRule] = &[
    rule!(
        "hardcoded_secret_assignment",
        Severity::Critical,
        r#"(?i)\b(api[_-]?key|secret|password|passwd|token)\s*[:=]\s*['"][A-Za-z0-9_\-\/+=]{12,}['"]"#
    ),
    rule!("aws_access_key", Severity::Critical, r"\bAKIA[0-9A-Z]{16}\b"),
    rule!("github_token", Severity::Critical, r"\bgh[pousr]_[A-Za-z0-9]{36,}\b"),
    rule!("stripe_key", Severity::Critical, r"\bsk_(live|test)_[A-Za-z0-9]{16,}\b"),
    rule!("pem_private_key", Severity::Critical, r"-----BEGIN (RSA |EC |OPENSSH |DSA |)PRIVATE KEY-----"),
    rule!(
        "env_var_exposed_in_response",
        Severity::Critical,
        r"(?i)(res\.(json|send|write)|console\.(log|error|warn))\([^)]*process\.env"
    ),
    rule!(
        "rls_disabled",
        Severity::Critical,
        r"(?i)alter\s+table\s+\S+\s+disable\s+row\s+level\s+security"
    ),
    rule!(
        "route_without_auth_reference",
        Severity::Warning,
        r#"(?i)(app|router)\.(get|post|put|patch|delete)\(\s*['"][^'"]+['"]\s*,\s*(async\s*)?\([^)]*\)\s*=>"#
    ),
];

#[derive(Debug, Clone)]
pub struct SecurityFinding {
    pub rule: &'static str,
    pub severity: Severity,
    pub file: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SecurityReport {
    pub critical_count: usize,
    pub warning_count: usize,
    pub findings: Vec<SecurityFinding>,
}

impl SecurityReport {
    /// The engine treats `blocked=true` as fatal.
    pub fn blocked(&self) -> bool {
        self.critical_count > 0
    }
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.file_name().to_str().map(|name| SKIP_DIRS.contains(&name)).unwrap_or(false)
}

fn is_test_fixture(path: &Path) -> bool {
    let s = path.to_string_lossy();
    TEST_FIXTURE_MARKERS.iter().any(|marker| s.contains(marker))
}

/// Walk `root`, scanning every non-fixture file's text content against
/// the fixed rule set. Binary files (non-UTF8) are skipped silently.
pub fn scan_security(root: &Path) -> SecurityReport {
    let mut findings = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_skipped_dir(e)).flatten() {
        if !entry.file_type().is_file() || is_test_fixture(entry.path()) {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(entry.path()) else { continue };

        for (line_no, line) in content.lines().enumerate() {
            for rule in RULES {
                if rule.pattern.is_match(line) {
                    findings.push(SecurityFinding {
                        rule: rule.name,
                        severity: rule.severity,
                        file: entry.path().to_path_buf(),
                        line: line_no + 1,
                    });
                }
            }
        }
    }

    let critical_count = findings.iter().filter(|f| f.severity == Severity::Critical).count();
    let warning_count = findings.iter().filter(|f| f.severity == Severity::Warning).count();
    SecurityReport { critical_count, warning_count, findings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn flags_a_hardcoded_secret_as_critical_and_blocking() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.js"), "const apiKey = \"sk_live_abcdefghijklmnop\";").unwrap();

        let report = scan_security(dir.path());
        assert!(report.blocked());
        assert!(report.critical_count >= 1);
    }

    #[test]
    fn flags_a_route_without_auth_as_a_non_blocking_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("routes.js"), "app.get('/admin', async (req, res) => {});").unwrap();

        let report = scan_security(dir.path());
        assert!(!report.blocked());
        assert_eq!(report.warning_count, 1);
    }

    #[test]
    fn skips_node_modules_and_test_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "const secret = \"sk_live_abcdefghijklmnop\";").unwrap();
        fs::create_dir_all(dir.path().join("__fixtures__")).unwrap();
        fs::write(dir.path().join("__fixtures__/sample.js"), "const secret = \"sk_live_abcdefghijklmnop\";").unwrap();

        let report = scan_security(dir.path());
        assert_eq!(report.critical_count, 0);
    }

    #[test]
    fn clean_repo_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.js"), "export function hello() { return 'hi'; }").unwrap();

        let report = scan_security(dir.path());
        assert_eq!(report.critical_count, 0);
        assert_eq!(report.warning_count, 0);
    }
}

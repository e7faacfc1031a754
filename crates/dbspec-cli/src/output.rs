use std::fs;
use std::io::{self, Write};
use std::path::Path;

use dbspec_schema::{ValidationIssue, ValidationReport};
use serde::Serialize;

/// Validation outcome for one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: String,
    pub valid: bool,
    #[serde(flatten)]
    pub report: ValidationReport,
}

impl FileReport {
    pub fn new(source: impl Into<String>, report: ValidationReport) -> Self {
        Self {
            source: source.into(),
            valid: report.is_ok(),
            report,
        }
    }

    /// True when the file should fail the run.
    pub fn fails(&self, deny_warnings: bool) -> bool {
        !self.valid || (deny_warnings && !self.report.warnings.is_empty())
    }
}

pub fn render_text(results: &[FileReport]) -> String {
    let mut lines = Vec::new();
    for result in results {
        let errors = result.report.errors.len();
        let warnings = result.report.warnings.len();
        if errors == 0 && warnings == 0 {
            lines.push(format!("{}: ok", result.source));
            continue;
        }
        let verdict = if result.valid { "ok" } else { "invalid" };
        lines.push(format!(
            "{}: {verdict} ({errors} error(s), {warnings} warning(s))",
            result.source
        ));
        for issue in &result.report.errors {
            issue_lines(&mut lines, "error", issue);
        }
        for issue in &result.report.warnings {
            issue_lines(&mut lines, "warning", issue);
        }
    }
    lines.into_iter().map(|line| line + "\n").collect()
}

fn issue_lines(lines: &mut Vec<String>, label: &str, issue: &ValidationIssue) {
    lines.push(format!("  {label} {} [{}]: {}", issue.path, issue.code, issue.message));
    if let Some(hint) = &issue.hint {
        lines.push(format!("    hint: {hint}"));
    }
}

pub fn render_json(results: &[FileReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}

/// Write to `path` through a sibling temp file, or to stdout when no path is given.
pub fn emit(path: Option<&Path>, content: &str) -> io::Result<()> {
    let Some(path) = path else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        if !content.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        return stdout.flush();
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"))?;
    let tmp_path = path.with_file_name(format!("{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path)
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether an issue rejects the document or only advises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// One finding about a resource document, located by JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Violated schema keyword (ex.: `minimum`) or advisory check name.
    pub code: String,
    /// JSON pointer of the offending field.
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        severity: IssueSeverity,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            hint,
        }
    }
}

/// Every finding for one document: rule violations in `errors`, advisory
/// checks in `warnings`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// A document is valid when nothing was rejected; warnings do not count.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    pub fn push_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Append the findings of another pass over the same document.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Error issues reported for one JSON pointer.
    pub fn errors_at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.errors.iter().filter(move |issue| issue.path == path)
    }
}

/// Failures that prevent a document from being evaluated at all.
///
/// Rule violations are never reported here; they go into a
/// [`ValidationReport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("candidate must be an object, found {0}")]
    NotAnObject(&'static str),
    #[error("schema compilation failed: {0}")]
    Compile(String),
    #[error("json error: {0}")]
    Json(String),
    #[error("yaml error: {0}")]
    Yaml(String),
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for SchemaError {
    fn from(err: serde_yaml::Error) -> Self {
        SchemaError::Yaml(err.to_string())
    }
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: IssueSeverity, code: &str) -> ValidationIssue {
        ValidationIssue::new(severity, code, "/spec/iops", "message", None)
    }

    #[test]
    fn warnings_alone_keep_a_document_valid() {
        let mut report = ValidationReport::default();
        report.push_warning(issue(IssueSeverity::Warning, "iops_ignored"));
        assert!(report.is_ok());

        report.push_error(issue(IssueSeverity::Error, "minimum"));
        assert!(!report.is_ok());
        assert_eq!(report.errors_at("/spec/iops").count(), 1);
    }

    #[test]
    fn merging_appends_both_kinds_of_findings() {
        let mut first = ValidationReport::default();
        first.push_error(issue(IssueSeverity::Error, "minimum"));
        let mut second = ValidationReport::default();
        second.push_error(issue(IssueSeverity::Error, "maximum"));
        second.push_warning(issue(IssueSeverity::Warning, "iops_ignored"));

        first.merge(second);
        let codes: Vec<_> = first.errors.iter().map(|issue| issue.code.as_str()).collect();
        assert_eq!(codes, vec!["minimum", "maximum"]);
        assert_eq!(first.warnings.len(), 1);
    }

    #[test]
    fn hint_is_omitted_from_json_when_absent() {
        let value = serde_json::to_value(issue(IssueSeverity::Error, "minimum")).expect("serialize");
        assert_eq!(value["severity"], "error");
        assert!(value.get("hint").is_none());
    }
}

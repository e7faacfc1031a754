use std::sync::OnceLock;

use dbspec_core::{Database, DatabaseSpecification, SpecField, StorageType, canonicalize, json_kind};
use jsonschema::error::ValidationErrorKind;
use jsonschema::{JSONSchema, ValidationError};
use serde_json::Value;
use tracing::debug;

use crate::errors::{IssueSeverity, Result, SchemaError, ValidationIssue, ValidationReport};
use crate::render::to_json_schema;
use crate::rules::{SpecSchema, database_schema};

/// Resource document that passed validation, with accumulated warnings.
///
/// Only the validator can build one, so holding a `ValidatedDatabase` proves
/// the specification satisfied every rule.
#[derive(Debug, Clone)]
pub struct ValidatedDatabase {
    database: Database,
    warnings: Vec<ValidationIssue>,
}

impl ValidatedDatabase {
    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn spec(&self) -> &DatabaseSpecification {
        &self.database.spec
    }

    pub fn warnings(&self) -> &[ValidationIssue] {
        &self.warnings
    }

    pub fn into_database(self) -> Database {
        self.database
    }
}

/// Compiled validator for database resource documents.
pub struct SpecValidator {
    rules: SpecSchema,
    compiled: JSONSchema,
}

impl std::fmt::Debug for SpecValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecValidator")
            .field("fields", &self.rules.fields.len())
            .field("conditionals", &self.rules.conditionals.len())
            .finish()
    }
}

impl SpecValidator {
    /// Compile the validator for the built-in rule table.
    pub fn new() -> Result<Self> {
        Self::from_rules(database_schema().clone())
    }

    /// Compile the validator for an arbitrary rule table.
    pub fn from_rules(rules: SpecSchema) -> Result<Self> {
        let document = to_json_schema(&rules);
        let compiled =
            JSONSchema::compile(&document).map_err(|err| SchemaError::Compile(err.to_string()))?;
        Ok(Self { rules, compiled })
    }

    /// Process-wide validator, compiled at most once.
    pub fn shared() -> Result<&'static SpecValidator> {
        static SHARED: OnceLock<Result<SpecValidator>> = OnceLock::new();
        SHARED.get_or_init(SpecValidator::new).as_ref().map_err(Clone::clone)
    }

    pub fn rules(&self) -> &SpecSchema {
        &self.rules
    }

    /// Evaluate every active rule against a resource document.
    ///
    /// Field names are matched case-insensitively. All violations are
    /// collected, ordered by path. When there are none, advisory checks run
    /// and their findings are added as warnings. The document is never
    /// modified.
    pub fn validate_document(&self, document: &Value) -> Result<ValidationReport> {
        self.evaluate(document).map(|(report, _)| report)
    }

    /// Validate a typed resource.
    pub fn validate(&self, database: &Database) -> Result<ValidationReport> {
        let document = serde_json::to_value(database)?;
        self.validate_document(&document)
    }

    /// Validate a document end-to-end, returning structured issues on failure.
    pub fn validate_database(
        &self,
        document: &Value,
    ) -> std::result::Result<ValidatedDatabase, ValidationReport> {
        match self.evaluate(document) {
            Ok((report, Some(database))) if report.is_ok() => Ok(ValidatedDatabase {
                database,
                warnings: report.warnings,
            }),
            Ok((report, _)) => Err(report),
            Err(err) => {
                let mut report = ValidationReport::default();
                report.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "invalid_document",
                    "/",
                    err.to_string(),
                    None,
                ));
                Err(report)
            }
        }
    }

    /// Schema pass, then the typed decode when the schema pass is clean.
    fn evaluate(&self, document: &Value) -> Result<(ValidationReport, Option<Database>)> {
        if !document.is_object() {
            return Err(SchemaError::NotAnObject(json_kind(document)));
        }

        let canonical = canonicalize(document);
        let mut report = ValidationReport::default();

        if let Err(errors) = self.compiled.validate(&canonical) {
            let mut issues: Vec<ValidationIssue> =
                errors.map(|error| self.issue_from(&error)).collect();
            issues.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.code.cmp(&b.code)));
            for issue in issues {
                report.push_error(issue);
            }
        }

        let mut decoded = None;
        if report.is_ok() {
            match serde_json::from_value::<Database>(canonical) {
                Ok(database) => {
                    for warning in advise(&database.spec) {
                        report.push_warning(warning);
                    }
                    decoded = Some(database);
                }
                Err(err) => report.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "invalid_shape",
                    "/",
                    err.to_string(),
                    None,
                )),
            }
        }

        debug!(
            event = "document_validated",
            errors = report.errors.len(),
            warnings = report.warnings.len()
        );
        Ok((report, decoded))
    }

    fn issue_from(&self, error: &ValidationError<'_>) -> ValidationIssue {
        let schema_path = error.schema_path.to_string();
        let code = schema_path
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or("schema")
            .to_string();

        let mut path = normalized_json_pointer(&error.instance_path.to_string());
        if let ValidationErrorKind::Required { property } = &error.kind {
            if let Some(property) = property.as_str() {
                path = child_pointer(&path, property);
            }
        }

        let hint = spec_field_at(&path)
            .and_then(|field| self.rules.describe(field))
            .map(str::to_string);

        ValidationIssue::new(IssueSeverity::Error, code, path, error.to_string(), hint)
    }
}

/// Validate a document with the shared validator.
pub fn validate_document(document: &Value) -> Result<ValidationReport> {
    SpecValidator::shared()?.validate_document(document)
}

/// Validate a document end-to-end with the shared validator.
pub fn validate_database(
    document: &Value,
) -> std::result::Result<ValidatedDatabase, ValidationReport> {
    match SpecValidator::shared() {
        Ok(validator) => validator.validate_database(document),
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_validation_error",
                "/",
                err.to_string(),
                None,
            ));
            Err(report)
        }
    }
}

/// Advisory checks on a specification that already satisfies the schema.
///
/// Findings are warnings: none of them makes a specification invalid.
pub fn advise(spec: &DatabaseSpecification) -> Vec<ValidationIssue> {
    let mut warnings = Vec::new();

    match (&spec.password, &spec.master_user_password) {
        (None, None) => warnings.push(ValidationIssue::new(
            IssueSeverity::Warning,
            "credentials_missing",
            SpecField::MasterUserPassword.pointer(),
            "no credential reference is set",
            Some("set masterUserPassword to a secret name and key".to_string()),
        )),
        (Some(_), Some(_)) => warnings.push(ValidationIssue::new(
            IssueSeverity::Warning,
            "credentials_ambiguous",
            SpecField::Password.pointer(),
            "both password and masterUserPassword are set; masterUserPassword is used",
            Some("remove one of the two credential references".to_string()),
        )),
        _ => {}
    }

    if let (Some(size), Some(max_allocated)) = (spec.size, spec.max_allocated_size) {
        if max_allocated < size {
            warnings.push(ValidationIssue::new(
                IssueSeverity::Warning,
                "max_allocated_below_size",
                SpecField::MaxAllocatedSize.pointer(),
                format!("maxAllocatedSize {max_allocated} is below size {size}"),
                Some("raise maxAllocatedSize to at least size".to_string()),
            ));
        }
    }

    if spec.iops.is_some() && spec.storage_kind() != Some(StorageType::Io1) {
        warnings.push(ValidationIssue::new(
            IssueSeverity::Warning,
            "iops_ignored",
            SpecField::Iops.pointer(),
            format!("iops is ignored for storage type '{}'", spec.storage_type),
            Some("set storageType to io1 or remove iops".to_string()),
        ));
    }

    warnings
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

fn child_pointer(parent: &str, property: &str) -> String {
    if parent == "/" {
        format!("/{property}")
    } else {
        format!("{parent}/{property}")
    }
}

fn spec_field_at(path: &str) -> Option<SpecField> {
    let rest = path.strip_prefix("/spec/")?;
    let name = rest.split('/').next()?;
    SpecField::lookup(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbspec_core::SecretKeySelector;
    use serde_json::json;

    fn base_document() -> Value {
        json!({
            "apiVersion": "dbspec.io/v1",
            "kind": "Database",
            "metadata": {"name": "my_db", "namespace": "default"},
            "spec": {
                "engine": "postgres",
                "class": "db.t2.micro",
                "size": 20,
                "storageType": "gp2",
                "username": "dbuser",
                "masterUserPassword": {"name": "db-secret", "key": "password"}
            }
        })
    }

    #[test]
    fn pointers_are_normalized() {
        assert_eq!(normalized_json_pointer(""), "/");
        assert_eq!(child_pointer("/", "spec"), "/spec");
        assert_eq!(child_pointer("/spec", "engine"), "/spec/engine");
        assert_eq!(spec_field_at("/spec/password/name"), Some(SpecField::Password));
        assert_eq!(spec_field_at("/metadata"), None);
    }

    #[test]
    fn missing_required_fields_point_at_the_field() {
        let validator = SpecValidator::new().expect("compile validator");
        let mut document = base_document();
        document["spec"].as_object_mut().unwrap().remove("engine");

        let report = validator.validate_document(&document).expect("validate");
        let issue = report.errors_at("/spec/engine").next().expect("engine issue");
        assert_eq!(issue.code, "required");
        assert_eq!(issue.hint.as_deref(), Some("database engine"));
    }

    #[test]
    fn wrong_types_are_reported_not_raised() {
        let validator = SpecValidator::new().expect("compile validator");
        let mut document = base_document();
        document["spec"]["size"] = json!("twenty");

        let report = validator.validate_document(&document).expect("validate");
        assert!(!report.is_ok());
        assert_eq!(report.errors[0].path, "/spec/size");
        assert_eq!(report.errors[0].code, "type");
    }

    #[test]
    fn advisories_flag_credential_problems() {
        let spec = DatabaseSpecification::default();
        let codes: Vec<_> = advise(&spec).into_iter().map(|issue| issue.code).collect();
        assert_eq!(codes, vec!["credentials_missing"]);

        let spec = DatabaseSpecification {
            password: Some(SecretKeySelector::new("a", "b")),
            master_user_password: Some(SecretKeySelector::new("c", "d")),
            ..DatabaseSpecification::default()
        };
        let codes: Vec<_> = advise(&spec).into_iter().map(|issue| issue.code).collect();
        assert_eq!(codes, vec!["credentials_ambiguous"]);
    }

    #[test]
    fn advisories_flag_storage_inconsistencies() {
        let spec = DatabaseSpecification {
            size: Some(100),
            max_allocated_size: Some(50),
            iops: Some(3000),
            master_user_password: Some(SecretKeySelector::new("c", "d")),
            ..DatabaseSpecification::default()
        };
        let codes: Vec<_> = advise(&spec).into_iter().map(|issue| issue.code).collect();
        assert_eq!(codes, vec!["max_allocated_below_size", "iops_ignored"]);
    }
}

//! Declarative rule table for database specifications.
//!
//! The table is plain data: every field rule and every conditional rule can
//! be listed, serialized, and rendered into a JSON Schema document.

use std::sync::OnceLock;

use dbspec_core::{Engine, Provider, SpecField, StorageType};
use serde::Serialize;

use crate::limits::{
    IDENTIFIER_PATTERN, INSTANCE_CLASS_PATTERN, MAX_BACKUP_RETENTION_DAYS, MAX_IOPS,
    MAX_STORAGE_GIB, MIN_BACKUP_RETENTION_DAYS, MIN_IOPS, MIN_STORAGE_GIB,
};

/// Base JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Integer,
    String,
    Boolean,
    /// Object with required `name` and `key` strings.
    SecretRef,
    /// Object whose values are all strings.
    StringMap,
}

/// A single constraint on a field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// Closed numeric interval; a missing side is unbounded.
    Range {
        minimum: Option<i64>,
        maximum: Option<i64>,
    },
    /// Case-sensitive set of allowed values.
    OneOf { values: Vec<&'static str> },
    /// Regular expression the value must match.
    Pattern { regex: &'static str },
}

/// Type, requiredness and constraints of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRule {
    pub field: SpecField,
    pub kind: ValueKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    pub description: String,
}

impl FieldRule {
    fn new(field: SpecField, kind: ValueKind, description: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            required: false,
            constraints: Vec::new(),
            description: description.into(),
        }
    }

    pub fn integer(field: SpecField, description: impl Into<String>) -> Self {
        Self::new(field, ValueKind::Integer, description)
    }

    pub fn string(field: SpecField, description: impl Into<String>) -> Self {
        Self::new(field, ValueKind::String, description)
    }

    pub fn boolean(field: SpecField, description: impl Into<String>) -> Self {
        Self::new(field, ValueKind::Boolean, description)
    }

    pub fn secret_ref(field: SpecField, description: impl Into<String>) -> Self {
        Self::new(field, ValueKind::SecretRef, description)
    }

    pub fn string_map(field: SpecField, description: impl Into<String>) -> Self {
        Self::new(field, ValueKind::StringMap, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn range(mut self, minimum: i64, maximum: i64) -> Self {
        self.constraints.push(Constraint::Range {
            minimum: Some(minimum),
            maximum: Some(maximum),
        });
        self
    }

    pub fn one_of(mut self, values: impl IntoIterator<Item = &'static str>) -> Self {
        self.constraints.push(Constraint::OneOf {
            values: values.into_iter().collect(),
        });
        self
    }

    pub fn pattern(mut self, regex: &'static str) -> Self {
        self.constraints.push(Constraint::Pattern { regex });
        self
    }
}

/// Extra field rules that apply only when a sibling field holds a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionalRule {
    pub when: SpecField,
    pub equals: &'static str,
    pub then: Vec<FieldRule>,
}

impl ConditionalRule {
    /// True when the sibling value activates this rule.
    pub fn is_active(&self, value: Option<&str>) -> bool {
        value == Some(self.equals)
    }
}

/// Complete rule set for the `spec` object of a database resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecSchema {
    pub fields: Vec<FieldRule>,
    pub conditionals: Vec<ConditionalRule>,
}

impl SpecSchema {
    /// Base rule of a field.
    pub fn field(&self, field: SpecField) -> Option<&FieldRule> {
        self.fields.iter().find(|rule| rule.field == field)
    }

    /// Conditional rules that constrain a field.
    pub fn conditionals_for(&self, field: SpecField) -> impl Iterator<Item = &ConditionalRule> {
        self.conditionals
            .iter()
            .filter(move |rule| rule.then.iter().any(|then| then.field == field))
    }

    /// Human-readable description of a field's base rule.
    pub fn describe(&self, field: SpecField) -> Option<&str> {
        self.field(field).map(|rule| rule.description.as_str())
    }

    /// Required fields, in table order.
    pub fn required_fields(&self) -> impl Iterator<Item = SpecField> + '_ {
        self.fields
            .iter()
            .filter(|rule| rule.required)
            .map(|rule| rule.field)
    }
}

/// Build the rule table for database specifications.
///
/// Pure and deterministic; prefer [`database_schema`] which builds it once.
pub fn generate_database_schema() -> SpecSchema {
    let fields = vec![
        FieldRule::string(SpecField::Engine, "database engine")
            .required()
            .one_of(Engine::ALL.iter().map(|engine| engine.as_str())),
        FieldRule::string(SpecField::Version, "engine version"),
        FieldRule::string(SpecField::Class, "instance class, ex.: db.t3.micro")
            .required()
            .pattern(INSTANCE_CLASS_PATTERN),
        FieldRule::integer(
            SpecField::Size,
            format!("allocated storage in GiB, {MIN_STORAGE_GIB} to {MAX_STORAGE_GIB}"),
        )
        .range(MIN_STORAGE_GIB, MAX_STORAGE_GIB),
        FieldRule::integer(
            SpecField::MaxAllocatedSize,
            format!("storage autoscaling limit in GiB, {MIN_STORAGE_GIB} to {MAX_STORAGE_GIB}"),
        )
        .range(MIN_STORAGE_GIB, MAX_STORAGE_GIB),
        FieldRule::string(SpecField::StorageType, "storage type: gp2, io1 or standard")
            .one_of(StorageType::ALL.iter().map(|kind| kind.as_str())),
        FieldRule::integer(
            SpecField::Iops,
            format!("provisioned IOPS, {MIN_IOPS} to {MAX_IOPS} when storageType is io1"),
        ),
        FieldRule::boolean(SpecField::MultiAz, "deploy a standby in a second availability zone"),
        FieldRule::boolean(SpecField::PubliclyAccessible, "expose the endpoint publicly"),
        FieldRule::boolean(SpecField::StorageEncrypted, "encrypt storage at rest"),
        FieldRule::integer(
            SpecField::BackupRetentionPeriod,
            format!("days to keep automated backups, at most {MAX_BACKUP_RETENTION_DAYS}"),
        )
        .range(MIN_BACKUP_RETENTION_DAYS, MAX_BACKUP_RETENTION_DAYS),
        FieldRule::boolean(SpecField::DeletionProtection, "refuse deletion while enabled"),
        FieldRule::boolean(SpecField::SkipFinalSnapshot, "skip the snapshot taken on deletion"),
        FieldRule::string(SpecField::DbSubnetGroupName, "subnet group to place the instance in"),
        FieldRule::string(
            SpecField::DbName,
            "initial database name: a letter, then letters, digits or underscores",
        )
        .pattern(IDENTIFIER_PATTERN),
        FieldRule::string(
            SpecField::Username,
            "master user name: a letter, then letters, digits or underscores",
        )
        .required()
        .pattern(IDENTIFIER_PATTERN),
        FieldRule::secret_ref(SpecField::Password, "secret key holding the master password"),
        FieldRule::secret_ref(
            SpecField::MasterUserPassword,
            "secret key holding the master password",
        ),
        FieldRule::string(SpecField::Provider, "backing implementation: aws or local")
            .one_of(Provider::ALL.iter().map(|provider| provider.as_str())),
        FieldRule::string_map(SpecField::Tags, "tags applied to the provisioned instance"),
    ];

    let conditionals = vec![ConditionalRule {
        when: SpecField::StorageType,
        equals: StorageType::Io1.as_str(),
        then: vec![
            FieldRule::integer(
                SpecField::Iops,
                format!("provisioned IOPS, {MIN_IOPS} to {MAX_IOPS}"),
            )
            .required()
            .range(MIN_IOPS, MAX_IOPS),
        ],
    }];

    SpecSchema {
        fields,
        conditionals,
    }
}

/// Shared rule table, built on first use.
pub fn database_schema() -> &'static SpecSchema {
    static SCHEMA: OnceLock<SpecSchema> = OnceLock::new();
    SCHEMA.get_or_init(generate_database_schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_spec_field_has_exactly_one_base_rule() {
        let schema = generate_database_schema();
        for field in SpecField::ALL {
            let count = schema.fields.iter().filter(|rule| rule.field == *field).count();
            assert_eq!(count, 1, "field {} has {count} base rules", field.name());
        }
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(generate_database_schema(), generate_database_schema());
        assert!(std::ptr::eq(database_schema(), database_schema()));
    }

    #[test]
    fn rule_table_matches_provider_limits() {
        let schema = generate_database_schema();
        let range = |field| {
            schema.field(field).and_then(|rule| {
                rule.constraints.iter().find_map(|constraint| match constraint {
                    Constraint::Range { minimum, maximum } => Some((*minimum, *maximum)),
                    _ => None,
                })
            })
        };

        assert_eq!(range(SpecField::Size), Some((Some(20), Some(64_000))));
        assert_eq!(range(SpecField::MaxAllocatedSize), Some((Some(20), Some(64_000))));
        assert_eq!(range(SpecField::BackupRetentionPeriod), Some((Some(0), Some(35))));
        assert_eq!(range(SpecField::Iops), None);
    }

    #[test]
    fn iops_bound_is_conditional_on_io1() {
        let schema = generate_database_schema();
        let rules: Vec<_> = schema.conditionals_for(SpecField::Iops).collect();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].when, SpecField::StorageType);
        assert!(rules[0].is_active(Some("io1")));
        assert!(!rules[0].is_active(Some("gp2")));
        assert!(!rules[0].is_active(None));
        assert_eq!(
            rules[0].then[0].constraints,
            vec![Constraint::Range {
                minimum: Some(1_000),
                maximum: Some(80_000)
            }]
        );
    }

    #[test]
    fn storage_types_are_a_fixed_set() {
        let schema = generate_database_schema();
        let rule = schema.field(SpecField::StorageType).expect("storage type rule");
        assert_eq!(
            rule.constraints,
            vec![Constraint::OneOf {
                values: vec!["gp2", "io1", "standard"]
            }]
        );
    }

    #[test]
    fn required_fields_are_engine_class_and_username() {
        let required: Vec<_> = generate_database_schema().required_fields().collect();
        assert_eq!(
            required,
            vec![SpecField::Engine, SpecField::Class, SpecField::Username]
        );
    }

    #[test]
    fn rule_table_serializes_as_data() {
        let value = serde_json::to_value(generate_database_schema()).expect("serialize");
        let size = &value["fields"][3];
        assert_eq!(size["field"], "size");
        assert_eq!(size["kind"], "integer");
        assert_eq!(size["constraints"][0]["type"], "range");
        assert_eq!(value["conditionals"][0]["when"], "storageType");
        assert_eq!(value["conditionals"][0]["equals"], "io1");
    }
}

//! Schema generation and validation for database specifications.
//!
//! The rule table in [`rules`] is the single source of truth. It renders to a
//! draft-07 JSON Schema that a compiled [`SpecValidator`] evaluates, and to
//! the structural schema embedded in the registration manifest.

pub mod admission;
pub mod crd;
pub mod errors;
pub mod limits;
pub mod render;
pub mod rules;
pub mod schema;
pub mod validate;

pub use admission::{AdmissionError, Provisioner, admit_and_provision};
pub use crd::{CustomResourceDefinition, database_crd, database_crd_yaml};
pub use errors::{IssueSeverity, Result, SchemaError, ValidationIssue, ValidationReport};
pub use render::{database_json_schema, to_json_schema, to_openapi_v3};
pub use rules::{
    ConditionalRule, Constraint, FieldRule, SpecSchema, ValueKind, database_schema,
    generate_database_schema,
};
pub use schema::report_json_schema;
pub use validate::{
    SpecValidator, ValidatedDatabase, advise, validate_database, validate_document,
};

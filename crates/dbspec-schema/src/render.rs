//! Render the rule table as JSON Schema documents.
//!
//! Two dialects are produced from the same table: draft-07 with `if`/`then`
//! for standard validators, and the Kubernetes structural OpenAPI v3 form,
//! which has no `if`/`then` and expresses each conditional as the implication
//! `anyOf: [not(predicate), then]`.

use std::sync::OnceLock;

use dbspec_core::KIND;
use serde_json::{Map, Value, json};

use crate::rules::{ConditionalRule, Constraint, FieldRule, SpecSchema, ValueKind, database_schema};

pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Draft07,
    OpenApiV3,
}

/// Draft-07 JSON Schema for a whole resource document.
pub fn to_json_schema(schema: &SpecSchema) -> Value {
    let mut root = resource_schema(schema, Dialect::Draft07);
    if let Value::Object(map) = &mut root {
        map.insert("$schema".to_string(), json!(DRAFT_07));
        map.insert("title".to_string(), json!(KIND));
    }
    root
}

/// Kubernetes structural schema (`openAPIV3Schema`) for a resource document.
pub fn to_openapi_v3(schema: &SpecSchema) -> Value {
    resource_schema(schema, Dialect::OpenApiV3)
}

/// Cached draft-07 rendering of the shared rule table.
pub fn database_json_schema() -> &'static Value {
    static DOCUMENT: OnceLock<Value> = OnceLock::new();
    DOCUMENT.get_or_init(|| to_json_schema(database_schema()))
}

fn resource_schema(schema: &SpecSchema, dialect: Dialect) -> Value {
    json!({
        "type": "object",
        "description": "Managed relational database resource",
        "properties": {
            "apiVersion": {"type": "string"},
            "kind": {"type": "string"},
            "metadata": metadata_schema(dialect),
            "spec": spec_schema(schema, dialect),
        },
        "required": ["spec"],
    })
}

/// Object metadata.
///
/// The API server validates metadata itself and structural schemas may only
/// constrain `name`, so the OpenAPI form stops there.
fn metadata_schema(dialect: Dialect) -> Value {
    match dialect {
        Dialect::Draft07 => json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "namespace": {"type": "string"},
                "labels": {"type": "object", "additionalProperties": {"type": "string"}},
                "annotations": {"type": "object", "additionalProperties": {"type": "string"}},
            },
        }),
        Dialect::OpenApiV3 => json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
            },
        }),
    }
}

fn spec_schema(schema: &SpecSchema, dialect: Dialect) -> Value {
    let mut properties = Map::new();
    for rule in &schema.fields {
        properties.insert(rule.field.name().to_string(), field_schema(rule));
    }
    let required: Vec<&str> = schema.required_fields().map(|field| field.name()).collect();

    let mut spec = Map::new();
    spec.insert("type".to_string(), json!("object"));
    spec.insert("properties".to_string(), Value::Object(properties));
    spec.insert("required".to_string(), json!(required));

    let conditionals: Vec<Value> = schema
        .conditionals
        .iter()
        .map(|rule| conditional_schema(rule, dialect))
        .collect();
    if !conditionals.is_empty() {
        spec.insert("allOf".to_string(), Value::Array(conditionals));
    }
    Value::Object(spec)
}

fn field_schema(rule: &FieldRule) -> Value {
    let mut node = match rule.kind {
        ValueKind::Integer => json!({"type": "integer", "format": "int64"}),
        ValueKind::String => json!({"type": "string"}),
        ValueKind::Boolean => json!({"type": "boolean"}),
        ValueKind::SecretRef => json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "key": {"type": "string"},
            },
            "required": ["name", "key"],
        }),
        ValueKind::StringMap => json!({
            "type": "object",
            "additionalProperties": {"type": "string"},
        }),
    };
    if let Value::Object(map) = &mut node {
        map.insert("description".to_string(), json!(rule.description));
        apply_constraints(map, &rule.constraints);
        if rule.kind == ValueKind::Integer {
            map.entry("minimum").or_insert_with(|| json!(i64::MIN));
            map.entry("maximum").or_insert_with(|| json!(i64::MAX));
        }
    }
    node
}

fn apply_constraints(node: &mut Map<String, Value>, constraints: &[Constraint]) {
    for constraint in constraints {
        match constraint {
            Constraint::Range { minimum, maximum } => {
                if let Some(minimum) = minimum {
                    node.insert("minimum".to_string(), json!(minimum));
                }
                if let Some(maximum) = maximum {
                    node.insert("maximum".to_string(), json!(maximum));
                }
            }
            Constraint::OneOf { values } => {
                node.insert("enum".to_string(), json!(values));
            }
            Constraint::Pattern { regex } => {
                node.insert("pattern".to_string(), json!(regex));
            }
        }
    }
}

/// Constraint-only schema for the rules a conditional activates.
///
/// Structural schemas forbid `type` and `description` below `anyOf`, so only
/// the constraints and requiredness are emitted.
fn then_schema(rules: &[FieldRule]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for rule in rules {
        let mut node = Map::new();
        apply_constraints(&mut node, &rule.constraints);
        properties.insert(rule.field.name().to_string(), Value::Object(node));
        if rule.required {
            required.push(rule.field.name());
        }
    }

    let mut then = Map::new();
    then.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        then.insert("required".to_string(), json!(required));
    }
    Value::Object(then)
}

fn predicate_schema(rule: &ConditionalRule) -> Value {
    let field = rule.when.name();
    json!({
        "properties": {
            field: {"enum": [rule.equals]},
        },
        "required": [field],
    })
}

fn conditional_schema(rule: &ConditionalRule, dialect: Dialect) -> Value {
    match dialect {
        Dialect::Draft07 => json!({
            "if": predicate_schema(rule),
            "then": then_schema(&rule.then),
        }),
        Dialect::OpenApiV3 => json!({
            "anyOf": [
                {"not": predicate_schema(rule)},
                then_schema(&rule.then),
            ],
        }),
    }
}

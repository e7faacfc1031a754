use std::fs;
use std::path::Path;

use dbspec_core::decode_document;
use dbspec_schema::{
    SpecValidator, ValidationReport, database_crd, database_schema, to_json_schema, to_openapi_v3,
};
use jsonschema::JSONSchema;
use serde_json::{Value, json};

fn load_manifest(name: &str) -> Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../manifests/examples")
        .join(name);
    let bytes = fs::read(&path).unwrap_or_else(|_| panic!("missing manifest at {}", path.display()));
    decode_document(&bytes).expect("parse manifest")
}

fn candidates() -> Vec<Value> {
    let base = json!({
        "engine": "postgres",
        "class": "db.t3.micro",
        "username": "dbuser",
        "masterUserPassword": {"name": "db", "key": "password"}
    });
    let with = |patch: Value| {
        let mut spec = base.clone();
        for (key, value) in patch.as_object().expect("patch object") {
            spec[key] = value.clone();
        }
        json!({"spec": spec})
    };

    vec![
        with(json!({})),
        with(json!({"size": 20})),
        with(json!({"size": 10})),
        with(json!({"size": 65000})),
        with(json!({"backupRetentionPeriod": 36})),
        with(json!({"storageType": "io1", "iops": 999})),
        with(json!({"storageType": "io1", "iops": 1000})),
        with(json!({"storageType": "io1", "iops": 80001})),
        with(json!({"storageType": "io1"})),
        with(json!({"storageType": "gp2", "iops": 999})),
        with(json!({"storageType": "io2"})),
        with(json!({"dbName": "database-name"})),
        with(json!({"username": "1database_name"})),
        with(json!({"engine": "oracle"})),
        with(json!({"class": "t3.micro"})),
        with(json!({"size": 20.0})),
        with(json!({"size": 20.5})),
        with(json!({"storageType": "io1", "iops": 1000.0})),
        with(json!({"storageType": "gp2", "iops": u64::MAX})),
        with(json!({"storageType": "gp2", "iops": i64::MAX})),
        json!({"spec": {}}),
        json!({"metadata": {"name": "empty"}}),
    ]
}

#[test]
fn json_schema_is_in_sync() {
    let generated_json = to_json_schema(database_schema());

    let schema_path =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schemas/database.schema.json");
    let stored = fs::read_to_string(&schema_path)
        .unwrap_or_else(|_| panic!("missing schema file at {}", schema_path.display()));
    let stored_json: Value = serde_json::from_str(&stored).expect("parse stored schema");

    assert_eq!(generated_json, stored_json);
}

#[test]
fn both_dialects_reach_the_same_verdicts() {
    let draft07 = JSONSchema::compile(&to_json_schema(database_schema())).expect("compile draft-07");
    let openapi = JSONSchema::compile(&to_openapi_v3(database_schema())).expect("compile openapi");

    for candidate in candidates() {
        assert_eq!(
            draft07.is_valid(&candidate),
            openapi.is_valid(&candidate),
            "dialects disagree on {candidate}"
        );
    }
}

#[test]
fn registration_manifest_rejects_what_the_validator_rejects() {
    let crd = serde_json::to_value(database_crd()).expect("serialize crd");
    let structural = &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"];
    let compiled = JSONSchema::compile(structural).expect("compile structural schema");
    let validator = SpecValidator::shared().expect("compile validator");

    for candidate in candidates() {
        let report = validator.validate_document(&candidate).expect("validate");
        assert_eq!(compiled.is_valid(&candidate), report.is_ok(), "verdicts differ on {candidate}");
    }
}

#[test]
fn concurrent_validations_share_one_validator() {
    let documents = vec![
        load_manifest("valid.yaml"),
        load_manifest("invalid.yaml"),
        load_manifest("case-insensitive.yaml"),
    ];
    let sequential: Vec<ValidationReport> = documents
        .iter()
        .map(|document| {
            SpecValidator::shared()
                .expect("compile validator")
                .validate_document(document)
                .expect("validate")
        })
        .collect();

    let documents = &documents;
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || {
                    let validator = SpecValidator::shared().expect("compile validator");
                    documents
                        .iter()
                        .map(|document| validator.validate_document(document).expect("validate"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            let reports = handle.join().expect("validation thread panicked");
            assert_eq!(reports, sequential);
        }
    });

    let first = SpecValidator::shared().expect("compile validator");
    let second = SpecValidator::shared().expect("compile validator");
    assert!(std::ptr::eq(first, second));
}

#[test]
fn rule_table_validator_matches_shared_validator() {
    let fresh = SpecValidator::from_rules(database_schema().clone()).expect("compile validator");
    let shared = SpecValidator::shared().expect("compile validator");
    for candidate in candidates() {
        assert_eq!(
            fresh.validate_document(&candidate).expect("validate"),
            shared.validate_document(&candidate).expect("validate")
        );
    }
}

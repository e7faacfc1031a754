//! Case-insensitive decoding of database resource documents.
//!
//! Field names are resolved through static lookup tables keyed by the
//! lowercase spelling, so `MaxAllocatedSize`, `maxallocatedsize` and
//! `maxAllocatedSize` all land in the same field.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{DecodeError, Result};
use crate::model::Database;

/// Canonical fields of a database specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecField {
    Engine,
    Version,
    Class,
    Size,
    MaxAllocatedSize,
    StorageType,
    Iops,
    MultiAz,
    PubliclyAccessible,
    StorageEncrypted,
    BackupRetentionPeriod,
    DeletionProtection,
    SkipFinalSnapshot,
    DbSubnetGroupName,
    DbName,
    Username,
    Password,
    MasterUserPassword,
    Provider,
    Tags,
}

impl SpecField {
    pub const ALL: &'static [SpecField] = &[
        SpecField::Engine,
        SpecField::Version,
        SpecField::Class,
        SpecField::Size,
        SpecField::MaxAllocatedSize,
        SpecField::StorageType,
        SpecField::Iops,
        SpecField::MultiAz,
        SpecField::PubliclyAccessible,
        SpecField::StorageEncrypted,
        SpecField::BackupRetentionPeriod,
        SpecField::DeletionProtection,
        SpecField::SkipFinalSnapshot,
        SpecField::DbSubnetGroupName,
        SpecField::DbName,
        SpecField::Username,
        SpecField::Password,
        SpecField::MasterUserPassword,
        SpecField::Provider,
        SpecField::Tags,
    ];

    /// Canonical serialized name.
    pub fn name(self) -> &'static str {
        match self {
            SpecField::Engine => "engine",
            SpecField::Version => "version",
            SpecField::Class => "class",
            SpecField::Size => "size",
            SpecField::MaxAllocatedSize => "maxAllocatedSize",
            SpecField::StorageType => "storageType",
            SpecField::Iops => "iops",
            SpecField::MultiAz => "multiAZ",
            SpecField::PubliclyAccessible => "publiclyAccessible",
            SpecField::StorageEncrypted => "storageEncrypted",
            SpecField::BackupRetentionPeriod => "backupRetentionPeriod",
            SpecField::DeletionProtection => "deletionProtection",
            SpecField::SkipFinalSnapshot => "skipFinalSnapshot",
            SpecField::DbSubnetGroupName => "dbSubnetGroupName",
            SpecField::DbName => "dbName",
            SpecField::Username => "username",
            SpecField::Password => "password",
            SpecField::MasterUserPassword => "masterUserPassword",
            SpecField::Provider => "provider",
            SpecField::Tags => "tags",
        }
    }

    /// Resolve a field name regardless of letter casing.
    pub fn lookup(key: &str) -> Option<SpecField> {
        static INDEX: OnceLock<HashMap<String, SpecField>> = OnceLock::new();
        INDEX
            .get_or_init(|| {
                SpecField::ALL
                    .iter()
                    .map(|field| (field.name().to_ascii_lowercase(), *field))
                    .collect()
            })
            .get(&key.to_ascii_lowercase())
            .copied()
    }

    /// JSON pointer of the field inside a resource document.
    pub fn pointer(self) -> String {
        format!("/spec/{}", self.name())
    }

    fn is_secret_ref(self) -> bool {
        matches!(self, SpecField::Password | SpecField::MasterUserPassword)
    }
}

impl Serialize for SpecField {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

struct KeyTable {
    names: &'static [&'static str],
    index: OnceLock<HashMap<String, &'static str>>,
}

impl KeyTable {
    const fn new(names: &'static [&'static str]) -> Self {
        Self {
            names,
            index: OnceLock::new(),
        }
    }

    fn resolve(&self, key: &str) -> Option<&'static str> {
        self.index
            .get_or_init(|| {
                self.names
                    .iter()
                    .map(|name| (name.to_ascii_lowercase(), *name))
                    .collect()
            })
            .get(&key.to_ascii_lowercase())
            .copied()
    }
}

static ENVELOPE_KEYS: KeyTable = KeyTable::new(&["apiVersion", "kind", "metadata", "spec"]);
static METADATA_KEYS: KeyTable = KeyTable::new(&["name", "namespace", "labels", "annotations"]);
static SECRET_REF_KEYS: KeyTable = KeyTable::new(&["name", "key"]);

#[derive(Debug, Clone, Copy)]
enum Level {
    Envelope,
    Metadata,
    Spec,
    SecretRef,
}

impl Level {
    fn resolve(self, key: &str) -> Option<(&'static str, Option<Level>)> {
        match self {
            Level::Envelope => ENVELOPE_KEYS.resolve(key).map(|name| {
                let child = match name {
                    "metadata" => Some(Level::Metadata),
                    "spec" => Some(Level::Spec),
                    _ => None,
                };
                (name, child)
            }),
            Level::Metadata => METADATA_KEYS.resolve(key).map(|name| (name, None)),
            Level::Spec => SpecField::lookup(key).map(|field| {
                let child = field.is_secret_ref().then_some(Level::SecretRef);
                (field.name(), child)
            }),
            Level::SecretRef => SECRET_REF_KEYS.resolve(key).map(|name| (name, None)),
        }
    }
}

/// Parse raw YAML or JSON bytes into a document.
///
/// Fails only when the bytes are not a document at all or the root is not
/// an object. Field values are not inspected.
pub fn decode_document(bytes: &[u8]) -> Result<Value> {
    let document: Value = serde_yaml::from_slice(bytes)?;
    if !document.is_object() {
        return Err(DecodeError::NotAnObject(json_kind(&document)));
    }
    Ok(document)
}

/// Copy a resource document, renaming known keys to their canonical spelling.
///
/// When several spellings of one field are present, the canonical spelling
/// wins; otherwise the first variant in key order is kept. Unknown keys are
/// carried over untouched.
pub fn canonicalize(document: &Value) -> Value {
    canonicalize_at(document, Level::Envelope)
}

fn canonicalize_at(value: &Value, level: Level) -> Value {
    match value {
        Value::Object(map) => Value::Object(canonicalize_object(map, level)),
        other => other.clone(),
    }
}

fn canonicalize_object(map: &Map<String, Value>, level: Level) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in map {
        match level.resolve(key) {
            Some((canonical, child)) => {
                let value = match child {
                    Some(child) => canonicalize_at(value, child),
                    None => value.clone(),
                };
                if key == canonical || !out.contains_key(canonical) {
                    out.insert(canonical.to_string(), value);
                }
            }
            None => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

/// Build the typed resource from an already parsed document.
pub fn from_document(document: &Value) -> Result<Database> {
    if !document.is_object() {
        return Err(DecodeError::NotAnObject(json_kind(document)));
    }
    let database = serde_json::from_value(canonicalize(document))?;
    Ok(database)
}

/// Decode raw YAML or JSON bytes into the typed resource.
pub fn decode(bytes: &[u8]) -> Result<Database> {
    let document = decode_document(bytes)?;
    from_document(&document)
}

/// Short name of a JSON value's type, for diagnostics.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

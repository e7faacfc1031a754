use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// API group the resource kind is registered under.
pub const API_GROUP: &str = "dbspec.io";
/// Served and stored version of the resource kind.
pub const API_VERSION: &str = "v1";
/// Resource kind name.
pub const KIND: &str = "Database";
/// Plural resource name used in the registration manifest.
pub const PLURAL: &str = "databases";
/// Singular resource name used in the registration manifest.
pub const SINGULAR: &str = "database";
/// Short name accepted by resource-management tooling.
pub const SHORT_NAME: &str = "rds";

/// `apiVersion` value for documents of this kind.
pub fn api_version() -> String {
    format!("{API_GROUP}/{API_VERSION}")
}

/// Top-level database resource document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(default = "api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: DatabaseSpecification,
}

fn default_kind() -> String {
    KIND.to_string()
}

impl Database {
    /// Build a resource document around a specification.
    pub fn new(name: impl Into<String>, spec: DatabaseSpecification) -> Self {
        Self {
            api_version: api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: name.into(),
                ..ObjectMeta::default()
            },
            spec,
        }
    }

    /// Place the resource in a namespace.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.metadata.namespace = Some(namespace.into());
        self
    }
}

/// Identifying metadata attached to every resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Reference to a key inside a named secret. Never holds the secret itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
}

impl SecretKeySelector {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

/// Desired state of a managed relational database.
///
/// Enumerated fields are kept as raw strings so that values outside the
/// allowed sets survive decoding and are reported by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseSpecification {
    /// Database engine identifier (ex.: postgres).
    pub engine: String,
    /// Engine version; the provider default is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Instance class (ex.: db.t3.micro).
    pub class: String,
    /// Allocated storage in GiB.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "whole_number"
    )]
    pub size: Option<i64>,
    /// Upper limit for storage autoscaling in GiB.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "whole_number"
    )]
    pub max_allocated_size: Option<i64>,
    pub storage_type: String,
    /// Provisioned IOPS; only meaningful for `io1` storage.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "whole_number"
    )]
    pub iops: Option<i64>,
    #[serde(rename = "multiAZ")]
    pub multi_az: bool,
    pub publicly_accessible: bool,
    pub storage_encrypted: bool,
    /// Days automated backups are kept.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "whole_number"
    )]
    pub backup_retention_period: Option<i64>,
    pub deletion_protection: bool,
    pub skip_final_snapshot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_subnet_group_name: Option<String>,
    /// Name of the initial database created on the instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    /// Master user name.
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretKeySelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_user_password: Option<SecretKeySelector>,
    /// Backing implementation (`aws` or `local`).
    pub provider: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Accept any JSON number with no fractional part that fits in an `i64`.
///
/// JSON Schema treats `20.0` as an integer, so the typed model must too.
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    deserializer.deserialize_option(WholeNumber)
}

struct WholeNumber;

impl<'de> Visitor<'de> for WholeNumber {
    type Value = Option<i64>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a whole number within the 64-bit signed range")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(WholeNumber)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Some(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        i64::try_from(value)
            .map(Some)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(value), &self))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        // 2^63 is exactly representable; i64::MAX is not.
        let upper = 9_223_372_036_854_775_808.0;
        if value.fract() == 0.0 && value >= -upper && value < upper {
            Ok(Some(value as i64))
        } else {
            Err(E::invalid_value(Unexpected::Float(value), &self))
        }
    }
}

impl Default for DatabaseSpecification {
    fn default() -> Self {
        Self {
            engine: String::new(),
            version: None,
            class: String::new(),
            size: None,
            max_allocated_size: None,
            storage_type: StorageType::Gp2.as_str().to_string(),
            iops: None,
            multi_az: false,
            publicly_accessible: false,
            storage_encrypted: false,
            backup_retention_period: None,
            deletion_protection: false,
            skip_final_snapshot: false,
            db_subnet_group_name: None,
            db_name: None,
            username: String::new(),
            password: None,
            master_user_password: None,
            provider: Provider::Aws.as_str().to_string(),
            tags: BTreeMap::new(),
        }
    }
}

impl DatabaseSpecification {
    /// Parsed storage type, `None` when the value is outside the allowed set.
    pub fn storage_kind(&self) -> Option<StorageType> {
        self.storage_type.parse().ok()
    }

    /// Parsed engine, `None` when the value is outside the allowed set.
    pub fn engine_kind(&self) -> Option<Engine> {
        self.engine.parse().ok()
    }

    /// Parsed provider, `None` when the value is outside the allowed set.
    pub fn provider_kind(&self) -> Option<Provider> {
        self.provider.parse().ok()
    }

    /// The credential reference in effect, preferring `masterUserPassword`.
    pub fn credentials(&self) -> Option<&SecretKeySelector> {
        self.master_user_password.as_ref().or(self.password.as_ref())
    }
}

/// Error returned when a string is not a member of a fixed value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownValue {}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every allowed value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownValue {
                        kind: $label,
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Storage classes accepted by the provider.
    StorageType, "storage type" {
        Gp2 => "gp2",
        Io1 => "io1",
        Standard => "standard",
    }
}

string_enum! {
    /// Database engines accepted by the provider.
    Engine, "engine" {
        Postgres => "postgres",
        Mysql => "mysql",
        Mariadb => "mariadb",
        AuroraMysql => "aurora-mysql",
        AuroraPostgresql => "aurora-postgresql",
        OracleEe => "oracle-ee",
        OracleSe2 => "oracle-se2",
        SqlserverEe => "sqlserver-ee",
        SqlserverSe => "sqlserver-se",
        SqlserverEx => "sqlserver-ex",
        SqlserverWeb => "sqlserver-web",
    }
}

string_enum! {
    /// Backing implementation that will provision the database.
    Provider, "provider" {
        Aws => "aws",
        Local => "local",
    }
}

impl StorageType {
    /// True for the storage type that activates the IOPS bound.
    pub fn is_provisioned_iops(self) -> bool {
        matches!(self, StorageType::Io1)
    }
}

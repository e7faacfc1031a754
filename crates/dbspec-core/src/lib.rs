//! Core contracts for dbspec.
//!
//! This crate defines the database resource model and the case-insensitive
//! decoder shared by the schema crate and the CLI.

pub mod decode;
pub mod error;
pub mod model;

pub use decode::{SpecField, canonicalize, decode, decode_document, from_document, json_kind};
pub use error::{DecodeError, Result};
pub use model::{
    API_GROUP, API_VERSION, Database, DatabaseSpecification, Engine, KIND, ObjectMeta, PLURAL,
    Provider, SHORT_NAME, SINGULAR, SecretKeySelector, StorageType, UnknownValue, api_version,
};

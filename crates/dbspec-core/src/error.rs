use thiserror::Error;

/// Errors raised while turning raw bytes into a database resource.
///
/// Only structural problems end up here. A document that parses but breaks
/// the schema rules is reported by validation instead.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input is not a parseable YAML/JSON document.
    #[error("malformed document: {0}")]
    Syntax(#[from] serde_yaml::Error),
    /// The document parsed, but its root is not an object.
    #[error("document root must be an object, found {0}")]
    NotAnObject(&'static str),
    /// A field holds a JSON type the typed model cannot represent.
    #[error("document does not match the resource shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Convenience alias for results returned by dbspec-core.
pub type Result<T> = std::result::Result<T, DecodeError>;

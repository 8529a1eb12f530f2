use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
///
/// Only fatal conditions live here. An unresolvable class during object
/// expansion or a missing example is a degraded result, and a failing
/// `rules()` read is recorded as a problem by the document builder.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    /// Invalid generator setup, e.g. a name registered for two example
    /// rules of different types or a symlink pointing at a missing class.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A class that must exist could not be found.
    #[error("Class not found: {0}")]
    NotFound(String),

    /// A variable description attribute was read before being set.
    #[error("Attribute `{attribute}` is not set on variable `{variable}`")]
    UnsetAttribute {
        variable: String,
        attribute: &'static str,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

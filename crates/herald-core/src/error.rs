use thiserror::Error;

/// Top-level error type for the Herald host.
///
/// Dispatch-level errors live in `herald-dispatch`; this type covers the
/// concerns shared by every crate (configuration, I/O, serialization).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HeraldError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for HeraldError {
    fn from(err: toml::de::Error) -> Self {
        HeraldError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HeraldError {
    fn from(err: toml::ser::Error) -> Self {
        HeraldError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HeraldError {
    fn from(err: serde_json::Error) -> Self {
        HeraldError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Herald operations.
pub type Result<T> = std::result::Result<T, HeraldError>;

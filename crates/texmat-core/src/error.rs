//! Error types for texmat

use thiserror::Error;

/// The main error type for texmat operations
#[derive(Debug, Error)]
pub enum TexmatError {
    /// The external extraction step failed. The message is the tool's own.
    #[error("Archive unreadable: {0}")]
    ArchiveUnreadable(String),

    #[error(
        "Inconsistent texture resolution: expected {expected} pixels, got {found} from '{file}'"
    )]
    InconsistentResolution {
        expected: u32,
        found: u32,
        file: String,
    },

    #[error("No suitable texture components found.")]
    NoUsableComponents,

    /// Raised while validating a cached node group. Callers treat it as
    /// "group absent" and never report it.
    #[error("Malformed node group definition: {0}")]
    MalformedGroupDefinition(String),

    #[error("Invalid relief preference: {0}")]
    InvalidPreference(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Graph sink error: {0}")]
    SinkError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

impl TexmatError {
    /// Whether this error ends the run. Only group validation is recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TexmatError::MalformedGroupDefinition(_))
    }
}

/// Result type alias for texmat operations
pub type Result<T> = std::result::Result<T, TexmatError>;

impl From<toml::de::Error> for TexmatError {
    fn from(err: toml::de::Error) -> Self {
        TexmatError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for TexmatError {
    fn from(err: toml::ser::Error) -> Self {
        TexmatError::TomlSerError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inconsistent_resolution_message() {
        let err = TexmatError::InconsistentResolution {
            expected: 2048,
            found: 4096,
            file: "a_nor_4k.png".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2048"));
        assert!(msg.contains("4096"));
        assert!(msg.contains("a_nor_4k.png"));
    }

    #[test]
    fn test_only_group_validation_is_recoverable() {
        assert!(!TexmatError::MalformedGroupDefinition("arity".into()).is_fatal());
        assert!(TexmatError::NoUsableComponents.is_fatal());
        assert!(TexmatError::ArchiveUnreadable("unar: exit 1".into()).is_fatal());
    }

    #[test]
    fn test_toml_error_conversion() {
        let err: TexmatError = toml::from_str::<toml::Value>("= broken")
            .unwrap_err()
            .into();
        assert!(matches!(err, TexmatError::TomlParseError(_)));
    }
}

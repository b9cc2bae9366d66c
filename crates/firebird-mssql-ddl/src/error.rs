//! Error types for the conversion library.

use thiserror::Error;

/// Exit code for configuration and input-document errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;

/// Exit code for structural errors in the schema metadata.
pub const EXIT_STRUCTURAL_ERROR: u8 = 2;

/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for conversion operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Type-mapping override document could not be used
    #[error("Type mapping error: {0}")]
    TypeMapping(String),

    /// A descriptor is missing a field the target statement needs
    #[error("Cannot build statement for {object}: {message}")]
    Structural { object: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    /// Create a Structural error naming the object whose statement failed
    pub fn structural(object: impl Into<String>, message: impl Into<String>) -> Self {
        ConvertError::Structural {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConvertError::Config(_)
            | ConvertError::TypeMapping(_)
            | ConvertError::Yaml(_)
            | ConvertError::Json(_) => EXIT_CONFIG_ERROR,
            ConvertError::Structural { .. } => EXIT_STRUCTURAL_ERROR,
            ConvertError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ConvertError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(
            ConvertError::structural("FK_A", "no referenced table").exit_code(),
            EXIT_STRUCTURAL_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(ConvertError::from(io).exit_code(), EXIT_IO_ERROR);
    }

    #[test]
    fn test_structural_message_names_object() {
        let err = ConvertError::structural("FK_ORDERS_CUSTOMERS", "referenced table is empty");
        assert_eq!(
            err.to_string(),
            "Cannot build statement for FK_ORDERS_CUSTOMERS: referenced table is empty"
        );
    }

    #[test]
    fn test_format_detailed_includes_header() {
        let err = ConvertError::Config("output.changelog is required".into());
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: Configuration error: output.changelog is required"));
    }
}

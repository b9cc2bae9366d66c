//! Non-fatal conditions reported alongside conversion output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A recoverable problem encountered during a conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionWarning {
    /// The type-mapping document could not be used; built-in mappings apply.
    TypeMappingIgnored { source: String, message: String },

    /// Tables whose foreign keys form (or depend on) a cycle were created
    /// in alphabetical order.
    DependencyCycle { count: usize, tables: Vec<String> },

    /// A statement could not be built and was left out.
    SkippedStatement { object: String, message: String },
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionWarning::TypeMappingIgnored { source, message } => write!(
                f,
                "type mappings from {} ignored, using built-in mappings: {}",
                source, message
            ),
            ConversionWarning::DependencyCycle { count, tables } => write!(
                f,
                "{} table(s) in circular foreign key dependencies created alphabetically: {}",
                count,
                tables.join(", ")
            ),
            ConversionWarning::SkippedStatement { object, message } => {
                write!(f, "skipped {}: {}", object, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let w = ConversionWarning::DependencyCycle {
            count: 2,
            tables: vec!["A".into(), "B".into()],
        };
        assert_eq!(
            w.to_string(),
            "2 table(s) in circular foreign key dependencies created alphabetically: A, B"
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let w = ConversionWarning::SkippedStatement {
            object: "FK_X".into(),
            message: "no referenced table".into(),
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "skipped_statement");
        assert_eq!(json["object"], "FK_X");
    }
}

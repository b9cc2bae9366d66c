//! User-supplied type mapping overrides.

use crate::core::Column;
use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single override: source type predicate plus the target type to emit.
///
/// Unset predicate fields are wildcards. A set field only matches a column
/// that carries the same value; a column with no value for that field never
/// matches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMappingRule {
    /// Source base type (e.g. "INT64", "VARCHAR").
    #[serde(rename = "firebirdType", alias = "FirebirdType", alias = "source_type")]
    pub source_type: String,

    #[serde(
        default,
        alias = "Precision",
        skip_serializing_if = "Option::is_none"
    )]
    pub precision: Option<i32>,

    #[serde(default, alias = "Scale", skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,

    #[serde(default, alias = "Length", skip_serializing_if = "Option::is_none")]
    pub length: Option<i32>,

    /// Target type emitted verbatim (native type or user-defined type name).
    #[serde(rename = "sqlServerType", alias = "SqlServerType", alias = "target_type")]
    pub target_type: String,

    /// Free-text note for documentation.
    #[serde(
        rename = "description",
        alias = "Description",
        alias = "note",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
}

impl TypeMappingRule {
    pub fn new(source_type: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            precision: None,
            scale: None,
            length: None,
            target_type: target_type.into(),
            note: None,
        }
    }

    pub fn with_precision(mut self, precision: i32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_scale(mut self, scale: i32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.length = Some(length);
        self
    }

    /// Check whether this rule applies to the column.
    pub fn matches(&self, column: &Column) -> bool {
        if !column.data_type.eq_ignore_ascii_case(&self.source_type) {
            return false;
        }
        field_matches(self.precision, column.precision)
            && field_matches(self.scale, column.scale)
            && field_matches(self.length, column.char_length)
    }

    /// Short human-readable form, e.g. `INT64(15,2) -> DM_MONEY`.
    pub fn describe(&self) -> String {
        let mut source = self.source_type.clone();
        match (self.precision, self.scale, self.length) {
            (Some(p), Some(s), _) => source.push_str(&format!("({},{})", p, s)),
            (_, _, Some(l)) => source.push_str(&format!("({})", l)),
            _ => {}
        }
        format!("{} -> {}", source, self.target_type)
    }
}

fn field_matches(expected: Option<i32>, actual: Option<i32>) -> bool {
    match expected {
        None => true,
        Some(v) => actual == Some(v),
    }
}

/// Override document: an ordered list of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMappingDocument {
    #[serde(
        rename = "customMappings",
        alias = "CustomMappings",
        alias = "custom_mappings",
        default
    )]
    pub custom_mappings: Vec<TypeMappingRule>,
}

impl TypeMappingDocument {
    /// Load a document, choosing YAML for `.yaml`/`.yml` files and JSON otherwise.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        let doc = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_json(&content)?
        };
        Ok(doc)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let doc: Self = serde_yaml::from_str(yaml)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Reject rules that cannot produce a type.
    pub fn validate(&self) -> Result<()> {
        for (i, rule) in self.custom_mappings.iter().enumerate() {
            if rule.source_type.trim().is_empty() {
                return Err(ConvertError::TypeMapping(format!(
                    "rule #{} has an empty source type",
                    i + 1
                )));
            }
            if rule.target_type.trim().is_empty() {
                return Err(ConvertError::TypeMapping(format!(
                    "rule #{} ({}) has an empty target type",
                    i + 1,
                    rule.source_type
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money_column() -> Column {
        Column::new("PRICE", "INT64").with_numeric(15, 2)
    }

    #[test]
    fn test_rule_matches_on_all_specified_fields() {
        let rule = TypeMappingRule::new("int64", "DM_MONEY")
            .with_precision(15)
            .with_scale(2);
        assert!(rule.matches(&money_column()));

        let other_scale = Column::new("RATE", "INT64").with_numeric(15, 4);
        assert!(!rule.matches(&other_scale));
    }

    #[test]
    fn test_specified_field_does_not_match_missing_value() {
        let rule = TypeMappingRule::new("VARCHAR", "NVARCHAR(50)").with_length(50);
        assert!(!rule.matches(&Column::new("NAME", "VARCHAR")));
        assert!(rule.matches(&Column::new("NAME", "VARCHAR").with_length(50)));
    }

    #[test]
    fn test_rule_without_predicates_is_wildcard() {
        let rule = TypeMappingRule::new("TIMESTAMP", "DATETIME");
        assert!(rule.matches(&Column::new("CREATED_AT", "timestamp")));
        assert!(!rule.matches(&Column::new("CREATED_AT", "DATE")));
    }

    #[test]
    fn test_describe() {
        let rule = TypeMappingRule::new("INT64", "DM_MONEY")
            .with_precision(15)
            .with_scale(2);
        assert_eq!(rule.describe(), "INT64(15,2) -> DM_MONEY");
        let rule = TypeMappingRule::new("VARCHAR", "NVARCHAR(100)").with_length(100);
        assert_eq!(rule.describe(), "VARCHAR(100) -> NVARCHAR(100)");
    }

    #[test]
    fn test_document_from_json_camel_case() {
        let json = r#"{
            "customMappings": [
                {"firebirdType": "INT64", "precision": 15, "scale": 2,
                 "sqlServerType": "DM_MONEY", "description": "currency"},
                {"firebirdType": "VARCHAR", "length": 1, "sqlServerType": "BIT"}
            ]
        }"#;
        let doc = TypeMappingDocument::from_json(json).unwrap();
        assert_eq!(doc.custom_mappings.len(), 2);
        assert_eq!(doc.custom_mappings[0].note.as_deref(), Some("currency"));
        assert_eq!(doc.custom_mappings[1].length, Some(1));
    }

    #[test]
    fn test_document_from_json_pascal_case() {
        let json = r#"{"CustomMappings": [{"FirebirdType": "DATE", "SqlServerType": "DATETIME"}]}"#;
        let doc = TypeMappingDocument::from_json(json).unwrap();
        assert_eq!(doc.custom_mappings[0].target_type, "DATETIME");
    }

    #[test]
    fn test_document_from_yaml() {
        let yaml = "custom_mappings:\n  - source_type: SHORT\n    target_type: TINYINT\n    note: flags\n";
        let doc = TypeMappingDocument::from_yaml(yaml).unwrap();
        assert_eq!(doc.custom_mappings[0].source_type, "SHORT");
        assert_eq!(doc.custom_mappings[0].note.as_deref(), Some("flags"));
    }

    #[test]
    fn test_document_rejects_empty_target() {
        let json = r#"{"customMappings": [{"firebirdType": "DATE", "sqlServerType": " "}]}"#;
        let err = TypeMappingDocument::from_json(json).unwrap_err();
        assert!(matches!(err, ConvertError::TypeMapping(_)));
    }

    #[test]
    fn test_document_rejects_malformed_json() {
        assert!(TypeMappingDocument::from_json("{\"customMappings\": [").is_err());
    }

    #[test]
    fn test_load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.yml");
        std::fs::write(&path, "custom_mappings:\n  - source_type: LONG\n    target_type: INT\n").unwrap();
        let doc = TypeMappingDocument::load(&path).unwrap();
        assert_eq!(doc.custom_mappings[0].target_type, "INT");
    }
}

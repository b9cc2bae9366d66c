//! Type mapping from Firebird base types to SQL Server types.
//!
//! Resolution order for a column:
//!
//! 1. user rules ([`TypeMappingRule`]) in load order, first match wins
//! 2. scaled `INT64` becomes `NUMERIC(p,s)`
//! 3. character types with a length become `CHAR(n)` / `VARCHAR(n)`
//! 4. any `BLOB` becomes `VARBINARY(MAX)`
//! 5. the fixed built-in table
//! 6. the base type itself

mod rules;

pub use rules::{TypeMappingDocument, TypeMappingRule};

use crate::core::{Column, Parameter};
use tracing::debug;

/// Precision used for scaled `INT64` columns that carry no precision.
const DEFAULT_NUMERIC_PRECISION: i32 = 18;

/// Resolves source column types to target type strings.
#[derive(Debug, Clone, Default)]
pub struct TypeMappingResolver {
    rules: Vec<TypeMappingRule>,
}

impl TypeMappingResolver {
    /// Create a resolver that only uses the built-in mappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with user overrides.
    pub fn with_rules(rules: Vec<TypeMappingRule>) -> Self {
        Self { rules }
    }

    /// Replace the user overrides.
    pub fn set_rules(&mut self, rules: Vec<TypeMappingRule>) {
        self.rules = rules;
    }

    pub fn rules(&self) -> &[TypeMappingRule] {
        &self.rules
    }

    /// Resolve the target type for a column. Never fails.
    pub fn resolve(&self, column: &Column) -> String {
        if let Some(rule) = self.rules.iter().find(|r| r.matches(column)) {
            debug!("{}: user rule {}", column.name, rule.describe());
            return rule.target_type.clone();
        }
        builtin_type(column)
    }

    /// Resolve the target type for a procedure parameter.
    pub fn resolve_parameter(&self, param: &Parameter) -> String {
        self.resolve(&param.as_column())
    }
}

fn builtin_type(column: &Column) -> String {
    let base = column.data_type.trim().to_uppercase();

    if base == "INT64" {
        if let Some(scale) = column.scale.filter(|s| *s > 0) {
            let precision = column.precision.unwrap_or(DEFAULT_NUMERIC_PRECISION);
            return format!("NUMERIC({},{})", precision, scale);
        }
    }

    if matches!(base.as_str(), "VARCHAR" | "VARYING" | "CHAR") {
        if let Some(length) = column.char_length {
            let target = if base == "CHAR" { "CHAR" } else { "VARCHAR" };
            return format!("{}({})", target, length);
        }
    }

    if base.contains("BLOB") {
        return "VARBINARY(MAX)".to_string();
    }

    match base.as_str() {
        "SHORT" => "SMALLINT",
        "LONG" => "INTEGER",
        "INT64" => "BIGINT",
        "FLOAT" => "FLOAT",
        "DOUBLE" | "D_FLOAT" => "DOUBLE PRECISION",
        "DATE" => "DATE",
        "TIME" => "TIME",
        "TIMESTAMP" => "DATETIME2",
        "CHAR" => "CHAR",
        "VARCHAR" | "VARYING" | "CSTRING" => "VARCHAR",
        "TEXT" => "VARCHAR(MAX)",
        _ => return base,
    }
    .to_string()
}

/// Map a type written inline in a PSQL `DECLARE VARIABLE` statement.
///
/// Character and exact numeric types are kept as written; the rest are
/// normalized to their SQL Server spelling.
pub fn map_local_type(firebird_type: &str) -> String {
    let upper = firebird_type.trim().to_uppercase();

    if upper.contains("CHAR") || upper.contains("NUMERIC") || upper.contains("DECIMAL") {
        return firebird_type.trim().to_string();
    }

    let mapped = if upper.contains("BIGINT") {
        "BIGINT"
    } else if upper.contains("SMALLINT") {
        "SMALLINT"
    } else if upper.contains("INTEGER") || upper == "INT" {
        "INT"
    } else if upper.contains("DOUBLE") {
        "FLOAT"
    } else if upper.contains("FLOAT") {
        "REAL"
    } else if upper.contains("TIMESTAMP") {
        "DATETIME2"
    } else if upper.contains("DATE") {
        "DATE"
    } else if upper.contains("TIME") {
        "TIME"
    } else if upper.contains("BLOB") {
        "VARCHAR(MAX)"
    } else {
        return firebird_type.trim().to_string();
    };
    mapped.to_string()
}

//! Identifier validation and quoting for emitted SQL Server statements.
//!
//! Source names are emitted as written when SQL Server accepts them as
//! regular identifiers. Anything else (reserved words, spaces, leading
//! digits) is bracket-quoted with `]` doubled.

use crate::error::{ConvertError, Result};

/// Maximum identifier length accepted by SQL Server.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// T-SQL reserved keywords that collide with common source object names.
const RESERVED: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BACKUP", "BEGIN", "BETWEEN", "BREAK",
    "BROWSE", "BULK", "BY", "CASCADE", "CASE", "CHECK", "CHECKPOINT", "CLOSE", "CLUSTERED",
    "COLUMN", "COMMIT", "COMPUTE", "CONSTRAINT", "CONTAINS", "CONTINUE", "CONVERT", "CREATE",
    "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "CURSOR", "DATABASE", "DEALLOCATE", "DECLARE", "DEFAULT", "DELETE", "DENY", "DESC", "DISK",
    "DISTINCT", "DOUBLE", "DROP", "DUMP", "ELSE", "END", "ERRLVL", "ESCAPE", "EXCEPT", "EXEC",
    "EXECUTE", "EXISTS", "EXIT", "EXTERNAL", "FETCH", "FILE", "FILLFACTOR", "FOR", "FOREIGN",
    "FROM", "FULL", "FUNCTION", "GOTO", "GRANT", "GROUP", "HAVING", "HOLDLOCK", "IDENTITY",
    "IF", "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "KILL",
    "LEFT", "LIKE", "LINENO", "MERGE", "NATIONAL", "NOCHECK", "NONCLUSTERED", "NOT", "NULL",
    "NULLIF", "OF", "OFF", "OFFSETS", "ON", "OPEN", "OPTION", "OR", "ORDER", "OUTER", "OVER",
    "PERCENT", "PIVOT", "PLAN", "PRIMARY", "PRINT", "PROC", "PROCEDURE", "PUBLIC", "RAISERROR",
    "READ", "REFERENCES", "RESTORE", "RESTRICT", "RETURN", "REVOKE", "RIGHT", "ROLLBACK",
    "ROWCOUNT", "RULE", "SAVE", "SCHEMA", "SELECT", "SESSION_USER", "SET", "SETUSER",
    "SHUTDOWN", "SOME", "STATISTICS", "SYSTEM_USER", "TABLE", "TEXTSIZE", "THEN", "TO", "TOP",
    "TRAN", "TRANSACTION", "TRIGGER", "TRUNCATE", "UNION", "UNIQUE", "UNPIVOT", "UPDATE",
    "USE", "USER", "VALUES", "VARYING", "VIEW", "WAITFOR", "WHEN", "WHERE", "WHILE", "WITH",
];

/// Validate an identifier before it is written into a statement.
///
/// # Errors
///
/// Returns `ConvertError::Structural` for empty names, names containing null
/// bytes and names longer than SQL Server accepts.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ConvertError::structural("<unnamed>", "identifier is empty"));
    }

    if name.contains('\0') {
        return Err(ConvertError::structural(
            name.replace('\0', "\\0"),
            "identifier contains a null byte",
        ));
    }

    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(ConvertError::structural(
            name,
            format!(
                "identifier exceeds {} characters",
                MAX_IDENTIFIER_LENGTH
            ),
        ));
    }

    Ok(())
}

/// Quote a SQL Server identifier using brackets, doubling `]`.
pub fn quote_mssql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Whether `name` must be bracket-quoted to be used as an identifier.
pub fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let regular = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#' | '@'))
        }
        _ => false,
    };
    !regular || RESERVED.contains(&name.to_ascii_uppercase().as_str())
}

/// Render an identifier: as written when it is a regular identifier,
/// bracket-quoted otherwise.
pub fn ident(name: &str) -> Result<String> {
    validate_identifier(name)?;
    if needs_quoting(name) {
        quote_mssql(name)
    } else {
        Ok(name.to_string())
    }
}

/// Render a comma-separated identifier list.
pub fn ident_list<S: AsRef<str>>(names: &[S]) -> Result<String> {
    let quoted = names
        .iter()
        .map(|n| ident(n.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(", "))
}

/// Validate a CHECK condition copied from the source catalog.
///
/// Conditions are emitted verbatim inside `CHECK (...)`, so anything that
/// could end the statement early is rejected.
pub fn validate_check_condition(object: &str, condition: &str) -> Result<()> {
    if condition.trim().is_empty() {
        return Err(ConvertError::structural(object, "CHECK condition is empty"));
    }

    if condition.contains(';') {
        return Err(ConvertError::structural(
            object,
            "CHECK condition contains a statement terminator",
        ));
    }

    let lower = condition.to_lowercase();
    if lower
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|word| word == "exec" || word == "execute")
    {
        return Err(ConvertError::structural(
            object,
            "CHECK condition contains EXEC/EXECUTE",
        ));
    }

    Ok(())
}

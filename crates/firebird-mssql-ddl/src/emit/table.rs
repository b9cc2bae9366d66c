//! Table-level statements: CREATE TABLE, foreign keys, indexes, sequences.

use crate::core::identifier::{ident, ident_list, validate_check_condition};
use crate::core::{Column, Constraint, ConstraintKind, Index, Sequence, Table};
use crate::error::{ConvertError, Result};
use crate::typemap::TypeMappingResolver;

/// Build `CREATE TABLE` with columns and inline PRIMARY KEY, UNIQUE and
/// CHECK constraints. Foreign keys and indexes are emitted separately.
pub fn create_table(table: &Table, resolver: &TypeMappingResolver) -> Result<String> {
    let name = ident(&table.name)?;
    if table.columns.is_empty() {
        return Err(ConvertError::structural(&table.name, "table has no columns"));
    }

    let mut lines = Vec::with_capacity(table.columns.len() + table.constraints.len());
    for (i, column) in table.columns.iter().enumerate() {
        lines.push(column_definition(table, i, column, resolver)?);
    }

    for constraint in &table.constraints {
        if let Some(line) = inline_constraint(table, constraint)? {
            lines.push(line);
        }
    }

    Ok(format!("CREATE TABLE {} (\n{}\n);", name, lines.join(",\n")))
}

fn column_definition(
    table: &Table,
    position: usize,
    column: &Column,
    resolver: &TypeMappingResolver,
) -> Result<String> {
    if column.name.trim().is_empty() {
        return Err(ConvertError::structural(
            &table.name,
            format!("column #{} has no name", position + 1),
        ));
    }

    let target_type = resolver.resolve(column);
    if target_type.is_empty() {
        return Err(ConvertError::structural(
            format!("{}.{}", table.name, column.name),
            "column has no type",
        ));
    }

    let mut def = format!("  {} {}", ident(&column.name)?, target_type);
    if !column.is_nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = column.default_value.as_deref().and_then(convert_default) {
        def.push_str(" DEFAULT ");
        def.push_str(&default);
    }
    Ok(def)
}

fn inline_constraint(table: &Table, constraint: &Constraint) -> Result<Option<String>> {
    let body = match constraint.kind {
        ConstraintKind::PrimaryKey | ConstraintKind::Unique => {
            if constraint.columns.is_empty() {
                return Err(ConvertError::structural(
                    constraint_object(table, constraint),
                    "constraint has no columns",
                ));
            }
            let keyword = if constraint.kind == ConstraintKind::PrimaryKey {
                "PRIMARY KEY"
            } else {
                "UNIQUE"
            };
            format!("{} ({})", keyword, ident_list(&constraint.columns)?)
        }
        ConstraintKind::Check => {
            let object = constraint_object(table, constraint);
            let condition = check_expression(constraint.check_condition.as_deref().unwrap_or(""));
            validate_check_condition(&object, condition)?;
            format!("CHECK ({})", condition)
        }
        ConstraintKind::ForeignKey => return Ok(None),
    };

    if constraint.name.trim().is_empty() {
        Ok(Some(format!("  {}", body)))
    } else {
        Ok(Some(format!("  CONSTRAINT {} {}", ident(&constraint.name)?, body)))
    }
}

fn constraint_object(table: &Table, constraint: &Constraint) -> String {
    if constraint.name.trim().is_empty() {
        table.name.clone()
    } else {
        constraint.name.clone()
    }
}

/// Reduce a stored check clause to its bare condition: `CHECK (x > 0)`
/// and `(x > 0)` both become `x > 0`.
fn check_expression(raw: &str) -> &str {
    let expr = raw.trim();
    strip_outer_parens(strip_keyword(expr, "CHECK"))
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> &'a str {
    match text.get(..keyword.len()) {
        Some(head) if head.eq_ignore_ascii_case(keyword) => text[keyword.len()..].trim_start(),
        _ => text,
    }
}

fn strip_outer_parens(expr: &str) -> &str {
    let inner = match expr.strip_prefix('(').and_then(|e| e.strip_suffix(')')) {
        Some(inner) => inner,
        None => return expr,
    };

    // Only strip when the first '(' closes at the very end.
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return expr;
                }
            }
            _ => {}
        }
    }
    inner.trim()
}

/// Convert a stored default clause to a SQL Server default expression.
///
/// Returns `None` when nothing remains after the `DEFAULT` keyword.
pub fn convert_default(raw: &str) -> Option<String> {
    let value = strip_keyword(raw.trim(), "DEFAULT");
    if value.is_empty() {
        return None;
    }

    let converted = match value.to_uppercase().as_str() {
        "CURRENT_TIMESTAMP" | "'NOW'" => "GETDATE()".to_string(),
        "CURRENT_DATE" | "'TODAY'" => "CAST(GETDATE() AS DATE)".to_string(),
        "CURRENT_TIME" => "CAST(GETDATE() AS TIME)".to_string(),
        "USER" | "CURRENT_USER" => "CURRENT_USER".to_string(),
        _ => value.to_string(),
    };
    Some(converted)
}

/// Build `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY ... REFERENCES ...`.
pub fn foreign_key(table: &Table, fk: &Constraint) -> Result<String> {
    let object = constraint_object(table, fk);
    let ref_table = fk
        .ref_table
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ConvertError::structural(&object, "foreign key has no referenced table"))?;

    if fk.columns.is_empty() {
        return Err(ConvertError::structural(&object, "foreign key has no columns"));
    }
    if !fk.ref_columns.is_empty() && fk.ref_columns.len() != fk.columns.len() {
        return Err(ConvertError::structural(
            &object,
            format!(
                "foreign key has {} column(s) but references {}",
                fk.columns.len(),
                fk.ref_columns.len()
            ),
        ));
    }

    let mut sql = format!("ALTER TABLE {} ADD ", ident(&table.name)?);
    if !fk.name.trim().is_empty() {
        sql.push_str(&format!("CONSTRAINT {} ", ident(&fk.name)?));
    }
    sql.push_str(&format!(
        "FOREIGN KEY ({}) REFERENCES {}",
        ident_list(&fk.columns)?,
        ident(ref_table)?
    ));
    if !fk.ref_columns.is_empty() {
        sql.push_str(&format!(" ({})", ident_list(&fk.ref_columns)?));
    }
    if let Some(action) = fk.on_delete.as_deref().and_then(referential_action) {
        sql.push_str(" ON DELETE ");
        sql.push_str(action);
    }
    if let Some(action) = fk.on_update.as_deref().and_then(referential_action) {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action);
    }
    sql.push(';');
    Ok(sql)
}

/// SQL Server spelling of a referential action. RESTRICT and NO ACTION are
/// the default and are not emitted.
fn referential_action(rule: &str) -> Option<&'static str> {
    match rule.trim().to_uppercase().as_str() {
        "CASCADE" => Some("CASCADE"),
        "SET NULL" => Some("SET NULL"),
        "SET DEFAULT" => Some("SET DEFAULT"),
        _ => None,
    }
}

/// Build `CREATE [UNIQUE] INDEX`.
pub fn create_index(table: &Table, index: &Index) -> Result<String> {
    if index.columns.is_empty() {
        return Err(ConvertError::structural(&index.name, "index has no columns"));
    }
    Ok(format!(
        "CREATE {}INDEX {} ON {} ({});",
        if index.is_unique { "UNIQUE " } else { "" },
        ident(&index.name)?,
        ident(&table.name)?,
        ident_list(&index.columns)?
    ))
}

/// Build `CREATE SEQUENCE` starting one above the source generator value.
pub fn create_sequence(sequence: &Sequence) -> Result<String> {
    Ok(format!(
        "CREATE SEQUENCE {} START WITH {};",
        ident(&sequence.name)?,
        sequence.start_value()
    ))
}

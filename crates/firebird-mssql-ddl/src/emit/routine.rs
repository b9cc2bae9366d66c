//! Procedure and trigger blocks.
//!
//! Each block is self-contained: a conditional drop, a `GO`, the CREATE
//! statement with its translated body, and a closing `GO`.

use crate::core::identifier::{ident, validate_identifier};
use crate::core::{Parameter, Procedure, Trigger};
use crate::error::Result;
use crate::translate::{translate_procedure_body_in, translate_trigger_body, Scope, MISSING_SOURCE};
use crate::typemap::TypeMappingResolver;

const RULE: &str = "-- ============================================================";

/// Build the full block for one stored procedure.
///
/// Output parameters have no direct counterpart, so they are declared as
/// locals and returned as a single-row result set at the end.
pub fn procedure_block(procedure: &Procedure, resolver: &TypeMappingResolver) -> Result<String> {
    let name = ident(&procedure.name)?;
    let inputs = by_position(&procedure.input_parameters);
    let outputs = by_position(&procedure.output_parameters);

    let mut sql = String::new();
    sql.push_str(RULE);
    sql.push('\n');
    sql.push_str(&format!("-- Stored Procedure: {}\n", procedure.name));
    sql.push_str("-- Converted from Firebird PSQL. Review before production use.\n");
    sql.push_str(RULE);
    sql.push('\n');
    sql.push_str(&drop_if_exists(&procedure.name, "P", "PROCEDURE", &name));
    sql.push('\n');

    sql.push_str(&format!("CREATE PROCEDURE {}\n", name));
    if inputs.is_empty() {
        sql.push_str("    -- no input parameters\n");
    } else {
        let params = inputs
            .iter()
            .map(|p| -> Result<String> {
                Ok(format!("    {} {}", variable(&p.name)?, resolver.resolve_parameter(p)))
            })
            .collect::<Result<Vec<_>>>()?;
        sql.push_str(&params.join(",\n"));
        sql.push('\n');
    }
    sql.push_str("AS\nBEGIN\n    SET NOCOUNT ON;\n\n");

    if !outputs.is_empty() {
        sql.push_str("    -- output parameters declared as local variables\n");
        for p in &outputs {
            sql.push_str(&format!(
                "    DECLARE {} {};\n",
                variable(&p.name)?,
                resolver.resolve_parameter(p)
            ));
        }
        sql.push('\n');
    }

    let scope = Scope::with_variables(inputs.iter().chain(outputs.iter()).map(|p| p.name.as_str()));
    match procedure.source.as_deref() {
        Some(source) => sql.push_str(&translate_procedure_body_in(source, &scope)),
        None => sql.push_str(MISSING_SOURCE),
    }

    if !outputs.is_empty() {
        let columns = outputs
            .iter()
            .map(|p| -> Result<String> {
                Ok(format!("{} AS {}", variable(&p.name)?, ident(&p.name)?))
            })
            .collect::<Result<Vec<_>>>()?;
        sql.push_str("\n    -- output values returned as a result set\n");
        sql.push_str(&format!("    SELECT {};\n", columns.join(", ")));
    }

    sql.push_str("END;\nGO\n");
    Ok(sql)
}

/// Build the full block for one trigger.
pub fn trigger_block(trigger: &Trigger) -> Result<String> {
    let name = ident(&trigger.name)?;
    let table = ident(&trigger.table_name)?;
    let timing = trigger_timing(trigger.trigger_type);
    let events = trigger_events(trigger.trigger_type);

    let mut sql = String::new();
    sql.push_str(RULE);
    sql.push('\n');
    sql.push_str(&format!("-- Trigger: {}\n", trigger.name));
    sql.push_str(&format!("-- Table: {}\n", trigger.table_name));
    sql.push_str(&format!("-- Type: {} {}\n", timing, events));
    if timing == "INSTEAD OF" {
        sql.push_str("-- BEFORE trigger converted to INSTEAD OF; the body must perform the write itself.\n");
    }
    sql.push_str(RULE);
    sql.push('\n');
    sql.push_str(&drop_if_exists(&trigger.name, "TR", "TRIGGER", &name));
    sql.push('\n');

    sql.push_str(&format!("CREATE TRIGGER {}\nON {}\n{} {}\n", name, table, timing, events));
    sql.push_str("AS\nBEGIN\n    SET NOCOUNT ON;\n\n");
    match trigger.source.as_deref() {
        Some(source) => sql.push_str(&translate_trigger_body(source)),
        None => sql.push_str(MISSING_SOURCE),
    }
    sql.push_str("END;\nGO\n");

    if !trigger.is_active {
        sql.push_str(&format!("DISABLE TRIGGER {} ON {};\nGO\n", name, table));
    }
    Ok(sql)
}

fn drop_if_exists(raw_name: &str, object_type: &str, keyword: &str, name: &str) -> String {
    format!(
        "IF OBJECT_ID('{}', '{}') IS NOT NULL\n    DROP {} {};\nGO\n",
        raw_name.replace('\'', "''"),
        object_type,
        keyword,
        name
    )
}

/// Parameters become `@name` variables; the sigil makes quoting unnecessary.
fn variable(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("@{}", name))
}

fn by_position(params: &[Parameter]) -> Vec<&Parameter> {
    let mut sorted: Vec<&Parameter> = params.iter().collect();
    sorted.sort_by_key(|p| p.position);
    sorted
}

/// Timing keyword for a trigger type code.
///
/// The target has no BEFORE triggers: odd codes (BEFORE in the source)
/// become `INSTEAD OF`, even codes become `AFTER`.
pub fn trigger_timing(trigger_type: i32) -> &'static str {
    if trigger_type.rem_euclid(2) == 1 {
        "INSTEAD OF"
    } else {
        "AFTER"
    }
}

/// Firing events for a trigger type code.
///
/// This is a heuristic decoding, not the full source bit layout: bits 0-2
/// are tested first (with the exact codes 1, 2 and 3 also selecting INSERT,
/// UPDATE and DELETE), then the code modulo 8, then all three events.
pub fn trigger_events(trigger_type: i32) -> String {
    let mut events = Vec::with_capacity(3);
    if trigger_type & 1 != 0 || trigger_type == 1 {
        events.push("INSERT");
    }
    if trigger_type & 2 != 0 || trigger_type == 2 {
        events.push("UPDATE");
    }
    if trigger_type & 4 != 0 || trigger_type == 3 {
        events.push("DELETE");
    }
    if !events.is_empty() {
        return events.join(", ");
    }

    match trigger_type.rem_euclid(8) {
        1 => "INSERT",
        2 | 3 => "UPDATE",
        5 | 6 => "DELETE",
        _ => "INSERT, UPDATE, DELETE",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_timing_follows_low_bit() {
        assert_eq!(trigger_timing(1), "INSTEAD OF");
        assert_eq!(trigger_timing(3), "INSTEAD OF");
        assert_eq!(trigger_timing(17), "INSTEAD OF");
        assert_eq!(trigger_timing(2), "AFTER");
        assert_eq!(trigger_timing(4), "AFTER");
        assert_eq!(trigger_timing(0), "AFTER");
        assert_eq!(trigger_timing(-1), "INSTEAD OF");
    }

    #[test]
    fn test_trigger_events() {
        assert_eq!(trigger_events(1), "INSERT");
        assert_eq!(trigger_events(2), "UPDATE");
        assert_eq!(trigger_events(3), "INSERT, UPDATE, DELETE");
        assert_eq!(trigger_events(4), "DELETE");
        assert_eq!(trigger_events(6), "UPDATE, DELETE");
        assert_eq!(trigger_events(8), "INSERT, UPDATE, DELETE");
        assert_eq!(trigger_events(0), "INSERT, UPDATE, DELETE");
    }

    #[test]
    fn test_procedure_block() {
        let proc = Procedure::new("GET_CUSTOMER")
            .input(Parameter::new("P_NAME", "VARCHAR", 1).with_length(50))
            .input(Parameter::new("P_ID", "LONG", 0))
            .output(Parameter::new("TOTAL", "INT64", 0).with_numeric(15, 2))
            .with_source("BEGIN\nTOTAL = 0;\nSUSPEND;\nEND");
        let sql = procedure_block(&proc, &TypeMappingResolver::new()).unwrap();

        assert!(sql.contains(
            "IF OBJECT_ID('GET_CUSTOMER', 'P') IS NOT NULL\n    DROP PROCEDURE GET_CUSTOMER;\nGO\n"
        ));
        assert!(sql.contains(
            "CREATE PROCEDURE GET_CUSTOMER\n    @P_ID INTEGER,\n    @P_NAME VARCHAR(50)\nAS\nBEGIN\n    SET NOCOUNT ON;\n"
        ));
        assert!(sql.contains("    DECLARE @TOTAL NUMERIC(15,2);\n"));
        assert!(sql.contains("SET @TOTAL = 0;"));
        assert!(sql.contains("    SELECT @TOTAL AS TOTAL;\n"));
        assert!(sql.ends_with("END;\nGO\n"));
    }

    #[test]
    fn test_procedure_without_parameters_or_source() {
        let sql = procedure_block(&Procedure::new("NOOP"), &TypeMappingResolver::new()).unwrap();
        assert!(sql.contains("CREATE PROCEDURE NOOP\n    -- no input parameters\nAS\n"));
        assert!(sql.contains(MISSING_SOURCE));
        assert!(!sql.contains("SELECT @"));
    }

    #[test]
    fn test_reserved_parameter_names_are_not_bracketed() {
        let proc = Procedure::new("SP_KEYS")
            .input(Parameter::new("KEY", "LONG", 0))
            .output(Parameter::new("USER", "VARCHAR", 0).with_length(31));
        let sql = procedure_block(&proc, &TypeMappingResolver::new()).unwrap();
        assert!(sql.contains("    @KEY INTEGER\n"));
        assert!(sql.contains("    DECLARE @USER VARCHAR(31);\n"));
        assert!(sql.contains("    SELECT @USER AS [USER];\n"));
    }

    #[test]
    fn test_object_id_literal_is_escaped() {
        let sql = procedure_block(&Procedure::new("O'BRIEN"), &TypeMappingResolver::new()).unwrap();
        assert!(sql.contains("OBJECT_ID('O''BRIEN', 'P')"));
        assert!(sql.contains("DROP PROCEDURE [O'BRIEN];"));
    }

    #[test]
    fn test_trigger_block() {
        let trigger = Trigger::new("TR_CUSTOMERS_BI", "CUSTOMERS", 1)
            .with_source("BEGIN\nNEW.ID = GEN_ID(SEQ_CUSTOMERS, 1);\nEND");
        let sql = trigger_block(&trigger).unwrap();

        assert!(sql.contains("IF OBJECT_ID('TR_CUSTOMERS_BI', 'TR') IS NOT NULL\n    DROP TRIGGER TR_CUSTOMERS_BI;\nGO\n"));
        assert!(sql.contains("CREATE TRIGGER TR_CUSTOMERS_BI\nON CUSTOMERS\nINSTEAD OF INSERT\nAS\nBEGIN\n"));
        assert!(sql.contains("INSERTED.ID = NEXT VALUE FOR SEQ_CUSTOMERS;"));
        assert!(sql.contains("-- BEFORE trigger converted to INSTEAD OF"));
        assert!(!sql.contains("DISABLE TRIGGER"));
    }

    #[test]
    fn test_inactive_trigger_is_disabled() {
        let trigger = Trigger::new("TR_AUDIT", "ORDERS", 2).inactive();
        let sql = trigger_block(&trigger).unwrap();
        assert!(sql.contains("ON ORDERS\nAFTER UPDATE\n"));
        assert!(sql.ends_with("END;\nGO\nDISABLE TRIGGER TR_AUDIT ON ORDERS;\nGO\n"));
    }
}

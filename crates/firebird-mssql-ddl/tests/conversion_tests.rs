//! End-to-end conversion tests: snapshot JSON in, statements and changelog out.

use chrono::NaiveDate;
use firebird_mssql_ddl::{
    split_batches, ChangelogMetadata, ConversionWarning, ConvertError, Converter, SchemaSnapshot,
    StatementKind, StructuralPolicy, TypeMappingResolver, TypeMappingRule,
};

const SNAPSHOT: &str = r#"{
    "tables": [
        {
            "name": "ORDERS",
            "columns": [
                {"name": "ID", "dataType": "LONG", "isNullable": false},
                {"name": "CUSTOMER_ID", "dataType": "LONG", "isNullable": false},
                {"name": "TOTAL", "dataType": "INT64", "precision": 10, "scale": 2},
                {"name": "CREATED_AT", "dataType": "TIMESTAMP", "defaultValue": "DEFAULT CURRENT_TIMESTAMP"}
            ],
            "constraints": [
                {"name": "PK_ORDERS", "kind": "PRIMARY KEY", "columns": ["ID"]},
                {"name": "FK_ORDERS_CUSTOMERS", "kind": "FOREIGN KEY", "columns": ["CUSTOMER_ID"],
                 "refTable": "CUSTOMERS", "refColumns": ["ID"]}
            ],
            "indexes": [
                {"name": "PK_ORDERS", "isUnique": true, "columns": ["ID"]},
                {"name": "IDX_ORDERS_CUSTOMER", "columns": ["CUSTOMER_ID"]}
            ]
        },
        {
            "name": "CUSTOMERS",
            "columns": [
                {"name": "ID", "dataType": "LONG", "isNullable": false},
                {"name": "NAME", "dataType": "VARCHAR", "charLength": 100}
            ],
            "constraints": [
                {"name": "PK_CUSTOMERS", "kind": "PRIMARY KEY", "columns": ["ID"]}
            ]
        }
    ],
    "generators": [{"name": "SEQ_CUSTOMERS", "currentValue": 1}],
    "procedures": [
        {
            "name": "GET_CUSTOMER_TOTAL",
            "source": "DECLARE VARIABLE V_SUM NUMERIC(15,2);\nBEGIN\n  SELECT SUM(TOTAL) FROM ORDERS WHERE CUSTOMER_ID = :P_ID INTO :V_SUM;\n  RESULT = COALESCE(V_SUM, 0);\n  SUSPEND;\nEND",
            "inputParameters": [{"name": "P_ID", "dataType": "LONG", "position": 0}],
            "outputParameters": [{"name": "RESULT", "dataType": "INT64", "precision": 15, "scale": 2, "position": 0}]
        }
    ],
    "triggers": [
        {
            "name": "TR_CUSTOMERS_BI",
            "tableName": "CUSTOMERS",
            "triggerType": 1,
            "source": "AS\nBEGIN\n  IF (NEW.ID IS NULL) THEN\n    NEW.ID = GEN_ID(SEQ_CUSTOMERS, 1);\nEND"
        }
    ]
}"#;

fn metadata() -> ChangelogMetadata {
    ChangelogMetadata::new("dba", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
}

fn snapshot() -> SchemaSnapshot {
    SchemaSnapshot::from_json(SNAPSHOT).unwrap()
}

#[test]
fn test_full_conversion_order_and_content() {
    let result = Converter::new().convert(&snapshot(), &metadata()).unwrap();

    let kinds: Vec<StatementKind> = result.statements.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            StatementKind::CreateTable,
            StatementKind::CreateTable,
            StatementKind::ForeignKey,
            StatementKind::CreateIndex,
            StatementKind::CreateSequence,
            StatementKind::Procedure,
            StatementKind::Trigger,
        ]
    );

    let sql: Vec<&str> = result.statements.iter().map(|s| s.sql.as_str()).collect();
    assert!(sql[0].starts_with("CREATE TABLE CUSTOMERS ("));
    assert!(sql[0].contains("  NAME VARCHAR(100)"));
    assert!(sql[1].starts_with("CREATE TABLE ORDERS ("));
    assert!(sql[1].contains("  TOTAL NUMERIC(10,2)"));
    assert!(sql[1].contains("  CREATED_AT DATETIME2 DEFAULT GETDATE()"));
    assert!(sql[2].contains("FOREIGN KEY (CUSTOMER_ID) REFERENCES CUSTOMERS (ID)"));
    assert_eq!(sql[3], "CREATE INDEX IDX_ORDERS_CUSTOMER ON ORDERS (CUSTOMER_ID);");
    assert_eq!(sql[4], "CREATE SEQUENCE SEQ_CUSTOMERS START WITH 2;");

    let procedure = sql[5];
    assert!(procedure.contains("    @P_ID INTEGER\nAS\n"));
    assert!(procedure.contains("DECLARE @RESULT NUMERIC(15,2);"));
    assert!(procedure.contains("DECLARE @V_SUM NUMERIC(15,2);"));
    assert!(procedure.contains("SET @RESULT = COALESCE(@V_SUM, 0);"));
    assert!(procedure.contains("SELECT @RESULT AS RESULT;"));

    let trigger = sql[6];
    assert!(trigger.contains("ON CUSTOMERS\nINSTEAD OF INSERT\n"));
    assert!(trigger.contains("NEXT VALUE FOR SEQ_CUSTOMERS"));
    assert!(trigger.contains("IF (INSERTED.ID IS NULL)"));
}

#[test]
fn test_changelog_groups_and_renders() {
    let result = Converter::new().convert(&snapshot(), &metadata()).unwrap();
    let descriptions: Vec<&str> = result
        .changelog
        .entries
        .iter()
        .map(|e| e.description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        vec![
            "Create table CUSTOMERS",
            "Create table ORDERS",
            "Foreign keys - ORDERS",
            "Create index IDX_ORDERS_CUSTOMER",
            "Sequences",
            "Stored procedure GET_CUSTOMER_TOTAL",
            "Trigger TR_CUSTOMERS_BI",
        ]
    );

    let xml = result.changelog.render();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<VRDDL maxversion=\"14\" requires=\"FP\">\n"));
    assert_eq!(xml.matches("<version id=").count(), 7);
    assert!(xml.contains("usr_created=\"dba\" dt_created=\"2024/05/01\""));
    assert!(xml.ends_with("</VRDDL>\n"));
}

#[test]
fn test_reruns_are_byte_identical() {
    let converter = Converter::new();
    let first = converter.convert(&snapshot(), &metadata()).unwrap();
    let second = converter.convert(&snapshot(), &metadata()).unwrap();
    assert_eq!(first.changelog.render(), second.changelog.render());
    assert_eq!(first.sql_script(), second.sql_script());
    assert_eq!(first.fingerprint, second.fingerprint);
}

#[test]
fn test_user_rule_takes_precedence() {
    let resolver = TypeMappingResolver::with_rules(vec![TypeMappingRule::new("INT64", "DECIMAL(10,2)")
        .with_precision(10)
        .with_scale(2)]);
    let result = Converter::new()
        .with_resolver(resolver)
        .convert(&snapshot(), &metadata())
        .unwrap();
    assert!(result.statements[1].sql.contains("  TOTAL DECIMAL(10,2)"));
    // Output parameter has precision 15, so the rule does not apply.
    assert!(result.statements[5].sql.contains("DECLARE @RESULT NUMERIC(15,2);"));
}

#[test]
fn test_procedure_block_splits_into_batches() {
    let result = Converter::new().convert(&snapshot(), &metadata()).unwrap();
    let batches = split_batches(&result.statements[5].sql);
    assert_eq!(batches.len(), 2);
    assert!(batches[1].starts_with("CREATE PROCEDURE GET_CUSTOMER_TOTAL"));
}

#[test]
fn test_structural_policy() {
    let mut snapshot = snapshot();
    snapshot.tables[0].constraints[1].ref_table = None;

    let err = Converter::new().convert(&snapshot, &metadata()).unwrap_err();
    assert!(matches!(err, ConvertError::Structural { .. }));
    assert_eq!(err.exit_code(), 2);

    let result = Converter::new()
        .with_policy(StructuralPolicy::Skip)
        .convert(&snapshot, &metadata())
        .unwrap();
    assert_eq!(result.counts.foreign_keys, 0);
    assert!(result.warnings.iter().any(|w| matches!(
        w,
        ConversionWarning::SkippedStatement { object, .. } if object == "FK_ORDERS_CUSTOMERS"
    )));
}

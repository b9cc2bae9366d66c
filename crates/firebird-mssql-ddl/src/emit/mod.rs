//! Target DDL emission.
//!
//! Statements are produced in six phases so that every object exists before
//! anything that refers to it:
//!
//! 1. tables (dependency order, no foreign keys or indexes)
//! 2. foreign keys
//! 3. indexes
//! 4. sequences
//! 5. stored procedures (by name)
//! 6. triggers (by table, then firing sequence)

mod batch;
mod routine;
mod table;

pub use batch::{render_script, split_batches};
pub use routine::{procedure_block, trigger_block, trigger_events, trigger_timing};
pub use table::{convert_default, create_index, create_sequence, create_table, foreign_key};

use crate::core::{Procedure, SchemaSnapshot, Sequence, Table, Trigger};
use crate::error::{ConvertError, Result};
use crate::ordering::order_tables;
use crate::typemap::TypeMappingResolver;
use crate::warning::ConversionWarning;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What an emitted statement creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    CreateTable,
    ForeignKey,
    CreateIndex,
    CreateSequence,
    Procedure,
    Trigger,
}

/// One emitted statement block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,

    /// Logical unit the statement belongs to. For foreign keys this is the
    /// owning table; otherwise the created object.
    pub object: String,

    pub sql: String,
}

impl Statement {
    pub fn new(kind: StatementKind, object: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            kind,
            object: object.into(),
            sql: sql.into(),
        }
    }

    /// Changelog description of the unit this statement belongs to.
    ///
    /// Statements with the same description are grouped into one entry.
    pub fn description(&self) -> String {
        match self.kind {
            StatementKind::CreateTable => format!("Create table {}", self.object),
            StatementKind::ForeignKey => format!("Foreign keys - {}", self.object),
            StatementKind::CreateIndex => format!("Create index {}", self.object),
            StatementKind::CreateSequence => "Sequences".to_string(),
            StatementKind::Procedure => format!("Stored procedure {}", self.object),
            StatementKind::Trigger => format!("Trigger {}", self.object),
        }
    }
}

/// What to do when a statement cannot be built from its descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralPolicy {
    /// Fail the run with the first structural error.
    #[default]
    Abort,

    /// Leave the statement out and record a warning.
    Skip,
}

/// Statements in execution order plus the warnings raised producing them.
#[derive(Debug, Clone, Default)]
pub struct EmitOutput {
    pub statements: Vec<Statement>,
    pub warnings: Vec<ConversionWarning>,
}

impl EmitOutput {
    /// Number of statements of one kind.
    pub fn count(&self, kind: StatementKind) -> usize {
        self.statements.iter().filter(|s| s.kind == kind).count()
    }
}

/// Builds the ordered target statement list for a schema.
pub struct SchemaEmitter<'a> {
    resolver: &'a TypeMappingResolver,
    policy: StructuralPolicy,
}

impl<'a> SchemaEmitter<'a> {
    pub fn new(resolver: &'a TypeMappingResolver) -> Self {
        Self {
            resolver,
            policy: StructuralPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: StructuralPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Emit every statement for a snapshot.
    pub fn emit_snapshot(&self, snapshot: &SchemaSnapshot) -> Result<EmitOutput> {
        self.emit_all(
            &snapshot.tables,
            &snapshot.sequences,
            &snapshot.procedures,
            &snapshot.triggers,
        )
    }

    /// Emit every statement, phase by phase.
    ///
    /// # Errors
    ///
    /// With [`StructuralPolicy::Abort`], the first descriptor that cannot be
    /// turned into a statement fails the call with `ConvertError::Structural`.
    pub fn emit_all(
        &self,
        tables: &[Table],
        sequences: &[Sequence],
        procedures: &[Procedure],
        triggers: &[Trigger],
    ) -> Result<EmitOutput> {
        let mut out = EmitOutput::default();

        let order = order_tables(tables);
        if order.has_cycle() {
            out.warnings.push(ConversionWarning::DependencyCycle {
                count: order.cyclic.len(),
                tables: order.cyclic.clone(),
            });
        }

        info!("Phase 1: Creating {} tables", order.tables.len());
        for table in &order.tables {
            let built = create_table(table, self.resolver);
            self.push(&mut out, StatementKind::CreateTable, &table.name, built)?;
        }

        info!("Phase 2: Adding foreign keys");
        for table in &order.tables {
            for fk in table.foreign_keys() {
                let built = foreign_key(table, fk);
                self.push(&mut out, StatementKind::ForeignKey, &table.name, built)?;
            }
        }

        info!("Phase 3: Creating indexes");
        for table in &order.tables {
            for index in &table.indexes {
                if table.is_constraint_index(index) {
                    debug!("Skipping constraint index: {}.{}", table.name, index.name);
                    continue;
                }
                let built = create_index(table, index);
                self.push(&mut out, StatementKind::CreateIndex, &index.name, built)?;
            }
        }

        info!("Phase 4: Creating {} sequences", sequences.len());
        for sequence in sequences {
            let built = create_sequence(sequence);
            self.push(&mut out, StatementKind::CreateSequence, &sequence.name, built)?;
        }

        info!("Phase 5: Converting {} stored procedures", procedures.len());
        let mut procedures: Vec<&Procedure> = procedures.iter().collect();
        procedures.sort_by(|a, b| a.name.cmp(&b.name));
        for procedure in procedures {
            let built = procedure_block(procedure, self.resolver);
            self.push(&mut out, StatementKind::Procedure, &procedure.name, built)?;
        }

        info!("Phase 6: Converting {} triggers", triggers.len());
        let mut triggers: Vec<&Trigger> = triggers.iter().collect();
        triggers.sort_by(|a, b| {
            a.table_name
                .cmp(&b.table_name)
                .then(a.sequence.cmp(&b.sequence))
        });
        for trigger in triggers {
            let built = trigger_block(trigger);
            self.push(&mut out, StatementKind::Trigger, &trigger.name, built)?;
        }

        info!(
            "Emitted {} statements ({} warnings)",
            out.statements.len(),
            out.warnings.len()
        );
        Ok(out)
    }

    fn push(
        &self,
        out: &mut EmitOutput,
        kind: StatementKind,
        object: &str,
        built: Result<String>,
    ) -> Result<()> {
        match built {
            Ok(sql) => {
                debug!("Emitted {:?}: {}", kind, object);
                out.statements.push(Statement::new(kind, object, sql));
                Ok(())
            }
            Err(ConvertError::Structural { object, message }) if self.policy == StructuralPolicy::Skip => {
                warn!("Skipping {}: {}", object, message);
                out.warnings
                    .push(ConversionWarning::SkippedStatement { object, message });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, Constraint, Index, Parameter};

    fn sample_tables() -> Vec<Table> {
        vec![
            Table::new("ORDERS")
                .column(Column::new("ID", "LONG").not_null())
                .column(Column::new("CUSTOMER_ID", "LONG"))
                .column(Column::new("ORDER_DATE", "TIMESTAMP"))
                .constraint(Constraint::primary_key("PK_ORDERS", &["ID"]))
                .constraint(Constraint::foreign_key(
                    "FK_ORDERS_CUSTOMERS",
                    &["CUSTOMER_ID"],
                    "CUSTOMERS",
                    &["ID"],
                ))
                .index(Index::new("PK_ORDERS", &["ID"]).unique())
                .index(Index::new("IDX_ORDERS_DATE", &["ORDER_DATE"])),
            Table::new("CUSTOMERS")
                .column(Column::new("ID", "LONG").not_null())
                .column(Column::new("NAME", "VARCHAR").with_length(100))
                .constraint(Constraint::primary_key("PK_CUSTOMERS", &["ID"])),
        ]
    }

    #[test]
    fn test_emit_all_phase_order() {
        let resolver = TypeMappingResolver::new();
        let out = SchemaEmitter::new(&resolver)
            .emit_all(
                &sample_tables(),
                &[Sequence::new("SEQ_CUSTOMERS", 1)],
                &[Procedure::new("SP_B"), Procedure::new("SP_A")],
                &[
                    Trigger::new("TR_ORDERS", "ORDERS", 1),
                    Trigger::new("TR_CUST_2", "CUSTOMERS", 2).with_sequence(2),
                    Trigger::new("TR_CUST_1", "CUSTOMERS", 2).with_sequence(1),
                ],
            )
            .unwrap();

        let units: Vec<(StatementKind, &str)> = out
            .statements
            .iter()
            .map(|s| (s.kind, s.object.as_str()))
            .collect();
        assert_eq!(
            units,
            vec![
                (StatementKind::CreateTable, "CUSTOMERS"),
                (StatementKind::CreateTable, "ORDERS"),
                (StatementKind::ForeignKey, "ORDERS"),
                (StatementKind::CreateIndex, "IDX_ORDERS_DATE"),
                (StatementKind::CreateSequence, "SEQ_CUSTOMERS"),
                (StatementKind::Procedure, "SP_A"),
                (StatementKind::Procedure, "SP_B"),
                (StatementKind::Trigger, "TR_CUST_1"),
                (StatementKind::Trigger, "TR_CUST_2"),
                (StatementKind::Trigger, "TR_ORDERS"),
            ]
        );
        assert!(out.warnings.is_empty());
        assert_eq!(out.count(StatementKind::Trigger), 3);
    }

    #[test]
    fn test_customers_orders_scenario() {
        let resolver = TypeMappingResolver::new();
        let out = SchemaEmitter::new(&resolver)
            .emit_all(&sample_tables(), &[Sequence::new("SEQ_CUSTOMERS", 1)], &[], &[])
            .unwrap();
        let sql: Vec<&str> = out.statements.iter().map(|s| s.sql.as_str()).collect();

        assert!(sql[0].starts_with("CREATE TABLE CUSTOMERS ("));
        assert!(sql[0].contains("  NAME VARCHAR(100)"));
        assert!(sql[1].starts_with("CREATE TABLE ORDERS ("));
        assert!(!sql[1].contains("FOREIGN KEY"));
        assert_eq!(
            sql[2],
            "ALTER TABLE ORDERS ADD CONSTRAINT FK_ORDERS_CUSTOMERS FOREIGN KEY (CUSTOMER_ID) \
             REFERENCES CUSTOMERS (ID);"
        );
        assert_eq!(sql[3], "CREATE INDEX IDX_ORDERS_DATE ON ORDERS (ORDER_DATE);");
        assert_eq!(sql[4], "CREATE SEQUENCE SEQ_CUSTOMERS START WITH 2;");
    }

    #[test]
    fn test_independent_tables_precede_all_foreign_keys() {
        let tables = vec![
            Table::new("C")
                .column(Column::new("A_ID", "LONG"))
                .column(Column::new("B_ID", "LONG"))
                .constraint(Constraint::foreign_key("FK_C_A", &["A_ID"], "A", &["ID"]))
                .constraint(Constraint::foreign_key("FK_C_B", &["B_ID"], "B", &["ID"])),
            Table::new("A").column(Column::new("ID", "LONG")),
            Table::new("B").column(Column::new("ID", "LONG")),
        ];
        let resolver = TypeMappingResolver::new();
        let out = SchemaEmitter::new(&resolver)
            .emit_all(&tables, &[], &[], &[])
            .unwrap();

        let kinds: Vec<StatementKind> = out.statements.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StatementKind::CreateTable,
                StatementKind::CreateTable,
                StatementKind::CreateTable,
                StatementKind::ForeignKey,
                StatementKind::ForeignKey,
            ]
        );
        assert_eq!(out.statements[2].object, "C");
    }

    #[test]
    fn test_cycle_is_reported_as_warning() {
        let tables = vec![
            Table::new("B")
                .column(Column::new("A_ID", "LONG"))
                .constraint(Constraint::foreign_key("FK_B_A", &["A_ID"], "A", &["ID"])),
            Table::new("A")
                .column(Column::new("B_ID", "LONG"))
                .constraint(Constraint::foreign_key("FK_A_B", &["B_ID"], "B", &["ID"])),
        ];
        let resolver = TypeMappingResolver::new();
        let out = SchemaEmitter::new(&resolver)
            .emit_all(&tables, &[], &[], &[])
            .unwrap();

        assert_eq!(out.statements[0].object, "A");
        assert_eq!(out.statements[1].object, "B");
        assert_eq!(
            out.warnings,
            vec![ConversionWarning::DependencyCycle {
                count: 2,
                tables: vec!["A".into(), "B".into()],
            }]
        );
    }

    fn broken_fk_tables() -> Vec<Table> {
        let mut fk = Constraint::foreign_key("FK_BROKEN", &["X"], "", &[]);
        fk.ref_table = None;
        vec![Table::new("T").column(Column::new("X", "LONG")).constraint(fk)]
    }

    #[test]
    fn test_abort_policy_fails_on_structural_error() {
        let resolver = TypeMappingResolver::new();
        let err = SchemaEmitter::new(&resolver)
            .emit_all(&broken_fk_tables(), &[], &[], &[])
            .unwrap_err();
        assert!(matches!(err, ConvertError::Structural { ref object, .. } if object == "FK_BROKEN"));
    }

    #[test]
    fn test_skip_policy_records_warning() {
        let resolver = TypeMappingResolver::new();
        let out = SchemaEmitter::new(&resolver)
            .with_policy(StructuralPolicy::Skip)
            .emit_all(&broken_fk_tables(), &[], &[], &[])
            .unwrap();

        assert_eq!(out.statements.len(), 1);
        assert_eq!(out.statements[0].kind, StatementKind::CreateTable);
        assert!(matches!(
            &out.warnings[0],
            ConversionWarning::SkippedStatement { object, .. } if object == "FK_BROKEN"
        ));
    }

    #[test]
    fn test_output_is_identical_across_runs() {
        let resolver = TypeMappingResolver::new();
        let emitter = SchemaEmitter::new(&resolver);
        let procs = [Procedure::new("SP_X")
            .input(Parameter::new("P_ID", "LONG", 0))
            .with_source("BEGIN\nFOR SELECT ID INTO :V FROM T DO BEGIN\nSUSPEND;\nEND\nEND")];
        let first = emitter.emit_all(&sample_tables(), &[], &procs, &[]).unwrap();
        let second = emitter.emit_all(&sample_tables(), &[], &procs, &[]).unwrap();
        assert_eq!(first.statements, second.statements);
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(
            Statement::new(StatementKind::ForeignKey, "ORDERS", "").description(),
            "Foreign keys - ORDERS"
        );
        assert_eq!(
            Statement::new(StatementKind::CreateSequence, "SEQ_A", "").description(),
            "Sequences"
        );
        assert_eq!(
            Statement::new(StatementKind::Procedure, "SP_A", "").description(),
            "Stored procedure SP_A"
        );
    }
}

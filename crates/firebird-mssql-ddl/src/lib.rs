//! # firebird-mssql-ddl
//!
//! Firebird to SQL Server schema conversion library.
//!
//! This library turns metadata extracted from a Firebird database into SQL
//! Server DDL with support for:
//!
//! - **Type mapping** with user override rules
//! - **Dependency ordering** of tables by foreign key, tolerating cycles
//! - **PSQL translation** of stored procedure and trigger bodies to T-SQL
//! - **Versioned changelogs** grouping statements into numbered entries
//!
//! ## Example
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use firebird_mssql_ddl::{ChangelogMetadata, Converter, SchemaSnapshot};
//!
//! fn main() -> firebird_mssql_ddl::Result<()> {
//!     let snapshot = SchemaSnapshot::load("schema.json")?;
//!     let mut converter = Converter::new();
//!     converter.load_type_mappings("mappings.json");
//!
//!     let date = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
//!     let result = converter.convert(&snapshot, &ChangelogMetadata::new("dba", date))?;
//!     result.changelog.write("output.vrddl")?;
//!     println!("Emitted {} statements", result.counts.total());
//!     Ok(())
//! }
//! ```

pub mod changelog;
pub mod config;
pub mod core;
pub mod emit;
pub mod error;
pub mod orchestrator;
pub mod ordering;
pub mod translate;
pub mod typemap;
pub mod warning;

// Re-exports for convenient access
pub use changelog::{Changelog, ChangelogEntry, ChangelogMetadata};
pub use config::Config;
pub use crate::core::{
    Column, Constraint, ConstraintKind, Index, Parameter, Procedure, SchemaSnapshot, Sequence,
    Table, Trigger,
};
pub use emit::{split_batches, EmitOutput, SchemaEmitter, Statement, StatementKind, StructuralPolicy};
pub use error::{ConvertError, Result};
pub use orchestrator::{ConversionResult, Converter, StatementCounts};
pub use ordering::{order_tables, TableOrder};
pub use translate::{translate_procedure_body, translate_trigger_body};
pub use typemap::{TypeMappingDocument, TypeMappingResolver, TypeMappingRule};
pub use warning::ConversionWarning;

//! Core descriptor types shared by every conversion stage.
//!
//! - [`schema`]: tables, columns, constraints, indexes, sequences,
//!   procedures and triggers as extracted from the source database
//! - [`identifier`]: validation and quoting of names written into target SQL

pub mod identifier;
pub mod schema;

pub use identifier::{ident, quote_mssql, validate_identifier};
pub use schema::{
    Column, Constraint, ConstraintKind, Index, Parameter, Procedure, SchemaSnapshot, Sequence,
    Table, Trigger,
};

//! Schema and metadata descriptors for the source database objects.
//!
//! These types are produced by an external metadata extractor and consumed
//! by the conversion core. They are plain data; all derive serde so a
//! snapshot can be exported as JSON and loaded back for conversion.

use serde::{Deserialize, Serialize};

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Base type identifier (e.g., "LONG", "INT64", "VARCHAR", "BLOB").
    pub data_type: String,

    /// Character length for string types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_length: Option<i32>,

    /// Numeric precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i32>,

    /// Numeric scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,

    /// Whether the column allows NULL.
    #[serde(default = "default_true")]
    pub is_nullable: bool,

    /// Raw default-value expression as stored by the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl Column {
    /// Create a nullable column with only a name and base type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            ..Default::default()
        }
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.char_length = Some(length);
        self
    }

    pub fn with_numeric(mut self, precision: i32, scale: i32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default_value = Some(expr.into());
        self
    }
}

/// Kind of table-level constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    #[serde(alias = "PRIMARY KEY")]
    PrimaryKey,
    Unique,
    #[serde(alias = "FOREIGN KEY")]
    ForeignKey,
    Check,
}

/// Table constraint metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    /// Constraint name.
    pub name: String,

    /// Constraint kind.
    pub kind: ConstraintKind,

    /// Constrained column names.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Referenced table (foreign keys only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_table: Option<String>,

    /// Referenced column names (foreign keys only).
    #[serde(default)]
    pub ref_columns: Vec<String>,

    /// ON DELETE rule (foreign keys only, e.g. "CASCADE").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,

    /// ON UPDATE rule (foreign keys only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,

    /// Check condition text (check constraints only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_condition: Option<String>,
}

impl Constraint {
    fn base(name: impl Into<String>, kind: ConstraintKind, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ref_table: None,
            ref_columns: Vec::new(),
            on_delete: None,
            on_update: None,
            check_condition: None,
        }
    }

    pub fn primary_key(name: impl Into<String>, columns: &[&str]) -> Self {
        Self::base(name, ConstraintKind::PrimaryKey, columns)
    }

    pub fn unique(name: impl Into<String>, columns: &[&str]) -> Self {
        Self::base(name, ConstraintKind::Unique, columns)
    }

    pub fn foreign_key(
        name: impl Into<String>,
        columns: &[&str],
        ref_table: impl Into<String>,
        ref_columns: &[&str],
    ) -> Self {
        let mut fk = Self::base(name, ConstraintKind::ForeignKey, columns);
        fk.ref_table = Some(ref_table.into());
        fk.ref_columns = ref_columns.iter().map(|c| c.to_string()).collect();
        fk
    }

    pub fn check(name: impl Into<String>, condition: impl Into<String>) -> Self {
        let mut chk = Self::base(name, ConstraintKind::Check, &[]);
        chk.check_condition = Some(condition.into());
        chk
    }

    /// Check if this is a foreign key.
    pub fn is_foreign_key(&self) -> bool {
        self.kind == ConstraintKind::ForeignKey
    }
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Whether the index is unique.
    #[serde(default)]
    pub is_unique: bool,

    /// Indexed column names, in key order.
    pub columns: Vec<String>,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            is_unique: false,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Column definitions, in declaration order.
    pub columns: Vec<Column>,

    /// Table constraints.
    #[serde(default)]
    pub constraints: Vec<Constraint>,

    /// Secondary indexes.
    #[serde(default)]
    pub indexes: Vec<Index>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Foreign key constraints of this table.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(|c| c.is_foreign_key())
    }

    /// Check whether an index backs one of this table's constraints.
    pub fn is_constraint_index(&self, index: &Index) -> bool {
        self.constraints
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&index.name))
    }
}

/// Generator (sequence) metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    /// Generator name.
    pub name: String,

    /// Last value issued by the source generator.
    #[serde(default)]
    pub current_value: i64,
}

impl Sequence {
    pub fn new(name: impl Into<String>, current_value: i64) -> Self {
        Self {
            name: name.into(),
            current_value,
        }
    }

    /// First value the target sequence must issue.
    pub fn start_value(&self) -> i64 {
        self.current_value.saturating_add(1)
    }
}

/// Stored procedure parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Parameter name (without sigil).
    pub name: String,

    /// Base type identifier.
    pub data_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_length: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,

    /// Position in the parameter list (0-based).
    #[serde(default)]
    pub position: i32,
}

impl Parameter {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, position: i32) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            char_length: None,
            precision: None,
            scale: None,
            position,
        }
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.char_length = Some(length);
        self
    }

    pub fn with_numeric(mut self, precision: i32, scale: i32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// View this parameter as a column for type resolution.
    pub fn as_column(&self) -> Column {
        Column {
            name: self.name.clone(),
            data_type: self.data_type.clone(),
            char_length: self.char_length,
            precision: self.precision,
            scale: self.scale,
            is_nullable: true,
            default_value: None,
        }
    }
}

/// Stored procedure metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    /// Procedure name.
    pub name: String,

    /// Raw PSQL body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default)]
    pub input_parameters: Vec<Parameter>,

    #[serde(default)]
    pub output_parameters: Vec<Parameter>,
}

impl Procedure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            input_parameters: Vec::new(),
            output_parameters: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn input(mut self, param: Parameter) -> Self {
        self.input_parameters.push(param);
        self
    }

    pub fn output(mut self, param: Parameter) -> Self {
        self.output_parameters.push(param);
        self
    }
}

/// Trigger metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    /// Trigger name.
    pub name: String,

    /// Owning table.
    pub table_name: String,

    /// Raw PSQL body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Encoded timing and event bits (RDB$TRIGGER_TYPE).
    pub trigger_type: i32,

    /// Firing order among triggers of the same table.
    #[serde(default)]
    pub sequence: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Trigger {
    pub fn new(name: impl Into<String>, table_name: impl Into<String>, trigger_type: i32) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            source: None,
            trigger_type,
            sequence: 0,
            is_active: true,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_sequence(mut self, sequence: i32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Everything extracted from one source database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSnapshot {
    #[serde(default)]
    pub tables: Vec<Table>,

    #[serde(default, alias = "generators")]
    pub sequences: Vec<Sequence>,

    #[serde(default)]
    pub procedures: Vec<Procedure>,

    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

impl SchemaSnapshot {
    /// Load a snapshot exported as JSON.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn default_true() -> bool {
    true
}

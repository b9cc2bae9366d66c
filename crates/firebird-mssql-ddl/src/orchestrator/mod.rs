//! Conversion run coordinator.

use crate::changelog::{Changelog, ChangelogMetadata};
use crate::config::Config;
use crate::core::SchemaSnapshot;
use crate::emit::{render_script, SchemaEmitter, Statement, StatementKind, StructuralPolicy};
use crate::error::Result;
use crate::typemap::{TypeMappingDocument, TypeMappingResolver};
use crate::warning::ConversionWarning;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, warn};

/// Converts a schema snapshot into target statements and a changelog.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    resolver: TypeMappingResolver,
    policy: StructuralPolicy,
    warnings: Vec<ConversionWarning>,
}

/// Number of statements per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementCounts {
    pub tables: usize,
    pub foreign_keys: usize,
    pub indexes: usize,
    pub sequences: usize,
    pub procedures: usize,
    pub triggers: usize,
}

impl StatementCounts {
    fn from_statements(statements: &[Statement]) -> Self {
        let mut counts = Self::default();
        for s in statements {
            let slot = match s.kind {
                StatementKind::CreateTable => &mut counts.tables,
                StatementKind::ForeignKey => &mut counts.foreign_keys,
                StatementKind::CreateIndex => &mut counts.indexes,
                StatementKind::CreateSequence => &mut counts.sequences,
                StatementKind::Procedure => &mut counts.procedures,
                StatementKind::Trigger => &mut counts.triggers,
            };
            *slot += 1;
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.tables
            + self.foreign_keys
            + self.indexes
            + self.sequences
            + self.procedures
            + self.triggers
    }
}

/// Result of a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// When the conversion started.
    pub started_at: DateTime<Utc>,

    /// When the conversion completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Statement counts per kind.
    pub counts: StatementCounts,

    /// SHA256 of all statement text, in order.
    pub fingerprint: String,

    /// Non-fatal problems, in the order they were found.
    pub warnings: Vec<ConversionWarning>,

    /// Statements in execution order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub statements: Vec<Statement>,

    /// The grouped changelog.
    pub changelog: Changelog,
}

impl ConversionResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// All statements as one script with `GO` separators.
    pub fn sql_script(&self) -> String {
        render_script(&self.statements)
    }
}

impl Converter {
    /// Converter with built-in type mappings and the abort policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter set up from a configuration: policy and type mappings.
    pub fn from_config(config: &Config) -> Self {
        let mut converter = Self::new().with_policy(config.conversion.on_structural_error);
        if let Some(path) = &config.input.type_mapping {
            converter.load_type_mappings(path);
        }
        converter
    }

    pub fn with_policy(mut self, policy: StructuralPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_resolver(mut self, resolver: TypeMappingResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn resolver(&self) -> &TypeMappingResolver {
        &self.resolver
    }

    /// Load user type mappings from a JSON or YAML document.
    ///
    /// A document that cannot be read or parsed is not an error: the
    /// built-in mappings stay in effect and a warning is recorded for the
    /// next conversion result.
    pub fn load_type_mappings<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        match TypeMappingDocument::load(path) {
            Ok(doc) => {
                info!(
                    "Loaded {} type mapping rule(s) from {:?}",
                    doc.custom_mappings.len(),
                    path
                );
                self.resolver.set_rules(doc.custom_mappings);
                true
            }
            Err(e) => {
                warn!("Ignoring type mappings from {:?}: {}", path, e);
                self.resolver.set_rules(Vec::new());
                self.warnings.push(ConversionWarning::TypeMappingIgnored {
                    source: path.display().to_string(),
                    message: e.to_string(),
                });
                false
            }
        }
    }

    /// Run a full conversion.
    pub fn convert(
        &self,
        snapshot: &SchemaSnapshot,
        metadata: &ChangelogMetadata,
    ) -> Result<ConversionResult> {
        let started_at = Utc::now();
        info!(
            "Starting conversion: {} tables, {} sequences, {} procedures, {} triggers",
            snapshot.tables.len(),
            snapshot.sequences.len(),
            snapshot.procedures.len(),
            snapshot.triggers.len()
        );

        let emitted = SchemaEmitter::new(&self.resolver)
            .with_policy(self.policy)
            .emit_snapshot(snapshot)?;

        let changelog = Changelog::from_statements(&emitted.statements, metadata.clone());
        let counts = StatementCounts::from_statements(&emitted.statements);
        let fingerprint = fingerprint(&emitted.statements);

        let mut warnings = self.warnings.clone();
        warnings.extend(emitted.warnings);

        let completed_at = Utc::now();
        let duration_seconds =
            (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        info!(
            "Conversion complete: {} statements in {} changelog entries, {} warning(s)",
            counts.total(),
            changelog.entries.len(),
            warnings.len()
        );

        Ok(ConversionResult {
            started_at,
            completed_at,
            duration_seconds,
            counts,
            fingerprint,
            warnings,
            statements: emitted.statements,
            changelog,
        })
    }
}

fn fingerprint(statements: &[Statement]) -> String {
    let mut hasher = Sha256::new();
    for s in statements {
        hasher.update(s.sql.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

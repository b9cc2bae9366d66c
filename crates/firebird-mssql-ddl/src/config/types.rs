//! Configuration type definitions.

use crate::emit::StructuralPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Input documents.
    pub input: InputConfig,

    /// Output documents.
    #[serde(default)]
    pub output: OutputConfig,

    /// Conversion behavior.
    #[serde(default)]
    pub conversion: ConversionConfig,
}

impl Config {
    /// Configuration with defaults for everything but the metadata snapshot.
    pub fn for_metadata(metadata: impl Into<PathBuf>) -> Self {
        Self {
            input: InputConfig {
                metadata: metadata.into(),
                type_mapping: None,
            },
            output: OutputConfig::default(),
            conversion: ConversionConfig::default(),
        }
    }
}

/// Input documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Metadata snapshot exported from the source database (JSON).
    pub metadata: PathBuf,

    /// Type-mapping overrides (JSON or YAML, by extension).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_mapping: Option<PathBuf>,
}

/// Output documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Changelog document path (default: "output.vrddl").
    #[serde(default = "default_changelog")]
    pub changelog: PathBuf,

    /// Optional plain SQL script with `GO` separators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_script: Option<PathBuf>,

    /// Root `maxversion` attribute (default: 14).
    #[serde(default = "default_max_version")]
    pub max_version: u32,

    /// Root `requires` attribute (default: "FP").
    #[serde(default = "default_requires")]
    pub requires: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            changelog: default_changelog(),
            sql_script: None,
            max_version: default_max_version(),
            requires: default_requires(),
        }
    }
}

/// Conversion behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// What to do with descriptors that cannot be turned into a statement.
    #[serde(default)]
    pub on_structural_error: StructuralPolicy,

    /// Changelog author. The CLI falls back to the current user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

fn default_changelog() -> PathBuf {
    PathBuf::from("output.vrddl")
}

fn default_max_version() -> u32 {
    14
}

fn default_requires() -> String {
    "FP".to_string()
}

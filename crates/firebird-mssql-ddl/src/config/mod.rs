//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::changelog::ChangelogMetadata;
use crate::error::Result;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Changelog metadata for a run. The configured author wins over
    /// `default_author`.
    pub fn changelog_metadata(&self, default_author: &str, created: NaiveDate) -> ChangelogMetadata {
        let author = self
            .conversion
            .author
            .as_deref()
            .unwrap_or(default_author);
        ChangelogMetadata::new(author, created)
            .with_max_version(self.output.max_version)
            .with_requires(self.output.requires.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::StructuralPolicy;
    use std::io::Write;
    use std::path::PathBuf;

    const FULL: &str = r#"
input:
  metadata: schema.json
  type_mapping: mappings.yaml
output:
  changelog: out/schema.vrddl
  sql_script: out/schema.sql
  max_version: 20
  requires: FP3
conversion:
  on_structural_error: skip
  author: dba
"#;

    #[test]
    fn test_from_yaml_full() {
        let config = Config::from_yaml(FULL).unwrap();
        assert_eq!(config.input.metadata, PathBuf::from("schema.json"));
        assert_eq!(config.input.type_mapping, Some(PathBuf::from("mappings.yaml")));
        assert_eq!(config.output.changelog, PathBuf::from("out/schema.vrddl"));
        assert_eq!(config.output.sql_script, Some(PathBuf::from("out/schema.sql")));
        assert_eq!(config.output.max_version, 20);
        assert_eq!(config.output.requires, "FP3");
        assert_eq!(config.conversion.on_structural_error, StructuralPolicy::Skip);
        assert_eq!(config.conversion.author.as_deref(), Some("dba"));
    }

    #[test]
    fn test_from_yaml_defaults() {
        let config = Config::from_yaml("input:\n  metadata: schema.json\n").unwrap();
        assert_eq!(config.output.changelog, PathBuf::from("output.vrddl"));
        assert_eq!(config.output.max_version, 14);
        assert_eq!(config.output.requires, "FP");
        assert_eq!(config.conversion.on_structural_error, StructuralPolicy::Abort);
        assert_eq!(config, Config::for_metadata("schema.json"));
    }

    #[test]
    fn test_from_yaml_rejects_invalid() {
        assert!(Config::from_yaml("output:\n  max_version: 3\n").is_err());
        assert!(Config::from_yaml("input:\n  metadata: a.json\noutput:\n  max_version: 0\n").is_err());
        assert!(Config::from_yaml(
            "input:\n  metadata: a.json\nconversion:\n  on_structural_error: ignore\n"
        )
        .is_err());
    }

    #[test]
    fn test_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.output.max_version, 20);
    }

    #[test]
    fn test_hash_is_stable_and_sensitive() {
        let a = Config::from_yaml(FULL).unwrap();
        let mut b = a.clone();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
        b.output.max_version = 21;
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_changelog_metadata() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let config = Config::from_yaml(FULL).unwrap();
        let meta = config.changelog_metadata("someone", date);
        assert_eq!(meta.author, "dba");
        assert_eq!(meta.max_version, 20);
        assert_eq!(meta.requires, "FP3");

        let meta = Config::for_metadata("s.json").changelog_metadata("someone", date);
        assert_eq!(meta.author, "someone");
        assert_eq!(meta.max_version, 14);
    }
}

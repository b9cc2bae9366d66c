//! Configuration validation.

use super::Config;
use crate::error::{ConvertError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.input.metadata.as_os_str().is_empty() {
        return Err(ConvertError::Config("input.metadata is required".into()));
    }
    if let Some(path) = &config.input.type_mapping {
        if path.as_os_str().is_empty() {
            return Err(ConvertError::Config(
                "input.type_mapping must not be empty when set".into(),
            ));
        }
    }

    if config.output.changelog.as_os_str().is_empty() {
        return Err(ConvertError::Config("output.changelog is required".into()));
    }
    if config.output.max_version == 0 {
        return Err(ConvertError::Config(
            "output.max_version must be at least 1".into(),
        ));
    }
    if config.output.requires.trim().is_empty() {
        return Err(ConvertError::Config("output.requires is required".into()));
    }

    if let Some(author) = &config.conversion.author {
        if author.trim().is_empty() {
            return Err(ConvertError::Config(
                "conversion.author must not be empty when set".into(),
            ));
        }
    }

    Ok(())
}

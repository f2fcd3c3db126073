use serde::Deserialize;
use thiserror::Error;

use std::fs;
use std::path::Path;

use crate::validation::EscalationMode;

/// Invariant categories checked by one validation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IrValidatorConfig {
    pub ensure_all_nodes_are_different: bool,
    pub check_types: bool,
    pub check_descriptors: bool,
    pub check_properties: bool,
    pub check_scopes: bool,
}

impl IrValidatorConfig {
    pub fn all() -> Self {
        IrValidatorConfig {
            ensure_all_nodes_are_different: true,
            check_types: true,
            check_descriptors: true,
            check_properties: true,
            check_scopes: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    None,
    Warning,
    #[default]
    Error,
}

impl VerificationMode {
    pub fn escalation(self) -> Option<EscalationMode> {
        match self {
            VerificationMode::None => None,
            VerificationMode::Warning => Some(EscalationMode::Warn),
            VerificationMode::Error => Some(EscalationMode::Abort),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid validation settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings of the command-line driver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    pub mode: VerificationMode,
    pub check_parents: bool,
    pub validator: IrValidatorConfig,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        ValidationSettings {
            mode: VerificationMode::Error,
            check_parents: true,
            validator: IrValidatorConfig {
                ensure_all_nodes_are_different: true,
                ..IrValidatorConfig::default()
            },
        }
    }
}

impl ValidationSettings {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

//! Session configuration, read from a TOML file.
//!
//! ```toml
//! namespace = "demo"
//! position = [0, 64, 0]
//! setup_on_load = true
//! extern = ["shared_score"]
//!
//! [args]
//! player = "Steve"
//!
//! [variables]
//! timer = "t"
//! slot = { template = "s{}", options = [["0"], ["1"]] }
//! ```

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::scope::{BlockPos, VariableEntry};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub namespace: String,
    pub position: BlockPos,
    #[serde(default)]
    pub args: HashMap<String, String>,
    #[serde(default, rename = "extern")]
    pub extern_names: Vec<String>,
    #[serde(default)]
    pub setup_on_load: bool,
    #[serde(default)]
    pub detect_trim_collisions: bool,
    #[serde(default)]
    pub variables: IndexMap<String, VariableEntry>,
}

impl SessionConfig {
    pub fn new(namespace: impl Into<String>, position: BlockPos) -> Self {
        Self {
            namespace: namespace.into(),
            position,
            args: HashMap::new(),
            extern_names: Vec::new(),
            setup_on_load: false,
            detect_trim_collisions: false,
            variables: IndexMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SessionConfig =
            toml::from_str(&content).map_err(|error| ConfigError::Parse {
                path: path.to_path_buf(),
                message: error.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig =
            toml::from_str(content).map_err(|error| ConfigError::Parse {
                path: PathBuf::from("<string>"),
                message: error.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::Invalid {
                message: "namespace must not be empty".into(),
            });
        }
        if let Some(bad) = self
            .namespace
            .chars()
            .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-'))
        {
            return Err(ConfigError::Invalid {
                message: format!("namespace {:?} contains {bad:?}", self.namespace),
            });
        }
        for (name, entry) in &self.variables {
            if let VariableEntry::Templated { template, options } = entry {
                let slots = template.matches("{}").count();
                if let Some(option) = options.iter().find(|args| args.len() != slots) {
                    return Err(ConfigError::Invalid {
                        message: format!(
                            "variable `{name}` expects {slots} template arguments, option {option:?} has {}",
                            option.len()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

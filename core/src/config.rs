use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConductorError;

/// Default maximum number of delegation hops below a root call.
pub const DEFAULT_MAX_DELEGATION_DEPTH: usize = 5;

/// Default cap on tasks per batch request.
pub const DEFAULT_MAX_BATCH_TASKS: usize = 10;

/// Runtime limits and the optional on-disk catalog location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Maximum delegation depth below the root call. A delegation whose
    /// depth would exceed this fails before the engine is touched.
    pub max_delegation_depth: usize,
    /// Maximum number of tasks accepted by a single batch.
    pub max_batch_tasks: usize,
    /// Directory of `*.md` agent definitions. `None` leaves catalog
    /// construction to the embedder.
    pub agents_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_delegation_depth: DEFAULT_MAX_DELEGATION_DEPTH,
            max_batch_tasks: DEFAULT_MAX_BATCH_TASKS,
            agents_dir: None,
        }
    }
}

impl Config {
    /// Parse a TOML document into a validated config.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConductorError> {
        let config: Self = toml::from_str(raw).map_err(|err| ConductorError::InvalidConfig {
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConductorError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConductorError::InvalidConfig {
            reason: format!("failed to read {}: {err}", path.display()),
        })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<(), ConductorError> {
        if self.max_delegation_depth == 0 {
            return Err(ConductorError::InvalidConfig {
                reason: "max_delegation_depth must be at least 1".to_string(),
            });
        }
        if self.max_batch_tasks == 0 {
            return Err(ConductorError::InvalidConfig {
                reason: "max_batch_tasks must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_the_documented_limits() {
        let config = Config::default();
        assert_eq!(config.max_delegation_depth, 5);
        assert_eq!(config.max_batch_tasks, 10);
        assert_eq!(config.agents_dir, None);
    }

    #[test]
    fn toml_overrides_individual_fields() {
        let config = Config::from_toml_str(
            r#"
            max_delegation_depth = 2
            agents_dir = "/etc/conductor/agents"
            "#,
        )
        .expect("parse config");
        assert_eq!(
            config,
            Config {
                max_delegation_depth: 2,
                max_batch_tasks: 10,
                agents_dir: Some(PathBuf::from("/etc/conductor/agents")),
            }
        );
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = Config::from_toml_str("max_delegation_depth = 0").expect_err("zero depth");
        assert!(err.to_string().contains("max_delegation_depth"));

        let err = Config::from_toml_str("max_batch_tasks = 0").expect_err("zero batch");
        assert!(err.to_string().contains("max_batch_tasks"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("max_sessions = 3").expect_err("unknown key");
        assert_eq!(err.code(), "invalid-config");
    }

    #[test]
    fn load_reports_missing_files_as_invalid_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Config::load(&dir.path().join("absent.toml")).expect_err("missing file");
        assert_eq!(err.code(), "invalid-config");
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("conductor.toml");
        std::fs::write(&path, "max_batch_tasks = 4\n").expect("write config");
        let config = Config::load(&path).expect("load config");
        assert_eq!(config.max_batch_tasks, 4);
    }
}

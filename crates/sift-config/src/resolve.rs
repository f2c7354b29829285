//! Configuration file resolution.
//!
//! Candidates are tried in order: explicit CLI path, `SIFT_CONFIG`, then
//! `$XDG_CONFIG_HOME/timesift/config.json`. The first file that exists
//! wins; if none exists the built-in defaults are used. A file that exists
//! but fails to parse is an error, never a silent fallback.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::extraction::ExtractionConfig;
use crate::validate::ValidationError;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "SIFT_CONFIG";

const CONFIG_DIR_NAME: &str = "timesift";
const CONFIG_FILE_NAME: &str = "config.json";

/// Candidate configuration locations, highest precedence first.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub explicit: Option<PathBuf>,
    pub env: Option<PathBuf>,
    pub xdg: Option<PathBuf>,
}

impl ConfigPaths {
    /// Gather candidates from the CLI argument, environment and XDG dirs.
    pub fn discover(explicit: Option<&Path>) -> Self {
        Self {
            explicit: explicit.map(Path::to_path_buf),
            env: std::env::var_os(CONFIG_ENV_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            xdg: dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)),
        }
    }

    fn candidates(&self) -> impl Iterator<Item = (ConfigSourceKind, &PathBuf)> {
        [
            (ConfigSourceKind::Explicit, self.explicit.as_ref()),
            (ConfigSourceKind::Environment, self.env.as_ref()),
            (ConfigSourceKind::Xdg, self.xdg.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, path)| path.map(|p| (kind, p)))
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigSourceKind {
    Explicit,
    Environment,
    Xdg,
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ConfigSource {
    Explicit(PathBuf),
    Environment(PathBuf),
    Xdg(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::Environment(p) | ConfigSource::Xdg(p) => {
                Some(p)
            }
            ConfigSource::Defaults => None,
        }
    }

    pub fn is_defaults(&self) -> bool {
        matches!(self, ConfigSource::Defaults)
    }
}

/// Configuration together with its origin.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ExtractionConfig,
    pub source: ConfigSource,
}

/// Resolve the effective configuration from the given candidates.
///
/// A path named on the command line must exist; missing env and XDG
/// candidates are skipped.
pub fn resolve_config(paths: &ConfigPaths) -> Result<ResolvedConfig, ValidationError> {
    for (kind, path) in paths.candidates() {
        if !path.is_file() {
            if let ConfigSourceKind::Explicit = kind {
                return Err(ValidationError::IoError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            continue;
        }
        let config = ExtractionConfig::from_file(path)?;
        config.validate().into_result()?;
        let source = match kind {
            ConfigSourceKind::Explicit => ConfigSource::Explicit(path.clone()),
            ConfigSourceKind::Environment => ConfigSource::Environment(path.clone()),
            ConfigSourceKind::Xdg => ConfigSource::Xdg(path.clone()),
        };
        return Ok(ResolvedConfig { config, source });
    }

    Ok(ResolvedConfig {
        config: ExtractionConfig::default(),
        source: ConfigSource::Defaults,
    })
}

//! Extraction configuration types.
//!
//! The file is JSON. Every field is optional; an empty object `{}` is the
//! default configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate::{ValidationError, ValidationResult};
use crate::CONFIG_SCHEMA_VERSION;

/// What the dispatcher does with the remaining queries of a plugin after
/// one of its queries fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueryFailurePolicy {
    /// Stop the plugin's run at the first failed query.
    #[default]
    AbortPlugin,
    /// Record the failure and run the plugin's remaining queries.
    ContinueSiblings,
}

impl std::fmt::Display for QueryFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryFailurePolicy::ContinueSiblings => write!(f, "continue_siblings"),
            QueryFailurePolicy::AbortPlugin => write!(f, "abort_plugin"),
        }
    }
}

/// Complete extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Allow-list of plugin names. `None` enables every registered plugin.
    #[serde(default)]
    pub enabled_plugins: Option<Vec<String>>,

    /// Deny-list of plugin names, applied after the allow-list.
    #[serde(default)]
    pub disabled_plugins: Vec<String>,

    #[serde(default)]
    pub query_failure_policy: QueryFailurePolicy,

    /// Abandon a query after this many row faults.
    #[serde(default)]
    pub max_row_faults_per_query: Option<u64>,

    /// Skip plugins whose reference schemas don't match the container.
    #[serde(default)]
    pub strict_schemas: bool,

    /// Default log filter when neither `SIFT_LOG` nor CLI flags set one.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_schema_version() -> String {
    CONFIG_SCHEMA_VERSION.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            enabled_plugins: None,
            disabled_plugins: Vec::new(),
            query_failure_policy: QueryFailurePolicy::default(),
            max_row_faults_per_query: None,
            strict_schemas: false,
            log_level: default_log_level(),
        }
    }
}

impl ExtractionConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn parse_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Whether the named plugin takes part in extraction.
    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        let allowed = match &self.enabled_plugins {
            Some(names) => names.iter().any(|n| n == name),
            None => true,
        };
        allowed && !self.disabled_plugins.iter().any(|n| n == name)
    }

    /// Shape validation. Plugin names are checked against the registry by
    /// the caller, since this crate doesn't know which plugins exist.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !sift_common::schema::is_compatible(&self.schema_version) {
            result.errors.push(format!(
                "unsupported schema_version {} (expected {})",
                self.schema_version, CONFIG_SCHEMA_VERSION
            ));
        }

        let enabled = self.enabled_plugins.as_deref().unwrap_or_default();
        for name in enabled.iter().chain(self.disabled_plugins.iter()) {
            if name.trim().is_empty() {
                result.errors.push("plugin names must not be empty".to_string());
            }
        }

        for name in enabled {
            if self.disabled_plugins.contains(name) {
                result
                    .errors
                    .push(format!("plugin '{name}' is both enabled and disabled"));
            }
        }

        if let Some(enabled) = &self.enabled_plugins {
            if enabled.is_empty() {
                result
                    .warnings
                    .push("enabled_plugins is empty; no plugin will run".to_string());
            }
        }

        if self.max_row_faults_per_query == Some(0) {
            result
                .errors
                .push("max_row_faults_per_query must be greater than 0".to_string());
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config = ExtractionConfig::parse_json("{}").unwrap();
        assert_eq!(config, ExtractionConfig::default());
        assert_eq!(config.query_failure_policy, QueryFailurePolicy::AbortPlugin);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ExtractionConfig::parse_json(r#"{"workers": 4}"#).unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }

    #[test]
    fn test_policy_snake_case() {
        let config =
            ExtractionConfig::parse_json(r#"{"query_failure_policy": "continue_siblings"}"#)
                .unwrap();
        assert_eq!(config.query_failure_policy, QueryFailurePolicy::ContinueSiblings);
    }

    #[test]
    fn test_plugin_filtering() {
        let config = ExtractionConfig {
            enabled_plugins: Some(vec!["a".into(), "b".into()]),
            disabled_plugins: vec!["b".into()],
            ..Default::default()
        };
        assert!(config.is_plugin_enabled("a"));
        assert!(!config.is_plugin_enabled("b"));
        assert!(!config.is_plugin_enabled("c"));

        let all = ExtractionConfig::default();
        assert!(all.is_plugin_enabled("anything"));
    }

    #[test]
    fn test_validate_conflicting_names() {
        let config = ExtractionConfig {
            enabled_plugins: Some(vec!["a".into()]),
            disabled_plugins: vec!["a".into()],
            ..Default::default()
        };
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors[0].contains("both enabled and disabled"));
    }

    #[test]
    fn test_validate_zero_fault_budget() {
        let config = ExtractionConfig {
            max_row_faults_per_query: Some(0),
            ..Default::default()
        };
        assert!(!config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_allow_list_warns() {
        let config = ExtractionConfig {
            enabled_plugins: Some(vec![]),
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_ok());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_validate_major_version_mismatch() {
        let config = ExtractionConfig {
            schema_version: "2.0.0".into(),
            ..Default::default()
        };
        assert!(!config.validate().is_ok());
    }
}

//! CLI commands for configuration: show, validate, and schema.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use sift_common::{OutputFormat, SCHEMA_VERSION};
use sift_config::{
    resolve_config, ConfigPaths, ConfigSnapshot, ExtractionConfig, ResolvedConfig,
    ValidationError,
};

use crate::exit_codes::ExitCode;
use crate::extract::unknown_plugins;
use crate::plugin::PluginRegistry;
use crate::plugin_cli::print_document;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show,
    /// Validate a configuration file (defaults to the resolved one)
    Validate {
        /// File to validate
        path: Option<PathBuf>,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

/// Run the config command dispatcher
pub fn run_config(
    format: OutputFormat,
    args: &ConfigArgs,
    paths: &ConfigPaths,
    registry: &PluginRegistry,
) -> ExitCode {
    match &args.command {
        ConfigCommands::Show => run_config_show(format, paths),
        ConfigCommands::Validate { path } => {
            run_config_validate(format, path.as_ref(), paths, registry)
        }
        ConfigCommands::Schema => {
            print_document(OutputFormat::Json, &schemars::schema_for!(ExtractionConfig))
        }
    }
}

fn config_error(err: ValidationError) -> ExitCode {
    eprintln!("sift-core: {}", sift_common::Error::from(err));
    ExitCode::ConfigError
}

fn run_config_show(format: OutputFormat, paths: &ConfigPaths) -> ExitCode {
    let resolved = match resolve_config(paths) {
        Ok(resolved) => resolved,
        Err(e) => return config_error(e),
    };
    let snapshot = match ConfigSnapshot::capture(&resolved) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("sift-core: {e}");
            return ExitCode::InternalError;
        }
    };

    match format {
        OutputFormat::Json | OutputFormat::Jsonl => print_document(
            format,
            &serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "command": "config show",
                "source": resolved.source,
                "snapshot": snapshot,
            }),
        ),
        OutputFormat::Summary => {
            let source = snapshot
                .source_path
                .as_deref()
                .unwrap_or("built-in defaults");
            let c = &resolved.config;
            println!("# Configuration ({source})");
            println!();
            println!("  sha256: {}", snapshot.sha256);
            match &c.enabled_plugins {
                Some(names) => println!("  enabled_plugins: {}", names.join(", ")),
                None => println!("  enabled_plugins: all"),
            }
            println!("  disabled_plugins: {}", c.disabled_plugins.join(", "));
            println!("  query_failure_policy: {}", c.query_failure_policy);
            match c.max_row_faults_per_query {
                Some(max) => println!("  max_row_faults_per_query: {max}"),
                None => println!("  max_row_faults_per_query: unlimited"),
            }
            println!("  strict_schemas: {}", c.strict_schemas);
            println!("  log_level: {}", c.log_level);
            ExitCode::Clean
        }
    }
}

fn run_config_validate(
    format: OutputFormat,
    path: Option<&PathBuf>,
    paths: &ConfigPaths,
    registry: &PluginRegistry,
) -> ExitCode {
    let loaded = match path {
        Some(p) => ExtractionConfig::from_file(p).map(|config| ResolvedConfig {
            config,
            source: sift_config::ConfigSource::Explicit(p.clone()),
        }),
        None => resolve_config(paths),
    };
    let resolved = match loaded {
        Ok(resolved) => resolved,
        Err(e) => return config_error(e),
    };

    let mut result = resolved.config.validate();
    for name in unknown_plugins(registry, &resolved.config) {
        result
            .warnings
            .push(format!("plugin '{name}' is not registered"));
    }

    let code = if result.is_ok() {
        ExitCode::Clean
    } else {
        ExitCode::ConfigError
    };

    match format {
        OutputFormat::Json | OutputFormat::Jsonl => {
            let printed = print_document(
                format,
                &serde_json::json!({
                    "schema_version": SCHEMA_VERSION,
                    "command": "config validate",
                    "source": resolved.source,
                    "valid": result.is_ok(),
                    "errors": result.errors,
                    "warnings": result.warnings,
                }),
            );
            if printed.is_error() {
                return printed;
            }
        }
        OutputFormat::Summary => {
            for e in &result.errors {
                println!("error: {e}");
            }
            for w in &result.warnings {
                println!("warning: {w}");
            }
            if result.is_ok() {
                println!("configuration is valid");
            }
        }
    }
    code
}

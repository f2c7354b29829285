//! CLI commands for plugin introspection.
//!
//! Provides list and show subcommands over the built-in registry.

use crate::exit_codes::ExitCode;
use crate::plugin::PluginRegistry;
use clap::{Args, Subcommand};
use serde::Serialize;
use sift_common::{OutputFormat, SCHEMA_VERSION};
use sift_config::ExtractionConfig;

/// Arguments for the plugins command
#[derive(Args, Debug)]
pub struct PluginsArgs {
    #[command(subcommand)]
    pub command: PluginsCommands,
}

/// Plugins subcommands
#[derive(Subcommand, Debug)]
pub enum PluginsCommands {
    /// List registered plugins
    List,
    /// Show a plugin's declaration
    Show {
        /// Plugin name
        name: String,
    },
}

/// Print a JSON document in the requested machine format.
pub(crate) fn print_document<T: Serialize>(format: OutputFormat, doc: &T) -> ExitCode {
    let rendered = match format {
        OutputFormat::Jsonl => serde_json::to_string(doc),
        _ => serde_json::to_string_pretty(doc),
    };
    match rendered {
        Ok(text) => {
            println!("{text}");
            ExitCode::Clean
        }
        Err(e) => {
            eprintln!("sift-core: failed to render output: {e}");
            ExitCode::InternalError
        }
    }
}

/// Run the plugins command dispatcher
pub fn run_plugins(
    format: OutputFormat,
    args: &PluginsArgs,
    registry: &PluginRegistry,
    config: &ExtractionConfig,
) -> ExitCode {
    match &args.command {
        PluginsCommands::List => run_plugins_list(format, registry, config),
        PluginsCommands::Show { name } => run_plugins_show(format, registry, name),
    }
}

fn run_plugins_list(
    format: OutputFormat,
    registry: &PluginRegistry,
    config: &ExtractionConfig,
) -> ExitCode {
    let plugins: Vec<serde_json::Value> = registry
        .plugins()
        .map(|p| {
            let d = p.descriptor();
            serde_json::json!({
                "name": d.name,
                "data_format": d.data_format,
                "queries": d.queries.len(),
                "enabled": config.is_plugin_enabled(&d.name),
            })
        })
        .collect();

    match format {
        OutputFormat::Json | OutputFormat::Jsonl => print_document(
            format,
            &serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "command": "plugins list",
                "plugins": plugins,
                "count": plugins.len(),
            }),
        ),
        OutputFormat::Summary => {
            println!("# Plugins ({} total)", registry.len());
            println!();
            for p in registry.plugins() {
                let d = p.descriptor();
                let state = if config.is_plugin_enabled(&d.name) {
                    "enabled"
                } else {
                    "disabled"
                };
                println!("  {:<20} {:<9} {}", d.name, state, d.data_format);
            }
            ExitCode::Clean
        }
    }
}

fn run_plugins_show(format: OutputFormat, registry: &PluginRegistry, name: &str) -> ExitCode {
    let plugin = match registry.lookup(name) {
        Ok(plugin) => plugin,
        Err(e) => {
            eprintln!("sift-core: {e}");
            return ExitCode::PluginError;
        }
    };
    let d = plugin.descriptor();

    match format {
        OutputFormat::Json | OutputFormat::Jsonl => print_document(
            format,
            &serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "command": "plugins show",
                "plugin": d,
            }),
        ),
        OutputFormat::Summary => {
            println!("# Plugin: {}", d.name);
            println!();
            println!("  Format: {}", d.data_format);
            println!("  Required structure:");
            for (object, fields) in &d.required_structure {
                let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
                println!("    {object}: {}", fields.join(", "));
            }
            println!("  Queries:");
            for q in &d.queries {
                println!("    [{}] {} -> {}", q.hash(), q.query, q.handler);
            }
            println!("  Reference schemas: {}", d.schemas.len());
            ExitCode::Clean
        }
    }
}

//! sift-core: extract timestamped events from SQLite application databases.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use sift_common::OutputFormat;
use sift_config::{resolve_config, ConfigPaths, ConfigSnapshot, ExtractionConfig};
use sift_core::config_cli::{run_config, ConfigArgs};
use sift_core::container::SqliteContainer;
use sift_core::dispatch::CancellationToken;
use sift_core::exit_codes::ExitCode;
use sift_core::extract::{unreadable, Extractor};
use sift_core::logging::{self, LogSettings};
use sift_core::plugin::PluginRegistry;
use sift_core::plugin_cli::{run_plugins, PluginsArgs};
use sift_core::report::ExtractionReport;
use sift_core::sink::JsonLinesSink;
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(name = "sift-core")]
#[command(about = "Extract timestamped events from SQLite application databases")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Report format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Summary)]
    format: OutputFormat,

    /// Configuration file (overrides SIFT_CONFIG and the XDG location)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every applicable plugin against one or more databases
    Extract(ExtractArgs),
    /// Show which plugins match a database, without extracting
    Check {
        /// Database file
        database: PathBuf,
    },
    /// Plugin introspection
    Plugins(PluginsArgs),
    /// Configuration inspection
    Config(ConfigArgs),
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Database files
    #[arg(required = true)]
    databases: Vec<PathBuf>,

    /// Only run these plugins
    #[arg(long = "plugin", value_name = "NAME")]
    plugins: Vec<String>,

    /// Write records here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let code = run(cli);
    std::process::exit(code.as_i32());
}

fn run(cli: Cli) -> ExitCode {
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "sift-core", &mut io::stdout());
        return ExitCode::Clean;
    }

    let paths = ConfigPaths::discover(cli.global.config.as_deref());

    // Config errors surface through `config` subcommands with details, so
    // those run even when the file is broken.
    let resolved = match resolve_config(&paths) {
        Ok(resolved) => Some(resolved),
        Err(e) if matches!(cli.command, Commands::Config(_)) => {
            debug!(error = %e, "configuration did not resolve");
            None
        }
        Err(e) => {
            eprintln!("sift-core: {}", sift_common::Error::from(e));
            return ExitCode::ConfigError;
        }
    };

    logging::init(&LogSettings {
        verbose: cli.global.verbose,
        quiet: cli.global.quiet,
        json: cli.global.log_json,
        config_level: resolved.as_ref().map(|r| r.config.log_level.clone()),
    });

    let registry = match PluginRegistry::with_builtin() {
        Ok(registry) => registry,
        Err(e) => {
            error!(error = %e, "built-in plugin failed to register");
            return ExitCode::InternalError;
        }
    };

    let format = cli.global.format;
    match (&cli.command, resolved) {
        (Commands::Config(args), _) => run_config(format, args, &paths, &registry),
        (_, None) => ExitCode::ConfigError,
        (Commands::Plugins(args), Some(resolved)) => {
            run_plugins(format, args, &registry, &resolved.config)
        }
        (Commands::Check { database }, Some(resolved)) => {
            run_check(format, database, &registry, resolved.config)
        }
        (Commands::Extract(args), Some(resolved)) => {
            let hash = match ConfigSnapshot::capture(&resolved) {
                Ok(snapshot) => snapshot.sha256,
                Err(e) => {
                    eprintln!("sift-core: {e}");
                    return ExitCode::InternalError;
                }
            };
            run_extract(format, args, &registry, resolved.config, hash)
        }
        (Commands::Completions { .. }, _) => ExitCode::Clean,
    }
}

fn open(path: &Path) -> Result<SqliteContainer, sift_common::Error> {
    let location = path.display().to_string();
    SqliteContainer::open(path).map_err(|e| unreadable(&location, &e))
}

fn run_extract(
    format: OutputFormat,
    args: &ExtractArgs,
    registry: &PluginRegistry,
    config: ExtractionConfig,
    config_sha256: String,
) -> ExitCode {
    let mut extractor = Extractor::new(registry, config).with_config_hash(config_sha256);
    if !args.plugins.is_empty() {
        extractor = match extractor.select(args.plugins.iter().cloned()) {
            Ok(extractor) => extractor,
            Err(e) => {
                eprintln!("sift-core: {e}");
                return ExitCode::for_error(&e);
            }
        };
    }

    let writer: Box<dyn Write + Send> = match &args.output {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(e) => {
                eprintln!("sift-core: cannot create {}: {e}", path.display());
                return ExitCode::IoError;
            }
        },
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let sink = JsonLinesSink::new(writer);
    let cancel = CancellationToken::new();

    let mut reports: Vec<ExtractionReport> = Vec::new();
    let mut unreadable_seen = false;

    for path in &args.databases {
        let result = open(path).and_then(|container| extractor.extract(&container, &sink, &cancel));
        match result {
            Ok(report) => reports.push(report),
            Err(e) if matches!(e, sift_common::Error::ContainerUnreadable { .. }) => {
                error!(error = %e, code = e.code(), "skipping container");
                unreadable_seen = true;
            }
            Err(e) => {
                error!(error = %e, code = e.code(), "extraction aborted");
                return ExitCode::for_error(&e);
            }
        }
    }

    if let Err(e) = sink.flush() {
        eprintln!("sift-core: {e}");
        return ExitCode::IoError;
    }
    print_reports(format, &reports);

    if unreadable_seen {
        ExitCode::ContainerUnreadable
    } else if reports.iter().any(ExtractionReport::has_failures) {
        ExitCode::PartialFail
    } else if reports.iter().any(|r| r.totals.events_produced > 0) {
        ExitCode::EventsProduced
    } else {
        ExitCode::Clean
    }
}

/// Reports go to stderr so stdout stays a pure record stream.
fn print_reports(format: OutputFormat, reports: &[ExtractionReport]) {
    let mut err = io::stderr().lock();
    let _ = match format {
        OutputFormat::Summary => reports
            .iter()
            .try_for_each(|r| write!(err, "{}", r.summary())),
        OutputFormat::Json => match serde_json::to_string_pretty(reports) {
            Ok(text) => writeln!(err, "{text}"),
            Err(e) => writeln!(err, "sift-core: {e}"),
        },
        OutputFormat::Jsonl => reports.iter().try_for_each(|r| {
            match serde_json::to_string(r) {
                Ok(line) => writeln!(err, "{line}"),
                Err(e) => writeln!(err, "sift-core: {e}"),
            }
        }),
    };
}

fn run_check(
    format: OutputFormat,
    database: &Path,
    registry: &PluginRegistry,
    config: ExtractionConfig,
) -> ExitCode {
    let checks = match open(database).and_then(|c| Extractor::new(registry, config).check(&c)) {
        Ok(checks) => checks,
        Err(e) => {
            eprintln!("sift-core: {e}");
            return ExitCode::for_error(&e);
        }
    };

    match format {
        OutputFormat::Json | OutputFormat::Jsonl => {
            let doc = serde_json::json!({
                "schema_version": sift_common::SCHEMA_VERSION,
                "command": "check",
                "container": database.display().to_string(),
                "plugins": checks,
            });
            let rendered = if format == OutputFormat::Jsonl {
                serde_json::to_string(&doc)
            } else {
                serde_json::to_string_pretty(&doc)
            };
            match rendered {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    eprintln!("sift-core: {e}");
                    return ExitCode::InternalError;
                }
            }
        }
        OutputFormat::Summary => {
            println!("# {}", database.display());
            println!();
            for check in &checks {
                println!("  {:<20} {}", check.plugin, check.structure);
            }
        }
    }

    ExitCode::Clean
}

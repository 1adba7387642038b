use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;

use apiprobe::config::{Config, CONFIG_FILE};
use apiprobe::error::ProbeError;
use apiprobe::output::OutputFormat;
use apiprobe::rules::{RuleEngine, Severity};
use apiprobe::run::RunHandle;
use apiprobe::store::{ExportBundle, FileStore, Store};
use apiprobe::{import_project, Prober, SelectionMode};

/// 128 + SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser)]
#[command(
    name = "apiprobe",
    about = "Input-validation prober for OpenAPI/Swagger-described HTTP APIs",
    version,
    author
)]
struct Cli {
    /// Store file for projects, results and false positives
    #[arg(long, global = true, env = "APIPROBE_STORE", default_value = ".apiprobe/store.json")]
    store: PathBuf,

    /// Log progress (equivalent to RUST_LOG=apiprobe=debug)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a document and list its endpoints
    Endpoints {
        /// Document URL or file path
        source: String,

        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Probe an API's endpoints with invalid input
    Run {
        /// Document URL or file path
        source: String,

        /// Rule selection: defaults, suggested, all, or a comma-separated list
        #[arg(long, short = 'r', default_value = "suggested")]
        rules: String,

        /// Only probe endpoints whose id matches or whose path contains this
        #[arg(long, short = 'e')]
        endpoint: Option<String>,

        /// Base URL of the API under test (overrides the document and config)
        #[arg(long)]
        base_url: Option<String>,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (console, json, sarif)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Minimum severity to fail (low, medium, high)
        #[arg(long)]
        fail_on: Option<String>,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List all validation rules
    ListRules {
        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Mark, unmark or list false positives
    FalsePositive {
        #[command(subcommand)]
        action: FalsePositiveAction,
    },

    /// Show recent runs, most recent first
    History {
        /// Maximum number of entries
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,
    },

    /// Write the whole store to a JSON file
    Export {
        path: PathBuf,
    },

    /// Replace the store's contents with a previously exported file
    Import {
        path: PathBuf,
    },

    /// Generate a starter .apiprobe.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum FalsePositiveAction {
    /// Accept a test case's failure; it is skipped in future runs
    Mark {
        endpoint_id: String,
        test_id: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Include a previously accepted test case again
    Unmark {
        endpoint_id: String,
        test_id: String,
    },
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Endpoints { source, format } => cmd_endpoints(&cli.store, source, format).await,
        Commands::Run {
            source,
            rules,
            endpoint,
            base_url,
            config,
            format,
            fail_on,
            output,
        } => {
            cmd_run(
                &cli.store,
                RunArgs {
                    source,
                    rules,
                    endpoint,
                    base_url,
                    config,
                    format,
                    fail_on,
                    output,
                },
            )
            .await
        }
        Commands::ListRules { format } => cmd_list_rules(format),
        Commands::FalsePositive { action } => cmd_false_positive(&cli.store, action),
        Commands::History { limit } => cmd_history(&cli.store, limit),
        Commands::Export { path } => cmd_export(&cli.store, path),
        Commands::Import { path } => cmd_import(&cli.store, path),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "apiprobe=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn open_store(path: &Path) -> Result<FileStore, ProbeError> {
    FileStore::open(path)
}

async fn cmd_endpoints(store_path: &Path, source: String, format: String) -> Result<i32, ProbeError> {
    let store = open_store(store_path)?;
    let imported = import_project(&source, &store).await?;
    let engine = RuleEngine::new();

    match format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&imported.endpoints)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{} ({}, {} endpoint(s)) base: {}",
                imported.project.name,
                imported.project.version,
                imported.endpoints.len(),
                if imported.project.base_url.is_empty() {
                    "-"
                } else {
                    &imported.project.base_url
                }
            );
            if imported.document_changed {
                println!("Document changed since the last import.");
            }
            println!("{:<32} {:<7} {:<32} SUGGESTED", "ID", "METHOD", "PATH");
            println!("{}", "-".repeat(100));
            for endpoint in &imported.endpoints {
                let mut suggested: Vec<String> = Vec::new();
                for param in &endpoint.parameters {
                    for rule in engine.suggest(param) {
                        let name = rule.to_string();
                        if !suggested.contains(&name) {
                            suggested.push(name);
                        }
                    }
                }
                println!(
                    "{:<32} {:<7} {:<32} {}",
                    endpoint.id,
                    endpoint.method.as_str(),
                    endpoint.path,
                    suggested.join(",")
                );
            }
        }
    }

    Ok(0)
}

struct RunArgs {
    source: String,
    rules: String,
    endpoint: Option<String>,
    base_url: Option<String>,
    config: Option<PathBuf>,
    format: String,
    fail_on: Option<String>,
    output: Option<PathBuf>,
}

async fn cmd_run(store_path: &Path, args: RunArgs) -> Result<i32, ProbeError> {
    let format = OutputFormat::from_str_lenient(&args.format).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", args.format);
        OutputFormat::Console
    });

    let config_path = args.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let mut config = Config::load(&config_path)?;
    if let Some(s) = args.fail_on {
        match Severity::from_str_lenient(&s) {
            Some(sev) => config.policy.fail_on = sev,
            None => eprintln!("Warning: unknown severity '{}', using config default", s),
        }
    }
    if let Some(base_url) = args.base_url {
        config.run.base_url = Some(base_url);
    }

    let store: Arc<dyn Store> = Arc::new(open_store(store_path)?);
    let imported = import_project(&args.source, store.as_ref()).await?;
    let prober = Prober::new(config, store)?;

    let handle = prober.handle();
    tokio::spawn(async move {
        while signal::ctrl_c().await.is_ok() {
            if let Some(code) = interrupt(&handle) {
                process::exit(code);
            }
        }
    });

    let mode = SelectionMode::from_str_lenient(&args.rules);
    let report = prober.run(&imported, &mode, args.endpoint.as_deref()).await?;
    let rendered = apiprobe::render_report(&report, format)?;

    match args.output {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = pass, 1 = accepted invalid input above threshold
    Ok(if report.verdict.pass { 0 } else { 1 })
}

/// Stop the active run, or give the exit code to leave with when nothing is
/// running (between endpoints, or a second Ctrl-C while stopping).
fn interrupt(handle: &RunHandle) -> Option<i32> {
    if handle.stop() {
        eprintln!("Stopping after the current probe... (Ctrl-C again to quit)");
        None
    } else {
        eprintln!("Interrupted");
        Some(INTERRUPTED_EXIT_CODE)
    }
}

fn cmd_list_rules(format_str: String) -> Result<i32, ProbeError> {
    let engine = RuleEngine::new();
    let rules = engine.list_rules();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&rules)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{:<16} {:<26} {:<10} {:<8} DESCRIPTION",
                "ID", "NAME", "SEVERITY", "DEFAULT"
            );
            println!("{}", "-".repeat(100));
            for rule in &rules {
                println!(
                    "{:<16} {:<26} {:<10} {:<8} {}",
                    rule.id.to_string(),
                    rule.name,
                    rule.severity.to_string(),
                    if rule.enabled_by_default { "yes" } else { "no" },
                    rule.description,
                );
            }
        }
    }

    Ok(0)
}

fn cmd_false_positive(store_path: &Path, action: FalsePositiveAction) -> Result<i32, ProbeError> {
    let store = open_store(store_path)?;
    match action {
        FalsePositiveAction::Mark {
            endpoint_id,
            test_id,
            reason,
        } => {
            store.save_false_positive(&endpoint_id, &test_id, &reason)?;
            println!("Marked {} as false positive", test_id);
        }
        FalsePositiveAction::Unmark {
            endpoint_id,
            test_id,
        } => {
            if !store.remove_false_positive(&endpoint_id, &test_id)? {
                eprintln!("{} was not marked as a false positive", test_id);
                return Ok(1);
            }
            println!("Unmarked {}", test_id);
        }
        FalsePositiveAction::List => {
            for mark in store.load_false_positives()? {
                println!(
                    "{}  {}  {}  {}",
                    mark.timestamp.format("%Y-%m-%d %H:%M"),
                    mark.endpoint_id,
                    mark.test_id,
                    mark.reason
                );
            }
        }
    }
    Ok(0)
}

fn cmd_history(store_path: &Path, limit: usize) -> Result<i32, ProbeError> {
    let store = open_store(store_path)?;
    for entry in store.load_history()?.into_iter().take(limit) {
        let s = entry.summary;
        println!(
            "{}  {:<7} {:<32} {:<10} {} passed, {} failed, {} inconclusive",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.method.as_str(),
            entry.path,
            entry.phase.to_string(),
            s.passed,
            s.failed,
            s.inconclusive
        );
    }
    Ok(0)
}

fn cmd_export(store_path: &Path, path: PathBuf) -> Result<i32, ProbeError> {
    let store = open_store(store_path)?;
    let bundle = store.export_data()?;
    std::fs::write(&path, serde_json::to_string_pretty(&bundle)?)?;
    println!("Exported {} project(s) to {}", bundle.projects.len(), path.display());
    Ok(0)
}

fn cmd_import(store_path: &Path, path: PathBuf) -> Result<i32, ProbeError> {
    let content = std::fs::read_to_string(&path)?;
    let bundle: ExportBundle = serde_json::from_str(&content)?;
    let count = bundle.projects.len();
    open_store(store_path)?.import_data(bundle)?;
    println!("Imported {} project(s) from {}", count, path.display());
    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, ProbeError> {
    let path = PathBuf::from(CONFIG_FILE);

    if path.exists() && !force {
        eprintln!("{} already exists. Use --force to overwrite.", CONFIG_FILE);
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {}", CONFIG_FILE);

    Ok(0)
}

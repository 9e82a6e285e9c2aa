use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use davpub::config::{self, Config, TransportKind};
use davpub::credentials::load_credentials;
use davpub::ledger::{LEDGER_FILE_NAME, Ledger};
use davpub::publisher::{
    DOCS_DIR_NAME, Destinations, PublishLayout, PublishMode, PublishReceipt, Publisher,
    plan_uploads, versioned_file_name,
};
use davpub::reporter::Reporter;
use davpub::toolkit::join_url;

#[derive(Parser, Debug)]
#[command(name = "davpub", version)]
#[command(about = "Publish build artifacts to a WebDAV store, verify them, and promote the build")]
struct Cli {
    /// Project root that local paths are resolved against
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Configuration file (default: <root>/davpub.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local ledger file, relative to the root (overrides [layout].ledger_file)
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Total attempts per request, first one included (overrides [retry].max_attempts)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Transport used for requests (overrides [remote].transport)
    #[arg(long, value_enum)]
    transport: Option<TransportArg>,

    /// Per-request timeout of the http transport (e.g. 30s, 5m)
    #[arg(long)]
    timeout: Option<String>,

    /// Print the run receipt as JSON instead of text.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TransportArg {
    Http,
    Curl,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Http => TransportKind::Http,
            TransportArg::Curl => TransportKind::Curl,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish an incremental build and promote it to LATEST.
    Incremental {
        /// Credentials file (TOML, first [[servers]] entry)
        credentials: PathBuf,
        build_number: u64,
        /// Incremental base URL (overrides [remote].incremental_base_url)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Publish a versioned release under the release namespaces.
    Release {
        /// Credentials file (TOML, first [[servers]] entry)
        credentials: PathBuf,
        base_url: String,
        version: String,
    },
    /// Print local files and their remote destinations without contacting the server.
    Plan {
        #[command(subcommand)]
        target: PlanTarget,
    },
    /// Compare two ledgers and print the URLs added and removed.
    LedgerDiff { old: PathBuf, new: PathBuf },
}

#[derive(Subcommand, Debug)]
enum PlanTarget {
    Incremental {
        build_number: u64,
        #[arg(long)]
        base_url: Option<String>,
    },
    Release {
        base_url: String,
        version: String,
    },
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = effective_config(&cli)?;
    let mut reporter = CliReporter;

    match cli.cmd {
        Commands::Incremental {
            credentials,
            build_number,
            base_url,
        } => {
            let base_url = base_url.unwrap_or_else(|| config.remote.incremental_base_url.clone());
            let mode = PublishMode::Incremental { build_number };
            let receipt = run_publish(
                &cli.root,
                &config,
                mode,
                &base_url,
                &credentials,
                &mut reporter,
            )?;
            print_receipt(&receipt, cli.json)?;
        }
        Commands::Release {
            credentials,
            base_url,
            version,
        } => {
            let mode = PublishMode::Release { version };
            let receipt = run_publish(
                &cli.root,
                &config,
                mode,
                &base_url,
                &credentials,
                &mut reporter,
            )?;
            print_receipt(&receipt, cli.json)?;
        }
        Commands::Plan { target } => {
            let (mode, base_url) = match target {
                PlanTarget::Incremental {
                    build_number,
                    base_url,
                } => (
                    PublishMode::Incremental { build_number },
                    base_url.unwrap_or_else(|| config.remote.incremental_base_url.clone()),
                ),
                PlanTarget::Release { base_url, version } => {
                    (PublishMode::Release { version }, base_url)
                }
            };
            print_plan(&cli.root, &config, &mode, &base_url)?;
        }
        Commands::LedgerDiff { old, new } => {
            print_ledger_diff(&old, &new)?;
        }
    }

    Ok(())
}

/// `davpub.toml` with command-line overrides applied.
fn effective_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => config::load_config_from_file(path)?,
        None => config::load_config(&cli.root)?,
    };

    if let Some(ledger) = &cli.ledger {
        config.layout.ledger_file = ledger.clone();
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(transport) = cli.transport {
        config.remote.transport = transport.into();
    }
    if let Some(timeout) = &cli.timeout {
        config.remote.timeout = parse_duration(timeout)?;
    }
    Ok(config)
}

fn parse_duration(s: &str) -> Result<Duration> {
    humantime::parse_duration(s).with_context(|| format!("invalid duration: {s}"))
}

fn run_publish(
    root: &Path,
    config: &Config,
    mode: PublishMode,
    base_url: &str,
    credentials: &Path,
    reporter: &mut dyn Reporter,
) -> Result<PublishReceipt> {
    let credentials = load_credentials(credentials)?;
    let dav = config.dav_client(credentials)?;
    reporter.info(&format!(
        "using {} transport, {} attempt(s) per request",
        dav.transport_name(),
        dav.retry_config().max_attempts
    ));

    let mut publisher = Publisher::from_config(root, config, mode, base_url, dav);
    publisher.publish_all(reporter)
}

fn print_receipt(receipt: &PublishReceipt, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(receipt).context("failed to serialize receipt")?;
        println!("{out}");
        return Ok(());
    }

    match &receipt.mode {
        PublishMode::Incremental { build_number } => {
            println!("mode: incremental (build {build_number})")
        }
        PublishMode::Release { version } => println!("mode: release ({version})"),
    }
    println!("dist_root: {}", receipt.destinations.dist_root);
    if receipt.destinations.docs_root != receipt.destinations.dist_root {
        println!("docs_root: {}", receipt.destinations.docs_root);
    }
    if let Some(alias_root) = &receipt.destinations.alias_root {
        println!("promoted_to: {alias_root}");
    }
    println!("stage: {}", receipt.stage);
    println!("ledger: {}", receipt.ledger_path.display());
    let elapsed = receipt.finished_at - receipt.started_at;
    println!("duration_ms: {}", elapsed.num_milliseconds());
    println!();

    for (idx, url) in receipt.ledger.iter().enumerate() {
        println!("{:>3}. {url}", idx + 1);
    }
    Ok(())
}

fn print_plan(root: &Path, config: &Config, mode: &PublishMode, base_url: &str) -> Result<()> {
    let destinations = Destinations::for_mode(mode, base_url, &config.release);
    let layout = PublishLayout::from_config(root, config, mode);

    println!("dist_root: {}", destinations.dist_root);
    if destinations.docs_root != destinations.dist_root {
        println!("docs_root: {}", destinations.docs_root);
    }
    if let Some(alias_root) = &destinations.alias_root {
        println!("alias_root: {alias_root}");
    }
    println!();

    for (idx, upload) in plan_uploads(mode, &destinations, &layout)?.iter().enumerate() {
        let missing = if upload.local.is_file() { "" } else { " (missing)" };
        println!(
            "{:>3}. {} -> {}{missing}",
            idx + 1,
            upload.local.display(),
            upload.url
        );
    }

    if let Some(tree) = &layout.docs_tree {
        let state = if tree.is_dir() {
            ""
        } else if layout.docs_tree_required {
            " (missing)"
        } else {
            " (skipped: not present)"
        };
        println!(
            "docs: {}/ -> {}{state}",
            tree.display(),
            join_url(&destinations.docs_root, DOCS_DIR_NAME)
        );
    }

    for alias in &layout.aliases {
        let (from, to) = match mode {
            PublishMode::Release { version } => (
                versioned_file_name(&alias.from, &layout.name_prefix, version),
                versioned_file_name(&alias.to, &layout.name_prefix, version),
            ),
            PublishMode::Incremental { .. } => (alias.from.clone(), alias.to.clone()),
        };
        println!("alias: {from} -> {to}");
    }

    println!(
        "ledger: {} -> {}",
        layout.ledger_path.display(),
        join_url(&destinations.dist_root, LEDGER_FILE_NAME)
    );
    Ok(())
}

fn print_ledger_diff(old: &Path, new: &Path) -> Result<()> {
    let old_ledger = Ledger::load(old)?;
    let new_ledger = Ledger::load(new)?;
    let diff = old_ledger.diff(&new_ledger);

    if diff.is_empty() {
        println!("no differences ({} entries)", new_ledger.len());
        return Ok(());
    }
    for url in &diff.added {
        println!("+ {url}");
    }
    for url in &diff.removed {
        println!("- {url}");
    }
    Ok(())
}

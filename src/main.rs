//! lnwatch - Lightning node alert monitor
//!
//! Polls the alert service for one node and raises terminal notifications
//! when new critical or warning alerts appear.
//!
//! ## Usage
//!
//! ```bash
//! # Monitor the node from ~/.lnwatch/config.yaml
//! lnwatch
//!
//! # Monitor a specific node against a local alert service
//! lnwatch --node 02b1fe65... --source-url http://127.0.0.1:8080
//!
//! # Poll every 10 seconds, with verbose logging
//! lnwatch --interval-ms 10000 -v
//! ```
//!
//! Type `help` at the prompt for interactive commands.

mod commands;
mod terminal;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use lnwatch_core::{LogGuard, WatchError, init_logging};
use lnwatch_monitor::{
    AppConfig, HttpAlertSource, MonitoringScheduler, MonitoringState, OptionsUpdate, Visibility,
    VisibilityAdapter, VisibilitySender,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{error, info, warn};

use commands::{Command, HELP};
use terminal::TerminalPlatform;

/// Lightning node alert monitor
///
/// Watches a node's alerts and notifies about new critical and warning
/// alerts as they appear.
#[derive(Parser, Debug)]
#[command(name = "lnwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.lnwatch/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.lnwatch/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node public key to monitor
    #[arg(long)]
    node: Option<String>,

    /// Base URL of the alert service
    #[arg(long)]
    source_url: Option<String>,

    /// Check interval in milliseconds (0 = manual checks only)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Start as if the window were in the background
    #[arg(long)]
    hidden: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    info!("Starting lnwatch");

    match run(cli).await {
        Ok(()) => {
            info!("lnwatch exited normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("lnwatch error: {:#}", e);
            eprintln!("Error: {:#}", e);
            if let Some(hint) = e.downcast_ref::<WatchError>().and_then(WatchError::guidance) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::from(1)
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> lnwatch_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

/// Load the config file and apply CLI overrides.
fn load_config(cli: &Cli) -> lnwatch_core::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load_default()?,
    };

    if let Some(node) = &cli.node {
        config.node_pubkey = Some(node.clone());
    }
    if let Some(url) = &cli.source_url {
        config.source.base_url = url.clone();
    }
    if let Some(ms) = cli.interval_ms {
        config.monitoring.check_interval_ms = ms;
    }

    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    if config.node_pubkey.is_none() {
        warn!("No node configured; set node_pubkey in the config file or pass --node");
    }

    let source = HttpAlertSource::from_config(&config.source).context("creating alert source")?;
    let initial = if cli.hidden {
        Visibility::Hidden
    } else {
        Visibility::Visible
    };
    let (visibility, adapter) = VisibilityAdapter::channel(initial);

    let scheduler = MonitoringScheduler::new(
        config.node_pubkey.clone(),
        Arc::new(source),
        Arc::new(TerminalPlatform::new()),
        config.monitoring.clone(),
    )
    .with_visibility(adapter);

    let reporter = tokio::spawn(report_states(scheduler.subscribe()));

    scheduler.start_monitoring().await;
    if !scheduler.is_monitoring() {
        println!("Monitoring is not running (no node configured or monitoring disabled).");
    }
    println!("Type 'help' for commands.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupt received");
                break;
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("reading stdin")? else {
                    // Detached from a terminal; keep monitoring until interrupted.
                    stdin_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(&scheduler, &visibility, command).await,
                    Err(e) => eprintln!("{:#}", e),
                }
            }
        }
    }

    scheduler.shutdown().await;
    reporter.abort();
    Ok(())
}

async fn execute(scheduler: &MonitoringScheduler, visibility: &VisibilitySender, command: Command) {
    match command {
        Command::Check => scheduler.check_now().await,
        Command::Clear => {
            scheduler.clear_alerts().await;
            println!("Alerts cleared.");
        }
        Command::Start => {
            scheduler.start_monitoring().await;
            if !scheduler.is_monitoring() {
                println!("Monitoring not started (no node configured or monitoring disabled).");
            }
        }
        Command::Stop => scheduler.stop_monitoring().await,
        Command::Hide => visibility.hide(),
        Command::Show => visibility.show(),
        Command::Interval(ms) => {
            let mut candidate = scheduler.options();
            candidate.check_interval_ms = ms;
            if let Err(e) = candidate.validate() {
                eprintln!("{}", e);
                return;
            }
            scheduler.update_options(OptionsUpdate::interval_ms(ms)).await;
        }
        Command::Status => print_status(scheduler),
        Command::State => match serde_json::to_string_pretty(&scheduler.state()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize state: {}", e),
        },
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

fn print_status(scheduler: &MonitoringScheduler) {
    let state = scheduler.state();
    println!("{}", state.summary());
    println!(
        "node: {} | visibility: {:?} | period: {}",
        scheduler.entity_id().unwrap_or("-"),
        scheduler.visibility(),
        scheduler
            .effective_interval()
            .map(|p| format!("{}ms", p.as_millis()))
            .unwrap_or_else(|| "manual".to_string())
    );
    for alert in &state.recent_alerts {
        println!("  {}", alert.format_compact());
    }
}

/// Print a summary whenever a check completes or monitoring starts/stops.
async fn report_states(mut rx: watch::Receiver<MonitoringState>) {
    let mut last_seen: Option<(bool, Option<DateTime<Utc>>)> = None;
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        let key = (state.is_monitoring, state.last_check);
        if last_seen == Some(key) {
            continue;
        }
        last_seen = Some(key);
        println!("{}", state.summary());
    }
}

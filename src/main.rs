//! Listenscope - event listener inventory for recorded page loads
//!
//! Replays recorded instrumentation sessions through the event listener
//! gatherer and writes a Markdown or JSON report of the artifacts.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, unreadable session, config error, etc.)
//!   2 - A pass committed the failure sentinel and --fail-on-error is set

mod cli;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use listenscope::config::{Config, CONFIG_FILE_NAME};
use listenscope::driver::{RecordedSession, ReplayDriver};
use listenscope::gatherer::{EventListenersGatherer, Gatherer, PassContext};
use listenscope::models::{Artifact, ListenerSummary, PassReport, Report, ReportMetadata};
use listenscope::report;
use listenscope::scanner::{SessionFile, SessionScanner};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first: it can turn on verbose logging
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.apply_overrides(&args.overrides());

    init_logging(args.log_level(config.general.verbose));

    info!("Listenscope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\nError: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .listenscope.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Replay every session and write the report. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let mut scanner = SessionScanner::new(args.sessions.clone());
    if let Some(depth) = args.max_depth {
        scanner = scanner.with_max_depth(depth);
    }
    let sessions = scanner.scan()?;

    if args.dry_run {
        return Ok(handle_dry_run(&sessions));
    }

    if sessions.is_empty() {
        warn!("No session files found");
    }

    let mut passes = Vec::with_capacity(sessions.len());
    for session in &sessions {
        passes.push(replay_session(session, &config).await?);
    }

    let summary = ListenerSummary::from_passes(&passes);
    let report = Report {
        metadata: ReportMetadata {
            generated_at: Utc::now(),
            element_selector: config.gatherer.element_selector.clone(),
            sessions: passes.len(),
            total_listeners: summary.total,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        passes,
        summary,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if !args.quiet {
        println!("Sessions replayed: {}", report.metadata.sessions);
        println!("Listeners collected: {}", report.summary.total);
        if report.summary.failed_passes > 0 {
            println!("Failed passes: {}", report.summary.failed_passes);
        }
        println!("Report saved to: {}", output_path.display());
    }

    if args.fail_on_error && report.summary.failed_passes > 0 {
        eprintln!(
            "{} pass(es) could not be collected. Failing (exit code 2).",
            report.summary.failed_passes
        );
        return Ok(2);
    }

    Ok(0)
}

/// Run one pass of the gatherer against a recorded session.
async fn replay_session(session_file: &SessionFile, config: &Config) -> Result<PassReport> {
    let session = RecordedSession::load(&session_file.path)?;
    let page_url = session.url.clone();
    let driver = ReplayDriver::new(session);
    let ctx = PassContext::new(&driver, &page_url);

    let mut gatherer = EventListenersGatherer::new(config.gatherer.clone());
    let artifact = run_pass(&mut gatherer, &ctx).await.with_context(|| {
        format!(
            "{} could not start on {}",
            gatherer.name(),
            session_file.path.display()
        )
    })?;

    Ok(PassReport {
        source: session_file.path.display().to_string(),
        page_url,
        artifact,
    })
}

/// Bracket one page load with the gatherer's pass hooks.
async fn run_pass(gatherer: &mut dyn Gatherer, ctx: &PassContext<'_>) -> Result<Artifact> {
    gatherer.before_pass(ctx).await?;
    Ok(gatherer.after_pass(ctx).await)
}

/// Handle --dry-run: list the discovered sessions and exit.
fn handle_dry_run(sessions: &[SessionFile]) -> i32 {
    if sessions.is_empty() {
        println!("No session files found.");
    } else {
        println!("Found {} sessions that would be replayed:\n", sessions.len());
        for session in sessions {
            println!("  {} ({} bytes)", session.path.display(), session.size);
        }
    }

    0
}

/// Load configuration from file or use defaults. Runs before logging is
/// set up, so it returns the path the configuration came from.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, Some(config_path.clone())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, Some(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => {
            eprintln!("Warning: failed to load config: {:#}", e);
            Ok((Config::default(), None))
        }
    }
}

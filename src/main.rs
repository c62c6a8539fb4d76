//! cursor-fingerprint CLI
//!
//! Mouse-dynamics fingerprint extraction from per-session cursor logs.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use cursor_fingerprint::{
    batch::{run_batch, BatchOptions},
    config::Config,
    core::{aggregate::format_value, analyze_session, FEATURE_COLUMNS},
    input::{discover_sessions, read_session_file, SessionKey},
    ledger::{create_shared_log_with_persistence, load_totals},
    sink::{collect_user_scores, FingerprintSink, ScoreFileSink},
    VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cursor-fingerprint")]
#[command(version = VERSION)]
#[command(about = "Mouse-dynamics fingerprints from cursor telemetry", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint every session found under the input directory
    Process {
        /// Root directory containing user<ID>/ session folders
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Directory for score files
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Worker threads (0 = one per CPU)
        #[arg(long)]
        workers: Option<usize>,

        /// Append the user id as a trailing column
        #[arg(long)]
        with_user_id: bool,
    },

    /// Fingerprint a single session log and show its movements
    Session {
        /// Session log file
        file: PathBuf,

        /// Owner of the session
        #[arg(long)]
        user_id: u32,

        /// Directory for score files
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print results without writing score rows
        #[arg(long)]
        dry_run: bool,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export per-user score files as tagged fingerprints
    Export {
        /// Output file (defaults to the score directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Show configuration and cumulative run statistics
    Status,

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Process {
            input,
            output,
            workers,
            with_user_id,
        } => cmd_process(input, output, workers, with_user_id),
        Commands::Session {
            file,
            user_id,
            output,
            dry_run,
            json,
        } => cmd_session(file, user_id, output, dry_run, json),
        Commands::Export { output, format } => cmd_export(output, &format),
        Commands::Status => cmd_status(),
        Commands::Config { save } => cmd_config(save),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config() -> anyhow::Result<Config> {
    Config::load().with_context(|| format!("could not load {:?}", Config::config_path()))
}

fn cmd_process(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    workers: Option<usize>,
    with_user_id: bool,
) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if let Some(input) = input {
        config.input_dir = input;
    }
    if let Some(output) = output {
        config.score_dir = output;
    }
    if let Some(workers) = workers {
        config.workers = workers;
    }
    config.emit_user_id |= with_user_id;
    config.ensure_directories()?;

    let sessions = discover_sessions(&config.input_dir)
        .with_context(|| format!("could not read input directory {:?}", config.input_dir))?;
    if sessions.is_empty() {
        println!("No sessions found in {:?}", config.input_dir);
        println!("Expected layout: <input>/user<ID>/<session files>");
        return Ok(());
    }

    let workers = config.effective_workers();
    println!("cursor-fingerprint v{VERSION}");
    println!();
    println!("  Input: {:?}", config.input_dir);
    println!("  Scores: {:?}", config.score_dir);
    println!("  Sessions: {}", sessions.len());
    println!("  Workers: {workers}");
    println!();

    let run_log = create_shared_log_with_persistence(config.run_log_path());
    let sink = ScoreFileSink::new(
        config.score_dir.clone(),
        config.global_score_file.clone(),
        config.emit_user_id,
    );
    let options = BatchOptions::new(workers);
    ctrlc_handler(Arc::clone(&options.running))?;

    let report = run_batch(sessions, &sink, &run_log, &options);

    for (key, fingerprint) in &report.succeeded {
        println!(
            "Session {key} processed ({} movements) -> {:?}",
            fingerprint.movement_count,
            sink.user_path(key)
        );
    }
    for failure in &report.failed {
        eprintln!("Session failed: {failure}");
    }
    if report.skipped > 0 {
        println!("Stopped early: {} session(s) not processed", report.skipped);
    }

    if let Err(e) = run_log.save() {
        eprintln!("Warning: Could not save run log: {e}");
    }

    println!();
    println!(
        "Processed {} of {} session(s), {} failed",
        report.succeeded.len(),
        report.total(),
        report.failed.len()
    );
    println!("Global scores: {:?}", sink.global_path());
    println!();
    println!("{}", run_log.summary());
    Ok(())
}

fn cmd_session(
    file: PathBuf,
    user_id: u32,
    output: Option<PathBuf>,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if let Some(output) = output {
        config.score_dir = output;
    }

    let samples = read_session_file(&file).with_context(|| format!("malformed session {file:?}"))?;
    let analysis = analyze_session(user_id, &samples);

    let session_id = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("session")
        .to_string();
    let key = SessionKey::new(user_id, session_id);

    let fingerprint = analysis
        .fingerprint()
        .with_context(|| format!("session {key}"))?;

    if json {
        let document = serde_json::json!({
            "session": key,
            "analysis": analysis,
            "fingerprint": fingerprint,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        println!("Session {key}: {} samples, {} move runs", analysis.sample_count, analysis.run_count);
        println!();
        println!("{}", FEATURE_COLUMNS.join(","));
        for movement in &analysis.movements {
            let row: Vec<String> = movement.values().iter().map(|&v| format_value(v)).collect();
            println!("{}", row.join(","));
        }
        println!();
        println!("Fingerprint ({} movements):", fingerprint.movement_count);
        println!("{}", fingerprint.to_line(config.emit_user_id));
    }

    if dry_run {
        return Ok(());
    }

    let sink = ScoreFileSink::new(
        config.score_dir.clone(),
        config.global_score_file.clone(),
        config.emit_user_id,
    );
    sink.append(&key, &fingerprint)?;
    println!();
    println!("Session {key} written to:");
    println!("  -> {:?}", sink.user_path(&key));
    println!("  -> {:?}", sink.global_path());
    Ok(())
}

fn cmd_export(output: Option<PathBuf>, format: &str) -> anyhow::Result<()> {
    let config = load_config()?;

    let fingerprints = collect_user_scores(&config.score_dir)
        .with_context(|| format!("could not read scores in {:?}", config.score_dir))?;
    if fingerprints.is_empty() {
        println!("No score files found in {:?}", config.score_dir);
        println!("Run 'cursor-fingerprint process' to generate them.");
        return Ok(());
    }

    let extension = if format == "jsonl" { "jsonl" } else { "json" };
    let output_path = output.unwrap_or_else(|| {
        config.score_dir.join(format!(
            "export_{}.{extension}",
            Utc::now().format("%Y%m%d_%H%M%S")
        ))
    });

    let content = if format == "jsonl" {
        let lines = fingerprints
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        lines.join("\n")
    } else {
        serde_json::to_string_pretty(&fingerprints)?
    };

    std::fs::write(&output_path, content)
        .with_context(|| format!("could not write {output_path:?}"))?;
    println!(
        "Exported {} fingerprints to {output_path:?}",
        fingerprints.len()
    );
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = load_config()?;

    println!("cursor-fingerprint Status");
    println!("=========================");
    println!();
    println!("Configuration:");
    println!("  Input directory: {:?}", config.input_dir);
    println!("  Score directory: {:?}", config.score_dir);
    println!("  Global score file: {}", config.global_score_file);
    println!("  Workers: {}", config.effective_workers());
    println!("  User id column: {}", config.emit_user_id);
    println!();

    let totals_path = config.run_log_path();
    if !totals_path.exists() {
        println!("No previous runs found.");
        return Ok(());
    }

    match load_totals(&totals_path) {
        Ok(totals) => {
            println!("Cumulative Statistics:");
            println!("  Sessions processed: {}", totals.sessions_processed);
            println!("  Sessions failed: {}", totals.sessions_failed);
            println!("  Samples read: {}", totals.samples_read);
            println!("  Movements extracted: {}", totals.movements_extracted);
            println!("  Short runs discarded: {}", totals.short_runs_discarded);
            println!("  Rows written: {}", totals.rows_written);
            println!(
                "  Last run: {} at {}",
                totals.last_run_id,
                totals.last_updated.format("%Y-%m-%d %H:%M:%S")
            );
        }
        Err(e) => eprintln!("Warning: Could not read run log {totals_path:?}: {e}"),
    }
    Ok(())
}

fn cmd_config(save: bool) -> anyhow::Result<()> {
    let config = load_config()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    if save {
        config.save()?;
        println!();
        println!("Saved to {:?}", Config::config_path());
    }
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("could not set Ctrl+C handler")
}

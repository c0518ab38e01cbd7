//! Change-detection session processing.
//!
//! ```bash
//! # classify behavior and build response tables for a batch of sessions
//! chgdet process sessions/*.json --out results/
//!
//! # running speed only, with the smoothing-parameter search
//! chgdet running sessions/123.json --optimize
//!
//! # synthetic session
//! chgdet simulate --seed 4 --trials 80 --out sim.json
//! ```

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chgdet_encoder::{optimize_knot_factor, process_encoder, smoothed_running};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod pipeline;
mod simulate;

use config::PipelineConfig;
use simulate::{simulate, SimulationConfig};

#[derive(Parser, Debug)]
#[command(name = "chgdet")]
#[command(author, version, about = "Change-detection behavior and response analysis", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline on every session file
    Process {
        #[arg(required = true)]
        sessions: Vec<PathBuf>,

        /// Pipeline configuration (JSON); missing fields keep their defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory the per-session result files are written to
        #[arg(short, long, default_value = "results")]
        out: PathBuf,

        /// Memoize response tables across the batch
        #[arg(long)]
        cache: bool,
    },

    /// Unwrap the running wheel encoder of one session
    Running {
        session: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Score every knot divisor and smooth with the best one
        #[arg(long)]
        optimize: bool,

        /// Output file; stdout when absent
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write a synthetic session
    Simulate {
        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(long, default_value = "60")]
        trials: usize,

        #[arg(long, default_value = "4")]
        cells: usize,

        #[arg(short, long)]
        out: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path),
        None => Ok(PipelineConfig::default()),
    }
}

fn write_json<T: serde::Serialize>(value: &T, out: Option<&PathBuf>) -> Result<()> {
    match out {
        Some(path) => {
            let file =
                fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
            serde_json::to_writer(std::io::BufWriter::new(file), value)?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer(&mut stdout, value)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Process {
            sessions,
            config,
            out,
            cache,
        } => {
            let config = load_config(config.as_ref())?;
            let summary = pipeline::run_batch(&sessions, &config, &out, cache)?;
            info!(
                written = summary.written.len(),
                failed = summary.failed.len(),
                "batch finished"
            );
            if summary.written.is_empty() {
                bail!("no session could be processed");
            }
        }
        Commands::Running {
            session,
            config,
            optimize,
            out,
        } => {
            let config = load_config(config.as_ref())?;
            let record = pipeline::load_session(&session)?;
            if record.encoder.is_empty() {
                bail!("session {} has no encoder samples", record.session_id);
            }
            if optimize {
                let search = optimize_knot_factor(&record.encoder, &config.encoder)?;
                let best = search.best().knot_factor;
                info!(knot_factor = best, score = search.best().score, "best smoothing");
                let running = smoothed_running(&record.encoder, &config.encoder, best)?;
                write_json(&json!({"search": search, "running": running}), out.as_ref())?;
            } else {
                let running = process_encoder(&record.encoder, &config.encoder)?;
                write_json(&running, out.as_ref())?;
            }
        }
        Commands::Simulate {
            seed,
            trials,
            cells,
            out,
        } => {
            let record = simulate(&SimulationConfig {
                seed,
                trials,
                cells,
                ..Default::default()
            })?;
            write_json(&record, Some(&out))?;
            info!(path = %out.display(), "session written");
        }
    }

    Ok(())
}

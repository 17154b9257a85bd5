use anyhow::{Context, Result};
use billiard_wave_modeller::config::Config;
use billiard_wave_modeller::diagnostics::{DiagnosticsSink, NullSink, WriterLog};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "billiard-wave-modeller")]
#[command(about = "Wave and Schrödinger fields on billiard-shaped domains")]
struct Args {
    /// TOML configuration (defaults to the built-in ellipse demo)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the number of ticks to run
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Append per-tick aggregates and probe samples to this file
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Log every tick
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => {
            info!("No config given, running the built-in ellipse demo");
            Config::demo()?
        }
    };
    if let Some(ticks) = args.ticks {
        config.run.ticks = ticks;
    }
    config.print_summary();

    let mut sim = config.build()?;

    let mut writer = match &args.log {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file '{}'", path.display()))?;
            Some(WriterLog::new(BufWriter::new(file)))
        }
        None => None,
    };
    let mut null = NullSink;
    let sink: &mut dyn DiagnosticsSink = match writer.as_mut() {
        Some(log) => log,
        None => &mut null,
    };

    let last = sim
        .run(config.run.ticks, config.run.report_period, sink)
        .context("Failed to write diagnostics log")?;

    if let Some(log) = writer {
        log.into_inner()
            .flush()
            .context("Failed to flush diagnostics log")?;
    }
    if let Some(frame) = last {
        info!(
            "Final tick {}: aggregate={:.6e}, scale={:.4}",
            frame.tick, frame.aggregate, frame.scale
        );
    }

    Ok(())
}

//! Constellation link-metrics collector
//!
//! Usage:
//!   constellation-sim --constellation 550:53:1584/72/1 --mode isl-timeseries \
//!                     --stations stations.txt --periods 2 --split-periods --csv --summary

use anyhow::{Context, Result};
use clap::Parser;
use constellation_sim::{output, SimConfig, SimulationContext};
use metrics_export::ExportMode;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "constellation-sim",
    about = "Collect satellite contact, ISL and ground link metrics for network emulation"
)]
struct Args {
    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Walker Delta descriptor `alt:inc:T/P/F`
    #[arg(short = 'w', long)]
    constellation: Option<String>,

    /// Ground station list, one `name lat lon` per line
    #[arg(short, long)]
    stations: Option<PathBuf>,

    /// contacts | isl-average | isl-timeseries
    #[arg(short, long)]
    mode: Option<ExportMode>,

    /// Orbital periods to collect
    #[arg(short, long)]
    periods: Option<u32>,

    /// Sampling interval in simulated seconds
    #[arg(short, long)]
    interval: Option<f64>,

    /// Simulated seconds per wall-clock second
    #[arg(long)]
    speed: Option<f64>,

    /// Wall-clock seconds per tick
    #[arg(long)]
    tick: Option<f64>,

    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write the CSV table
    #[arg(long)]
    csv: bool,

    /// Also write the text summary
    #[arg(long)]
    summary: bool,

    /// Write one document per orbital period (isl-timeseries only)
    #[arg(long)]
    split_periods: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::load(path)?,
            None => SimConfig::default(),
        };

        if let Some(constellation) = self.constellation {
            config.constellation = constellation;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(periods) = self.periods {
            config.num_periods = periods;
        }
        if let Some(interval) = self.interval {
            config.sampling_interval_s = interval;
        }
        if let Some(speed) = self.speed {
            config.speed_factor = speed;
        }
        if let Some(tick) = self.tick {
            config.tick_s = tick;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if self.stations.is_some() {
            config.stations_file = self.stations;
        }
        config.write_csv |= self.csv;
        config.write_summary |= self.summary;
        config.split_periods |= self.split_periods;

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "constellation_sim=debug,info"
    } else {
        "constellation_sim=info,warn"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("{}", "=".repeat(60));
    info!("Constellation Link Metrics");
    info!("{}", "=".repeat(60));

    let config = args.into_config()?;
    let mut ctx = SimulationContext::new(config)?;

    if let Some(path) = ctx.config().stations_file.clone() {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading ground stations from {:?}", path))?;
        let report = ctx.import_stations(&text);
        for issue in &report.issues {
            warn!("   line {}: {}", issue.line, issue.error);
        }
    }

    let samples = ctx.run_headless()?;
    info!("   {} samples over {:.1} s simulated", samples, ctx.sim_time());

    let written = output::write_all(&ctx, chrono::Utc::now())?;

    info!("{}", "=".repeat(60));
    info!("EXPORT COMPLETE");
    info!("{}", "=".repeat(60));
    for path in written.all() {
        info!("   {}", path.display());
    }

    if ctx.config().write_summary {
        println!("{}", ctx.summary());
    }
    Ok(())
}

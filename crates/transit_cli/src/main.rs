//! Transit simulation runner.
//!
//! Loads a scenario (or the built-in demo network), runs the driver for a
//! number of ticks, and writes every event as one JSON object per line on
//! stdout. Ctrl-C requests a cooperative stop; the current tick finishes
//! and its batch is delivered before the run ends.

use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bevy_ecs::prelude::World;
use clap::Parser;
use tracing::info;

use transit_core::events::TickBatch;
use transit_core::runner::{run, simulation_schedule};
use transit_core::scenario::{build_scenario, ScenarioParams};
use transit_core::sink::{EventSink, SinkError};

#[derive(Debug, Parser)]
#[command(
    name = "transit_cli",
    about = "Simulates a transit network and emits its event stream as JSON lines"
)]
struct Args {
    /// Scenario file (JSON). Uses the built-in demo network when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 3600)]
    ticks: u64,

    /// Overrides the scenario's seed.
    #[arg(long)]
    seed: Option<u64>,
}

/// Event sink that writes one JSON object per event. Write failures on a
/// local pipe are not worth retrying.
struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn accept(&mut self, batch: &TickBatch) -> Result<(), SinkError> {
        for event in &batch.events {
            serde_json::to_writer(&mut self.out, event)
                .map_err(|e| SinkError::Permanent(e.to_string()))?;
            self.out
                .write_all(b"\n")
                .map_err(|e| SinkError::Permanent(e.to_string()))?;
        }
        self.out
            .flush()
            .map_err(|e| SinkError::Permanent(e.to_string()))
    }
}

fn load_params(args: &Args) -> Result<ScenarioParams, Box<dyn Error>> {
    let mut params = match &args.config {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => ScenarioParams::demo(),
    };
    if let Some(seed) = args.seed {
        params.seed = Some(seed);
    }
    Ok(params)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let params = load_params(&args)?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed))?;

    let mut world = World::new();
    build_scenario(&mut world, params)?;
    let mut schedule = simulation_schedule();
    let mut sink = JsonLinesSink {
        out: BufWriter::new(io::stdout().lock()),
    };

    let delivered = run(&mut world, &mut schedule, &mut sink, args.ticks, &stop)?;
    info!(ticks = delivered, "simulation finished");
    Ok(())
}

//! LBT Simulator CLI
//!
//! Compute LoRa airtime, run TOML scenarios, and sweep spreading factors
//! against node counts.
//!
//! # Example
//!
//! ```bash
//! # Airtime of a full SF9 packet
//! lbt-sim airtime --sf 9 --payload 255
//!
//! # Run a scenario with a different seed and print JSON
//! lbt-sim run cli/scenarios/two_channels.toml --seed 42 --json
//!
//! # 10/20/40 nodes on two channels, SF7 to SF12
//! lbt-sim sweep --sf 7,8,9,10,11,12 --nodes 10,20,40 --channels 2
//! ```

mod scenario;
mod stats;
mod sweep;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use lbt_simulator_core_rs::models::LbtParams;
use lbt_simulator_core_rs::orchestrator::{RunReport, Simulation};
use lbt_simulator_core_rs::phy::{
    Bandwidth, CodingRate, LoraModulation, PacketShape, SpreadingFactor,
};
use lbt_simulator_core_rs::Tick;
use log::{info, warn, LevelFilter};
use serde::Serialize;

use crate::scenario::{RadioSection, Scenario, DEFAULT_PERIOD_TICKS, DEFAULT_TICKS_PER_SECOND};
use crate::stats::{percent, Summary};
use crate::sweep::SweepPlan;

/// Listen-Before-Talk contention simulator
#[derive(Parser, Debug)]
#[command(name = "lbt-sim")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the time on air of one packet
    Airtime(AirtimeArgs),
    /// Run a TOML scenario
    Run(RunArgs),
    /// Sweep spreading factors against node counts
    Sweep(SweepArgs),
}

#[derive(Args, Debug, Clone)]
struct RadioArgs {
    /// Channel bandwidth, e.g. 125KHz or 250000
    #[arg(long, default_value = "125KHz")]
    bandwidth: Bandwidth,

    /// Coding rate
    #[arg(long, default_value = "4/5")]
    cr: CodingRate,

    /// Preamble length in symbols
    #[arg(long, default_value = "8")]
    preamble: u16,

    /// Implicit header mode (no PHY header on air)
    #[arg(long)]
    implicit_header: bool,

    /// Payload length in bytes
    #[arg(long, default_value = "255")]
    payload: usize,

    /// CRC length in bytes
    #[arg(long, default_value = "2")]
    crc: u8,

    /// Low data rate optimization
    #[arg(long)]
    ldro: bool,
}

impl RadioArgs {
    fn packet(&self) -> Result<PacketShape> {
        Ok(PacketShape::new(self.payload)?
            .with_preamble_symbols(self.preamble)
            .with_implicit_header(self.implicit_header)
            .with_crc_bytes(self.crc)?
            .with_low_data_rate_optimization(self.ldro))
    }

    fn radio(&self, spreading_factor: SpreadingFactor) -> Result<RadioSection> {
        let modulation = LoraModulation::from_parts(self.bandwidth, spreading_factor, self.cr);
        Ok(RadioSection::new(modulation, self.packet()?))
    }
}

#[derive(Args, Debug)]
struct AirtimeArgs {
    /// Spreading factor (6-12)
    #[arg(long, default_value = "7", value_parser = parse_spreading_factor)]
    sf: SpreadingFactor,

    #[command(flatten)]
    radio: RadioArgs,

    /// Tick resolution used for the tick count
    #[arg(long, default_value_t = DEFAULT_TICKS_PER_SECOND)]
    ticks_per_second: f64,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario file
    scenario: PathBuf,

    /// Override the scenario's seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Spreading factors to sweep
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "7,8,9,10,11,12",
        value_parser = parse_spreading_factor
    )]
    sf: Vec<SpreadingFactor>,

    /// Total node counts to sweep
    #[arg(long, value_delimiter = ',', default_value = "10,20,40")]
    nodes: Vec<u32>,

    /// Channels the nodes are split across
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..))]
    channels: u32,

    /// Transmission period of every node, in ticks
    #[arg(long, default_value_t = DEFAULT_PERIOD_TICKS)]
    period: Tick,

    /// Ticks per run
    #[arg(long, default_value = "600000")]
    budget: Tick,

    /// Busy observations per cycle before giving up
    #[arg(long, default_value = "5")]
    retry_limit: u32,

    /// Runs per point, seeded consecutively from --seed
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    runs: u32,

    #[arg(long, default_value = "12345")]
    seed: u64,

    #[command(flatten)]
    radio: RadioArgs,

    /// Print the results as JSON
    #[arg(long)]
    json: bool,
}

fn parse_spreading_factor(value: &str) -> Result<SpreadingFactor, String> {
    let raw: u8 = value
        .trim()
        .trim_start_matches("SF")
        .parse()
        .map_err(|e| format!("{}: {}", value, e))?;
    SpreadingFactor::new(raw).map_err(|e| e.to_string())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Airtime(args) => airtime(&args),
        Command::Run(args) => run(&args),
        Command::Sweep(args) => sweep(&args),
    }
}

fn airtime(args: &AirtimeArgs) -> Result<()> {
    let radio = args.radio.radio(args.sf)?;
    let modulation = radio.modulation();

    if modulation.recommends_ldro() && !radio.packet.low_data_rate_optimization() {
        warn!(
            "{} has symbols of {:.3} s; LDRO is recommended",
            modulation,
            modulation.symbol_time()
        );
    }

    let seconds = modulation.time_on_air(&radio.packet);
    println!("{}, {} byte payload", modulation, radio.packet.payload_bytes());
    println!("  symbol time:     {:.6} s", modulation.symbol_time());
    println!("  preamble time:   {:.6} s", modulation.preamble_time(&radio.packet));
    println!("  payload symbols: {}", modulation.payload_symbols(&radio.packet));
    println!("  time on air:     {:.6} s", seconds);
    println!("  ticks:           {}", radio.occupy_ticks(args.ticks_per_second));
    Ok(())
}

#[derive(Serialize)]
struct RunOutput<'a> {
    occupy_ticks: Tick,
    summary: &'a Summary,
    report: &'a RunReport,
}

fn run(args: &RunArgs) -> Result<()> {
    let mut scenario = Scenario::load(&args.scenario)?;
    if let Some(seed) = args.seed {
        scenario.seed = seed;
    }

    let occupy_ticks = scenario.occupy_ticks();
    info!(
        "{}: {} ticks per transmission, seed {}",
        scenario.radio.modulation(),
        occupy_ticks,
        scenario.seed
    );

    let mut simulation = Simulation::new(scenario.to_config()?)
        .with_context(|| format!("cannot build simulation from {}", args.scenario.display()))?;
    let report = simulation.run();
    let summary = Summary::from_report(&report);

    if args.json {
        let output = RunOutput {
            occupy_ticks,
            summary: &summary,
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{:<12} {:>8} {:>10} {:>10} {:>10} {:>8}",
        "channel", "node", "successes", "hard fails", "suspends", "cycles"
    );
    for node in &report.nodes {
        println!(
            "{:<12} {:>8} {:>10} {:>10} {:>10} {:>8}",
            node.channel_label,
            node.id.0,
            node.counters.successes,
            node.counters.hard_fails,
            node.counters.suspends,
            node.counters.cycles
        );
    }
    println!();
    println!("ticks elapsed:        {}", report.ticks_elapsed);
    println!("occupy ticks:         {}", occupy_ticks);
    println!("mean success rate:    {}", percent(summary.mean_success_rate));
    println!("mean hard-fail rate:  {}", percent(summary.mean_hard_fail_rate));
    Ok(())
}

fn sweep(args: &SweepArgs) -> Result<()> {
    let plan = SweepPlan {
        radio: args.radio.radio(SpreadingFactor::SF7)?,
        spreading_factors: args.sf.clone(),
        node_counts: args.nodes.clone(),
        channels: args.channels,
        period_ticks: args.period,
        tick_budget: args.budget,
        lbt: LbtParams {
            retry_limit: args.retry_limit,
            ..Default::default()
        },
        seed: args.seed,
        runs: args.runs,
    };

    let points = plan.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    println!(
        "{:<6} {:>6} {:>8} {:>10} {:>10}",
        "sf", "nodes", "airtime", "success", "hard fail"
    );
    for point in &points {
        println!(
            "{:<6} {:>6} {:>8} {:>10} {:>10}",
            format!("SF{}", point.spreading_factor),
            point.nodes,
            point.occupy_ticks,
            percent(point.summary.mean_success_rate),
            percent(point.summary.mean_hard_fail_rate)
        );
    }
    Ok(())
}

//! romsearch: enumerate the devices on a simulated 1-Wire style bus
//!
//! # Usage
//!
//! ```bash
//! # Random population of up to 8 devices with 8-bit ids
//! romsearch
//!
//! # Reproducible population, 16-bit ids, bus tracing on
//! romsearch -b 16 -m 20 --seed 7 --trace
//!
//! # Ids from a population file, results as JSON
//! romsearch devices.txt --json
//! ```

mod report;
mod source;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rom_protocol::{MAX_ROM_BITS, MIN_ROM_BITS};
use rom_search::{SearchConfig, SearchEngine};
use rom_sim::{run_bus_task, BusSimulator, BusTaskCommand};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use report::SearchReport;
use source::PopulationSource;

/// Exit status after Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

/// ROM search over a simulated device bus
#[derive(Parser, Debug)]
#[command(name = "romsearch")]
#[command(about = "Discover every device id on a simulated wired-AND bus")]
#[command(version)]
struct Args {
    /// Population file (otherwise ids are generated randomly)
    file: Option<PathBuf>,

    /// Number of bits in each id
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(i64::from(MIN_ROM_BITS)..=i64::from(MAX_ROM_BITS)))]
    bitsize: Option<u8>,

    /// Maximum number of randomly generated devices
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    max_devices: Option<u64>,

    /// Seed for a reproducible random population
    #[arg(short, long)]
    seed: Option<u64>,

    /// Ask the bus to trace every slot
    #[arg(short = 'v', long = "trace")]
    trace: bool,

    /// Print the results as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&args.log_level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Same level for the binary and every library crate
fn default_filter(level: &str) -> String {
    ["romsearch", "rom_protocol", "rom_sim", "rom_search"]
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let source = PopulationSource::select(
        args.file,
        args.bitsize,
        args.max_devices.map(|m| m as usize),
        args.seed,
    );
    let config = source
        .resolve()
        .context("failed to build the device population")?;
    let bus = BusSimulator::from_config(&config).context("invalid device population")?;

    info!(
        "Searching {} devices with {}-bit ids",
        config.devices.len(),
        config.width
    );

    let (engine_io, bus_io) = tokio::io::duplex(64);
    let (bus_tx, bus_rx) = mpsc::channel(8);
    let bus_task = tokio::spawn(run_bus_task(bus_io, bus, bus_rx));

    let mut engine = SearchEngine::with_config(
        engine_io,
        SearchConfig {
            request_trace: args.trace,
            ..Default::default()
        },
    );

    let outcome = tokio::select! {
        result = engine.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let Some(result) = outcome else {
        warn!("Interrupted, asking the bus to quit");
        stop_bus(&mut engine, &bus_tx, bus_task).await;
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    };

    let frontier = result.context("search failed")?;
    let bus = bus_task
        .await
        .context("bus task panicked")?
        .context("bus task failed")?;
    info!("Bus answered {} read slots", bus.read_slots());

    let report = SearchReport::new(&frontier, engine.stats());
    if report.devices.len() != config.devices.len() {
        warn!(
            "Found {} of {} devices",
            report.devices.len(),
            config.devices.len()
        );
    }

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        for line in report.lines() {
            println!("{}", line);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Stop the bus after the search was cut short
///
/// The engine sends `Q` first; the control channel is only used when that
/// fails. Returns the simulator if its task ended cleanly.
async fn stop_bus<T>(
    engine: &mut SearchEngine<T>,
    bus_tx: &mpsc::Sender<BusTaskCommand>,
    bus_task: JoinHandle<io::Result<BusSimulator>>,
) -> Option<BusSimulator>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = engine.quit().await {
        warn!("Failed to send quit to bus ({}), shutting it down directly", e);
        if bus_tx.send(BusTaskCommand::Shutdown).await.is_err() {
            warn!("Bus task already stopped");
        }
    }

    match bus_task.await {
        Ok(Ok(bus)) => {
            info!("Bus stopped after {} read slots", bus.read_slots());
            Some(bus)
        }
        Ok(Err(e)) => {
            warn!("Bus task failed: {}", e);
            None
        }
        Err(e) => {
            warn!("Bus task panicked: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_options() {
        let args =
            Args::try_parse_from(["romsearch", "-b", "16", "-m", "3", "-s", "9", "-v"]).unwrap();
        assert_eq!(args.bitsize, Some(16));
        assert_eq!(args.max_devices, Some(3));
        assert_eq!(args.seed, Some(9));
        assert!(args.trace);
        assert!(!args.json);
        assert!(args.file.is_none());
    }

    #[test]
    fn test_bitsize_range() {
        assert!(Args::try_parse_from(["romsearch", "-b", "1"]).is_err());
        assert!(Args::try_parse_from(["romsearch", "-b", "65"]).is_err());
        assert!(Args::try_parse_from(["romsearch", "-b", "64"]).is_ok());
        assert!(Args::try_parse_from(["romsearch", "-m", "0"]).is_err());
    }

    #[tokio::test]
    async fn test_stop_bus_sends_quit() {
        let bus = BusSimulator::new(4, &[3, 9]).unwrap();
        let (engine_io, bus_io) = tokio::io::duplex(64);
        let (bus_tx, bus_rx) = mpsc::channel(8);
        let bus_task = tokio::spawn(run_bus_task(bus_io, bus, bus_rx));

        let mut engine = SearchEngine::new(engine_io);
        let bus = stop_bus(&mut engine, &bus_tx, bus_task).await.unwrap();
        assert_eq!(bus.read_slots(), 0);
    }

    #[tokio::test]
    async fn test_stop_bus_falls_back_to_shutdown() {
        let bus = BusSimulator::new(4, &[3, 9]).unwrap();
        let (engine_io, bus_io) = tokio::io::duplex(64);
        let (bus_tx, bus_rx) = mpsc::channel(8);
        let bus_task = tokio::spawn(run_bus_task(bus_io, bus, bus_rx));

        // the engine's end of the line is gone, so Q cannot be written
        let (dead_io, _) = tokio::io::duplex(64);
        let mut engine = SearchEngine::new(dead_io);
        assert!(stop_bus(&mut engine, &bus_tx, bus_task).await.is_some());
        drop(engine_io);
    }

    #[tokio::test]
    async fn test_stop_bus_reports_task_failure() {
        let (engine_io, _bus_io) = tokio::io::duplex(64);
        let (bus_tx, _bus_rx) = mpsc::channel(8);
        let bus_task =
            tokio::spawn(async { Err::<BusSimulator, _>(io::Error::other("line fault")) });

        let mut engine = SearchEngine::new(engine_io);
        assert!(stop_bus(&mut engine, &bus_tx, bus_task).await.is_none());
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter("debug"),
            "romsearch=debug,rom_protocol=debug,rom_sim=debug,rom_search=debug"
        );
    }
}

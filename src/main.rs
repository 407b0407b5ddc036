//! Simulator command line entry point

use anyhow::Context;
use clap::Parser;
use coldchain_simulator::logging::LoggingConfig;
use coldchain_simulator::network::NetworkBuilder;
use coldchain_simulator::shipment::{
    create_package, LabelCodec, LabelRequest, LabelResponse, PassthroughCodec,
};
use coldchain_simulator::store::MemoryGraph;
use coldchain_simulator::transit::{
    bootstrap_network, package_timeline, persist_package, TransitSimulator,
};
use coldchain_simulator::types::{CliArgs, Command, NetworkConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, Level};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let level = if args.debug {
        Level::DEBUG
    } else if args.verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    LoggingConfig::new()
        .with_level(level)
        .init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let mut config = NetworkConfig::from_file(&args.config)
        .with_context(|| format!("loading network definition {}", args.config))?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let model = NetworkBuilder::build(&config).context("building network model")?;
    info!(
        carriers = model.carriers.len(),
        products = model.thresholds.len(),
        "network model built"
    );

    match args.command {
        Command::Check => {
            for carrier in model.carriers.values() {
                let routes: usize = carrier.offices.values().map(|o| o.routes.len()).sum();
                println!(
                    "{}: {} offices, {} routes, hub {}",
                    carrier.name,
                    carrier.offices.len(),
                    routes,
                    carrier.hub().map(|h| h.iata.as_str()).unwrap_or("-")
                );
            }
            println!("network definition ok");
        }
        Command::Ship { request, timeline } => {
            let request = LabelRequest::from_file(&request)
                .with_context(|| format!("loading label request {}", request))?;

            let mut store = MemoryGraph::new();
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            bootstrap_network(&mut store, &model, &mut rng)
                .context("bootstrapping transit graph")?;

            let package = create_package(&model, &request, &mut rng)
                .context("creating shipping label")?;
            let label = PassthroughCodec
                .encode(&serde_json::to_vec(&package)?)
                .context("encoding label")?;
            let response = LabelResponse {
                uid: package.uid.clone(),
                carrier: package.carrier.clone(),
                estimated_pickup: package.estimated_pickup,
                estimated_delivery: package.estimated_delivery,
                label,
            };
            println!("{}", serde_json::to_string_pretty(&response)?);

            persist_package(&mut store, &package).context("persisting package")?;

            let mut simulator =
                TransitSimulator::new(model, store, config.monitor.clone(), config.seed);
            let report = simulator
                .pickup_package(&package.uid)
                .context("simulating package transit")?;
            println!(
                "package {} delivered; picked up {}, delivered {}, {} legs, {} measurements{}",
                report.package,
                report.pickup_time.to_rfc3339(),
                report.delivery_time.to_rfc3339(),
                report.containment_legs,
                report.measurements,
                if report.transferred { ", transferred between carriers" } else { "" }
            );

            if timeline {
                let history = package_timeline(simulator.store(), &package.uid)
                    .context("reconstructing timeline")?;
                for entry in &history.entries {
                    println!(
                        "{}  {:<12} {:<18} {}{}",
                        entry.time.to_rfc3339(),
                        entry.event.to_string(),
                        format!("{:?}", entry.state),
                        entry.location,
                        entry
                            .route
                            .as_deref()
                            .map(|r| format!(" (route {})", r))
                            .unwrap_or_default()
                    );
                }
                for violation in &history.violations {
                    println!(
                        "violation  {} .. {}  min {} max {} {}",
                        violation.start.to_rfc3339(),
                        violation.end.to_rfc3339(),
                        violation.min_value,
                        violation.max_value,
                        violation.uom
                    );
                }
            }
        }
    }
    Ok(())
}

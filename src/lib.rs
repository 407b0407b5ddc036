//! Cold-chain logistics transit simulator
//!
//! Builds a multi-carrier hub-and-spoke shipping network from a JSON
//! definition, persists it to a property-graph store, and simulates the
//! full transit lifecycle of packages: local pickup, flights through the
//! carrier hubs, inter-carrier custody transfer, and local delivery, with
//! randomized temperature-compliance monitoring of refrigerated containers.
//!
//! # Architecture
//!
//! - [`types`] — core enumerations and configuration
//! - [`network`] — carrier/office/route/container topology
//! - [`schedule`] — cross-timezone schedule calculations
//! - [`store`] — transactional property-graph persistence
//! - [`shipment`] — shipping-label intake and package creation
//! - [`transit`] — graph bootstrap and the transit state machine
//! - [`compliance`] — temperature measurement generation and audit sink
//!
//! # Example
//!
//! ```no_run
//! use coldchain_simulator::network::NetworkBuilder;
//! use coldchain_simulator::store::MemoryGraph;
//! use coldchain_simulator::transit::{bootstrap_network, TransitSimulator};
//! use coldchain_simulator::types::NetworkConfig;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NetworkConfig::from_file("network.json")?;
//! let model = NetworkBuilder::build(&config)?;
//! let mut store = MemoryGraph::new();
//! let mut rng = StdRng::seed_from_u64(7);
//! bootstrap_network(&mut store, &model, &mut rng)?;
//! let mut simulator =
//!     TransitSimulator::new(model, store, config.monitor.clone(), config.seed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]

pub mod compliance;
pub mod logging;
pub mod network;
pub mod schedule;
pub mod shipment;
pub mod store;
pub mod transit;
pub mod types;

pub use network::{NetworkBuilder, NetworkModel};
pub use store::MemoryGraph;
pub use transit::{bootstrap_network, persist_package, SimulationError, TransitSimulator};
pub use types::{CliArgs, Command, NetworkConfig};

//! Transit graph bootstrap and package lifecycle simulation

pub mod bootstrap;
pub mod error;
pub mod resolver;
pub mod simulator;
pub mod timeline;

pub use bootstrap::{bootstrap_network, persist_package};
pub use error::SimulationError;
pub use resolver::resolve_container;
pub use simulator::{DeliveryReport, TransitSimulator};
pub use timeline::{package_timeline, Timeline, TimelineEntry};

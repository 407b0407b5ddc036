//! Network topology model and builder

pub mod builder;
pub mod model;

pub use builder::NetworkBuilder;
pub use model::{Carrier, Container, NetworkModel, Office, Route, Threshold};

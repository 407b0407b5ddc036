//! Core types, enumerations, and configuration

pub mod config;
pub mod enums;

pub use config::{
    CarrierConfig, CliArgs, Command, ConfigError, ConfigValidationError, MonitorConfig,
    NetworkConfig, OfficeConfig, ThresholdConfig,
};
pub use enums::{ChildKind, ContainerKind, EventKind, RouteKind, TransitState};

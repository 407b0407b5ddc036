//! Temperature-compliance monitoring and audit notification

pub mod monitor;
pub mod notify;

pub use monitor::{
    container_measurements, ComplianceMonitor, LegSchedule, Measurement, LOOKAHEAD_DAYS,
};
pub use notify::{
    post_quietly, ComplianceSink, LoggingSink, NotifyError, PackageTransaction, TemperatureUpdate,
};

//! Compliance notification sink
//!
//! Custody and temperature events are posted to an external audit sink.
//! Posting is strictly fire-and-forget: a sink failure is logged and
//! swallowed, it never fails or blocks the simulation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised by a notification sink
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The sink rejected or failed to accept the event
    #[error("compliance sink rejected event: {0}")]
    Rejected(String),

    /// Payload serialization failed
    #[error("event payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A custody-change event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageTransaction {
    /// Tracking identifier of the package
    pub uid: String,
    /// Event type name from the monitoring configuration
    pub event_type: String,
    /// When the custody change occurred
    pub event_time: DateTime<Utc>,
    /// Latitude of the custody change
    pub latitude: f64,
    /// Longitude of the custody change
    pub longitude: f64,
    /// Carrier holding custody after the event
    pub carrier: String,
    /// Handling employee identifier
    pub employee_id: String,
}

/// A temperature-measurement event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureUpdate {
    /// Tracking identifier of the affected package
    pub uid: String,
    /// Monitored container identifier
    pub container: String,
    /// Monitored product
    pub product: String,
    /// Measurement period start
    pub period_start: DateTime<Utc>,
    /// Measurement period end
    pub period_end: DateTime<Utc>,
    /// Minimum observed value
    pub min_value: f64,
    /// Maximum observed value
    pub max_value: f64,
    /// Unit of measure
    pub uom: String,
    /// Whether the period violated the product threshold
    pub violated: bool,
}

/// External audit sink for compliance events
pub trait ComplianceSink {
    /// Post one event on behalf of `actor`
    fn post_event(
        &self,
        actor: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<u16, NotifyError>;
}

/// Default sink: events go to the process log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl ComplianceSink for LoggingSink {
    fn post_event(
        &self,
        actor: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<u16, NotifyError> {
        info!(actor, event_type, %payload, "compliance event");
        Ok(200)
    }
}

/// Post an event, logging and swallowing any failure
pub fn post_quietly<T: Serialize>(
    sink: &dyn ComplianceSink,
    actor: &str,
    event_type: &str,
    payload: &T,
) {
    let encoded = match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(err) => {
            warn!(actor, event_type, error = %err, "dropping unencodable compliance event");
            return;
        }
    };
    if let Err(err) = sink.post_event(actor, event_type, &encoded) {
        warn!(actor, event_type, error = %err, "compliance sink failed, event dropped");
    }
}

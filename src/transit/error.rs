//! Transit simulation errors
//!
//! Lookup failures are fatal for the current simulation step and are never
//! retried. Steps committed before a failure stay persisted; there is no
//! compensating rollback.

use crate::shipment::LabelError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors raised while simulating package transit
#[derive(Debug, Error)]
pub enum SimulationError {
    /// No office matched the lookup
    #[error("office '{iata}' not found for carrier '{carrier}'")]
    OfficeNotFound {
        /// Carrier searched
        carrier: String,
        /// IATA code or state requested
        iata: String,
    },

    /// Package is not in the graph
    #[error("package '{0}' not found")]
    PackageNotFound(String),

    /// Route is not in the graph
    #[error("route '{0}' not found")]
    RouteNotFound(String),

    /// Route has no usable depart/arrive occurrence pair
    #[error("route '{0}' has no usable occurrence")]
    OccurrenceNotFound(String),

    /// No container on the route accepts the product
    #[error("no container on route '{route}' accepts product '{product}'")]
    ContainerNotFound {
        /// Route searched
        route: String,
        /// Product requested
        product: String,
    },

    /// Monitored product has no persisted threshold
    #[error("no threshold registered for product '{0}'")]
    ThresholdNotFound(String),

    /// Persistence failure, aborts the in-progress leg
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Label intake failure
    #[error(transparent)]
    Label(#[from] LabelError),
}

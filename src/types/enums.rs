//! Core enumerations and their wire codes
//!
//! Routes, containers, and containment edges are persisted with one-letter
//! codes; the enums here are the typed side of those codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a scheduled route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteKind {
    /// Flight between a spoke office and its carrier's hub
    Air,
    /// Local truck route, a self-loop at one office
    Ground,
}

impl RouteKind {
    /// One-letter code used in persisted route attributes
    pub fn code(&self) -> &'static str {
        match self {
            RouteKind::Air => "A",
            RouteKind::Ground => "G",
        }
    }

    /// Parse a persisted route-type code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(RouteKind::Air),
            "G" => Some(RouteKind::Ground),
            _ => None,
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Nesting level of a shipping container
///
/// The hierarchy has a fixed depth: a Vehicle holds ULDs (air) or Freezers
/// (ground) directly, and a ULD holds exactly one Freezer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Top-level conveyance (aircraft or truck)
    Vehicle,
    /// Unit load device, air routes only
    Uld,
    /// Refrigerated container, may carry a monitored-product tag
    Freezer,
}

impl ContainerKind {
    /// One-letter code used in persisted container attributes
    pub fn code(&self) -> &'static str {
        match self {
            ContainerKind::Vehicle => "V",
            ContainerKind::Uld => "U",
            ContainerKind::Freezer => "F",
        }
    }

    /// Parse a persisted container-type code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "V" => Some(ContainerKind::Vehicle),
            "U" => Some(ContainerKind::Uld),
            "F" => Some(ContainerKind::Freezer),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of the child on a containment edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildKind {
    /// Nested container, bound to its parent for the life of the network
    Container,
    /// Package, contained only for one leg's transit window
    Package,
}

impl ChildKind {
    /// One-letter code on the persisted `contains` edge
    pub fn code(&self) -> &'static str {
        match self {
            ChildKind::Container => "C",
            ChildKind::Package => "P",
        }
    }
}

/// Transit lifecycle state of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitState {
    /// Shipping label printed, package not yet collected
    Created,
    /// Collected by the local truck route
    PickedUp,
    /// Arrived at the origin carrier's hub
    AtOriginHub,
    /// Custody handed to the destination carrier (inter-carrier only)
    Transferred,
    /// Arrived at the destination carrier's hub-side spoke
    AtDestinationHub,
    /// Delivered to the recipient, terminal
    Delivered,
}

/// Event kinds appearing on a package's transit timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// Local pickup at the sender address
    Pickup,
    /// Departure of a scheduled leg
    Depart,
    /// Arrival of a scheduled leg
    Arrive,
    /// Custody handoff from the origin carrier
    Transfer,
    /// Custody acknowledgment by the destination carrier
    TransferAck,
    /// Local delivery at the recipient address
    Deliver,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Pickup => "pickup",
            EventKind::Depart => "depart",
            EventKind::Arrive => "arrive",
            EventKind::Transfer => "transfer",
            EventKind::TransferAck => "transferAck",
            EventKind::Deliver => "deliver",
        };
        f.write_str(name)
    }
}

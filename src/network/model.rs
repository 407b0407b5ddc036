//! In-memory network model
//!
//! The carrier/office/route/container topology, built once at bootstrap and
//! immutable afterwards. One explicit value passed by reference into every
//! component; there are no process-wide registries.

use crate::types::{ContainerKind, RouteKind};
use std::collections::BTreeMap;

/// Environmental tolerance band for a monitored product
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    /// Product name
    pub product: String,
    /// Handling code of the item type (`P` perishable, `D` dry ice)
    pub item_type: String,
    /// Minimum tolerated value
    pub min_value: f64,
    /// Maximum tolerated value
    pub max_value: f64,
    /// Unit of measure
    pub uom: String,
}

/// A shipping container, possibly nesting others
///
/// Fixed depth in practice: a Vehicle holds ULDs (air) or Freezers (ground),
/// a ULD holds exactly one Freezer. Only Freezers carry a `monitor` tag.
#[derive(Debug, Clone)]
pub struct Container {
    /// Unique container identifier
    pub uid: String,
    /// Nesting level
    pub kind: ContainerKind,
    /// Monitored-product tag, Freezers only
    pub monitor: Option<String>,
    /// Owned child containers
    pub children: Vec<Container>,
}

impl Container {
    /// Depth-first search for the Freezer tagged with `product`
    pub fn find_monitored(&self, product: &str) -> Option<&Container> {
        if self.kind == ContainerKind::Freezer && self.monitor.as_deref() == Some(product) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_monitored(product))
    }
}

/// A scheduled route between two offices
#[derive(Debug, Clone)]
pub struct Route {
    /// Unique route number, `{carrier}{seq:03}`
    pub number: String,
    /// Air or Ground
    pub kind: RouteKind,
    /// Scheduled local departure, `HH:MM` at the origin office
    pub depart_local: String,
    /// Scheduled local arrival, `HH:MM` at the destination office
    pub arrival_local: String,
    /// Origin office IATA code
    pub from_iata: String,
    /// Destination office IATA code
    pub to_iata: String,
    /// Owned vehicle hierarchy; `None` for return legs sharing a vehicle
    pub vehicle: Option<Container>,
    /// Route number owning the physical vehicle (may be this route)
    pub vehicle_route: String,
}

/// A carrier office
#[derive(Debug, Clone)]
pub struct Office {
    /// IATA code
    pub iata: String,
    /// Whether this is the carrier's hub
    pub is_hub: bool,
    /// Owning carrier name
    pub carrier: String,
    /// State or province token from the description
    pub state: String,
    /// Human-readable location
    pub description: String,
    /// GMT offset, `±HH:MM` with an explicit sign
    pub gmt_offset: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Routes departing this office
    pub routes: Vec<Route>,
}

impl Office {
    /// The office's Ground self-loop route
    pub fn ground_route(&self) -> Option<&Route> {
        self.routes.iter().find(|r| r.kind == RouteKind::Ground)
    }

    /// The Air route from this office to `to_iata`
    pub fn air_route_to(&self, to_iata: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.kind == RouteKind::Air && r.to_iata == to_iata)
    }
}

/// A carrier with its offices
#[derive(Debug, Clone)]
pub struct Carrier {
    /// Carrier name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Offices keyed by IATA code
    pub offices: BTreeMap<String, Office>,
}

impl Carrier {
    /// The carrier's hub office
    pub fn hub(&self) -> Option<&Office> {
        self.offices.values().find(|o| o.is_hub)
    }
}

/// The complete immutable network topology
#[derive(Debug, Clone)]
pub struct NetworkModel {
    /// Carriers keyed by name
    pub carriers: BTreeMap<String, Carrier>,
    /// Monitored-product thresholds keyed by product name
    pub thresholds: BTreeMap<String, Threshold>,
}

impl NetworkModel {
    /// Look up a carrier by name
    pub fn carrier(&self, name: &str) -> Option<&Carrier> {
        self.carriers.get(name)
    }

    /// Look up an office by carrier and IATA code
    pub fn office(&self, carrier: &str, iata: &str) -> Option<&Office> {
        self.carriers.get(carrier).and_then(|c| c.offices.get(iata))
    }

    /// The hub office of a carrier
    pub fn hub(&self, carrier: &str) -> Option<&Office> {
        self.carriers.get(carrier).and_then(Carrier::hub)
    }

    /// First office serving a state, searching carriers in name order
    pub fn office_by_state(&self, state: &str) -> Option<&Office> {
        self.carriers
            .values()
            .flat_map(|c| c.offices.values())
            .find(|o| o.state == state)
    }

    /// Office of a specific carrier serving a state
    pub fn carrier_office_by_state(&self, carrier: &str, state: &str) -> Option<&Office> {
        self.carriers
            .get(carrier)
            .and_then(|c| c.offices.values().find(|o| o.state == state))
    }

    /// Threshold for a product, if one is registered
    pub fn threshold(&self, product: &str) -> Option<&Threshold> {
        self.thresholds.get(product)
    }

    /// Whether a package requires temperature monitoring
    ///
    /// True only for the perishable handling code with a registered product
    /// threshold.
    pub fn is_monitored(&self, handling_code: &str, product: &str) -> bool {
        handling_code == "P" && self.thresholds.contains_key(product)
    }
}

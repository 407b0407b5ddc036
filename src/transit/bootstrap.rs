//! Network and package persistence
//!
//! Writes the built topology into the graph store: carriers, offices,
//! routes, container hierarchies, thresholds, and one initial depart/arrive
//! occurrence per route. Every logical write is committed individually;
//! deferring commits across a loop is not safe under the store contract.

use crate::network::{Carrier, Container, NetworkModel, Office, Route};
use crate::schedule::{
    advance_to_after, random_occurrence_time, OCCURRENCE_JITTER_MINUTES,
};
use crate::shipment::Package;
use crate::store::{EdgeSpec, GraphStore, NodeId, NodeSpec};
use crate::transit::error::SimulationError;
use crate::types::ChildKind;
use chrono::Utc;
use rand::Rng;
use tracing::info;

/// Persist the whole network topology
pub fn bootstrap_network<S: GraphStore, R: Rng>(
    store: &mut S,
    model: &NetworkModel,
    rng: &mut R,
) -> Result<(), SimulationError> {
    for threshold in model.thresholds.values() {
        store.insert_node(
            NodeSpec::new("threshold", &threshold.product)
                .attr("product", threshold.product.as_str())
                .attr("itemType", threshold.item_type.as_str())
                .attr("minValue", threshold.min_value)
                .attr("maxValue", threshold.max_value)
                .attr("uom", threshold.uom.as_str()),
        )?;
        store.commit()?;
    }

    let mut route_count = 0usize;
    for carrier in model.carriers.values() {
        let carrier_node = store.insert_node(
            NodeSpec::new("carrier", &carrier.name)
                .attr("name", carrier.name.as_str())
                .attr("description", carrier.description.as_str()),
        )?;
        store.commit()?;

        for office in carrier.offices.values() {
            let office_node = persist_office(store, carrier_node, office)?;
            for route in &office.routes {
                persist_route(store, office_node, route)?;
                if let Some(vehicle) = &route.vehicle {
                    let route_node = require_route(store, &route.number)?;
                    let vehicle_node =
                        persist_container_tree(store, carrier_node, vehicle, None)?;
                    store.insert_edge(EdgeSpec::new("assigned", route_node, vehicle_node))?;
                    store.commit()?;
                }
                route_count += 1;
            }
        }

        // Return legs share the outbound leg's vehicle; the vehicle nodes
        // all exist once the carrier's offices are persisted.
        for office in carrier.offices.values() {
            for route in &office.routes {
                if route.vehicle.is_none() {
                    let route_node = require_route(store, &route.number)?;
                    let vehicle_uid = format!("{}001", route.vehicle_route);
                    let vehicle_node = store
                        .get_node("container", &vehicle_uid)
                        .ok_or_else(|| SimulationError::ContainerNotFound {
                            route: route.number.clone(),
                            product: String::new(),
                        })?;
                    store.insert_edge(EdgeSpec::new("assigned", route_node, vehicle_node))?;
                    store.commit()?;
                }
            }
        }

        for office in carrier.offices.values() {
            for route in &office.routes {
                seed_occurrence(store, carrier, route, rng)?;
            }
        }
    }

    info!(
        carriers = model.carriers.len(),
        thresholds = model.thresholds.len(),
        routes = route_count,
        "network persisted to graph store"
    );
    Ok(())
}

fn persist_office<S: GraphStore>(
    store: &mut S,
    carrier_node: NodeId,
    office: &Office,
) -> Result<NodeId, SimulationError> {
    let office_node = store.insert_node(
        NodeSpec::new("office", &office.iata)
            .attr("iata", office.iata.as_str())
            .attr("carrier", office.carrier.as_str())
            .attr("state", office.state.as_str())
            .attr("description", office.description.as_str())
            .attr("gmtOffset", office.gmt_offset.as_str())
            .attr("hub", office.is_hub)
            .attr("latitude", office.latitude)
            .attr("longitude", office.longitude),
    )?;
    store.insert_edge(EdgeSpec::new("operates", carrier_node, office_node))?;
    store.commit()?;
    Ok(office_node)
}

fn persist_route<S: GraphStore>(
    store: &mut S,
    office_node: NodeId,
    route: &Route,
) -> Result<NodeId, SimulationError> {
    let route_node = store.insert_node(
        NodeSpec::new("route", &route.number)
            .attr("routeNbr", route.number.as_str())
            .attr("type", route.kind.code())
            .attr("fromIata", route.from_iata.as_str())
            .attr("toIata", route.to_iata.as_str())
            .attr("schdDepartTime", route.depart_local.as_str())
            .attr("schdArrivalTime", route.arrival_local.as_str()),
    )?;
    store.insert_edge(EdgeSpec::new("schedules", office_node, route_node))?;
    store.commit()?;
    Ok(route_node)
}

fn persist_container_tree<S: GraphStore>(
    store: &mut S,
    carrier_node: NodeId,
    container: &Container,
    parent: Option<NodeId>,
) -> Result<NodeId, SimulationError> {
    let mut spec = NodeSpec::new("container", &container.uid)
        .attr("uid", container.uid.as_str())
        .attr("type", container.kind.code());
    if let Some(product) = &container.monitor {
        spec = spec.attr("monitor", product.as_str());
    }
    let node = store.insert_node(spec)?;
    match parent {
        Some(parent_node) => {
            store.insert_edge(
                EdgeSpec::new("contains", parent_node, node)
                    .attr("childType", ChildKind::Container.code())
                    .attr("eventTimestamp", Utc::now()),
            )?;
        }
        None => {
            store.insert_edge(EdgeSpec::new("builds", carrier_node, node))?;
        }
    }
    store.commit()?;
    for child in &container.children {
        persist_container_tree(store, carrier_node, child, Some(node))?;
    }
    Ok(node)
}

/// First depart/arrive occurrence of a route, jittered around today's
/// schedule
fn seed_occurrence<S: GraphStore, R: Rng>(
    store: &mut S,
    carrier: &Carrier,
    route: &Route,
    rng: &mut R,
) -> Result<(), SimulationError> {
    let route_node = require_route(store, &route.number)?;
    let from = require_office_node(store, carrier, &route.from_iata)?;
    let to = require_office_node(store, carrier, &route.to_iata)?;

    let depart = random_occurrence_time(
        &route.depart_local,
        &from.1,
        OCCURRENCE_JITTER_MINUTES,
        rng,
    );
    let mut arrive = random_occurrence_time(
        &route.arrival_local,
        &to.1,
        OCCURRENCE_JITTER_MINUTES,
        rng,
    );
    if arrive <= depart {
        arrive = advance_to_after(arrive, depart);
    }

    store.insert_edge(
        EdgeSpec::new("departs", route_node, from.0).attr("eventTimestamp", depart),
    )?;
    store.commit()?;
    store.insert_edge(EdgeSpec::new("arrives", route_node, to.0).attr("eventTimestamp", arrive))?;
    store.commit()?;
    Ok(())
}

fn require_route<S: GraphStore>(store: &S, number: &str) -> Result<NodeId, SimulationError> {
    store
        .get_node("route", number)
        .ok_or_else(|| SimulationError::RouteNotFound(number.to_string()))
}

fn require_office_node<S: GraphStore>(
    store: &S,
    carrier: &Carrier,
    iata: &str,
) -> Result<(NodeId, String), SimulationError> {
    let office = carrier.offices.get(iata).ok_or_else(|| SimulationError::OfficeNotFound {
        carrier: carrier.name.clone(),
        iata: iata.to_string(),
    })?;
    let node = store.get_node("office", iata).ok_or_else(|| SimulationError::OfficeNotFound {
        carrier: carrier.name.clone(),
        iata: iata.to_string(),
    })?;
    Ok((node, office.gmt_offset.clone()))
}

/// Persist a package with its addresses and content, upserting by UID
///
/// Repeated requests with identical content hash to the same identifiers
/// and leave the graph unchanged.
pub fn persist_package<S: GraphStore>(
    store: &mut S,
    package: &Package,
) -> Result<NodeId, SimulationError> {
    if let Some(existing) = store.get_node("package", &package.uid) {
        return Ok(existing);
    }

    let package_node = store.insert_node(
        NodeSpec::new("package", &package.uid)
            .attr("trackingID", package.uid.as_str())
            .attr("handlingCd", package.handling_cd.as_str())
            .attr("product", package.product.as_str())
            .attr("carrier", package.carrier.as_str())
            .attr("created", package.created)
            .attr("estimatedPickup", package.estimated_pickup)
            .attr("estimatedDelivery", package.estimated_delivery),
    )?;
    store.commit()?;

    let sender_node = persist_address(store, &package.sender)?;
    store.insert_edge(EdgeSpec::new("sender", package_node, sender_node))?;
    store.commit()?;
    let recipient_node = persist_address(store, &package.recipient)?;
    store.insert_edge(EdgeSpec::new("recipient", package_node, recipient_node))?;
    store.commit()?;

    let content_node = store.insert_node(
        NodeSpec::new("content", &package.uid)
            .attr("product", package.content.product.as_str())
            .attr("description", package.content.description.as_str())
            .attr("producer", package.content.producer.as_str())
            .attr("count", f64::from(package.content.count))
            .attr("startLotNumber", package.content.start_lot_number.as_str())
            .attr("endLotNumber", package.content.end_lot_number.as_str()),
    )?;
    store.insert_edge(EdgeSpec::new("contains", package_node, content_node))?;
    store.commit()?;

    info!(package = %package.uid, "package persisted");
    Ok(package_node)
}

fn persist_address<S: GraphStore>(
    store: &mut S,
    address: &crate::shipment::Address,
) -> Result<NodeId, SimulationError> {
    if let Some(existing) = store.get_node("address", &address.uid) {
        return Ok(existing);
    }
    let node = store.insert_node(
        NodeSpec::new("address", &address.uid)
            .attr("uid", address.uid.as_str())
            .attr("name", address.name.as_str())
            .attr("street", address.street.as_str())
            .attr("city", address.city.as_str())
            .attr("state", address.state_province.as_str())
            .attr("postalCd", address.postal_cd.as_str())
            .attr("country", address.country.as_str())
            .attr("latitude", address.latitude.unwrap_or_default())
            .attr("longitude", address.longitude.unwrap_or_default()),
    )?;
    store.commit()?;
    Ok(node)
}

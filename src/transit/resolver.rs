//! Container assignment resolution
//!
//! Picks the container a package rides in for one leg. Non-monitored
//! packages travel in the route's top-level vehicle; monitored packages
//! descend the containment tree to the freezer tagged with their product.
//! The descent is breadth-first and depth-agnostic, the fixed 2-level
//! hierarchy is a property of the builder, not of this code.

use crate::network::NetworkModel;
use crate::store::{GraphQuery, GraphStore, NodeId};
use crate::transit::error::SimulationError;
use std::collections::VecDeque;
use tracing::debug;

/// Resolve the container for a (route, package) pair
pub fn resolve_container<S: GraphStore>(
    store: &S,
    model: &NetworkModel,
    route_number: &str,
    handling_cd: &str,
    product: &str,
) -> Result<NodeId, SimulationError> {
    if store.get_node("route", route_number).is_none() {
        return Err(SimulationError::RouteNotFound(route_number.to_string()));
    }

    let vehicle = store
        .query(
            &GraphQuery::nodes("route")
                .has("routeNbr", route_number)
                .out_edges("assigned")
                .far_nodes(),
        )
        .first_node()
        .ok_or_else(|| SimulationError::ContainerNotFound {
            route: route_number.to_string(),
            product: product.to_string(),
        })?;

    if !model.is_monitored(handling_cd, product) {
        debug!(route = route_number, "non-monitored package rides the vehicle");
        return Ok(vehicle);
    }

    let mut frontier = VecDeque::from([vehicle]);
    while let Some(node) = frontier.pop_front() {
        if store.node_attr(node, "monitor").as_text() == product {
            debug!(
                route = route_number,
                container = %store.node_key(node),
                product,
                "monitored package resolved to freezer"
            );
            return Ok(node);
        }
        let uid = store.node_key(node);
        let children = store.query(
            &GraphQuery::nodes("container")
                .has("uid", uid.as_str())
                .out_edges("contains")
                .has("childType", "C")
                .far_nodes(),
        );
        frontier.extend(children.nodes);
    }

    Err(SimulationError::ContainerNotFound {
        route: route_number.to_string(),
        product: product.to_string(),
    })
}

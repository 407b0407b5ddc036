//! In-memory graph store
//!
//! The reference [`GraphStore`] backend. Holds the whole transit graph in
//! process memory with staged writes, a per-label key index, and linear-scan
//! traversals. Scan-based query execution is deliberate; a simulated network
//! stays small enough that index tuning would be noise.

use crate::store::graph::{EdgeId, EdgeSpec, GraphStore, NodeId, NodeSpec, PathRow, QueryResult, StoreError};
use crate::store::query::{GraphQuery, SortOrder, Step, StepKind};
use crate::store::value::AttrValue;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
struct NodeRecord {
    label: String,
    key: String,
    attrs: BTreeMap<String, AttrValue>,
    out_edges: Vec<EdgeId>,
    in_edges: Vec<EdgeId>,
}

#[derive(Debug)]
struct EdgeRecord {
    label: String,
    from: NodeId,
    to: NodeId,
    attrs: BTreeMap<String, AttrValue>,
}

/// An in-memory property graph with staged writes
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: HashMap<NodeId, NodeRecord>,
    edges: HashMap<EdgeId, EdgeRecord>,
    key_index: HashMap<(String, String), NodeId>,
    staged_nodes: Vec<(NodeId, NodeSpec)>,
    staged_edges: Vec<(EdgeId, EdgeSpec)>,
    issued: HashSet<NodeId>,
}

impl MemoryGraph {
    /// New empty graph
    pub fn new() -> Self {
        MemoryGraph::default()
    }

    /// Number of committed nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of committed edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn node_matches(&self, node: NodeId, filters: &[(String, AttrValue)]) -> bool {
        let Some(record) = self.nodes.get(&node) else {
            return false;
        };
        filters
            .iter()
            .all(|(name, value)| record.attrs.get(name).map(|v| v == value).unwrap_or(false))
    }

    fn edge_matches(&self, edge: EdgeId, filters: &[(String, AttrValue)]) -> bool {
        let Some(record) = self.edges.get(&edge) else {
            return false;
        };
        filters
            .iter()
            .all(|(name, value)| record.attrs.get(name).map(|v| v == value).unwrap_or(false))
    }

    fn apply_order_and_limit(&self, rows: &mut Vec<Row>, step: &Step) {
        if let Some((attr, order)) = &step.order {
            rows.sort_by(|a, b| {
                let av = a.frontier_edge().map(|e| self.edge_attr(e, attr)).unwrap_or(AttrValue::Absent);
                let bv = b.frontier_edge().map(|e| self.edge_attr(e, attr)).unwrap_or(AttrValue::Absent);
                let cmp = av.compare(&bv);
                match order {
                    SortOrder::Ascending => cmp,
                    SortOrder::Descending => cmp.reverse(),
                }
            });
        }
        if let Some(limit) = step.limit {
            rows.truncate(limit);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Frontier {
    Node(NodeId),
    Edge(EdgeId),
}

#[derive(Debug, Clone)]
struct Row {
    frontier: Frontier,
    path: PathRow,
}

impl Row {
    fn frontier_edge(&self) -> Option<EdgeId> {
        match self.frontier {
            Frontier::Edge(e) => Some(e),
            Frontier::Node(_) => None,
        }
    }
}

impl GraphStore for MemoryGraph {
    fn insert_node(&mut self, spec: NodeSpec) -> Result<NodeId, StoreError> {
        let id = NodeId(Uuid::new_v4());
        self.issued.insert(id);
        self.staged_nodes.push((id, spec));
        Ok(id)
    }

    fn insert_edge(&mut self, spec: EdgeSpec) -> Result<EdgeId, StoreError> {
        if !self.issued.contains(&spec.from) || !self.issued.contains(&spec.to) {
            return Err(StoreError::UnknownNode);
        }
        let id = EdgeId(Uuid::new_v4());
        self.staged_edges.push((id, spec));
        Ok(id)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        // Validate the whole batch before applying any of it.
        let mut batch_keys = HashSet::new();
        for (_, spec) in &self.staged_nodes {
            let key = (spec.label.clone(), spec.key.clone());
            if self.key_index.contains_key(&key) || !batch_keys.insert(key) {
                return Err(StoreError::DuplicateKey {
                    label: spec.label.clone(),
                    key: spec.key.clone(),
                });
            }
        }

        let staged_nodes = std::mem::take(&mut self.staged_nodes);
        let staged_edges = std::mem::take(&mut self.staged_edges);
        debug!(
            nodes = staged_nodes.len(),
            edges = staged_edges.len(),
            "committing staged graph writes"
        );

        for (id, spec) in staged_nodes {
            self.key_index.insert((spec.label.clone(), spec.key.clone()), id);
            self.nodes.insert(
                id,
                NodeRecord {
                    label: spec.label,
                    key: spec.key,
                    attrs: spec.attrs,
                    out_edges: Vec::new(),
                    in_edges: Vec::new(),
                },
            );
        }
        for (id, spec) in staged_edges {
            if !self.nodes.contains_key(&spec.from) || !self.nodes.contains_key(&spec.to) {
                return Err(StoreError::UnknownNode);
            }
            if let Some(from) = self.nodes.get_mut(&spec.from) {
                from.out_edges.push(id);
            }
            if let Some(to) = self.nodes.get_mut(&spec.to) {
                to.in_edges.push(id);
            }
            self.edges.insert(
                id,
                EdgeRecord { label: spec.label, from: spec.from, to: spec.to, attrs: spec.attrs },
            );
        }
        Ok(())
    }

    fn get_node(&self, label: &str, key: &str) -> Option<NodeId> {
        self.key_index.get(&(label.to_string(), key.to_string())).copied()
    }

    fn node_key(&self, node: NodeId) -> String {
        self.nodes.get(&node).map(|r| r.key.clone()).unwrap_or_default()
    }

    fn node_attr(&self, node: NodeId, name: &str) -> AttrValue {
        self.nodes
            .get(&node)
            .and_then(|r| r.attrs.get(name).cloned())
            .unwrap_or(AttrValue::Absent)
    }

    fn edge_attr(&self, edge: EdgeId, name: &str) -> AttrValue {
        self.edges
            .get(&edge)
            .and_then(|r| r.attrs.get(name).cloned())
            .unwrap_or(AttrValue::Absent)
    }

    fn query(&self, query: &GraphQuery) -> QueryResult {
        // Start frontier, sorted by key for deterministic traversal order.
        let mut start: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, r)| r.label == query.start_label)
            .map(|(id, _)| *id)
            .filter(|id| self.node_matches(*id, &query.start_filters))
            .collect();
        start.sort_by_key(|id| self.node_key(*id));

        let mut rows: Vec<Row> = start
            .into_iter()
            .map(|id| Row {
                frontier: Frontier::Node(id),
                path: PathRow { nodes: vec![id], edges: Vec::new() },
            })
            .collect();

        for step in &query.steps {
            let mut next = Vec::new();
            match &step.kind {
                StepKind::OutEdges(label) | StepKind::InEdges(label) => {
                    let outgoing = matches!(step.kind, StepKind::OutEdges(_));
                    for row in &rows {
                        let Frontier::Node(node) = row.frontier else {
                            continue;
                        };
                        let Some(record) = self.nodes.get(&node) else {
                            continue;
                        };
                        let candidates =
                            if outgoing { &record.out_edges } else { &record.in_edges };
                        for edge in candidates {
                            let matches = self
                                .edges
                                .get(edge)
                                .map(|r| r.label == *label)
                                .unwrap_or(false)
                                && self.edge_matches(*edge, &step.filters);
                            if matches {
                                let mut path = row.path.clone();
                                path.edges.push(*edge);
                                next.push(Row { frontier: Frontier::Edge(*edge), path });
                            }
                        }
                    }
                }
                StepKind::FarNodes => {
                    for row in &rows {
                        let Frontier::Edge(edge) = row.frontier else {
                            continue;
                        };
                        let Some(record) = self.edges.get(&edge) else {
                            continue;
                        };
                        let came_from = row.path.nodes.last().copied();
                        let far = if came_from == Some(record.from) {
                            record.to
                        } else {
                            record.from
                        };
                        if self.node_matches(far, &step.filters) {
                            let mut path = row.path.clone();
                            path.nodes.push(far);
                            next.push(Row { frontier: Frontier::Node(far), path });
                        }
                    }
                }
            }
            self.apply_order_and_limit(&mut next, step);
            rows = next;
        }

        let mut result = QueryResult::default();
        for row in rows {
            match row.frontier {
                Frontier::Node(n) => result.nodes.push(n),
                Frontier::Edge(e) => result.edges.push(e),
            }
            result.paths.push(row.path);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn seeded() -> (MemoryGraph, NodeId, NodeId, NodeId) {
        let mut graph = MemoryGraph::new();
        let route = graph
            .insert_node(NodeSpec::new("route", "NS000").attr("type", "A"))
            .unwrap();
        let vehicle = graph
            .insert_node(NodeSpec::new("container", "NS000001").attr("type", "V"))
            .unwrap();
        let freezer = graph
            .insert_node(
                NodeSpec::new("container", "NS000003")
                    .attr("type", "F")
                    .attr("monitor", "PharmaA"),
            )
            .unwrap();
        graph.insert_edge(EdgeSpec::new("assigned", route, vehicle)).unwrap();
        graph
            .insert_edge(EdgeSpec::new("contains", vehicle, freezer).attr("childType", "C"))
            .unwrap();
        graph.commit().unwrap();
        (graph, route, vehicle, freezer)
    }

    #[test]
    fn test_staged_writes_invisible_until_commit() {
        let mut graph = MemoryGraph::new();
        graph.insert_node(NodeSpec::new("route", "NS000")).unwrap();
        assert_eq!(graph.get_node("route", "NS000"), None);
        graph.commit().unwrap();
        assert!(graph.get_node("route", "NS000").is_some());
    }

    #[test]
    fn test_duplicate_key_rejected_at_commit() {
        let mut graph = MemoryGraph::new();
        graph.insert_node(NodeSpec::new("route", "NS000")).unwrap();
        graph.commit().unwrap();
        graph.insert_node(NodeSpec::new("route", "NS000")).unwrap();
        assert!(matches!(
            graph.commit(),
            Err(StoreError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_edge_to_unknown_node_rejected() {
        let mut graph = MemoryGraph::new();
        let a = graph.insert_node(NodeSpec::new("route", "NS000")).unwrap();
        let ghost = NodeId(Uuid::new_v4());
        assert!(matches!(
            graph.insert_edge(EdgeSpec::new("assigned", a, ghost)),
            Err(StoreError::UnknownNode)
        ));
    }

    #[test]
    fn test_traversal_with_node_filter() {
        let (graph, _, _, freezer) = seeded();
        let q = GraphQuery::nodes("route")
            .has("type", "A")
            .out_edges("assigned")
            .far_nodes()
            .out_edges("contains")
            .has("childType", "C")
            .far_nodes()
            .has("monitor", "PharmaA");
        let result = graph.query(&q);
        assert_eq!(result.nodes, vec![freezer]);
        assert_eq!(result.paths[0].nodes.len(), 3);
        assert_eq!(result.paths[0].edges.len(), 2);
    }

    #[test]
    fn test_filter_mismatch_yields_empty() {
        let (graph, _, _, _) = seeded();
        let q = GraphQuery::nodes("route").has("type", "G");
        assert!(graph.query(&q).is_empty());
    }

    #[test]
    fn test_order_by_descending_with_limit() {
        let mut graph = MemoryGraph::new();
        let container = graph.insert_node(NodeSpec::new("container", "NS000001")).unwrap();
        let office = graph.insert_node(NodeSpec::new("office", "DEN")).unwrap();
        let base = Utc::now();
        let mut latest = None;
        for day in 0..3 {
            let stamp = base + Duration::days(day);
            let edge = graph
                .insert_edge(
                    EdgeSpec::new("departs", container, office).attr("eventTimestamp", stamp),
                )
                .unwrap();
            latest = Some(edge);
        }
        graph.commit().unwrap();

        let q = GraphQuery::nodes("container")
            .out_edges("departs")
            .order_by("eventTimestamp", SortOrder::Descending)
            .limit(1);
        let result = graph.query(&q);
        assert_eq!(result.edges, vec![latest.unwrap()]);
    }

    #[test]
    fn test_in_edges_walk_backwards() {
        let (graph, route, vehicle, _) = seeded();
        let q = GraphQuery::nodes("container")
            .has("type", "V")
            .in_edges("assigned")
            .far_nodes();
        let result = graph.query(&q);
        assert_eq!(result.nodes, vec![route]);
        assert_eq!(graph.node_key(vehicle), "NS000001");
    }
}

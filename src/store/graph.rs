//! Graph store abstraction
//!
//! The transit graph is written through this trait so the simulator core
//! stays independent of any one backing store. Writes are staged and become
//! visible to reads only at [`GraphStore::commit`]; the simulator commits
//! after each logical write batch, mirroring one transaction per event.

use crate::store::query::GraphQuery;
use crate::store::value::AttrValue;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Opaque handle to a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) Uuid);

/// Opaque handle to a graph edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) Uuid);

/// Errors raised by graph store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A node with the same label and key is already committed
    #[error("node '{key}' already exists under label '{label}'")]
    DuplicateKey {
        /// Node label
        label: String,
        /// Conflicting key
        key: String,
    },

    /// An edge referenced a node handle the store has never issued
    #[error("edge endpoint refers to an unknown node")]
    UnknownNode,
}

/// Specification of a node to insert
///
/// `key` is unique within `label`; committing a duplicate fails the batch.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub(crate) label: String,
    pub(crate) key: String,
    pub(crate) attrs: BTreeMap<String, AttrValue>,
}

impl NodeSpec {
    /// New node under `label` with unique `key`
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        NodeSpec { label: label.into(), key: key.into(), attrs: BTreeMap::new() }
    }

    /// Attach an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }
}

/// Specification of a directed edge to insert
#[derive(Debug, Clone)]
pub struct EdgeSpec {
    pub(crate) label: String,
    pub(crate) from: NodeId,
    pub(crate) to: NodeId,
    pub(crate) attrs: BTreeMap<String, AttrValue>,
}

impl EdgeSpec {
    /// New edge labeled `label` from `from` to `to`
    pub fn new(label: impl Into<String>, from: NodeId, to: NodeId) -> Self {
        EdgeSpec { label: label.into(), from, to, attrs: BTreeMap::new() }
    }

    /// Attach an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }
}

/// One surviving traversal row with its full path
///
/// `nodes` and `edges` interleave in traversal order: the row's start node,
/// then each edge walked and each endpoint hopped to.
#[derive(Debug, Clone, Default)]
pub struct PathRow {
    /// Nodes touched, in order
    pub nodes: Vec<NodeId>,
    /// Edges walked, in order
    pub edges: Vec<EdgeId>,
}

/// Result of executing a [`GraphQuery`]
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Final frontier when the traversal ends on nodes
    pub nodes: Vec<NodeId>,
    /// Final frontier when the traversal ends on edges
    pub edges: Vec<EdgeId>,
    /// One path per surviving row
    pub paths: Vec<PathRow>,
}

impl QueryResult {
    /// First node of the final frontier
    pub fn first_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// First edge of the final frontier
    pub fn first_edge(&self) -> Option<EdgeId> {
        self.edges.first().copied()
    }

    /// True when no rows survived
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// A transactional property graph
pub trait GraphStore {
    /// Stage a node for insertion, returning its handle immediately
    fn insert_node(&mut self, spec: NodeSpec) -> Result<NodeId, StoreError>;

    /// Stage an edge for insertion
    ///
    /// Endpoints may be staged or committed nodes.
    fn insert_edge(&mut self, spec: EdgeSpec) -> Result<EdgeId, StoreError>;

    /// Make all staged writes visible to reads
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Look up a committed node by label and key
    fn get_node(&self, label: &str, key: &str) -> Option<NodeId>;

    /// The key of a committed node, empty for unknown handles
    fn node_key(&self, node: NodeId) -> String;

    /// A node attribute, [`AttrValue::Absent`] when missing
    fn node_attr(&self, node: NodeId, name: &str) -> AttrValue;

    /// An edge attribute, [`AttrValue::Absent`] when missing
    fn edge_attr(&self, edge: EdgeId, name: &str) -> AttrValue;

    /// Execute a traversal over committed data
    fn query(&self, query: &GraphQuery) -> QueryResult;
}

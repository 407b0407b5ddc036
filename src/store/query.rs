//! Typed graph queries
//!
//! A small traversal builder over the patterns the simulator actually runs:
//! start from nodes of one label, filter on attribute equality, walk labeled
//! edges in either direction, hop to the far endpoint, order by an edge
//! attribute, and cap the result. Every surviving traversal row also records
//! its full path, which the timeline reconstruction reads back.

use crate::store::value::AttrValue;

/// Sort direction for [`GraphQuery::order_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// One traversal step
#[derive(Debug, Clone)]
pub(crate) enum StepKind {
    /// Walk edges with this label leaving the current nodes
    OutEdges(String),
    /// Walk edges with this label arriving at the current nodes
    InEdges(String),
    /// Hop from the current edges to their far endpoints
    FarNodes,
}

#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub(crate) kind: StepKind,
    pub(crate) filters: Vec<(String, AttrValue)>,
    pub(crate) order: Option<(String, SortOrder)>,
    pub(crate) limit: Option<usize>,
}

impl Step {
    fn new(kind: StepKind) -> Self {
        Step { kind, filters: Vec::new(), order: None, limit: None }
    }
}

/// A declarative graph traversal
///
/// Built fluently and executed by a
/// [`GraphStore`](crate::store::GraphStore). Filter, order, and limit calls
/// attach to the most recent step.
#[derive(Debug, Clone)]
pub struct GraphQuery {
    pub(crate) start_label: String,
    pub(crate) start_filters: Vec<(String, AttrValue)>,
    pub(crate) steps: Vec<Step>,
}

impl GraphQuery {
    /// Start from all nodes carrying `label`
    pub fn nodes(label: impl Into<String>) -> Self {
        GraphQuery { start_label: label.into(), start_filters: Vec::new(), steps: Vec::new() }
    }

    /// Keep only elements whose attribute equals `value`
    ///
    /// Applies to the start nodes before any traversal step, and to the most
    /// recent step afterwards.
    pub fn has(mut self, attr: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        let filter = (attr.into(), value.into());
        match self.steps.last_mut() {
            Some(step) => step.filters.push(filter),
            None => self.start_filters.push(filter),
        }
        self
    }

    /// Walk outgoing edges with the given label
    pub fn out_edges(mut self, label: impl Into<String>) -> Self {
        self.steps.push(Step::new(StepKind::OutEdges(label.into())));
        self
    }

    /// Walk incoming edges with the given label
    pub fn in_edges(mut self, label: impl Into<String>) -> Self {
        self.steps.push(Step::new(StepKind::InEdges(label.into())));
        self
    }

    /// Hop from the current edges to their far endpoints
    ///
    /// After [`out_edges`](Self::out_edges) this lands on edge targets, after
    /// [`in_edges`](Self::in_edges) on edge sources.
    pub fn far_nodes(mut self) -> Self {
        self.steps.push(Step::new(StepKind::FarNodes));
        self
    }

    /// Order the rows of the most recent edge step by an edge attribute
    pub fn order_by(mut self, attr: impl Into<String>, order: SortOrder) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.order = Some((attr.into(), order));
        }
        self
    }

    /// Keep at most `n` rows after the most recent step
    pub fn limit(mut self, n: usize) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.limit = Some(n);
        }
        self
    }
}

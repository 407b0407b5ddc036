//! Transit graph persistence

pub mod graph;
pub mod memory;
pub mod query;
pub mod value;

pub use graph::{EdgeId, EdgeSpec, GraphStore, NodeId, NodeSpec, PathRow, QueryResult, StoreError};
pub use memory::MemoryGraph;
pub use query::{GraphQuery, SortOrder};
pub use value::AttrValue;

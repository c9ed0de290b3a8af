use crate::{EdgeId, ElementId, NodeId};
use thiserror::Error;

/// Failures raised by graph model mutation and lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Unknown edge: {0}")]
    UnknownEdge(EdgeId),
    #[error("Element already exists: {0}")]
    Duplicate(ElementId),
    #[error("Edge {edge} references missing endpoint {endpoint}")]
    MissingEndpoint { edge: EdgeId, endpoint: NodeId },
}

impl GraphError {
    pub fn unknown(id: ElementId) -> Self {
        match id {
            ElementId::Node(n) => GraphError::UnknownNode(n),
            ElementId::Edge(e) => GraphError::UnknownEdge(e),
        }
    }
}

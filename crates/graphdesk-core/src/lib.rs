use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod geometry;

pub use error::GraphError;
pub use geometry::{Axis, Rect, Vec2, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub i64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to either kind of graph element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "group", content = "id", rename_all = "lowercase")]
pub enum ElementId {
    Node(NodeId),
    Edge(EdgeId),
}

impl ElementId {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            ElementId::Node(id) => Some(*id),
            ElementId::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<EdgeId> {
        match self {
            ElementId::Edge(id) => Some(*id),
            ElementId::Node(_) => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, ElementId::Node(_))
    }
}

impl From<NodeId> for ElementId {
    fn from(id: NodeId) -> Self {
        ElementId::Node(id)
    }
}

impl From<EdgeId> for ElementId {
    fn from(id: EdgeId) -> Self {
        ElementId::Edge(id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Node(id) => write!(f, "node#{}", id),
            ElementId::Edge(id) => write!(f, "edge#{}", id),
        }
    }
}

/// Coarse element group, used where the panel or event stream needs a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementGroup {
    Node,
    Edge,
}

impl fmt::Display for ElementGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementGroup::Node => write!(f, "node"),
            ElementGroup::Edge => write!(f, "edge"),
        }
    }
}

use anyhow::Context;
use graphdesk_core::{EdgeId, ElementGroup, ElementId, GraphError, NodeId, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Transient per-node UI state. Never written to graph files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scratch {
    /// The node has at least one hidden neighbour.
    pub thick_border: bool,
}

fn default_true() -> bool {
    true
}

fn default_size() -> Vec2 {
    Vec2::new(40.0, 40.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: NodeId,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    /// Center of the node in model coordinates.
    #[serde(default)]
    pub position: Vec2,
    #[serde(default = "default_size")]
    pub size: Vec2,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub selected: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(skip)]
    pub scratch: Scratch,
}

impl NodeData {
    pub fn new(id: NodeId, name: impl Into<String>, position: Vec2) -> Self {
        Self {
            id,
            parent: None,
            kind: String::new(),
            name: name.into(),
            position,
            size: default_size(),
            data: Value::Null,
            selected: false,
            visible: true,
            scratch: Scratch::default(),
        }
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center_size(self.position, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub selected: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl EdgeData {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            kind: String::new(),
            data: Value::Null,
            selected: false,
            visible: true,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn other_end(&self, node: NodeId) -> NodeId {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }
}

/// Borrowed view over either element kind.
#[derive(Debug, Clone, Copy)]
pub enum GraphElement<'a> {
    Node(&'a NodeData),
    Edge(&'a EdgeData),
}

impl GraphElement<'_> {
    pub fn id(&self) -> ElementId {
        match self {
            GraphElement::Node(n) => ElementId::Node(n.id),
            GraphElement::Edge(e) => ElementId::Edge(e.id),
        }
    }

    pub fn group(&self) -> ElementGroup {
        match self {
            GraphElement::Node(_) => ElementGroup::Node,
            GraphElement::Edge(_) => ElementGroup::Edge,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            GraphElement::Node(n) => &n.kind,
            GraphElement::Edge(e) => &e.kind,
        }
    }

    pub fn data(&self) -> &Value {
        match self {
            GraphElement::Node(n) => &n.data,
            GraphElement::Edge(e) => &e.data,
        }
    }

    pub fn visible(&self) -> bool {
        match self {
            GraphElement::Node(n) => n.visible,
            GraphElement::Edge(e) => e.visible,
        }
    }
}

/// On-disk graph description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub nodes: Vec<NodeData>,
    #[serde(default)]
    pub edges: Vec<EdgeData>,
}

/// Everything taken out of the graph by a removal, in re-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovedElements {
    pub nodes: Vec<NodeData>,
    pub edges: Vec<EdgeData>,
}

impl RemovedElements {
    pub fn ids(&self) -> Vec<ElementId> {
        self.nodes
            .iter()
            .map(|n| ElementId::Node(n.id))
            .chain(self.edges.iter().map(|e| ElementId::Edge(e.id)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Positions, visibility and existence: what undo must restore.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservableState {
    pub nodes: BTreeMap<NodeId, (Vec2, bool)>,
    pub edges: BTreeMap<EdgeId, bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphModel {
    nodes: BTreeMap<NodeId, NodeData>,
    edges: BTreeMap<EdgeId, EdgeData>,
    incidence: HashMap<NodeId, BTreeSet<EdgeId>>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from a parsed file. Nodes are inserted parents first.
    pub fn from_file(file: GraphFile) -> Result<Self, GraphError> {
        let mut model = Self::new();
        let mut pending = file.nodes;
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for node in pending {
                match node.parent {
                    Some(parent) if !model.nodes.contains_key(&parent) => deferred.push(node),
                    _ => model.add_node(node)?,
                }
            }
            if deferred.len() == before {
                let orphan = &deferred[0];
                let parent = orphan.parent.unwrap_or(orphan.id);
                return Err(GraphError::UnknownNode(parent));
            }
            pending = deferred;
        }
        for edge in file.edges {
            model.add_edge(edge)?;
        }
        Ok(model)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph file {:?}", path))?;
        let file: GraphFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse graph file {:?}", path))?;
        let model = Self::from_file(file)?;
        tracing::info!(
            "Loaded graph with {} nodes and {} edges from {:?}",
            model.node_count(),
            model.edge_count(),
            path
        );
        Ok(model)
    }

    pub fn to_file(&self) -> GraphFile {
        GraphFile {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeData> {
        self.edges.values()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&EdgeData> {
        self.edges.get(&id)
    }

    pub fn element(&self, id: ElementId) -> Option<GraphElement<'_>> {
        match id {
            ElementId::Node(n) => self.nodes.get(&n).map(GraphElement::Node),
            ElementId::Edge(e) => self.edges.get(&e).map(GraphElement::Edge),
        }
    }

    pub fn contains(&self, id: ElementId) -> bool {
        match id {
            ElementId::Node(n) => self.nodes.contains_key(&n),
            ElementId::Edge(e) => self.edges.contains_key(&e),
        }
    }

    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.nodes.keys().next_back().map_or(1, |id| id.0 + 1))
    }

    pub fn next_edge_id(&self) -> EdgeId {
        EdgeId(self.edges.keys().next_back().map_or(1, |id| id.0 + 1))
    }

    pub fn add_node(&mut self, node: NodeData) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::Duplicate(ElementId::Node(node.id)));
        }
        if let Some(parent) = node.parent {
            if !self.nodes.contains_key(&parent) {
                return Err(GraphError::UnknownNode(parent));
            }
        }
        self.incidence.entry(node.id).or_default();
        self.nodes.insert(node.id, node);
        Ok(())
    }

    pub fn add_edge(&mut self, edge: EdgeData) -> Result<(), GraphError> {
        if self.edges.contains_key(&edge.id) {
            return Err(GraphError::Duplicate(ElementId::Edge(edge.id)));
        }
        for endpoint in [edge.source, edge.target] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(GraphError::MissingEndpoint {
                    edge: edge.id,
                    endpoint,
                });
            }
        }
        self.incidence.entry(edge.source).or_default().insert(edge.id);
        self.incidence.entry(edge.target).or_default().insert(edge.id);
        self.edges.insert(edge.id, edge);
        Ok(())
    }

    /// Remove elements. Removing a node takes its descendants and every
    /// incident edge with it. Unknown ids are skipped.
    pub fn remove(&mut self, ids: &[ElementId]) -> RemovedElements {
        let mut node_ids = Vec::new();
        let mut seen = BTreeSet::new();
        for id in ids.iter().filter_map(ElementId::as_node) {
            if !self.nodes.contains_key(&id) {
                tracing::warn!("Ignoring removal of unknown node {}", id);
                continue;
            }
            for n in std::iter::once(id).chain(self.descendants(id)) {
                if seen.insert(n) {
                    node_ids.push(n);
                }
            }
        }
        // Parents before children so restore can replay in order.
        node_ids.sort_by_key(|n| self.ancestors(*n).len());

        let mut edge_ids = BTreeSet::new();
        for n in &node_ids {
            edge_ids.extend(self.incident_edges(*n));
        }
        for id in ids.iter().filter_map(ElementId::as_edge) {
            if self.edges.contains_key(&id) {
                edge_ids.insert(id);
            }
        }

        let mut removed = RemovedElements::default();
        for e in edge_ids {
            if let Some(edge) = self.edges.remove(&e) {
                for endpoint in [edge.source, edge.target] {
                    if let Some(set) = self.incidence.get_mut(&endpoint) {
                        set.remove(&e);
                    }
                }
                removed.edges.push(edge);
            }
        }
        for n in node_ids {
            if let Some(node) = self.nodes.remove(&n) {
                self.incidence.remove(&n);
                removed.nodes.push(node);
            }
        }
        removed
    }

    /// Re-insert what [`GraphModel::remove`] returned.
    pub fn restore(&mut self, removed: &RemovedElements) -> Result<(), GraphError> {
        for node in &removed.nodes {
            self.add_node(node.clone())?;
        }
        for edge in &removed.edges {
            self.add_edge(edge.clone())?;
        }
        Ok(())
    }

    pub fn position(&self, id: NodeId) -> Option<Vec2> {
        self.nodes.get(&id).map(|n| n.position)
    }

    /// Returns the previous position.
    pub fn set_position(&mut self, id: NodeId, position: Vec2) -> Result<Vec2, GraphError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(GraphError::UnknownNode(id))?;
        Ok(std::mem::replace(&mut node.position, position))
    }

    pub fn bounds(&self, id: NodeId) -> Option<Rect> {
        self.nodes.get(&id).map(NodeData::bounds)
    }

    pub fn scratch(&self, id: NodeId) -> Option<&Scratch> {
        self.nodes.get(&id).map(|n| &n.scratch)
    }

    pub fn scratch_mut(&mut self, id: NodeId) -> Option<&mut Scratch> {
        self.nodes.get_mut(&id).map(|n| &mut n.scratch)
    }

    pub fn incident_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.incidence
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Nodes connected to `id` by any edge, regardless of visibility.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = BTreeSet::new();
        for e in self.incident_edges(id) {
            if let Some(edge) = self.edges.get(&e) {
                let other = edge.other_end(id);
                if other != id {
                    out.insert(other);
                }
            }
        }
        out.into_iter().collect()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.parent == Some(id))
            .map(|n| n.id)
            .collect()
    }

    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.children(id);
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n));
        }
        out
    }

    /// Parent chain, root first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(p) = current {
            if chain.contains(&p) {
                break;
            }
            chain.push(p);
            current = self.nodes.get(&p).and_then(|n| n.parent);
        }
        chain.reverse();
        chain
    }

    /// Nodes sharing the same parent. Top-level nodes are siblings of each other.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        self.nodes
            .values()
            .filter(|n| n.parent == node.parent && n.id != id)
            .map(|n| n.id)
            .collect()
    }

    pub fn is_visible(&self, id: ElementId) -> bool {
        self.element(id).is_some_and(|e| e.visible())
    }

    pub fn selected(&self) -> Vec<ElementId> {
        self.nodes
            .values()
            .filter(|n| n.selected)
            .map(|n| ElementId::Node(n.id))
            .chain(
                self.edges
                    .values()
                    .filter(|e| e.selected)
                    .map(|e| ElementId::Edge(e.id)),
            )
            .collect()
    }

    /// Replace the selection. Returns the previous selection.
    pub fn set_selection(&mut self, ids: &[ElementId]) -> Vec<ElementId> {
        let previous = self.selected();
        for node in self.nodes.values_mut() {
            node.selected = false;
        }
        for edge in self.edges.values_mut() {
            edge.selected = false;
        }
        for id in ids {
            match id {
                ElementId::Node(n) => {
                    if let Some(node) = self.nodes.get_mut(n) {
                        node.selected = true;
                    }
                }
                ElementId::Edge(e) => {
                    if let Some(edge) = self.edges.get_mut(e) {
                        edge.selected = true;
                    }
                }
            }
        }
        previous
    }

    pub(crate) fn set_element_visible(&mut self, id: ElementId, visible: bool) -> bool {
        match id {
            ElementId::Node(n) => match self.nodes.get_mut(&n) {
                Some(node) if node.visible != visible => {
                    node.visible = visible;
                    true
                }
                _ => false,
            },
            ElementId::Edge(e) => match self.edges.get_mut(&e) {
                Some(edge) if edge.visible != visible => {
                    edge.visible = visible;
                    true
                }
                _ => false,
            },
        }
    }

    pub fn observable(&self) -> ObservableState {
        ObservableState {
            nodes: self
                .nodes
                .values()
                .map(|n| (n.id, (n.position, n.visible)))
                .collect(),
            edges: self.edges.values().map(|e| (e.id, e.visible)).collect(),
        }
    }
}

//! Hide/show with "thick border" bookkeeping.
//!
//! A node carries the thick-border flag while at least one of its neighbours
//! is hidden. Plans are computed before the visibility change so the tagging
//! step and the hide/show step can be recorded as one undoable batch.

use crate::model::{GraphModel, RemovedElements};
use graphdesk_core::{EdgeId, ElementId, NodeId};
use std::collections::BTreeSet;

/// Nodes to tag before hiding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HidePlan {
    pub to_tag: Vec<NodeId>,
}

/// Tag changes that accompany a reveal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowPlan {
    /// Tagged nodes left with no hidden neighbour.
    pub to_untag: Vec<NodeId>,
    /// Revealed nodes that still border something hidden.
    pub to_tag: Vec<NodeId>,
}

/// Tags that lose their last hidden neighbour to a removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovePlan {
    pub to_untag: Vec<NodeId>,
}

/// Visible nodes that an insertion connects to something hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddPlan {
    pub to_tag: Vec<NodeId>,
}

impl GraphModel {
    /// Target nodes plus their descendants.
    fn expand_nodes(&self, ids: &[ElementId]) -> BTreeSet<NodeId> {
        let mut out = BTreeSet::new();
        for id in ids.iter().filter_map(ElementId::as_node) {
            if self.node(id).is_none() {
                continue;
            }
            out.insert(id);
            out.extend(self.descendants(id));
        }
        out
    }

    pub fn hide_plan(&self, ids: &[ElementId]) -> HidePlan {
        let hiding = self.expand_nodes(ids);
        let mut to_tag = BTreeSet::new();
        for target in &hiding {
            for neighbor in self.neighbors(*target) {
                if hiding.contains(&neighbor) {
                    continue;
                }
                let Some(node) = self.node(neighbor) else {
                    continue;
                };
                if node.visible && !node.scratch.thick_border {
                    to_tag.insert(neighbor);
                }
            }
        }
        HidePlan {
            to_tag: to_tag.into_iter().collect(),
        }
    }

    pub fn show_plan(&self, ids: &[ElementId]) -> ShowPlan {
        let revealing = self.expand_nodes(ids);
        let visible_after = |n: NodeId| {
            revealing.contains(&n) || self.node(n).is_some_and(|node| node.visible)
        };
        let hidden_neighbor_after = |n: NodeId| {
            self.neighbors(n).into_iter().any(|m| !visible_after(m))
        };

        let to_untag = self
            .thick_border_nodes()
            .into_iter()
            .filter(|n| !hidden_neighbor_after(*n))
            .collect();
        let to_tag = revealing
            .iter()
            .copied()
            .filter(|n| {
                self.node(*n)
                    .is_some_and(|node| !node.scratch.thick_border)
                    && hidden_neighbor_after(*n)
            })
            .collect();
        ShowPlan { to_untag, to_tag }
    }

    pub fn remove_plan(&self, ids: &[ElementId]) -> RemovePlan {
        let removing = self.expand_nodes(ids);
        let mut dropped: BTreeSet<EdgeId> = ids.iter().filter_map(ElementId::as_edge).collect();
        for n in &removing {
            dropped.extend(self.incident_edges(*n));
        }

        let keeps_hidden_neighbor = |n: NodeId| {
            self.incident_edges(n)
                .into_iter()
                .filter(|e| !dropped.contains(e))
                .filter_map(|e| self.edge(e).map(|edge| edge.other_end(n)))
                .any(|m| !removing.contains(&m) && !self.is_visible(ElementId::Node(m)))
        };
        let to_untag = self
            .thick_border_nodes()
            .into_iter()
            .filter(|n| !removing.contains(n) && !keeps_hidden_neighbor(*n))
            .collect();
        RemovePlan { to_untag }
    }

    /// Plan for inserting `added`; its nodes may not exist in the model yet.
    pub fn add_plan(&self, added: &RemovedElements) -> AddPlan {
        let lookup = |n: NodeId| {
            added
                .nodes
                .iter()
                .find(|d| d.id == n)
                .or_else(|| self.node(n))
                .map(|d| (d.visible, d.scratch.thick_border))
        };
        let mut to_tag = BTreeSet::new();
        for edge in &added.edges {
            for (a, b) in [(edge.source, edge.target), (edge.target, edge.source)] {
                if let (Some((true, false)), Some((false, _))) = (lookup(a), lookup(b)) {
                    to_tag.insert(a);
                }
            }
        }
        AddPlan {
            to_tag: to_tag.into_iter().collect(),
        }
    }

    /// Hide elements. Nodes take their descendants and incident edges along.
    /// Returns only the elements whose visibility actually changed.
    pub fn hide(&mut self, ids: &[ElementId]) -> Vec<ElementId> {
        let nodes = self.expand_nodes(ids);
        let mut targets: BTreeSet<ElementId> = nodes.iter().map(|n| ElementId::Node(*n)).collect();
        for n in &nodes {
            targets.extend(self.incident_edges(*n).into_iter().map(ElementId::Edge));
        }
        targets.extend(ids.iter().filter(|id| !id.is_node()).copied());
        self.set_visibility(&targets.into_iter().collect::<Vec<_>>(), false)
    }

    /// Show elements. Incident edges come back when their other endpoint is
    /// visible; an explicitly listed edge only when both endpoints are.
    pub fn show(&mut self, ids: &[ElementId]) -> Vec<ElementId> {
        let nodes = self.expand_nodes(ids);
        let mut changed = self.set_visibility(
            &nodes.iter().map(|n| ElementId::Node(*n)).collect::<Vec<_>>(),
            true,
        );

        let mut edges = BTreeSet::new();
        for n in &nodes {
            edges.extend(self.incident_edges(*n));
        }
        edges.extend(ids.iter().filter_map(ElementId::as_edge));
        let showable: Vec<ElementId> = edges
            .into_iter()
            .filter(|e| {
                self.edge(*e).is_some_and(|edge| {
                    self.is_visible(ElementId::Node(edge.source))
                        && self.is_visible(ElementId::Node(edge.target))
                })
            })
            .map(ElementId::Edge)
            .collect();
        changed.extend(self.set_visibility(&showable, true));
        changed
    }

    /// Flip visibility of exactly the given elements, no expansion.
    pub fn set_visibility(&mut self, ids: &[ElementId], visible: bool) -> Vec<ElementId> {
        ids.iter()
            .copied()
            .filter(|id| self.set_element_visible(*id, visible))
            .collect()
    }

    /// Returns the nodes that were not tagged before.
    pub fn tag_thick_border(&mut self, nodes: &[NodeId]) -> Vec<NodeId> {
        self.set_thick_border(nodes, true)
    }

    /// Returns the nodes that were tagged before.
    pub fn untag_thick_border(&mut self, nodes: &[NodeId]) -> Vec<NodeId> {
        self.set_thick_border(nodes, false)
    }

    fn set_thick_border(&mut self, nodes: &[NodeId], value: bool) -> Vec<NodeId> {
        let mut changed = Vec::new();
        for n in nodes {
            if let Some(scratch) = self.scratch_mut(*n) {
                if scratch.thick_border != value {
                    scratch.thick_border = value;
                    changed.push(*n);
                }
            }
        }
        changed
    }

    pub fn has_hidden_neighbor(&self, node: NodeId) -> bool {
        self.neighbors(node)
            .into_iter()
            .any(|m| !self.is_visible(ElementId::Node(m)))
    }

    pub fn thick_border_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| n.scratch.thick_border)
            .map(|n| n.id)
            .collect()
    }

    pub fn hidden_elements(&self) -> Vec<ElementId> {
        self.nodes()
            .filter(|n| !n.visible)
            .map(|n| ElementId::Node(n.id))
            .chain(
                self.edges()
                    .filter(|e| !e.visible)
                    .map(|e| ElementId::Edge(e.id)),
            )
            .collect()
    }
}

use graphdesk_core::{ElementGroup, ElementId, NodeId};
use graphdesk_graph::{GraphElement, GraphModel};
use serde_json::Value;
use std::fmt;

/// What clicking a panel entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkIntent {
    /// Show the entry in the panel.
    Retarget,
    /// Select the entry on the canvas.
    Select,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelLink {
    pub target: ElementId,
    pub label: String,
    pub intent: LinkIntent,
}

/// Rendered contents of the detail panel for one element.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub target: ElementId,
    pub group: ElementGroup,
    /// Root first.
    pub ancestors: Vec<PanelLink>,
    pub kind: String,
    pub id: String,
    pub name: String,
    /// Pretty-printed metadata; empty when there is none.
    pub metadata: String,
    pub neighbors: Vec<PanelLink>,
    pub siblings: Vec<PanelLink>,
    pub children: Vec<PanelLink>,
}

pub struct DetailPanel {
    current: Option<ElementId>,
}

impl Default for DetailPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailPanel {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn current(&self) -> Option<ElementId> {
        self.current
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Describe `element` and make it the panel's target. `None` when the
    /// element is not in the graph.
    pub fn describe(&mut self, model: &GraphModel, element: ElementId) -> Option<PanelView> {
        let view = build_view(model, element)?;
        self.current = Some(element);
        Some(view)
    }

    /// Rebuild the current view, dropping the target if it has gone away.
    pub fn refresh(&mut self, model: &GraphModel) -> Option<PanelView> {
        let target = self.current?;
        let view = build_view(model, target);
        if view.is_none() {
            tracing::debug!("Detail panel target {} no longer exists", target);
            self.current = None;
        }
        view
    }
}

fn build_view(model: &GraphModel, element: ElementId) -> Option<PanelView> {
    let el = model.element(element)?;
    let node_link = |id: NodeId, intent| PanelLink {
        target: ElementId::Node(id),
        label: node_label(model, id),
        intent,
    };

    let (ancestors, neighbors, siblings, children, name) = match el {
        GraphElement::Node(node) => (
            model
                .ancestors(node.id)
                .into_iter()
                .map(|id| node_link(id, LinkIntent::Retarget))
                .collect(),
            model
                .neighbors(node.id)
                .into_iter()
                .map(|id| node_link(id, LinkIntent::Select))
                .collect(),
            model
                .siblings(node.id)
                .into_iter()
                .map(|id| node_link(id, LinkIntent::Retarget))
                .collect(),
            model
                .children(node.id)
                .into_iter()
                .map(|id| node_link(id, LinkIntent::Retarget))
                .collect(),
            display_name(&node.name, &node.data),
        ),
        GraphElement::Edge(edge) => (
            Vec::new(),
            [edge.source, edge.target]
                .into_iter()
                .map(|id| node_link(id, LinkIntent::Select))
                .collect(),
            Vec::new(),
            Vec::new(),
            display_name("", &edge.data),
        ),
    };

    Some(PanelView {
        target: element,
        group: el.group(),
        ancestors,
        kind: el.kind().to_string(),
        id: match element {
            ElementId::Node(id) => id.to_string(),
            ElementId::Edge(id) => id.to_string(),
        },
        name,
        metadata: pretty_metadata(el.data()),
        neighbors,
        siblings,
        children,
    })
}

fn display_name(name: &str, data: &Value) -> String {
    if !name.is_empty() {
        return name.to_string();
    }
    data.get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn node_label(model: &GraphModel, id: NodeId) -> String {
    match model.node(id) {
        Some(node) => {
            let name = display_name(&node.name, &node.data);
            if name.is_empty() {
                format!("#{}", id)
            } else {
                format!("{} (#{})", name, id)
            }
        }
        None => format!("#{}", id),
    }
}

fn pretty_metadata(data: &Value) -> String {
    match data {
        Value::Null => String::new(),
        Value::Object(map) if map.is_empty() => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

fn write_links(f: &mut fmt::Formatter<'_>, title: &str, links: &[PanelLink]) -> fmt::Result {
    writeln!(f, "{}:", title)?;
    if links.is_empty() {
        writeln!(f, "  (none)")?;
    }
    for link in links {
        writeln!(f, "  - {}", link.label)?;
    }
    Ok(())
}

impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.ancestors.is_empty() {
            let chain: Vec<&str> = self.ancestors.iter().map(|l| l.label.as_str()).collect();
            writeln!(f, "{}", chain.join(" > "))?;
        }
        writeln!(f, "Type: {} {}", self.group, self.kind)?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Data:")?;
        for line in self.metadata.lines() {
            writeln!(f, "  {}", line)?;
        }
        write_links(f, "Neighbors", &self.neighbors)?;
        write_links(f, "Siblings", &self.siblings)?;
        write_links(f, "Children", &self.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphdesk_core::{EdgeId, Vec2};
    use graphdesk_graph::{EdgeData, NodeData};
    use serde_json::json;

    fn model() -> GraphModel {
        let mut m = GraphModel::new();
        m.add_node(NodeData::new(NodeId(1), "cluster", Vec2::ZERO).with_kind("group"))
            .unwrap();
        m.add_node(
            NodeData::new(NodeId(2), "api", Vec2::ZERO)
                .with_parent(NodeId(1))
                .with_kind("service")
                .with_data(json!({ "port": 8080 })),
        )
        .unwrap();
        m.add_node(NodeData::new(NodeId(3), "", Vec2::ZERO).with_parent(NodeId(1)))
            .unwrap();
        m.add_node(NodeData::new(NodeId(4), "db", Vec2::ZERO)).unwrap();
        m.add_edge(EdgeData::new(EdgeId(1), NodeId(2), NodeId(4)).with_kind("reads"))
            .unwrap();
        m
    }

    #[test]
    fn test_describe_node() {
        let m = model();
        let mut panel = DetailPanel::new();
        let view = panel.describe(&m, ElementId::Node(NodeId(2))).unwrap();

        assert_eq!(panel.current(), Some(ElementId::Node(NodeId(2))));
        assert_eq!(view.kind, "service");
        assert_eq!(view.name, "api");
        assert_eq!(view.id, "2");
        assert_eq!(view.ancestors.len(), 1);
        assert_eq!(view.ancestors[0].label, "cluster (#1)");
        assert_eq!(view.neighbors[0].target, ElementId::Node(NodeId(4)));
        assert_eq!(view.neighbors[0].intent, LinkIntent::Select);
        assert_eq!(view.siblings[0].label, "#3");
        assert!(view.children.is_empty());
        assert!(view.metadata.contains("\"port\": 8080"));
    }

    #[test]
    fn test_missing_data_renders_empty() {
        let m = model();
        let mut panel = DetailPanel::new();
        let view = panel.describe(&m, ElementId::Node(NodeId(3))).unwrap();
        assert_eq!(view.name, "");
        assert_eq!(view.kind, "");
        assert_eq!(view.metadata, "");

        let text = view.to_string();
        assert!(text.contains("Name: \n"));
        assert!(text.contains("Children:\n  (none)"));
    }

    #[test]
    fn test_describe_edge() {
        let m = model();
        let mut panel = DetailPanel::new();
        let view = panel.describe(&m, ElementId::Edge(EdgeId(1))).unwrap();
        assert_eq!(view.group, ElementGroup::Edge);
        assert_eq!(view.kind, "reads");
        assert_eq!(view.neighbors.len(), 2);
        assert!(view.ancestors.is_empty());
    }

    #[test]
    fn test_refresh_drops_removed_target() {
        let mut m = model();
        let mut panel = DetailPanel::new();
        panel.describe(&m, ElementId::Node(NodeId(4))).unwrap();
        m.remove(&[ElementId::Node(NodeId(4))]);

        assert!(panel.refresh(&m).is_none());
        assert_eq!(panel.current(), None);
    }

    #[test]
    fn test_unknown_element_is_none() {
        let m = model();
        let mut panel = DetailPanel::new();
        assert!(panel.describe(&m, ElementId::Node(NodeId(99))).is_none());
        assert_eq!(panel.current(), None);
    }
}

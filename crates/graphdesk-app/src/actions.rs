//! Built-in graph actions registered on every session.

use crate::error::ActionError;
use crate::undo_redo::{ActionContext, UndoRedo};
use graphdesk_core::{ElementId, GraphError, NodeId, Vec2, Viewport};
use graphdesk_events::{Event, EventBus};
use graphdesk_graph::{GraphModel, RemovedElements};

pub const ACTION_ADD: &str = "add";
pub const ACTION_REMOVE: &str = "remove";
pub const ACTION_MOVE: &str = "move";
pub const ACTION_SELECT: &str = "select";
pub const ACTION_HIDE: &str = "hide";
pub const ACTION_SHOW: &str = "show";
pub const ACTION_THICKEN_BORDER: &str = "thickenBorder";
pub const ACTION_THIN_BORDER: &str = "thinBorder";

/// Payload handed between forward and inverse handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphArgs {
    Elements(Vec<ElementId>),
    Nodes(Vec<NodeId>),
    Positions(Vec<(NodeId, Vec2)>),
    Snapshot(RemovedElements),
    Selection(Vec<ElementId>),
}

impl GraphArgs {
    fn elements(self, action: &str) -> Result<Vec<ElementId>, ActionError> {
        match self {
            GraphArgs::Elements(ids) => Ok(ids),
            _ => Err(invalid(action, "element")),
        }
    }

    fn nodes(self, action: &str) -> Result<Vec<NodeId>, ActionError> {
        match self {
            GraphArgs::Nodes(ids) => Ok(ids),
            _ => Err(invalid(action, "node")),
        }
    }

    fn positions(self, action: &str) -> Result<Vec<(NodeId, Vec2)>, ActionError> {
        match self {
            GraphArgs::Positions(p) => Ok(p),
            _ => Err(invalid(action, "position")),
        }
    }

    fn snapshot(self, action: &str) -> Result<RemovedElements, ActionError> {
        match self {
            GraphArgs::Snapshot(s) => Ok(s),
            _ => Err(invalid(action, "snapshot")),
        }
    }

    fn selection(self, action: &str) -> Result<Vec<ElementId>, ActionError> {
        match self {
            GraphArgs::Selection(ids) => Ok(ids),
            _ => Err(invalid(action, "selection")),
        }
    }
}

fn invalid(action: &str, expected: &'static str) -> ActionError {
    ActionError::InvalidArgs {
        action: action.to_string(),
        expected,
    }
}

/// State the action handlers mutate: the model plus where to report changes.
pub struct Canvas {
    pub model: GraphModel,
    pub viewport: Viewport,
    events: EventBus,
}

impl Canvas {
    pub fn new(model: GraphModel, events: EventBus) -> Self {
        Self {
            model,
            viewport: Viewport::default(),
            events,
        }
    }

    pub fn emit(&self, event: Event) {
        self.events.publish(event);
    }

    fn add(&mut self, snapshot: RemovedElements) -> Result<RemovedElements, ActionError> {
        self.model.restore(&snapshot)?;
        self.emit(Event::ElementsAdded {
            ids: snapshot.ids(),
        });
        Ok(snapshot)
    }

    fn remove(&mut self, ids: &[ElementId]) -> RemovedElements {
        let removed = self.model.remove(ids);
        self.emit(Event::ElementsRemoved {
            ids: removed.ids(),
        });
        removed
    }

    pub(crate) fn move_to(&mut self, positions: &[(NodeId, Vec2)]) -> Result<Vec<(NodeId, Vec2)>, ActionError> {
        // Every id is checked before anything moves.
        if let Some((missing, _)) = positions.iter().find(|(id, _)| self.model.node(*id).is_none()) {
            return Err(GraphError::UnknownNode(*missing).into());
        }
        let mut previous = Vec::with_capacity(positions.len());
        for (id, pos) in positions {
            previous.push((*id, self.model.set_position(*id, *pos)?));
        }
        self.emit(Event::NodesMoved {
            moves: positions.to_vec(),
        });
        Ok(previous)
    }

    fn select(&mut self, ids: &[ElementId]) -> Vec<ElementId> {
        let previous = self.model.set_selection(ids);
        self.emit(Event::SelectionChanged {
            selected: self.model.selected(),
        });
        previous
    }

    fn set_visible(&self, changed: Vec<ElementId>, visible: bool) -> Vec<ElementId> {
        if !changed.is_empty() {
            let ids = changed.clone();
            self.emit(if visible {
                Event::ElementsShown { ids }
            } else {
                Event::ElementsHidden { ids }
            });
        }
        changed
    }

    fn set_border(&mut self, nodes: &[NodeId], thick: bool) -> Vec<NodeId> {
        let changed = if thick {
            self.model.tag_thick_border(nodes)
        } else {
            self.model.untag_thick_border(nodes)
        };
        if !changed.is_empty() {
            let nodes = changed.clone();
            self.emit(if thick {
                Event::BorderThickened { nodes }
            } else {
                Event::BorderThinned { nodes }
            });
        }
        changed
    }
}

pub fn register_builtin_actions(history: &mut UndoRedo<Canvas, GraphArgs>) {
    history.register(
        ACTION_ADD,
        |c: &mut Canvas, args: GraphArgs, _: &ActionContext| {
            Ok(GraphArgs::Snapshot(c.add(args.snapshot(ACTION_ADD)?)?))
        },
        |c: &mut Canvas, args: GraphArgs, _: &ActionContext| {
            let ids = args.snapshot(ACTION_ADD)?.ids();
            Ok(GraphArgs::Snapshot(c.remove(&ids)))
        },
    );

    history.register(
        ACTION_REMOVE,
        |c: &mut Canvas, args: GraphArgs, _: &ActionContext| {
            let ids = args.elements(ACTION_REMOVE)?;
            Ok(GraphArgs::Snapshot(c.remove(&ids)))
        },
        |c: &mut Canvas, args: GraphArgs, _: &ActionContext| {
            let restored = c.add(args.snapshot(ACTION_REMOVE)?)?;
            Ok(GraphArgs::Elements(restored.ids()))
        },
    );

    // Moving is its own inverse: both directions return the previous positions.
    let move_nodes = |c: &mut Canvas, args: GraphArgs, _: &ActionContext| -> Result<GraphArgs, ActionError> {
        let positions = args.positions(ACTION_MOVE)?;
        Ok(GraphArgs::Positions(c.move_to(&positions)?))
    };
    history.register(ACTION_MOVE, move_nodes, move_nodes);

    let select = |c: &mut Canvas, args: GraphArgs, _: &ActionContext| -> Result<GraphArgs, ActionError> {
        let ids = args.selection(ACTION_SELECT)?;
        Ok(GraphArgs::Selection(c.select(&ids)))
    };
    history.register(ACTION_SELECT, select, select);

    history.register(
        ACTION_HIDE,
        |c: &mut Canvas, args: GraphArgs, _: &ActionContext| {
            let ids = args.elements(ACTION_HIDE)?;
            let changed = c.model.hide(&ids);
            Ok(GraphArgs::Elements(c.set_visible(changed, false)))
        },
        |c: &mut Canvas, args: GraphArgs, _: &ActionContext| {
            let ids = args.elements(ACTION_HIDE)?;
            let changed = c.model.set_visibility(&ids, true);
            Ok(GraphArgs::Elements(c.set_visible(changed, true)))
        },
    );

    history.register(
        ACTION_SHOW,
        |c: &mut Canvas, args: GraphArgs, _: &ActionContext| {
            let ids = args.elements(ACTION_SHOW)?;
            let changed = c.model.show(&ids);
            Ok(GraphArgs::Elements(c.set_visible(changed, true)))
        },
        |c: &mut Canvas, args: GraphArgs, _: &ActionContext| {
            let ids = args.elements(ACTION_SHOW)?;
            let changed = c.model.set_visibility(&ids, false);
            Ok(GraphArgs::Elements(c.set_visible(changed, false)))
        },
    );

    let thicken = |c: &mut Canvas, args: GraphArgs, _: &ActionContext| -> Result<GraphArgs, ActionError> {
        let nodes = args.nodes(ACTION_THICKEN_BORDER)?;
        Ok(GraphArgs::Nodes(c.set_border(&nodes, true)))
    };
    let thin = |c: &mut Canvas, args: GraphArgs, _: &ActionContext| -> Result<GraphArgs, ActionError> {
        let nodes = args.nodes(ACTION_THIN_BORDER)?;
        Ok(GraphArgs::Nodes(c.set_border(&nodes, false)))
    };
    history.register(ACTION_THICKEN_BORDER, thicken, thin);
    history.register(ACTION_THIN_BORDER, thin, thicken);
}

//! One interactive editing session over a graph.
//!
//! The session owns everything a canvas needs: the model, the undo stack, the
//! event bus, the in-flight drag and the detail panel. Nothing is global, so
//! several sessions can live side by side.

use crate::actions::{
    ACTION_ADD, ACTION_HIDE, ACTION_MOVE, ACTION_REMOVE, ACTION_SELECT, ACTION_SHOW,
    ACTION_THICKEN_BORDER, ACTION_THIN_BORDER, Canvas, GraphArgs, register_builtin_actions,
};
use crate::debounce::Debouncer;
use crate::detail_panel::{DetailPanel, LinkIntent, PanelLink, PanelView};
use crate::error::ActionError;
use crate::settings::Settings;
use crate::undo_redo::{ActionContext, UndoRedo};
use graphdesk_core::{ElementId, NodeId, Rect, Vec2, Viewport};
use graphdesk_events::{Event, EventBus};
use graphdesk_graph::{
    DragOutcome, DragSnap, DragUpdate, EdgeData, GraphModel, NodeData, RemovedElements,
    snap_to_grid,
};
use std::time::Instant;

pub struct GraphSession {
    canvas: Canvas,
    history: UndoRedo<Canvas, GraphArgs>,
    events: EventBus,
    settings: Settings,
    drag: Option<DragSnap>,
    panel: DetailPanel,
    panel_refresh: Debouncer<ElementId>,
}

impl GraphSession {
    pub fn new(model: GraphModel, settings: Settings) -> Self {
        let events = EventBus::new();
        let mut history = UndoRedo::new(settings.undo.clone(), events.clone());
        register_builtin_actions(&mut history);
        tracing::info!(
            "Session started with {} nodes and {} edges",
            model.node_count(),
            model.edge_count()
        );
        Self {
            canvas: Canvas::new(model, events.clone()),
            history,
            events,
            panel_refresh: Debouncer::new(settings.debounce()),
            settings,
            drag: None,
            panel: DetailPanel::new(),
        }
    }

    pub fn model(&self) -> &GraphModel {
        &self.canvas.model
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &UndoRedo<Canvas, GraphArgs> {
        &self.history
    }

    pub fn viewport(&self) -> Viewport {
        self.canvas.viewport
    }

    /// Zoom must be a positive, finite factor.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), ActionError> {
        if !(viewport.zoom.is_finite() && viewport.zoom > 0.0) {
            return Err(ActionError::InvalidZoom(viewport.zoom));
        }
        self.canvas.viewport = viewport;
        Ok(())
    }

    pub fn panel(&self) -> &DetailPanel {
        &self.panel
    }

    /// Add a host-defined action to the session's stack.
    pub fn register_action<D, U>(&mut self, name: impl Into<String>, do_fn: D, undo_fn: U)
    where
        D: Fn(&mut Canvas, GraphArgs, &ActionContext) -> Result<GraphArgs, ActionError> + 'static,
        U: Fn(&mut Canvas, GraphArgs, &ActionContext) -> Result<GraphArgs, ActionError> + 'static,
    {
        self.history.register(name, do_fn, undo_fn);
    }

    pub fn execute(&mut self, name: &str, args: GraphArgs) -> Result<GraphArgs, ActionError> {
        self.history.execute(&mut self.canvas, name, args)
    }

    pub fn batch(&mut self, entries: Vec<(String, GraphArgs)>) -> Result<Vec<GraphArgs>, ActionError> {
        self.history.batch(&mut self.canvas, entries)
    }

    /// Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool, ActionError> {
        Ok(self.history.undo(&mut self.canvas)?.is_some())
    }

    /// Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool, ActionError> {
        Ok(self.history.redo(&mut self.canvas)?.is_some())
    }

    /// Run `entries` as one undo step. A single entry is recorded under its
    /// own name rather than as a batch.
    fn record(&mut self, mut entries: Vec<(String, GraphArgs)>) -> Result<Vec<GraphArgs>, ActionError> {
        if entries.len() == 1 {
            let (name, args) = entries.remove(0);
            return Ok(vec![self.execute(&name, args)?]);
        }
        self.batch(entries)
    }

    pub fn add_node(&mut self, node: NodeData) -> Result<(), ActionError> {
        self.add(RemovedElements {
            nodes: vec![node],
            edges: Vec::new(),
        })
    }

    pub fn add_edge(&mut self, edge: EdgeData) -> Result<(), ActionError> {
        self.add(RemovedElements {
            nodes: Vec::new(),
            edges: vec![edge],
        })
    }

    /// Insert elements, tagging visible nodes they connect to hidden ones.
    fn add(&mut self, snapshot: RemovedElements) -> Result<(), ActionError> {
        let plan = self.canvas.model.add_plan(&snapshot);
        let mut entries = vec![(ACTION_ADD.to_string(), GraphArgs::Snapshot(snapshot))];
        if !plan.to_tag.is_empty() {
            entries.push((ACTION_THICKEN_BORDER.to_string(), GraphArgs::Nodes(plan.to_tag)));
        }
        self.record(entries)?;
        Ok(())
    }

    /// Remove elements together with descendants and incident edges, and
    /// untag nodes that no longer border anything hidden.
    pub fn remove(&mut self, ids: &[ElementId]) -> Result<Vec<ElementId>, ActionError> {
        let plan = self.canvas.model.remove_plan(ids);
        let mut entries = Vec::with_capacity(2);
        if !plan.to_untag.is_empty() {
            entries.push((ACTION_THIN_BORDER.to_string(), GraphArgs::Nodes(plan.to_untag)));
        }
        entries.push((ACTION_REMOVE.to_string(), GraphArgs::Elements(ids.to_vec())));
        match self.record(entries)?.pop() {
            Some(GraphArgs::Snapshot(removed)) => Ok(removed.ids()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn move_nodes(&mut self, positions: &[(NodeId, Vec2)]) -> Result<(), ActionError> {
        self.execute(ACTION_MOVE, GraphArgs::Positions(positions.to_vec()))?;
        Ok(())
    }

    pub fn select(&mut self, ids: &[ElementId]) -> Result<(), ActionError> {
        self.execute(ACTION_SELECT, GraphArgs::Selection(ids.to_vec()))?;
        Ok(())
    }

    /// Hide elements and tag the visible neighbours left behind, as one
    /// undo step. Returns the elements that became hidden.
    pub fn hide(&mut self, ids: &[ElementId]) -> Result<Vec<ElementId>, ActionError> {
        let plan = self.canvas.model.hide_plan(ids);
        let mut entries = Vec::with_capacity(2);
        if !plan.to_tag.is_empty() {
            entries.push((ACTION_THICKEN_BORDER.to_string(), GraphArgs::Nodes(plan.to_tag)));
        }
        entries.push((ACTION_HIDE.to_string(), GraphArgs::Elements(ids.to_vec())));
        let results = self.record(entries)?;
        Ok(last_elements(results))
    }

    /// Reveal elements and fix up border tags, as one undo step. Returns the
    /// elements that became visible.
    pub fn show(&mut self, ids: &[ElementId]) -> Result<Vec<ElementId>, ActionError> {
        let plan = self.canvas.model.show_plan(ids);
        let mut entries = Vec::with_capacity(3);
        if !plan.to_untag.is_empty() {
            entries.push((ACTION_THIN_BORDER.to_string(), GraphArgs::Nodes(plan.to_untag)));
        }
        entries.push((ACTION_SHOW.to_string(), GraphArgs::Elements(ids.to_vec())));
        let tag = !plan.to_tag.is_empty();
        if tag {
            entries.push((ACTION_THICKEN_BORDER.to_string(), GraphArgs::Nodes(plan.to_tag)));
        }
        let mut results = self.record(entries)?;
        if tag {
            results.pop();
        }
        Ok(last_elements(results))
    }

    /// Reveal everything and clear every border tag.
    pub fn show_all(&mut self) -> Result<Vec<ElementId>, ActionError> {
        let hidden = self.canvas.model.hidden_elements();
        let tagged = self.canvas.model.thick_border_nodes();
        let mut entries = Vec::with_capacity(2);
        if !tagged.is_empty() {
            entries.push((ACTION_THIN_BORDER.to_string(), GraphArgs::Nodes(tagged)));
        }
        if !hidden.is_empty() {
            entries.push((ACTION_SHOW.to_string(), GraphArgs::Elements(hidden)));
        }
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let results = self.record(entries)?;
        Ok(last_elements(results))
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn begin_drag(&mut self, nodes: &[NodeId]) -> Result<(), ActionError> {
        if self.drag.is_some() {
            tracing::warn!("New drag started before the previous one ended");
        }
        let drag = DragSnap::begin(
            &self.canvas.model,
            nodes,
            self.canvas.viewport,
            self.settings.snap.clone(),
        )?;
        tracing::debug!("Drag started on {} nodes", nodes.len());
        self.drag = Some(drag);
        Ok(())
    }

    /// Feed the pointer displacement since `begin_drag`, in rendered pixels.
    pub fn drag_to(&mut self, pointer: Vec2) -> Result<DragUpdate, ActionError> {
        let drag = self.drag.as_mut().ok_or(ActionError::NoDrag)?;
        let update = drag.update(pointer);
        // The whole group moves by one offset, so every node is offered it.
        for node in drag.nodes() {
            for snap in [&update.result.x, &update.result.y].into_iter().flatten() {
                self.events.publish(Event::SnapOffered {
                    node,
                    axis: snap.axis,
                    offset: snap.offset,
                });
            }
        }
        Ok(update)
    }

    /// Drop the drag without moving anything.
    pub fn cancel_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Commit the drag. Falls back to grid snapping when no guideline matched.
    pub fn end_drag(&mut self) -> Result<DragOutcome, ActionError> {
        let drag = self.drag.take().ok_or(ActionError::NoDrag)?;
        let mut outcome = drag.release();
        // Nodes removed while the drag was in flight are dropped.
        outcome.moves.retain(|(id, _)| {
            let alive = self.canvas.model.node(*id).is_some();
            if !alive {
                tracing::debug!("Dropping stale drag target {}", id);
            }
            alive
        });
        if outcome.moves.is_empty() {
            return Ok(outcome);
        }

        if !outcome.snapped {
            if let Some(spacing) = self.settings.snap.grid {
                let offset = snap_to_grid(&self.moved_bounds(&outcome.moves), spacing);
                if offset != Vec2::ZERO {
                    for (_, pos) in &mut outcome.moves {
                        *pos = *pos + offset;
                    }
                    let zoom = self.canvas.viewport.zoom;
                    outcome.correction =
                        outcome.correction + Vec2::new(offset.x * zoom, offset.y * zoom);
                    outcome.snapped = true;
                }
            }
        }

        if outcome.snapped {
            for (node, _) in &outcome.moves {
                self.events.publish(Event::NodeSnapped {
                    node: *node,
                    offset: outcome.correction,
                });
            }
        }

        if self.history.options().undoable_drag {
            self.execute(ACTION_MOVE, GraphArgs::Positions(outcome.moves.clone()))?;
        } else {
            self.canvas.move_to(&outcome.moves)?;
        }
        Ok(outcome)
    }

    /// Model-space bounding box of the given nodes at their new positions.
    fn moved_bounds(&self, moves: &[(NodeId, Vec2)]) -> Rect {
        let mut bounds: Option<Rect> = None;
        for (id, pos) in moves {
            let Some(node) = self.canvas.model.node(*id) else {
                continue;
            };
            let r = Rect::from_center_size(*pos, node.size);
            bounds = Some(match bounds {
                None => r,
                Some(b) => Rect::from_min_max(
                    Vec2::new(b.min.x.min(r.min.x), b.min.y.min(r.min.y)),
                    Vec2::new(b.max.x.max(r.max.x), b.max.y.max(r.max.y)),
                ),
            });
        }
        bounds.unwrap_or_default()
    }

    pub fn describe(&mut self, element: ElementId) -> Option<PanelView> {
        let view = self.panel.describe(&self.canvas.model, element);
        match &view {
            Some(_) => self.events.publish(Event::PanelRetargeted { target: element }),
            None => self.events.publish(Event::ShowWarning {
                message: format!("{} does not exist", element),
            }),
        }
        view
    }

    /// Follow a panel link. Retarget links return the new view; select links
    /// change the canvas selection and return `None`.
    pub fn activate(&mut self, link: &PanelLink) -> Result<Option<PanelView>, ActionError> {
        match link.intent {
            LinkIntent::Retarget => Ok(self.describe(link.target)),
            LinkIntent::Select => {
                self.select(&[link.target])?;
                Ok(None)
            }
        }
    }

    /// Queue a panel refresh for `element`; bursts collapse to the last one.
    pub fn request_panel_refresh(&mut self, element: ElementId, now: Instant) {
        self.panel_refresh.request(element, now);
    }

    /// Run deferred panel work whose window has passed. Ids captured before
    /// the window are checked again; ones removed meanwhile are dropped.
    pub fn flush_deferred(&mut self, now: Instant) -> Option<PanelView> {
        let element = self.panel_refresh.poll(now)?;
        if !self.canvas.model.contains(element) {
            tracing::debug!("Dropping deferred refresh for removed {}", element);
            return None;
        }
        self.describe(element)
    }
}

fn last_elements(results: Vec<GraphArgs>) -> Vec<ElementId> {
    match results.into_iter().last() {
        Some(GraphArgs::Elements(ids)) => ids,
        _ => Vec::new(),
    }
}

//! Alignment guidelines for dragged nodes.
//!
//! Static nodes are indexed by the rendered coordinates of their three anchors
//! per axis (start, center, end). While dragging, two searches run per axis:
//!
//! * geometric: an anchor of the dragged box lies within `tolerance` of an
//!   anchor of a static node that is within `geometric_range` on the other axis;
//! * distribution: the dragged box sits (almost) equally spaced between static
//!   neighbours on that axis.
//!
//! The correction with the smaller magnitude wins. All distances are in
//! rendered pixels; ranges scale with the zoom level.

use crate::index::CoordinateIndex;
use crate::model::GraphModel;
use graphdesk_core::{Axis, GraphError, NodeId, Rect, Vec2, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    pub geometric: bool,
    pub distribution: bool,
    pub tolerance: f32,
    pub geometric_range: f32,
    pub distribution_range: f32,
    pub min_distribution_gap: f32,
    /// Apply corrections while dragging instead of on release.
    pub continuous: bool,
    /// Pointer travel needed to break a continuous snap.
    pub lock_distance: f32,
    /// Grid spacing in model units. `None` disables grid snapping.
    pub grid: Option<f32>,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            geometric: true,
            distribution: true,
            tolerance: 2.0,
            geometric_range: 400.0,
            distribution_range: 100.0,
            min_distribution_gap: 10.0,
            continuous: false,
            lock_distance: 4.0,
            grid: None,
        }
    }
}

/// Which neighbours an equal-gap match was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionKind {
    /// One static node on each side.
    Between,
    /// Two static nodes before the dragged one.
    Before,
    /// Two static nodes after the dragged one.
    After,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapSource {
    Geometric {
        coordinate: f32,
        aligned: Vec<NodeId>,
    },
    Distribution {
        kind: DistributionKind,
        first: NodeId,
        second: NodeId,
        gap: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSnap {
    pub axis: Axis,
    pub offset: f32,
    pub source: SnapSource,
}

/// Line or gap marker for the renderer, in rendered coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Guideline {
    /// A line perpendicular to `axis` at `coordinate`.
    Geometric {
        axis: Axis,
        coordinate: f32,
        nodes: Vec<NodeId>,
    },
    Distribution {
        axis: Axis,
        kind: DistributionKind,
        first: NodeId,
        second: NodeId,
        gap: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapResult {
    pub x: Option<AxisSnap>,
    pub y: Option<AxisSnap>,
}

impl SnapResult {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none()
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::new(
            self.x.as_ref().map_or(0.0, |s| s.offset),
            self.y.as_ref().map_or(0.0, |s| s.offset),
        )
    }

    pub fn axis(&self, axis: Axis) -> Option<&AxisSnap> {
        match axis {
            Axis::X => self.x.as_ref(),
            Axis::Y => self.y.as_ref(),
        }
    }

    pub fn guidelines(&self) -> Vec<Guideline> {
        [&self.x, &self.y]
            .into_iter()
            .flatten()
            .map(|snap| match &snap.source {
                SnapSource::Geometric {
                    coordinate,
                    aligned,
                } => Guideline::Geometric {
                    axis: snap.axis,
                    coordinate: *coordinate,
                    nodes: aligned.clone(),
                },
                SnapSource::Distribution {
                    kind,
                    first,
                    second,
                    gap,
                } => Guideline::Distribution {
                    axis: snap.axis,
                    kind: *kind,
                    first: *first,
                    second: *second,
                    gap: *gap,
                },
            })
            .collect()
    }
}

/// Rendered rectangles of the static nodes, indexed per axis.
#[derive(Debug, Clone, Default)]
pub struct SnapIndex {
    rects: HashMap<NodeId, Rect>,
    x: CoordinateIndex,
    y: CoordinateIndex,
}

impl SnapIndex {
    /// Index every visible node except the active ones and anything nested
    /// with them.
    pub fn build(model: &GraphModel, active: &[NodeId], viewport: &Viewport) -> Self {
        let mut excluded: BTreeSet<NodeId> = BTreeSet::new();
        for id in active {
            excluded.insert(*id);
            excluded.extend(model.descendants(*id));
            excluded.extend(model.ancestors(*id));
        }

        let mut index = Self::default();
        for node in model.nodes() {
            if !node.visible || excluded.contains(&node.id) {
                continue;
            }
            index.insert(node.id, viewport.rect_to_rendered(&node.bounds()));
        }
        tracing::debug!("Snap index built over {} static nodes", index.rects.len());
        index
    }

    pub fn insert(&mut self, id: NodeId, rect: Rect) {
        if let Some(old) = self.rects.insert(id, rect) {
            for key in old.anchors(Axis::X) {
                self.x.remove(key, id);
            }
            for key in old.anchors(Axis::Y) {
                self.y.remove(key, id);
            }
        }
        for key in rect.anchors(Axis::X) {
            self.x.insert(key, id);
        }
        for key in rect.anchors(Axis::Y) {
            self.y.insert(key, id);
        }
    }

    pub fn axis(&self, axis: Axis) -> &CoordinateIndex {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.rects.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SnapEngine {
    settings: SnapSettings,
    index: SnapIndex,
    zoom: f32,
}

impl SnapEngine {
    pub fn new(settings: SnapSettings, index: SnapIndex, zoom: f32) -> Self {
        Self {
            settings,
            index,
            zoom,
        }
    }

    pub fn settings(&self) -> &SnapSettings {
        &self.settings
    }

    pub fn index(&self) -> &SnapIndex {
        &self.index
    }

    /// Best correction per axis for a dragged box in rendered space.
    pub fn evaluate(&self, rect: &Rect) -> SnapResult {
        SnapResult {
            x: self.evaluate_axis(rect, Axis::X),
            y: self.evaluate_axis(rect, Axis::Y),
        }
    }

    fn evaluate_axis(&self, rect: &Rect, axis: Axis) -> Option<AxisSnap> {
        let geometric = if self.settings.geometric {
            self.geometric(rect, axis)
        } else {
            None
        };
        let distribution = if self.settings.distribution {
            self.distribution(rect, axis)
        } else {
            None
        };
        match (geometric, distribution) {
            (Some(g), Some(d)) => {
                if d.offset.abs() < g.offset.abs() {
                    Some(d)
                } else {
                    Some(g)
                }
            }
            (g, d) => g.or(d),
        }
    }

    pub fn geometric(&self, rect: &Rect, axis: Axis) -> Option<AxisSnap> {
        let range = self.settings.geometric_range * self.zoom;
        let tolerance = self.settings.tolerance;
        let mut best: Option<(f32, f32, Vec<NodeId>)> = None;

        for anchor in rect.anchors(axis) {
            for (key, ids) in self.index.axis(axis).around(anchor, tolerance) {
                let aligned: Vec<NodeId> = ids
                    .iter()
                    .copied()
                    .filter(|id| {
                        self.index
                            .rect(*id)
                            .is_some_and(|r| rect.distance_on(&r, axis.other()) <= range)
                    })
                    .collect();
                if aligned.is_empty() {
                    continue;
                }
                let offset = key - anchor;
                if best
                    .as_ref()
                    .is_none_or(|(current, _, _)| offset.abs() < current.abs())
                {
                    best = Some((offset, key, aligned));
                }
            }
        }

        best.map(|(offset, coordinate, aligned)| AxisSnap {
            axis,
            offset,
            source: SnapSource::Geometric {
                coordinate,
                aligned,
            },
        })
    }

    pub fn distribution(&self, rect: &Rect, axis: Axis) -> Option<AxisSnap> {
        let range = self.settings.distribution_range * self.zoom;
        let tolerance = self.settings.tolerance;
        let min_gap = self.settings.min_distribution_gap;
        let other = axis.other();

        let mut seen = BTreeSet::new();
        let mut before: Vec<(NodeId, Rect)> = Vec::new();
        let mut after: Vec<(NodeId, Rect)> = Vec::new();
        let window = self
            .index
            .axis(axis)
            .range(rect.start(axis) - range, rect.end(axis) + range);
        for (_, ids) in window {
            for id in ids {
                if !seen.insert(*id) {
                    continue;
                }
                let Some(r) = self.index.rect(*id) else {
                    continue;
                };
                if !r.overlaps_on(rect, other) || r.distance_on(rect, axis) > range {
                    continue;
                }
                if r.end(axis) <= rect.start(axis) {
                    before.push((*id, r));
                } else if r.start(axis) >= rect.end(axis) {
                    after.push((*id, r));
                }
            }
        }
        // Nearest first.
        before.sort_by(|a, b| b.1.end(axis).total_cmp(&a.1.end(axis)));
        after.sort_by(|a, b| a.1.start(axis).total_cmp(&b.1.start(axis)));

        let snap = |offset: f32, kind: DistributionKind, first: NodeId, second: NodeId, gap: f32| AxisSnap {
            axis,
            offset,
            source: SnapSource::Distribution {
                kind,
                first,
                second,
                gap,
            },
        };

        let nearest_before = before.first();
        let nearest_after = after.first();

        if let (Some((b_id, b)), Some((a_id, a))) = (nearest_before, nearest_after) {
            let gap_before = rect.start(axis) - b.end(axis);
            let gap_after = a.start(axis) - rect.end(axis);
            let gap = (gap_before + gap_after) * 0.5;
            if (gap_after - gap_before).abs() <= 2.0 * tolerance && gap >= min_gap {
                let offset = (gap_after - gap_before) * 0.5;
                return Some(snap(offset, DistributionKind::Between, *b_id, *a_id, gap));
            }
        }

        // TODO: confirm against the canvas whether the one-sided fallbacks
        // should share a formula; they are mirrored, not unified.
        if let Some((b_id, b)) = nearest_before {
            let gap_before = rect.start(axis) - b.end(axis);
            let further = before
                .iter()
                .skip(1)
                .find(|(_, r)| r.end(axis) <= b.start(axis));
            if let Some((f_id, f)) = further {
                let prev_gap = b.start(axis) - f.end(axis);
                let offset = prev_gap - gap_before;
                if offset.abs() <= tolerance && prev_gap >= min_gap {
                    return Some(snap(offset, DistributionKind::Before, *f_id, *b_id, prev_gap));
                }
            }
        }

        if let Some((a_id, a)) = nearest_after {
            let gap_after = a.start(axis) - rect.end(axis);
            let further = after
                .iter()
                .skip(1)
                .find(|(_, r)| r.start(axis) >= a.end(axis));
            if let Some((f_id, f)) = further {
                let next_gap = f.start(axis) - a.end(axis);
                let offset = gap_after - next_gap;
                if offset.abs() <= tolerance && next_gap >= min_gap {
                    return Some(snap(offset, DistributionKind::After, *a_id, *f_id, next_gap));
                }
            }
        }

        None
    }
}

#[derive(Debug, Clone, Copy)]
struct SnapLock {
    /// Pointer delta at the moment the snap engaged.
    pointer: Vec2,
    /// Delta the nodes are pinned to.
    snapped: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragUpdate {
    /// Rendered displacement to display the dragged nodes at.
    pub delta: Vec2,
    pub result: SnapResult,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragOutcome {
    /// New model positions for every dragged node.
    pub moves: Vec<(NodeId, Vec2)>,
    /// Snap correction included in the moves, rendered pixels.
    pub correction: Vec2,
    pub snapped: bool,
}

/// State for one drag gesture over one or more nodes.
#[derive(Debug, Clone)]
pub struct DragSnap {
    origins: Vec<(NodeId, Vec2)>,
    start_rect: Rect,
    viewport: Viewport,
    engine: SnapEngine,
    lock: Option<SnapLock>,
    pointer: Vec2,
    last: SnapResult,
}

impl DragSnap {
    pub fn begin(
        model: &GraphModel,
        active: &[NodeId],
        viewport: Viewport,
        settings: SnapSettings,
    ) -> Result<Self, GraphError> {
        let mut origins = Vec::with_capacity(active.len());
        let mut bounds: Option<Rect> = None;
        for id in active {
            let node = model.node(*id).ok_or(GraphError::UnknownNode(*id))?;
            origins.push((*id, node.position));
            let r = viewport.rect_to_rendered(&node.bounds());
            bounds = Some(match bounds {
                None => r,
                Some(b) => Rect::from_min_max(
                    Vec2::new(b.min.x.min(r.min.x), b.min.y.min(r.min.y)),
                    Vec2::new(b.max.x.max(r.max.x), b.max.y.max(r.max.y)),
                ),
            });
        }
        let start_rect = bounds.unwrap_or_default();
        let index = SnapIndex::build(model, active, &viewport);
        Ok(Self {
            origins,
            start_rect,
            viewport,
            engine: SnapEngine::new(settings, index, viewport.zoom),
            lock: None,
            pointer: Vec2::ZERO,
            last: SnapResult::default(),
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.origins.iter().map(|(id, _)| *id)
    }

    pub fn engine(&self) -> &SnapEngine {
        &self.engine
    }

    /// Feed the pointer displacement since the drag started (rendered px).
    pub fn update(&mut self, pointer: Vec2) -> DragUpdate {
        self.pointer = pointer;
        if let Some(lock) = self.lock {
            if (pointer - lock.pointer).length() <= self.engine.settings.lock_distance {
                return DragUpdate {
                    delta: lock.snapped,
                    result: self.last.clone(),
                    locked: true,
                };
            }
            tracing::debug!("Snap lock released after pointer moved to {:?}", pointer);
            self.lock = None;
        }

        let result = self.engine.evaluate(&self.start_rect.translate(pointer));
        let mut delta = pointer;
        let mut locked = false;
        if self.engine.settings.continuous && !result.is_empty() {
            delta = pointer + result.offset();
            self.lock = Some(SnapLock {
                pointer,
                snapped: delta,
            });
            locked = true;
        }
        self.last = result.clone();
        DragUpdate {
            delta,
            result,
            locked,
        }
    }

    pub fn last_result(&self) -> &SnapResult {
        &self.last
    }

    /// Finish the gesture and compute final model positions.
    pub fn release(self) -> DragOutcome {
        // A live lock pins the nodes where they were last shown.
        let (delta, correction) = match self.lock {
            Some(lock) => (lock.snapped, lock.snapped - self.pointer),
            None => {
                let offset = self.last.offset();
                (self.pointer + offset, offset)
            }
        };
        let snapped = !self.last.is_empty();
        let model_delta = Vec2::new(
            self.viewport.length_to_model(delta.x),
            self.viewport.length_to_model(delta.y),
        );
        let moves = self
            .origins
            .iter()
            .map(|(id, origin)| (*id, *origin + model_delta))
            .collect();
        DragOutcome {
            moves,
            correction,
            snapped,
        }
    }
}

/// Offset that moves `rect`'s top-left corner onto the nearest grid point.
pub fn snap_to_grid(rect: &Rect, spacing: f32) -> Vec2 {
    if spacing <= 0.0 {
        return Vec2::ZERO;
    }
    let snap = |v: f32| (v / spacing).round() * spacing - v;
    Vec2::new(snap(rect.min.x), snap(rect.min.y))
}

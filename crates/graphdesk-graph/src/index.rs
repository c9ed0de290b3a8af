use graphdesk_core::NodeId;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Width substituted for a zero-width query. Keys are computed from
/// center +/- half size, so exact float equality cannot be relied on.
pub const ZERO_RANGE_EPSILON: f32 = 1e-3;

/// Total-ordered wrapper so coordinates can key a `BTreeMap`.
#[derive(Debug, Clone, Copy)]
pub struct Coord(pub f32);

impl PartialEq for Coord {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Coord {}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Ordered map from a coordinate to the nodes with an anchor there.
#[derive(Debug, Clone, Default)]
pub struct CoordinateIndex {
    entries: BTreeMap<Coord, Vec<NodeId>>,
}

impl CoordinateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: f32, node: NodeId) {
        let ids = self.entries.entry(Coord(key)).or_default();
        if !ids.contains(&node) {
            ids.push(node);
        }
    }

    pub fn remove(&mut self, key: f32, node: NodeId) {
        if let Some(ids) = self.entries.get_mut(&Coord(key)) {
            ids.retain(|n| *n != node);
            if ids.is_empty() {
                self.entries.remove(&Coord(key));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with `lo <= key <= hi`, in key order.
    pub fn range(&self, lo: f32, hi: f32) -> impl Iterator<Item = (f32, &[NodeId])> {
        let (lo, hi) = if hi - lo <= 0.0 {
            let mid = (lo + hi) * 0.5;
            (mid - ZERO_RANGE_EPSILON, mid + ZERO_RANGE_EPSILON)
        } else {
            (lo, hi)
        };
        self.entries
            .range((Bound::Included(Coord(lo)), Bound::Included(Coord(hi))))
            .map(|(k, v)| (k.0, v.as_slice()))
    }

    /// Entries within `tolerance` of `center`.
    pub fn around(&self, center: f32, tolerance: f32) -> impl Iterator<Item = (f32, &[NodeId])> {
        self.range(center - tolerance, center + tolerance)
    }
}

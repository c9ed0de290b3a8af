use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn get(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn with(mut self, axis: Axis, value: f32) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
        }
        self
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// A rectangle defined by min and max corners
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Nodes are positioned by their center, so this is the common constructor.
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = Vec2::new(size.x * 0.5, size.y * 0.5);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.min.x + self.width() * 0.5,
            self.min.y + self.height() * 0.5,
        )
    }

    /// Leading edge on the axis (left for X, top for Y).
    pub fn start(&self, axis: Axis) -> f32 {
        self.min.get(axis)
    }

    /// Trailing edge on the axis (right for X, bottom for Y).
    pub fn end(&self, axis: Axis) -> f32 {
        self.max.get(axis)
    }

    pub fn mid(&self, axis: Axis) -> f32 {
        self.center().get(axis)
    }

    /// The three representative coordinates on an axis: start, center, end.
    pub fn anchors(&self, axis: Axis) -> [f32; 3] {
        [self.start(axis), self.mid(axis), self.end(axis)]
    }

    pub fn translate(&self, delta: Vec2) -> Rect {
        Rect {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Whether the projections of both rectangles onto `axis` intersect.
    pub fn overlaps_on(&self, other: &Rect, axis: Axis) -> bool {
        self.start(axis) <= other.end(axis) && self.end(axis) >= other.start(axis)
    }

    /// Gap between the projections onto `axis`; zero when they overlap.
    pub fn distance_on(&self, other: &Rect, axis: Axis) -> f32 {
        if self.overlaps_on(other, axis) {
            0.0
        } else if self.end(axis) < other.start(axis) {
            other.start(axis) - self.end(axis)
        } else {
            self.start(axis) - other.end(axis)
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// Pan and zoom of the canvas. Rendered = model * zoom + pan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f32,
    pub pan: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl Viewport {
    pub fn to_rendered(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x * self.zoom + self.pan.x, p.y * self.zoom + self.pan.y)
    }

    pub fn to_model(&self, p: Vec2) -> Vec2 {
        Vec2::new((p.x - self.pan.x) / self.zoom, (p.y - self.pan.y) / self.zoom)
    }

    pub fn rect_to_rendered(&self, r: &Rect) -> Rect {
        Rect::from_min_max(self.to_rendered(r.min), self.to_rendered(r.max))
    }

    /// Converts a rendered-space distance into model space.
    pub fn length_to_model(&self, len: f32) -> f32 {
        len / self.zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_anchors() {
        let r = Rect::from_center_size(Vec2::new(100.0, 50.0), Vec2::new(20.0, 10.0));
        assert_eq!(r.anchors(Axis::X), [90.0, 100.0, 110.0]);
        assert_eq!(r.anchors(Axis::Y), [45.0, 50.0, 55.0]);
    }

    #[test]
    fn test_distance_on_axis() {
        let a = Rect::from_min_max(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let b = Rect::from_min_max(Vec2::new(30.0, 5.0), Vec2::new(40.0, 15.0));
        assert_eq!(a.distance_on(&b, Axis::X), 20.0);
        assert_eq!(b.distance_on(&a, Axis::X), 20.0);
        assert_eq!(a.distance_on(&b, Axis::Y), 0.0);
        assert!(a.overlaps_on(&b, Axis::Y));
    }

    #[test]
    fn test_viewport_round_trip_point() {
        let vp = Viewport {
            zoom: 2.0,
            pan: Vec2::new(10.0, -4.0),
        };
        let p = Vec2::new(3.0, 5.0);
        let r = vp.to_rendered(p);
        assert_eq!(r, Vec2::new(16.0, 6.0));
        assert_eq!(vp.to_model(r), p);
        assert_eq!(vp.length_to_model(4.0), 2.0);
    }
}

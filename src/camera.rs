#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use std::ops::{Add, Sub};

/// A point (or displacement) in client, board, or board-local space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Pan state for the board. There is no zoom: one offset maps
/// board-local entity positions onto the board surface.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub offset: Point,
}

impl Viewport {
    /// Map a board-local position to its rendered position on the board surface.
    #[must_use]
    pub fn apply_offset(&self, local: Point) -> Point {
        local + self.offset
    }

    /// Translate the view by `delta`. Panning is unbounded.
    pub fn update_offset(&mut self, delta: Point) {
        self.offset = self.offset + delta;
    }

    /// Convert a client-space point to a board-local position, given the
    /// client-space position of the board's top-left corner.
    #[must_use]
    pub fn screen_to_local(&self, screen: Point, origin: Point) -> Point {
        screen - origin - self.offset
    }

    /// Convert a board-local position to client space.
    #[must_use]
    pub fn local_to_screen(&self, local: Point, origin: Point) -> Point {
        origin + self.apply_offset(local)
    }

    /// Return to the unpanned view.
    pub fn reset(&mut self) {
        self.offset = Point::default();
    }
}

//! Drawing interface implemented by rendering backends.

use crate::shapes::ShapeColor;
use kurbo::{Ellipse, Point, Rect};

/// Fill pattern for a painted area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPattern {
    #[default]
    Solid,
    /// Sparse dot pattern used to mark a selected group.
    Dense,
}

/// Pen and brush for one drawing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintStyle {
    pub stroke: ShapeColor,
    /// Fill color (None = outline only).
    pub fill: Option<ShapeColor>,
    pub pattern: FillPattern,
    pub dashed: bool,
}

/// Rendering surface. Geometry arrives in canvas coordinates.
pub trait Painter {
    fn draw_rect(&mut self, rect: Rect, style: &PaintStyle);

    fn draw_ellipse(&mut self, ellipse: Ellipse, style: &PaintStyle);

    fn draw_polygon(&mut self, points: &[Point], style: &PaintStyle);
}

/// A recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    Rect(Rect, PaintStyle),
    Ellipse(Ellipse, PaintStyle),
    Polygon(Vec<Point>, PaintStyle),
}

/// Painter that records calls, for headless hosts and tests.
#[derive(Debug, Default, Clone)]
pub struct DisplayList {
    pub commands: Vec<PaintCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Painter for DisplayList {
    fn draw_rect(&mut self, rect: Rect, style: &PaintStyle) {
        self.commands.push(PaintCommand::Rect(rect, *style));
    }

    fn draw_ellipse(&mut self, ellipse: Ellipse, style: &PaintStyle) {
        self.commands.push(PaintCommand::Ellipse(ellipse, *style));
    }

    fn draw_polygon(&mut self, points: &[Point], style: &PaintStyle) {
        self.commands.push(PaintCommand::Polygon(points.to_vec(), *style));
    }
}

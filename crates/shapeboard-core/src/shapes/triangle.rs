//! Equilateral triangle shape.

use super::{ShapeBase, ShapeColor, ShapeTrait, StoredFields};
use crate::geometry::{Point, Rect};
use crate::markup::Element;
use crate::painter::{PaintStyle, Painter};
use crate::storage::StorageResult;
use kurbo::{BezPath, Shape as KurboShape};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Height of an equilateral triangle with the given base width.
fn equilateral_height(width: i32) -> i32 {
    (width as f64 * 3f64.sqrt() / 2.0).round() as i32
}

/// Vertices (top-center, bottom-right, bottom-left) of a bounding rectangle.
fn vertices_of(rect: &Rect) -> [Point; 3] {
    [rect.top_center(), rect.bottom_right(), rect.bottom_left()]
}

/// Equilateral triangle pointing up. The height is always derived from the width.
#[derive(Debug)]
pub struct Triangle {
    base: ShapeBase,
    vertices: [Point; 3],
}

impl Triangle {
    pub const TAG: &'static str = "Triangle";

    /// Create a triangle with the given base width.
    ///
    /// The rectangle is first centered as a `width`×`width` square, then its
    /// height is cut down to the equilateral height with the top edge kept.
    pub fn new(center: Point, width: i32, color: ShapeColor, active: bool) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self::build(id, Rect::from_center(center, width, width), color, active)
    }

    fn build(id: u32, rect: Rect, color: ShapeColor, active: bool) -> Self {
        let rect = rect.with_height(equilateral_height(rect.width));
        Self {
            base: ShapeBase::new(Self::TAG, id, rect, color, active),
            vertices: vertices_of(&rect),
        }
    }

    pub(crate) fn from_element(element: &Element) -> StorageResult<Self> {
        let StoredFields { id, color, rect } = StoredFields::read(element)?;
        let rect = Rect::from_center(rect.center(), rect.width, rect.height);
        Ok(Self::build(id, rect, color, false))
    }

    pub fn vertices(&self) -> [Point; 3] {
        self.vertices
    }

    fn path(&self) -> BezPath {
        let [a, b, c] = self.vertices.map(Point::to_kurbo);
        let mut path = BezPath::new();
        path.move_to(a);
        path.line_to(b);
        path.line_to(c);
        path.close_path();
        path
    }
}

impl ShapeTrait for Triangle {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn hit_test(&self, point: Point) -> bool {
        // Nonzero winding rule
        self.path().winding(point.to_kurbo()) != 0
    }

    fn draw(&self, painter: &mut dyn Painter, style: &PaintStyle) {
        let points = self.vertices.map(Point::to_kurbo);
        painter.draw_polygon(&points, style);
    }

    fn move_by(&mut self, canvas: &Rect, dx: i32, dy: i32) -> bool {
        if !self.base.move_by(canvas, dx, dy) {
            return false;
        }
        self.vertices = self.vertices.map(|v| v.translated(dx, dy));
        true
    }

    fn resize(&mut self, canvas: &Rect, delta: i32) -> bool {
        let Some(grown) = self.base.rect().checked_grown(delta) else {
            return false;
        };
        let candidate = grown.with_height(equilateral_height(grown.width));
        if !self.base.resize_to(canvas, candidate) {
            return false;
        }
        self.vertices = vertices_of(&candidate);
        true
    }

    fn undo_resize(&mut self, delta: i32) {
        let shrunk = self.base.rect().grown(-delta);
        let rect = shrunk.with_height(equilateral_height(shrunk.width));
        self.base.set_rect(rect);
        self.vertices = vertices_of(&rect);
        self.base.notify_changed();
    }

    fn to_element(&self) -> Element {
        let mut element = self.base.to_element();
        let mut points = Element::new("points");
        points.set_attr("count_points", self.vertices.len());
        for vertex in &self.vertices {
            let mut point = Element::new("point");
            point.set_attr("x", vertex.x);
            point.set_attr("y", vertex.y);
            points.push(point);
        }
        let mut polygon = Element::new("polygon");
        polygon.push(points);
        element.push(polygon);
        element
    }
}

//! Circle shape.

use super::{ShapeBase, ShapeColor, ShapeTrait, StoredFields};
use crate::geometry::{Point, Rect};
use crate::markup::Element;
use crate::painter::{PaintStyle, Painter};
use crate::storage::StorageResult;
use kurbo::Ellipse;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// A circle inscribed in its square bounding rectangle.
#[derive(Debug)]
pub struct Circle {
    base: ShapeBase,
}

impl Circle {
    pub const TAG: &'static str = "Circle";

    /// Create a circle with the given diameter.
    pub fn new(center: Point, diameter: i32, color: ShapeColor, active: bool) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let rect = Rect::from_center(center, diameter, diameter);
        Self {
            base: ShapeBase::new(Self::TAG, id, rect, color, active),
        }
    }

    pub(crate) fn from_element(element: &Element) -> StorageResult<Self> {
        let StoredFields { id, color, rect } = StoredFields::read(element)?;
        let rect = Rect::from_center(rect.center(), rect.width, rect.height);
        Ok(Self {
            base: ShapeBase::new(Self::TAG, id, rect, color, false),
        })
    }

    pub fn radius(&self) -> i32 {
        self.base.rect().width / 2
    }
}

impl ShapeTrait for Circle {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn hit_test(&self, point: Point) -> bool {
        let center = self.base.rect().center();
        let dx = (center.x - point.x) as i64;
        let dy = (center.y - point.y) as i64;
        let radius = self.radius() as i64;
        dx * dx + dy * dy <= radius * radius
    }

    fn draw(&self, painter: &mut dyn Painter, style: &PaintStyle) {
        painter.draw_ellipse(Ellipse::from_rect(self.base.rect().to_kurbo()), style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::painter::{DisplayList, PaintCommand};

    const CANVAS: Rect = Rect::new(0, 0, 800, 600);

    #[test]
    fn test_circle_creation() {
        let circle = Circle::new(Point::new(100, 100), 50, ShapeColor::BLACK, false);
        assert_eq!(circle.base().rect(), Rect::new(76, 76, 50, 50));
        assert_eq!(circle.base().rect().center(), Point::new(100, 100));
        assert_eq!(circle.radius(), 25);
    }

    #[test]
    fn test_ids_increase() {
        let a = Circle::new(Point::new(100, 100), 50, ShapeColor::BLACK, false);
        let b = Circle::new(Point::new(100, 100), 50, ShapeColor::BLACK, false);
        assert!(b.base().id() > a.base().id());
    }

    #[test]
    fn test_hit_test() {
        let circle = Circle::new(Point::new(100, 100), 50, ShapeColor::BLACK, false);
        assert!(circle.hit_test(Point::new(100, 100)));
        assert!(circle.hit_test(Point::new(125, 100)));
        assert!(!circle.hit_test(Point::new(126, 100)));
        // Corner of the bounding box lies outside the circle.
        assert!(!circle.hit_test(Point::new(77, 77)));
    }

    #[test]
    fn test_sixth_shrink_fails_at_minimum() {
        let mut circle = Circle::new(Point::new(400, 300), 170, ShapeColor::BLACK, false);
        for expected in [140, 110, 80, 50, 20] {
            assert!(circle.resize(&CANVAS, -15));
            assert_eq!(circle.base().rect().width, expected);
        }
        assert!(!circle.resize(&CANVAS, -15));
        assert_eq!(circle.base().rect().width, 20);
    }

    #[test]
    fn test_draw_uses_bounding_box() {
        let circle = Circle::new(Point::new(100, 100), 50, ShapeColor::BLACK, false);
        let mut list = DisplayList::new();
        circle.paint(&mut list);
        match &list.commands[..] {
            [PaintCommand::Ellipse(ellipse, style)] => {
                assert_eq!(ellipse.center(), kurbo::Point::new(101.0, 101.0));
                assert_eq!(style.fill, Some(ShapeColor::BLACK));
            }
            other => panic!("unexpected commands: {other:?}"),
        }
    }
}

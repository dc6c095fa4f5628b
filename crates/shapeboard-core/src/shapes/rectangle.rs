//! Rectangle shape.

use super::{ShapeBase, ShapeColor, ShapeTrait, StoredFields};
use crate::geometry::{Point, Rect};
use crate::markup::Element;
use crate::painter::{PaintStyle, Painter};
use crate::storage::StorageResult;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// An axis-aligned rectangle.
#[derive(Debug)]
pub struct Rectangle {
    base: ShapeBase,
}

impl Rectangle {
    pub const TAG: &'static str = "Rectangle";

    /// Create a new rectangle centered on `center`.
    pub fn new(center: Point, width: i32, height: i32, color: ShapeColor, active: bool) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            base: ShapeBase::new(Self::TAG, id, Rect::from_center(center, width, height), color, active),
        }
    }

    pub(crate) fn from_element(element: &Element) -> StorageResult<Self> {
        let StoredFields { id, color, rect } = StoredFields::read(element)?;
        let rect = Rect::from_center(rect.center(), rect.width, rect.height);
        Ok(Self {
            base: ShapeBase::new(Self::TAG, id, rect, color, false),
        })
    }
}

impl ShapeTrait for Rectangle {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn hit_test(&self, point: Point) -> bool {
        self.base.rect().contains(point)
    }

    fn draw(&self, painter: &mut dyn Painter, style: &PaintStyle) {
        painter.draw_rect(self.base.rect().to_kurbo(), style);
    }
}

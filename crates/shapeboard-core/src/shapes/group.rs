//! Group shape for combining multiple shapes.

use super::{Shape, ShapeBase, ShapeColor, ShapeTrait, SharedShape, StoredFields, COLOR_SELECTED};
use crate::geometry::{Point, Rect};
use crate::markup::Element;
use crate::observer::Change;
use crate::painter::{FillPattern, PaintStyle, Painter};
use crate::storage::{StorageError, StorageResult};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// A group of entities manipulated as a single unit.
/// Groups can contain other groups, enabling nested hierarchies.
///
/// The group's rectangle is always the union of its children's rectangles.
#[derive(Debug)]
pub struct Group {
    base: ShapeBase,
    children: Vec<SharedShape>,
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl Group {
    pub const TAG: &'static str = "Group";

    /// Create an empty, black group.
    pub fn new() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self::with_id(id, ShapeColor::BLACK)
    }

    fn with_id(id: u32, color: ShapeColor) -> Self {
        Self {
            base: ShapeBase::new(Self::TAG, id, Rect::default(), color, false),
            children: Vec::new(),
        }
    }

    pub(crate) fn from_element(element: &Element) -> StorageResult<Self> {
        let StoredFields { id, color, .. } = StoredFields::read(element)?;
        let items = element.child("items").ok_or_else(|| {
            StorageError::InvalidDocument(format!("<{}> has no <items>", element.tag()))
        })?;
        let mut group = Self::with_id(id, color);
        for child in Shape::from_items(items)? {
            group.add_child(child);
        }
        Ok(group)
    }

    /// Get the children of this group.
    pub fn children(&self) -> &[SharedShape] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Append a child and announce it to observers.
    pub fn add_child(&mut self, child: SharedShape) {
        self.children.push(child.clone());
        self.update_rect();
        self.base
            .observable()
            .notify(Change::NewChild(self.base.state(), child));
    }

    fn update_rect(&mut self) {
        let union = Rect::union_all(self.children.iter().map(|c| c.borrow().rect()));
        self.base.set_rect(union);
    }
}

impl ShapeTrait for Group {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn hit_test(&self, point: Point) -> bool {
        self.children.iter().any(|c| c.borrow().hit_test(point))
    }

    fn draw(&self, painter: &mut dyn Painter, style: &PaintStyle) {
        painter.draw_rect(self.base.rect().to_kurbo(), style);
        for child in &self.children {
            child.borrow().paint(painter);
        }
    }

    fn paint(&self, painter: &mut dyn Painter) {
        let active = self.base.is_active();
        let style = PaintStyle {
            stroke: if active { COLOR_SELECTED } else { ShapeColor::BLACK },
            fill: active.then(|| self.base.display_color()),
            pattern: if active { FillPattern::Dense } else { FillPattern::Solid },
            dashed: true,
        };
        self.draw(painter, &style);
    }

    fn move_by(&mut self, canvas: &Rect, dx: i32, dy: i32) -> bool {
        if !self.base.move_by(canvas, dx, dy) {
            return false;
        }
        // Children fit because their union did.
        for child in &self.children {
            child.borrow_mut().move_by(canvas, dx, dy);
        }
        true
    }

    /// All-or-nothing resize of every child by `delta`.
    ///
    /// The group's own rectangle is checked first with `delta` scaled by the
    /// child count. If any child then rejects the resize, the children resized
    /// so far and the group itself are rolled back.
    fn resize(&mut self, canvas: &Rect, delta: i32) -> bool {
        let Some(scaled) = i32::try_from(self.children.len())
            .ok()
            .and_then(|count| delta.checked_mul(count))
        else {
            log::debug!("{}: resize by {delta} rejected", self.base.name());
            return false;
        };
        if !self.base.resize(canvas, scaled) {
            return false;
        }
        for (index, child) in self.children.iter().enumerate() {
            if !child.borrow_mut().resize(canvas, delta) {
                for done in &self.children[..index] {
                    done.borrow_mut().undo_resize(delta);
                }
                self.base.undo_resize(scaled);
                return false;
            }
        }
        self.update_rect();
        true
    }

    fn undo_resize(&mut self, delta: i32) {
        for child in &self.children {
            child.borrow_mut().undo_resize(delta);
        }
        self.update_rect();
        self.base.notify_changed();
    }

    fn toggle_activation(&mut self) {
        self.base.toggle_activation();
        for child in &self.children {
            child.borrow_mut().toggle_activation();
        }
    }

    fn deactivate(&mut self) {
        self.base.deactivate();
        for child in &self.children {
            child.borrow_mut().deactivate();
        }
    }

    fn to_element(&self) -> Element {
        let mut element = self.base.to_element();
        let mut items = Element::new("items");
        for child in &self.children {
            items.push(child.borrow().to_element());
        }
        items.set_attr("count_elements", self.children.len());
        element.push(items);
        element
    }
}

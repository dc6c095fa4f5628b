//! Shape definitions for the scene graph.

mod circle;
mod group;
mod rectangle;
mod triangle;

pub use circle::Circle;
pub use group::Group;
pub use rectangle::Rectangle;
pub use triangle::Triangle;

use crate::geometry::{Point, Rect};
use crate::markup::Element;
use crate::observer::{Change, EntityState, Observable, Observer, Token};
use crate::painter::{FillPattern, PaintStyle, Painter};
use crate::storage::{StorageError, StorageResult};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

/// Side length of a freshly placed shape.
pub const INITIAL_SIZE: i32 = 50;
/// Smallest allowed width and height.
pub const MIN_SIZE: i32 = 10;

/// Opaque RGB color, stored in documents as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShapeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ShapeColor {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GRAY: Self = Self::new(160, 160, 164);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb` form.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse `#rrggbb` or the short `#rgb` form.
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.trim().strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            6 => Some(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                let short = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
                Some(Self::new(short(0)?, short(1)?, short(2)?))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ShapeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for ShapeColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<ShapeColor> for String {
    fn from(color: ShapeColor) -> Self {
        color.to_hex()
    }
}

impl From<Color> for ShapeColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b)
    }
}

impl From<ShapeColor> for Color {
    fn from(color: ShapeColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, 255)
    }
}

/// Fill used for active entities instead of their own color.
pub const COLOR_SELECTED: ShapeColor = ShapeColor::RED;
/// Outline of every primitive.
pub const COLOR_BORDER: ShapeColor = ShapeColor::GRAY;

/// Primitive shapes a user can place on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    #[default]
    Circle,
    Rectangle,
    Triangle,
}

impl ShapeKind {
    pub fn tag(self) -> &'static str {
        match self {
            ShapeKind::Circle => Circle::TAG,
            ShapeKind::Rectangle => Rectangle::TAG,
            ShapeKind::Triangle => Triangle::TAG,
        }
    }

    /// Build a new shape of this kind centered on `center`.
    pub fn create(self, center: Point, color: ShapeColor, size: i32, active: bool) -> Shape {
        match self {
            ShapeKind::Circle => Shape::Circle(Circle::new(center, size, color, active)),
            ShapeKind::Rectangle => {
                Shape::Rectangle(Rectangle::new(center, size, size, color, active))
            }
            ShapeKind::Triangle => Shape::Triangle(Triangle::new(center, size, color, active)),
        }
    }
}

/// State shared by every entity: identity, geometry, color and activation.
///
/// Every successful mutation notifies the entity's observers.
#[derive(Debug)]
pub struct ShapeBase {
    id: u32,
    tag: &'static str,
    rect: Rect,
    color: ShapeColor,
    active: bool,
    observable: Observable,
}

impl ShapeBase {
    pub(crate) fn new(tag: &'static str, id: u32, rect: Rect, color: ShapeColor, active: bool) -> Self {
        Self {
            id,
            tag,
            rect,
            color,
            active,
            observable: Observable::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Element tag and display type name.
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// The entity's own color.
    pub fn color(&self) -> ShapeColor {
        self.color
    }

    /// Color the entity is drawn with: the selection color while active.
    pub fn display_color(&self) -> ShapeColor {
        if self.active { COLOR_SELECTED } else { self.color }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Display name, e.g. `"Triangle 2"`.
    pub fn name(&self) -> String {
        format!("{} {}", self.tag, self.id)
    }

    pub fn state(&self) -> EntityState {
        EntityState {
            name: self.name(),
            active: self.active,
            color: self.color,
        }
    }

    pub fn observable(&self) -> &Observable {
        &self.observable
    }

    pub(crate) fn notify_changed(&self) -> Token {
        self.observable.notify(Change::State(self.state()))
    }

    /// Replace the rectangle without validation or notification.
    pub(crate) fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    pub fn move_by(&mut self, canvas: &Rect, dx: i32, dy: i32) -> bool {
        let Some(moved) = self.rect.checked_translated(dx, dy).filter(|r| r.is_inside(canvas)) else {
            log::debug!("{}: move by ({dx}, {dy}) rejected", self.name());
            return false;
        };
        self.rect = moved;
        self.notify_changed();
        true
    }

    pub fn resize(&mut self, canvas: &Rect, delta: i32) -> bool {
        match self.rect.checked_grown(delta) {
            Some(candidate) => self.resize_to(canvas, candidate),
            None => {
                log::debug!("{}: resize by {delta} rejected", self.name());
                false
            }
        }
    }

    /// Adopt `candidate` if it fits the canvas and the minimum size.
    pub(crate) fn resize_to(&mut self, canvas: &Rect, candidate: Rect) -> bool {
        if !candidate.has_representable_edges()
            || !candidate.is_inside(canvas)
            || !is_valid_size(&candidate)
        {
            log::debug!("{}: resize to {:?} rejected", self.name(), candidate);
            return false;
        }
        self.rect = candidate;
        self.notify_changed();
        true
    }

    /// Reverse a successful `resize(delta)`.
    pub(crate) fn undo_resize(&mut self, delta: i32) {
        self.rect = self.rect.grown(-delta);
        self.notify_changed();
    }

    pub fn toggle_activation(&mut self) {
        self.active = !self.active;
        self.notify_changed();
    }

    pub fn set_activation(&mut self, active: bool) {
        self.active = active;
        self.notify_changed();
    }

    /// Set activation as part of a round started elsewhere.
    pub(crate) fn set_activation_with(&mut self, token: Token, active: bool) {
        self.active = active;
        self.observable.notify_with(token, Change::State(self.state()));
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.notify_changed();
    }

    pub fn set_color(&mut self, color: ShapeColor) {
        self.color = color;
        self.notify_changed();
    }

    /// Common element: tag, `color`, `id` and a `rect` child.
    pub fn to_element(&self) -> Element {
        let mut element = Element::new(self.tag);
        element.set_attr("color", self.color.to_hex());
        element.set_attr("id", self.id);
        let mut rect = Element::new("rect");
        rect.set_attr("left", self.rect.left);
        rect.set_attr("top", self.rect.top);
        rect.set_attr("width", self.rect.width);
        rect.set_attr("height", self.rect.height);
        element.push(rect);
        element
    }
}

impl Drop for ShapeBase {
    fn drop(&mut self) {
        self.observable.notify(Change::Removed);
    }
}

fn is_valid_size(rect: &Rect) -> bool {
    rect.width >= MIN_SIZE && rect.height >= MIN_SIZE
}

/// Fields every stored entity element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StoredFields {
    pub id: u32,
    pub color: ShapeColor,
    pub rect: Rect,
}

impl StoredFields {
    pub(crate) fn read(element: &Element) -> StorageResult<Self> {
        let id = element.attr_or_default("id")?;
        let color = match element.attr("color") {
            None => ShapeColor::BLACK,
            Some(text) => ShapeColor::from_hex(text).unwrap_or_else(|| {
                log::warn!("Invalid color {text:?} on <{}>, using black", element.tag());
                ShapeColor::BLACK
            }),
        };
        let rect = element.child("rect").ok_or_else(|| {
            StorageError::InvalidDocument(format!("<{}> has no <rect>", element.tag()))
        })?;
        let rect = Rect::new(
            rect.attr_or_default("left")?,
            rect.attr_or_default("top")?,
            rect.attr_or_default("width")?,
            rect.attr_or_default("height")?,
        );
        Ok(Self { id, color, rect })
    }
}

/// Common trait for all entities.
pub trait ShapeTrait {
    fn base(&self) -> &ShapeBase;

    fn base_mut(&mut self) -> &mut ShapeBase;

    /// Whether `point` hits this entity.
    fn hit_test(&self, point: Point) -> bool;

    /// Draw the geometry with an already resolved style.
    fn draw(&self, painter: &mut dyn Painter, style: &PaintStyle);

    /// Draw with the entity's own style.
    fn paint(&self, painter: &mut dyn Painter) {
        let style = PaintStyle {
            stroke: COLOR_BORDER,
            fill: Some(self.base().display_color()),
            pattern: FillPattern::Solid,
            dashed: false,
        };
        self.draw(painter, &style);
    }

    fn move_by(&mut self, canvas: &Rect, dx: i32, dy: i32) -> bool {
        self.base_mut().move_by(canvas, dx, dy)
    }

    fn resize(&mut self, canvas: &Rect, delta: i32) -> bool {
        self.base_mut().resize(canvas, delta)
    }

    /// Reverse a successful `resize(delta)` without re-validating.
    fn undo_resize(&mut self, delta: i32) {
        self.base_mut().undo_resize(delta)
    }

    fn toggle_activation(&mut self) {
        self.base_mut().toggle_activation()
    }

    fn set_activation(&mut self, active: bool) {
        self.base_mut().set_activation(active)
    }

    fn deactivate(&mut self) {
        self.base_mut().deactivate()
    }

    fn set_color(&mut self, color: ShapeColor) {
        self.base_mut().set_color(color)
    }

    fn to_element(&self) -> Element {
        self.base().to_element()
    }
}

/// An entity shared between its owner and weak observers.
pub type SharedShape = Rc<RefCell<Shape>>;

/// Enum wrapper for all entity types.
#[derive(Debug)]
pub enum Shape {
    Circle(Circle),
    Rectangle(Rectangle),
    Triangle(Triangle),
    Group(Group),
}

type Factory = fn(&Element) -> StorageResult<Shape>;

/// Tag → factory table, built on first use.
fn registry() -> &'static HashMap<&'static str, Factory> {
    static REGISTRY: OnceLock<HashMap<&'static str, Factory>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut factories: HashMap<&'static str, Factory> = HashMap::new();
        factories.insert(Circle::TAG, |e| Circle::from_element(e).map(Shape::Circle));
        factories.insert(Rectangle::TAG, |e| Rectangle::from_element(e).map(Shape::Rectangle));
        factories.insert(Triangle::TAG, |e| Triangle::from_element(e).map(Shape::Triangle));
        factories.insert(Group::TAG, |e| Group::from_element(e).map(Shape::Group));
        factories
    })
}

impl Shape {
    pub fn as_trait(&self) -> &dyn ShapeTrait {
        match self {
            Shape::Circle(s) => s,
            Shape::Rectangle(s) => s,
            Shape::Triangle(s) => s,
            Shape::Group(s) => s,
        }
    }

    pub fn as_trait_mut(&mut self) -> &mut dyn ShapeTrait {
        match self {
            Shape::Circle(s) => s,
            Shape::Rectangle(s) => s,
            Shape::Triangle(s) => s,
            Shape::Group(s) => s,
        }
    }

    /// Rebuild an entity from its element.
    ///
    /// Returns `Ok(None)` when the tag names no known entity type.
    pub fn from_element(element: &Element) -> StorageResult<Option<Shape>> {
        match registry().get(element.tag()) {
            Some(factory) => factory(element).map(Some),
            None => {
                log::warn!("Skipping unknown shape <{}>", element.tag());
                Ok(None)
            }
        }
    }

    /// Rebuild every known entity listed in an `<items>` element.
    ///
    /// `count_elements` is only a hint: a wrong or unreadable count is
    /// logged and the listed children win.
    pub(crate) fn from_items(items: &Element) -> StorageResult<Vec<SharedShape>> {
        let listed = items.children().len();
        match items.attr("count_elements").map(|v| v.trim().parse::<usize>()) {
            Some(Ok(declared)) if declared != listed => {
                log::warn!("count_elements says {declared}, document lists {listed}");
            }
            Some(Err(_)) => {
                log::warn!("Ignoring unreadable count_elements, document lists {listed}");
            }
            _ => {}
        }

        let mut loaded = Vec::with_capacity(listed);
        for element in items.children() {
            if let Some(shape) = Shape::from_element(element)? {
                loaded.push(shape.into_shared());
            }
        }
        Ok(loaded)
    }

    pub fn into_shared(self) -> SharedShape {
        Rc::new(RefCell::new(self))
    }

    pub fn base(&self) -> &ShapeBase {
        self.as_trait().base()
    }

    pub fn base_mut(&mut self) -> &mut ShapeBase {
        self.as_trait_mut().base_mut()
    }

    pub fn id(&self) -> u32 {
        self.base().id()
    }

    pub fn name(&self) -> String {
        self.base().name()
    }

    pub fn rect(&self) -> Rect {
        self.base().rect()
    }

    pub fn color(&self) -> ShapeColor {
        self.base().color()
    }

    pub fn is_active(&self) -> bool {
        self.base().is_active()
    }

    pub fn hit_test(&self, point: Point) -> bool {
        self.as_trait().hit_test(point)
    }

    pub fn paint(&self, painter: &mut dyn Painter) {
        self.as_trait().paint(painter)
    }

    pub fn move_by(&mut self, canvas: &Rect, dx: i32, dy: i32) -> bool {
        self.as_trait_mut().move_by(canvas, dx, dy)
    }

    pub fn resize(&mut self, canvas: &Rect, delta: i32) -> bool {
        self.as_trait_mut().resize(canvas, delta)
    }

    pub(crate) fn undo_resize(&mut self, delta: i32) {
        self.as_trait_mut().undo_resize(delta)
    }

    pub fn toggle_activation(&mut self) {
        self.as_trait_mut().toggle_activation()
    }

    pub fn set_activation(&mut self, active: bool) {
        self.as_trait_mut().set_activation(active)
    }

    pub fn deactivate(&mut self) {
        self.as_trait_mut().deactivate()
    }

    pub fn set_color(&mut self, color: ShapeColor) {
        self.as_trait_mut().set_color(color)
    }

    pub fn to_element(&self) -> Element {
        self.as_trait().to_element()
    }

    /// Check if this entity is a group.
    pub fn is_group(&self) -> bool {
        matches!(self, Shape::Group(_))
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_triangle(&self) -> Option<&Triangle> {
        match self {
            Shape::Triangle(t) => Some(t),
            _ => None,
        }
    }
}

/// Entities observe their tree nodes: a user check-state change on the node
/// becomes the entity's activation.
impl Observer for RefCell<Shape> {
    fn update(&self, token: Token, change: &Change) {
        let Change::CheckState(active) = change else {
            return;
        };
        let Ok(mut shape) = self.try_borrow_mut() else {
            log::debug!("Entity busy, dropping check state update");
            return;
        };
        let base = shape.base_mut();
        if base.observable().is_echo(token) || base.is_active() == *active {
            return;
        }
        base.set_activation_with(token, *active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: Rect = Rect::new(0, 0, 800, 600);

    #[test]
    fn test_color_hex() {
        let color = ShapeColor::new(0x12, 0xab, 0xff);
        assert_eq!(color.to_hex(), "#12abff");
        assert_eq!(ShapeColor::from_hex("#12ABFF"), Some(color));
        assert_eq!(ShapeColor::from_hex("#f00"), Some(ShapeColor::RED));
        assert_eq!(ShapeColor::from_hex("red"), None);
        assert_eq!(ShapeColor::from_hex("#12ab"), None);
    }

    #[test]
    fn test_color_peniko_conversion() {
        let color = ShapeColor::new(10, 20, 30);
        let peniko: Color = color.into();
        assert_eq!(ShapeColor::from(peniko), color);
    }

    #[test]
    fn test_display_color_follows_activation() {
        let mut shape = ShapeKind::Rectangle.create(Point::new(100, 100), ShapeColor::BLACK, 50, false);
        assert_eq!(shape.base().display_color(), ShapeColor::BLACK);
        shape.toggle_activation();
        assert_eq!(shape.base().display_color(), COLOR_SELECTED);
        assert_eq!(shape.color(), ShapeColor::BLACK);
    }

    #[test]
    fn test_move_then_move_back() {
        for kind in [ShapeKind::Circle, ShapeKind::Rectangle, ShapeKind::Triangle] {
            let mut shape = kind.create(Point::new(400, 300), ShapeColor::BLACK, 50, false);
            let original = shape.rect();
            assert!(shape.move_by(&CANVAS, 37, -12));
            assert_ne!(shape.rect(), original);
            assert!(shape.move_by(&CANVAS, -37, 12));
            assert_eq!(shape.rect(), original);
        }
    }

    #[test]
    fn test_move_outside_canvas_is_rejected() {
        let mut shape = ShapeKind::Rectangle.create(Point::new(30, 30), ShapeColor::BLACK, 50, false);
        let original = shape.rect();
        assert!(!shape.move_by(&CANVAS, -10, 0));
        assert_eq!(shape.rect(), original);
    }

    #[test]
    fn test_resize_below_minimum_is_rejected() {
        for kind in [ShapeKind::Circle, ShapeKind::Rectangle, ShapeKind::Triangle] {
            let mut shape = kind.create(Point::new(400, 300), ShapeColor::BLACK, 50, false);
            let original = shape.rect();
            assert!(!shape.resize(&CANVAS, -21));
            assert_eq!(shape.rect(), original);
        }
    }

    #[test]
    fn test_extreme_deltas_are_rejected() {
        for kind in [ShapeKind::Circle, ShapeKind::Rectangle, ShapeKind::Triangle] {
            let mut shape = kind.create(Point::new(400, 300), ShapeColor::BLACK, 50, false);
            let original = shape.rect();
            assert!(!shape.move_by(&CANVAS, i32::MAX, 0));
            assert!(!shape.move_by(&CANVAS, 0, i32::MIN));
            assert!(!shape.resize(&CANVAS, i32::MAX / 2 + 1));
            assert!(!shape.resize(&CANVAS, i32::MAX));
            assert!(!shape.resize(&CANVAS, i32::MIN));
            assert_eq!(shape.rect(), original);
        }
    }

    #[test]
    fn test_resize_outside_canvas_is_rejected() {
        let mut shape = ShapeKind::Circle.create(Point::new(30, 30), ShapeColor::BLACK, 50, false);
        let original = shape.rect();
        assert!(!shape.resize(&CANVAS, 10));
        assert_eq!(shape.rect(), original);
    }

    #[test]
    fn test_unknown_tag_yields_none() {
        let element = Element::new("Hexagon");
        assert!(Shape::from_element(&element).unwrap().is_none());
    }

    #[test]
    fn test_missing_rect_is_an_error() {
        let mut element = Element::new("Circle");
        element.set_attr("id", 3);
        assert!(matches!(
            Shape::from_element(&element),
            Err(StorageError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_missing_attributes_default_to_zero() {
        let mut element = Element::new("Rectangle");
        let mut rect = Element::new("rect");
        rect.set_attr("width", 20);
        rect.set_attr("height", 20);
        element.push(rect);

        let shape = Shape::from_element(&element).unwrap().unwrap();
        assert_eq!(shape.id(), 0);
        assert_eq!(shape.color(), ShapeColor::BLACK);
        assert_eq!(shape.rect(), Rect::new(0, 0, 20, 20));
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let mut element = Element::new("Rectangle");
        element.set_attr("id", "seven");
        element.push(Element::new("rect"));
        assert!(Shape::from_element(&element).is_err());
    }
}

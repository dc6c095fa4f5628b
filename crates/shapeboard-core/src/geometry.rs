//! Integer canvas geometry.
//!
//! Shapes live on a pixel grid. A [`Rect`] covers the inclusive span
//! `left..=right()` horizontally, so `right() == left + width - 1`.

/// A point on the canvas grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset of this point from `origin`, saturating at the `i32` range.
    pub fn delta_from(self, origin: Point) -> (i32, i32) {
        (self.x.saturating_sub(origin.x), self.y.saturating_sub(origin.y))
    }

    pub fn translated(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(self.x as f64, self.y as f64)
    }
}

/// An axis-aligned rectangle on the canvas grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Create a rectangle of the given size centered on `center`.
    ///
    /// Inverse of [`Rect::center`]: `Rect::from_center(r.center(), r.width, r.height) == r`.
    pub fn from_center(center: Point, width: i32, height: i32) -> Self {
        let left = center.x - (width - 1) / 2;
        let top = center.y - (height - 1) / 2;
        Self::new(left, top, width, height)
    }

    /// A rectangle with zero width and height.
    pub fn is_null(&self) -> bool {
        self.width == 0 && self.height == 0
    }

    pub fn right(&self) -> i32 {
        self.left + self.width - 1
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height - 1
    }

    pub fn center(&self) -> Point {
        let x = (self.left as i64 + self.right() as i64) / 2;
        let y = (self.top as i64 + self.bottom() as i64) / 2;
        Point::new(x as i32, y as i32)
    }

    pub fn top_center(&self) -> Point {
        Point::new(self.center().x, self.top)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.left, self.bottom())
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.width, self.height)
    }

    /// [`Rect::translated`], or `None` if an edge would overflow `i32`.
    pub fn checked_translated(&self, dx: i32, dy: i32) -> Option<Self> {
        let moved = Self::new(
            self.left.checked_add(dx)?,
            self.top.checked_add(dy)?,
            self.width,
            self.height,
        );
        moved.has_representable_edges().then_some(moved)
    }

    /// [`Rect::grown`], or `None` if an edge or extent would overflow `i32`.
    pub fn checked_grown(&self, margin: i32) -> Option<Self> {
        let twice = margin.checked_mul(2)?;
        let grown = Self::new(
            self.left.checked_sub(margin)?,
            self.top.checked_sub(margin)?,
            self.width.checked_add(twice)?,
            self.height.checked_add(twice)?,
        );
        grown.has_representable_edges().then_some(grown)
    }

    /// Whether `right()` and `bottom()` can be computed without overflow.
    pub fn has_representable_edges(&self) -> bool {
        let edge = |start: i32, extent: i32| start.checked_add(extent).and_then(|end| end.checked_sub(1));
        edge(self.left, self.width).is_some() && edge(self.top, self.height).is_some()
    }

    /// Grow by `margin` on every side (shrink when negative).
    pub fn grown(&self, margin: i32) -> Self {
        Self::new(
            self.left - margin,
            self.top - margin,
            self.width + 2 * margin,
            self.height + 2 * margin,
        )
    }

    /// Same rectangle with a different height, top edge kept in place.
    pub fn with_height(&self, height: i32) -> Self {
        Self::new(self.left, self.top, self.width, height)
    }

    /// Smallest rectangle containing both. A null rectangle is the identity.
    pub fn united(&self, other: &Rect) -> Rect {
        if self.is_null() {
            return *other;
        }
        if other.is_null() {
            return *self;
        }
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left + 1, bottom - top + 1)
    }

    /// Union of a sequence of rectangles, null when empty.
    pub fn union_all(rects: impl IntoIterator<Item = Rect>) -> Rect {
        rects
            .into_iter()
            .fold(Rect::default(), |acc, rect| acc.united(&rect))
    }

    /// Whether the point lies inside, edges included.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// Whether this rectangle lies entirely within `outer`.
    ///
    /// Agrees with `self.united(outer) == *outer`, but compares edges so far
    /// apart rectangles cannot overflow.
    pub fn is_inside(&self, outer: &Rect) -> bool {
        if self.is_null() {
            return true;
        }
        if outer.is_null() {
            return false;
        }
        self.left >= outer.left
            && self.top >= outer.top
            && self.right() <= outer.right()
            && self.bottom() <= outer.bottom()
    }

    /// Convert to a kurbo rectangle covering the same pixels.
    pub fn to_kurbo(&self) -> kurbo::Rect {
        kurbo::Rect::new(
            self.left as f64,
            self.top as f64,
            (self.left + self.width) as f64,
            (self.top + self.height) as f64,
        )
    }
}

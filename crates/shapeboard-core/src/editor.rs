//! Interaction logic of the editor window, independent of any windowing
//! toolkit.
//!
//! A host forwards pointer, wheel and key events to [`Editor`] and paints it
//! through a [`Painter`] whenever it needs redrawing.

use crate::config::EditorConfig;
use crate::geometry::{Point, Rect};
use crate::painter::Painter;
use crate::shapes::{Group, Shape, ShapeColor, ShapeKind, SharedShape};
use crate::storage::{Storage, StorageResult};
use crate::tree::SceneTree;
use std::path::Path;

/// Provides the region entities must stay within.
pub trait CanvasBounds {
    fn canvas_rect(&self) -> Rect;
}

impl CanvasBounds for Rect {
    fn canvas_rect(&self) -> Rect {
        *self
    }
}

/// Editing keys, already mapped from platform key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorKey {
    Up,
    Down,
    Left,
    Right,
    /// Grow the selection.
    Grow,
    /// Shrink the selection.
    Shrink,
    /// Delete the selection.
    Delete,
}

/// Scene, tree view and current drawing state of one editor window.
#[derive(Debug)]
pub struct Editor<B: CanvasBounds = Rect> {
    storage: Storage,
    tree: SceneTree,
    bounds: B,
    kind: ShapeKind,
    color: ShapeColor,
    /// Last pointer position while a button is held.
    anchor: Option<Point>,
    config: EditorConfig,
}

impl<B: CanvasBounds> Editor<B> {
    pub fn new(bounds: B, config: EditorConfig) -> Self {
        let tree = SceneTree::new();
        Self {
            storage: Storage::with_tree(tree.clone()),
            tree,
            bounds,
            kind: config.initial_kind,
            color: config.initial_color,
            anchor: None,
            config,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    pub fn tree(&self) -> &SceneTree {
        &self.tree
    }

    pub fn bounds(&self) -> &B {
        &self.bounds
    }

    pub fn bounds_mut(&mut self) -> &mut B {
        &mut self.bounds
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn current_kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn current_color(&self) -> ShapeColor {
        self.color
    }

    /// Primary button press.
    ///
    /// Clicking an entity toggles it; without `ctrl`, clicking an inactive
    /// entity first clears the rest of the selection. Clicking empty canvas
    /// places a new shape of the current kind, active only with `ctrl`.
    pub fn press(&mut self, point: Point, ctrl: bool) {
        if let Some(hit) = self.storage.item_at(point) {
            if !ctrl && !hit.borrow().is_active() {
                self.storage.deactivate_all();
            }
            hit.borrow_mut().toggle_activation();
        } else {
            let shape = self.kind.create(point, self.color, self.config.initial_size, ctrl);
            if shape.rect().is_inside(&self.bounds.canvas_rect()) {
                self.storage.add_item(shape.into_shared());
                if !ctrl {
                    self.storage.deactivate_all();
                }
            } else {
                log::debug!("{} at {:?} would leave the canvas", shape.name(), point);
            }
        }
        self.anchor = Some(point);
    }

    /// Pointer moved with a button held: drag the selection along.
    pub fn drag_to(&mut self, point: Point) {
        let Some(anchor) = self.anchor else {
            return;
        };
        let (dx, dy) = point.delta_from(anchor);
        self.move_active(dx, dy);
        self.anchor = Some(point);
    }

    pub fn release(&mut self) {
        self.anchor = None;
    }

    /// Wheel turned by `steps` notches; each notch resizes the selection by one.
    pub fn wheel(&mut self, steps: i32) {
        self.resize_active(steps);
    }

    pub fn key(&mut self, key: EditorKey) {
        let step = self.config.move_step;
        match key {
            EditorKey::Delete => {
                let removed = self.storage.delete_all_active();
                log::debug!("Deleted {removed} items");
            }
            EditorKey::Up => self.move_active(0, -step),
            EditorKey::Left => self.move_active(-step, 0),
            EditorKey::Down => self.move_active(0, step),
            EditorKey::Right => self.move_active(step, 0),
            EditorKey::Grow => self.resize_active(self.config.resize_step),
            EditorKey::Shrink => self.resize_active(-self.config.resize_step),
        }
    }

    fn move_active(&mut self, dx: i32, dy: i32) {
        let canvas = self.bounds.canvas_rect();
        for item in self.storage.active_items() {
            item.borrow_mut().move_by(&canvas, dx, dy);
        }
    }

    fn resize_active(&mut self, delta: i32) {
        let canvas = self.bounds.canvas_rect();
        for item in self.storage.active_items() {
            item.borrow_mut().resize(&canvas, delta);
        }
    }

    /// Change the drawing color. The current selection is recolored and
    /// then cleared.
    pub fn set_color(&mut self, color: ShapeColor) {
        if color == self.color {
            return;
        }
        for item in self.storage.active_items() {
            item.borrow_mut().set_color(color);
        }
        self.storage.deactivate_all();
        self.color = color;
    }

    pub fn select_kind(&mut self, kind: ShapeKind) {
        self.kind = kind;
    }

    /// Whether enough items are selected to form a group.
    pub fn can_group(&self) -> bool {
        self.storage.active_items().len() > 1
    }

    /// Replace the active top-level items by a group containing them.
    pub fn group_active(&mut self) -> Option<SharedShape> {
        if !self.can_group() {
            return None;
        }
        let mut group = Group::new();
        for item in self.storage.active_items() {
            group.add_child(item);
        }
        self.storage.delete_all_active();
        let group = Shape::Group(group).into_shared();
        self.storage.add_item(group.clone());
        log::debug!("Created {}", group.borrow().name());
        Some(group)
    }

    /// Smallest window size that still shows every item.
    pub fn minimum_size(&self) -> (i32, i32) {
        let (min_width, min_height) = self.config.min_window;
        self.storage.iter().fold((min_width, min_height), |(w, h), item| {
            let corner = item.borrow().rect().bottom_right();
            (w.max(corner.x), h.max(corner.y))
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        let path = path.as_ref();
        self.storage.save(path).inspect_err(|e| {
            log::error!("Failed to save {}: {e}", path.display());
        })
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> StorageResult<()> {
        let path = path.as_ref();
        self.storage.load(path).inspect_err(|e| {
            log::error!("Failed to load {}: {e}", path.display());
        })
    }

    /// Paint every item, bottom first.
    pub fn paint(&self, painter: &mut dyn Painter) {
        for item in &self.storage {
            item.borrow().paint(painter);
        }
    }
}

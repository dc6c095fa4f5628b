//! Shapeboard Core Library
//!
//! Platform-agnostic scene model for the Shapeboard shape editor: shapes and
//! groups, XML persistence, and the checkable tree view kept in sync with
//! the scene through token-guarded observers.

pub mod config;
pub mod editor;
pub mod geometry;
pub mod markup;
pub mod observer;
pub mod painter;
pub mod shapes;
pub mod storage;
pub mod tree;

pub use config::{ConfigError, EditorConfig};
pub use editor::{CanvasBounds, Editor, EditorKey};
pub use geometry::{Point, Rect};
pub use markup::Element;
pub use observer::{Change, EntityState, Observable, Observer, Token};
pub use painter::{DisplayList, FillPattern, PaintCommand, PaintStyle, Painter};
pub use shapes::{Circle, Group, Rectangle, Shape, ShapeColor, ShapeKind, ShapeTrait, SharedShape, Triangle};
pub use storage::{ActiveItems, Storage, StorageError, StorageResult};
pub use tree::{CheckState, NodeId, SceneTree};

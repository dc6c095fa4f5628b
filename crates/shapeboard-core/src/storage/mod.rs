//! Scene storage and persistence.
//!
//! [`Storage`] owns the top-level entities in z-order and converts them to
//! and from the XML scene document:
//!
//! ```xml
//! <storage>
//!   <items count_elements="1">
//!     <Circle color="#ff0000" id="1">
//!       <rect left="76" top="76" width="50" height="50"/>
//!     </Circle>
//!   </items>
//! </storage>
//! ```

mod file;

use crate::geometry::Point;
use crate::markup::Element;
use crate::shapes::{Shape, SharedShape};
use crate::tree::SceneTree;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Root tag of a scene document.
pub const ROOT_TAG: &str = "storage";
/// Tag of an entity list, both at the root and inside groups.
pub const ITEMS_TAG: &str = "items";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    /// The text is not well-formed XML.
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    /// Well-formed XML that does not describe a scene.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Ordered collection of top-level entities. Later items are drawn on top
/// and hit first.
///
/// When built [`with_tree`](Storage::with_tree), every item added is mirrored
/// into the tree and every item removed is detached from it.
#[derive(Debug, Default)]
pub struct Storage {
    items: Vec<SharedShape>,
    tree: Option<SceneTree>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage mirrored into `tree`.
    pub fn with_tree(tree: SceneTree) -> Self {
        Self {
            items: Vec::new(),
            tree: Some(tree),
        }
    }

    pub fn tree(&self) -> Option<&SceneTree> {
        self.tree.as_ref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SharedShape> {
        self.items.get(index)
    }

    /// Items in z-order, bottom first.
    pub fn iter(&self) -> std::slice::Iter<'_, SharedShape> {
        self.items.iter()
    }

    pub fn contains(&self, item: &SharedShape) -> bool {
        self.items.iter().any(|i| Rc::ptr_eq(i, item))
    }

    /// Append an item. `None` and items already stored are ignored.
    ///
    /// Returns whether the item was added.
    pub fn add_item(&mut self, item: impl Into<Option<SharedShape>>) -> bool {
        let Some(item) = item.into() else {
            return false;
        };
        if self.contains(&item) {
            log::debug!("{} is already stored", item.borrow().name());
            return false;
        }
        if let Some(tree) = &self.tree {
            tree.attach(&item);
        }
        self.items.push(item);
        true
    }

    /// Topmost item hit by `point`.
    pub fn item_at(&self, point: Point) -> Option<SharedShape> {
        self.items
            .iter()
            .rev()
            .find(|item| item.borrow().hit_test(point))
            .cloned()
    }

    pub fn deactivate_all(&mut self) {
        for item in &self.items {
            item.borrow_mut().deactivate();
        }
    }

    /// Active top-level items, in storage order, as of this call.
    pub fn active_items(&self) -> ActiveItems {
        let snapshot: Vec<_> = self
            .items
            .iter()
            .filter(|item| item.borrow().is_active())
            .cloned()
            .collect();
        ActiveItems {
            inner: snapshot.into_iter(),
        }
    }

    /// Remove every active top-level item. Returns how many were removed.
    pub fn delete_all_active(&mut self) -> usize {
        let mut removed = 0;
        for index in (0..self.items.len()).rev() {
            if self.items[index].borrow().is_active() {
                let item = self.items.remove(index);
                self.detach(&item);
                removed += 1;
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        for item in std::mem::take(&mut self.items) {
            self.detach(&item);
        }
    }

    fn detach(&self, item: &SharedShape) {
        if let Some(tree) = &self.tree {
            tree.detach(item);
        }
    }

    /// Build the scene document.
    pub fn to_element(&self) -> Element {
        let mut items = Element::new(ITEMS_TAG);
        items.set_attr("count_elements", self.items.len());
        for item in &self.items {
            items.push(item.borrow().to_element());
        }
        let mut root = Element::new(ROOT_TAG);
        root.push(items);
        root
    }

    pub fn to_markup(&self) -> StorageResult<String> {
        self.to_element().to_xml()
    }

    /// Replace the contents with the scene in `text`.
    ///
    /// The document is fully parsed and every entity built before anything is
    /// replaced, so on error the storage is left as it was.
    pub fn load_markup(&mut self, text: &str) -> StorageResult<()> {
        let root = Element::parse(text)?;
        let loaded = read_items(&root)?;
        self.clear();
        for item in loaded {
            self.add_item(item);
        }
        Ok(())
    }

    /// Write the scene document to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        let path = path.as_ref();
        let text = self.to_markup()?;
        file::write_document(path, &text)?;
        log::info!("Saved {} items to {}", self.items.len(), path.display());
        Ok(())
    }

    /// Replace the contents with the scene stored at `path`.
    pub fn load(&mut self, path: impl AsRef<Path>) -> StorageResult<()> {
        let path = path.as_ref();
        let text = file::read_document(path)?;
        self.load_markup(&text)?;
        log::info!("Loaded {} items from {}", self.items.len(), path.display());
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Storage {
    type Item = &'a SharedShape;
    type IntoIter = std::slice::Iter<'a, SharedShape>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Build the top-level entities of a scene document.
fn read_items(root: &Element) -> StorageResult<Vec<SharedShape>> {
    if root.tag() != ROOT_TAG {
        return Err(StorageError::InvalidDocument(format!(
            "expected <{ROOT_TAG}> root, found <{}>",
            root.tag()
        )));
    }
    let items = root.child(ITEMS_TAG).ok_or_else(|| {
        StorageError::InvalidDocument(format!("<{ROOT_TAG}> has no <{ITEMS_TAG}>"))
    })?;

    Shape::from_items(items)
}

/// Snapshot of the active items taken by [`Storage::active_items`].
///
/// Later changes to the storage or to activation do not affect it.
#[derive(Debug)]
pub struct ActiveItems {
    inner: std::vec::IntoIter<SharedShape>,
}

impl Iterator for ActiveItems {
    type Item = SharedShape;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ActiveItems {}

//! Checkable tree view mirroring the scene.
//!
//! [`SceneTree`] keeps one node per entity, nested the way groups nest. Nodes
//! and entities observe each other:
//!
//! - an entity change updates its node's label, foreground and check state,
//!   and a new group child gets a node of its own;
//! - a user check-state change ([`SceneTree::set_check_state`]) cascades to
//!   the node's descendants and is pushed back into every affected entity's
//!   activation.
//!
//! Nodes only hold weak references to their entities. Dropping an entity
//! removes its node and the node's subtree.

use crate::observer::{Change, EntityState, Observable, Observer, Token};
use crate::shapes::{Shape, ShapeColor, SharedShape};
use slotmap::SlotMap;
use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::rc::{Rc, Weak};

slotmap::new_key_type! {
    /// Identifier of a node in a [`SceneTree`].
    pub struct NodeId;
}

/// Foreground of the node of an active entity.
pub const HIGHLIGHT: ShapeColor = ShapeColor::BLACK;

/// Tri-state check mark of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckState {
    #[default]
    Unchecked,
    PartiallyChecked,
    Checked,
}

impl CheckState {
    /// Anything but `Unchecked` counts as checked.
    pub fn is_checked(self) -> bool {
        self != CheckState::Unchecked
    }

    pub fn from_active(active: bool) -> Self {
        if active { CheckState::Checked } else { CheckState::Unchecked }
    }

    fn mark(self) -> char {
        match self {
            CheckState::Unchecked => ' ',
            CheckState::PartiallyChecked => '-',
            CheckState::Checked => 'x',
        }
    }
}

fn foreground_for(state: &EntityState) -> ShapeColor {
    if state.active { HIGHLIGHT } else { state.color }
}

struct TreeNode {
    label: String,
    check: CheckState,
    foreground: ShapeColor,
    /// `None` only for the invisible root.
    entity: Option<Weak<RefCell<Shape>>>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Channel the node pushes check-state changes on; its entity listens.
    observable: Rc<Observable>,
    /// Subscribed to the entity's observable. Dropped with the node.
    link: Option<Rc<NodeLink>>,
}

impl TreeNode {
    fn root() -> Self {
        Self {
            label: String::new(),
            check: CheckState::Unchecked,
            foreground: ShapeColor::BLACK,
            entity: None,
            parent: None,
            children: Vec::new(),
            observable: Rc::new(Observable::new()),
            link: None,
        }
    }

    fn shows(&self, entity: &SharedShape) -> bool {
        self.entity
            .as_ref()
            .is_some_and(|w| w.strong_count() > 0 && std::ptr::eq(w.as_ptr(), Rc::as_ptr(entity)))
    }
}

struct TreeInner {
    root: NodeId,
    nodes: RefCell<SlotMap<NodeId, TreeNode>>,
}

/// Observer registered on an entity on behalf of one node.
struct NodeLink {
    tree: Weak<TreeInner>,
    node: NodeId,
}

impl Observer for NodeLink {
    fn update(&self, token: Token, change: &Change) {
        // The tree may already be gone during teardown.
        if let Some(tree) = self.tree.upgrade() {
            tree.entity_changed(self.node, token, change);
        }
    }
}

/// Collect `node` and all of its descendants, parents first.
fn subtree(nodes: &SlotMap<NodeId, TreeNode>, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        if let Some(n) = nodes.get(id) {
            out.push(id);
            stack.extend(n.children.iter().rev().copied());
        }
    }
    out
}

impl TreeInner {
    fn entity_changed(self: &Rc<Self>, node: NodeId, token: Token, change: &Change) {
        match change {
            Change::State(state) => self.apply_state(node, token, state),
            Change::NewChild(state, child) => {
                self.apply_state(node, token, state);
                self.attach_under(child, node);
            }
            Change::Removed => self.remove(node),
            Change::CheckState(_) => {}
        }
    }

    fn apply_state(&self, node: NodeId, token: Token, state: &EntityState) {
        let Ok(mut nodes) = self.nodes.try_borrow_mut() else {
            log::debug!("Tree busy, dropping update for {}", state.name);
            return;
        };
        let Some(n) = nodes.get_mut(node) else {
            return;
        };
        // Our own check-state push coming back.
        if n.observable.is_echo(token) {
            return;
        }
        n.label.clone_from(&state.name);
        n.foreground = foreground_for(state);
        let check = CheckState::from_active(state.active);
        if n.check != check {
            for id in subtree(&nodes, node) {
                nodes[id].check = check;
            }
        }
    }

    fn node_for(&self, entity: &SharedShape) -> Option<NodeId> {
        self.nodes
            .borrow()
            .iter()
            .find(|(_, n)| n.shows(entity))
            .map(|(id, _)| id)
    }

    /// Give `entity` a node under `parent`, moving its node there if it has one.
    fn attach_under(self: &Rc<Self>, entity: &SharedShape, parent: NodeId) -> Option<NodeId> {
        if let Some(existing) = self.node_for(entity) {
            self.reparent(existing, parent);
            return Some(existing);
        }
        let Ok(shape) = entity.try_borrow() else {
            log::warn!("Entity busy, not added to the tree");
            return None;
        };
        let state = shape.base().state();

        let (id, link, observable) = {
            let mut nodes = self.nodes.borrow_mut();
            if !nodes.contains_key(parent) {
                return None;
            }
            let id = nodes.insert_with_key(|key| TreeNode {
                label: state.name.clone(),
                check: CheckState::from_active(state.active),
                foreground: foreground_for(&state),
                entity: Some(Rc::downgrade(entity)),
                parent: Some(parent),
                children: Vec::new(),
                observable: Rc::new(Observable::new()),
                link: Some(Rc::new(NodeLink {
                    tree: Rc::downgrade(self),
                    node: key,
                })),
            });
            nodes[parent].children.push(id);
            let node = &nodes[id];
            (id, node.link.clone(), node.observable.clone())
        };

        if let Some(link) = link {
            let link: Weak<NodeLink> = Rc::downgrade(&link);
            shape.base().observable().subscribe(link);
        }
        let entity_observer: Weak<RefCell<Shape>> = Rc::downgrade(entity);
        observable.subscribe(entity_observer);

        if let Some(group) = shape.as_group() {
            for child in group.children() {
                self.attach_under(child, id);
            }
        }
        Some(id)
    }

    fn reparent(&self, node: NodeId, parent: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if node == parent || !nodes.contains_key(parent) || subtree(&nodes, node).contains(&parent) {
            log::warn!("Refusing to move a tree node under itself");
            return;
        }
        let Some(old_parent) = nodes.get(node).and_then(|n| n.parent) else {
            return;
        };
        if let Some(old) = nodes.get_mut(old_parent) {
            old.children.retain(|&id| id != node);
        }
        nodes[node].parent = Some(parent);
        nodes[parent].children.push(node);
    }

    /// Remove `node` and its subtree. The root stays.
    fn remove(&self, node: NodeId) {
        if node == self.root {
            return;
        }
        let Ok(mut nodes) = self.nodes.try_borrow_mut() else {
            log::warn!("Tree busy, node not removed");
            return;
        };
        if let Some(parent) = nodes.get(node).and_then(|n| n.parent) {
            if let Some(p) = nodes.get_mut(parent) {
                p.children.retain(|&id| id != node);
            }
        }
        for id in subtree(&nodes, node) {
            nodes.remove(id);
        }
    }

    /// Re-read label and foreground from the node's entity.
    fn refresh(&self, node: NodeId) {
        let entity = self
            .nodes
            .borrow()
            .get(node)
            .and_then(|n| n.entity.as_ref())
            .and_then(Weak::upgrade);
        let Some(entity) = entity else {
            return;
        };
        let state = match entity.try_borrow() {
            Ok(shape) => shape.base().state(),
            Err(_) => return,
        };
        if let Some(n) = self.nodes.borrow_mut().get_mut(node) {
            n.label = state.name.clone();
            n.foreground = foreground_for(&state);
        }
    }
}

/// Tree of checkable nodes bridged to the scene's entities.
///
/// Cloning yields another handle to the same tree.
#[derive(Clone)]
pub struct SceneTree {
    inner: Rc<TreeInner>,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(TreeNode::root());
        Self {
            inner: Rc::new(TreeInner {
                root,
                nodes: RefCell::new(nodes),
            }),
        }
    }

    /// The invisible root. Top-level entities hang below it.
    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    /// Number of entity nodes.
    pub fn len(&self) -> usize {
        self.inner.nodes.borrow().len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mirror a top-level entity, recursing into group children.
    ///
    /// An entity that already has a node is moved under the root instead.
    pub fn attach(&self, entity: &SharedShape) -> Option<NodeId> {
        self.inner.attach_under(entity, self.inner.root)
    }

    /// Remove the node of `entity` and its subtree.
    pub fn detach(&self, entity: &SharedShape) -> bool {
        match self.inner.node_for(entity) {
            Some(node) => {
                self.inner.remove(node);
                true
            }
            None => false,
        }
    }

    /// Apply a user check-state change.
    ///
    /// The node and all its descendants take `state`; each then pushes the
    /// matching activation into its entity.
    pub fn set_check_state(&self, node: NodeId, state: CheckState) {
        let targets: Vec<(NodeId, Rc<Observable>)> = {
            let mut nodes = self.inner.nodes.borrow_mut();
            if node == self.inner.root || !nodes.contains_key(node) {
                return;
            }
            subtree(&nodes, node)
                .into_iter()
                .map(|id| {
                    let n = &mut nodes[id];
                    n.check = state;
                    (id, n.observable.clone())
                })
                .collect()
        };

        let active = state.is_checked();
        for (_, observable) in &targets {
            observable.notify(Change::CheckState(active));
        }
        for (id, _) in targets {
            self.inner.refresh(id);
        }
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .nodes
            .borrow()
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.nodes.borrow().get(node).and_then(|n| n.parent)
    }

    pub fn label(&self, node: NodeId) -> Option<String> {
        self.inner.nodes.borrow().get(node).map(|n| n.label.clone())
    }

    pub fn check_state(&self, node: NodeId) -> Option<CheckState> {
        self.inner.nodes.borrow().get(node).map(|n| n.check)
    }

    pub fn foreground(&self, node: NodeId) -> Option<ShapeColor> {
        self.inner.nodes.borrow().get(node).map(|n| n.foreground)
    }

    /// The entity shown by `node`, if it is still alive.
    pub fn entity(&self, node: NodeId) -> Option<SharedShape> {
        self.inner
            .nodes
            .borrow()
            .get(node)
            .and_then(|n| n.entity.as_ref())
            .and_then(Weak::upgrade)
    }

    pub fn node_for(&self, entity: &SharedShape) -> Option<NodeId> {
        self.inner.node_for(entity)
    }

    /// Indented text rendering, one node per line: `[x] Circle 1`.
    pub fn outline(&self) -> String {
        let nodes = self.inner.nodes.borrow();
        let mut out = String::new();
        let mut stack: Vec<(NodeId, usize)> = nodes[self.inner.root]
            .children
            .iter()
            .rev()
            .map(|&id| (id, 0))
            .collect();
        while let Some((id, depth)) = stack.pop() {
            let node = &nodes[id];
            let _ = writeln!(
                out,
                "{:indent$}[{}] {}",
                "",
                node.check.mark(),
                node.label,
                indent = depth * 2
            );
            stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        out
    }
}

impl fmt::Debug for SceneTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneTree")
            .field("root", &self.inner.root)
            .field("nodes", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::shapes::{Group, ShapeKind};
    use crate::storage::Storage;

    const CANVAS: Rect = Rect::new(0, 0, 800, 600);
    const GREEN: ShapeColor = ShapeColor::new(0, 200, 0);

    fn shape(kind: ShapeKind, x: i32, y: i32) -> SharedShape {
        kind.create(Point::new(x, y), GREEN, 40, false).into_shared()
    }

    fn group_of(children: &[SharedShape]) -> SharedShape {
        let mut group = Group::new();
        for child in children {
            group.add_child(child.clone());
        }
        Shape::Group(group).into_shared()
    }

    #[test]
    fn test_attach_mirrors_entity() {
        let tree = SceneTree::new();
        let circle = shape(ShapeKind::Circle, 100, 100);
        let node = tree.attach(&circle).unwrap();

        assert_eq!(tree.label(node), Some(circle.borrow().name()));
        assert_eq!(tree.check_state(node), Some(CheckState::Unchecked));
        assert_eq!(tree.foreground(node), Some(GREEN));
        assert_eq!(tree.parent(node), Some(tree.root()));
        assert_eq!(tree.node_for(&circle), Some(node));
        assert!(Rc::ptr_eq(&tree.entity(node).unwrap(), &circle));
    }

    #[test]
    fn test_entity_changes_update_node() {
        let tree = SceneTree::new();
        let rect = shape(ShapeKind::Rectangle, 100, 100);
        let node = tree.attach(&rect).unwrap();

        rect.borrow_mut().toggle_activation();
        assert_eq!(tree.check_state(node), Some(CheckState::Checked));
        assert_eq!(tree.foreground(node), Some(HIGHLIGHT));

        rect.borrow_mut().deactivate();
        rect.borrow_mut().set_color(ShapeColor::RED);
        assert_eq!(tree.check_state(node), Some(CheckState::Unchecked));
        assert_eq!(tree.foreground(node), Some(ShapeColor::RED));
    }

    #[test]
    fn test_group_children_get_nodes() {
        let tree = SceneTree::new();
        let a = shape(ShapeKind::Rectangle, 100, 100);
        let b = shape(ShapeKind::Triangle, 200, 200);
        let group = group_of(&[a.clone(), b.clone()]);
        let node = tree.attach(&group).unwrap();

        let children = tree.children(node);
        assert_eq!(children.len(), 2);
        assert_eq!(tree.node_for(&a), Some(children[0]));
        assert_eq!(tree.node_for(&b), Some(children[1]));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_new_child_attaches_node() {
        let tree = SceneTree::new();
        let group = group_of(&[shape(ShapeKind::Circle, 100, 100)]);
        let node = tree.attach(&group).unwrap();

        let extra = shape(ShapeKind::Rectangle, 300, 300);
        group.borrow_mut().as_group_mut().unwrap().add_child(extra.clone());

        let extra_node = tree.node_for(&extra).unwrap();
        assert_eq!(tree.parent(extra_node), Some(node));
        assert_eq!(tree.children(node).len(), 2);
    }

    #[test]
    fn test_new_child_reparents_existing_node() {
        let tree = SceneTree::new();
        let loose = shape(ShapeKind::Circle, 100, 100);
        let loose_node = tree.attach(&loose).unwrap();
        let group = group_of(&[shape(ShapeKind::Rectangle, 300, 300)]);
        let group_node = tree.attach(&group).unwrap();

        group.borrow_mut().as_group_mut().unwrap().add_child(loose.clone());

        assert_eq!(tree.node_for(&loose), Some(loose_node));
        assert_eq!(tree.parent(loose_node), Some(group_node));
        assert_eq!(tree.children(tree.root()), vec![group_node]);
    }

    #[test]
    fn test_checking_group_node_activates_descendants() {
        let tree = SceneTree::new();
        let a = shape(ShapeKind::Rectangle, 100, 100);
        let b = shape(ShapeKind::Circle, 200, 200);
        let inner = group_of(&[b.clone()]);
        let group = group_of(&[a.clone(), inner.clone()]);
        let node = tree.attach(&group).unwrap();

        tree.set_check_state(node, CheckState::Checked);
        for entity in [&group, &a, &inner, &b] {
            assert!(entity.borrow().is_active());
            let n = tree.node_for(entity).unwrap();
            assert_eq!(tree.check_state(n), Some(CheckState::Checked));
            assert_eq!(tree.foreground(n), Some(HIGHLIGHT));
        }

        tree.set_check_state(node, CheckState::Unchecked);
        for entity in [&group, &a, &inner, &b] {
            assert!(!entity.borrow().is_active());
        }
        assert_eq!(tree.foreground(tree.node_for(&a).unwrap()), Some(GREEN));
    }

    #[test]
    fn test_partially_checked_counts_as_checked() {
        let tree = SceneTree::new();
        let circle = shape(ShapeKind::Circle, 100, 100);
        let node = tree.attach(&circle).unwrap();
        tree.set_check_state(node, CheckState::PartiallyChecked);
        assert!(circle.borrow().is_active());
        assert_eq!(tree.check_state(node), Some(CheckState::PartiallyChecked));
    }

    #[test]
    fn test_check_push_while_entity_busy_is_dropped() {
        let tree = SceneTree::new();
        let circle = shape(ShapeKind::Circle, 100, 100);
        let node = tree.attach(&circle).unwrap();
        let guard = circle.borrow();
        tree.set_check_state(node, CheckState::Checked);
        assert!(!guard.is_active());
    }

    #[test]
    fn test_dropping_entity_removes_node() {
        let tree = SceneTree::new();
        let a = shape(ShapeKind::Rectangle, 100, 100);
        let b = shape(ShapeKind::Rectangle, 300, 100);
        let group = group_of(&[a, b]);
        let kept = shape(ShapeKind::Circle, 500, 500);
        tree.attach(&group);
        tree.attach(&kept);
        assert_eq!(tree.len(), 4);

        drop(group);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.children(tree.root()).len(), 1);
    }

    #[test]
    fn test_detach_removes_subtree() {
        let tree = SceneTree::new();
        let child = shape(ShapeKind::Circle, 100, 100);
        let group = group_of(&[child.clone()]);
        tree.attach(&group);

        assert!(tree.detach(&group));
        assert!(tree.is_empty());
        assert!(tree.node_for(&child).is_none());
        assert!(!tree.detach(&group));
    }

    #[test]
    fn test_mutual_updates_terminate() {
        let tree = SceneTree::new();
        let circle = shape(ShapeKind::Circle, 100, 100);
        let node = tree.attach(&circle).unwrap();
        for _ in 0..3 {
            tree.set_check_state(node, CheckState::Checked);
            circle.borrow_mut().toggle_activation();
            assert_eq!(tree.check_state(node), Some(CheckState::Unchecked));
        }
        assert!(circle.borrow_mut().move_by(&CANVAS, 5, 5));
    }

    #[test]
    fn test_storage_keeps_tree_in_sync() {
        let tree = SceneTree::new();
        let mut storage = Storage::with_tree(tree.clone());
        let a = ShapeKind::Circle.create(Point::new(100, 100), GREEN, 40, true).into_shared();
        let b = shape(ShapeKind::Rectangle, 300, 300);
        storage.add_item(a.clone());
        storage.add_item(b.clone());
        assert_eq!(tree.len(), 2);

        storage.delete_all_active();
        assert!(tree.node_for(&a).is_none());
        assert!(tree.node_for(&b).is_some());

        storage.clear();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_outline() {
        let tree = SceneTree::new();
        let a = shape(ShapeKind::Rectangle, 100, 100);
        let group = group_of(&[a.clone()]);
        a.borrow_mut().set_activation(true);
        tree.attach(&group);

        let expected = format!(
            "[ ] {}\n  [x] {}\n",
            group.borrow().name(),
            a.borrow().name()
        );
        assert_eq!(tree.outline(), expected);
    }
}

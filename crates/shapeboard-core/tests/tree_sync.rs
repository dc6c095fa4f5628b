//! Integration tests: storage and editor changes mirrored into the tree view.

use shapeboard_core::{
    CheckState, Editor, EditorConfig, EditorKey, Point, Rect, SceneTree, ShapeColor, Storage,
};
use std::rc::Rc;

const MIXED_SCENE: &str = include_str!("fixtures/mixed_scene.xml");

#[test]
fn tree_mirrors_loaded_scene() {
    let tree = SceneTree::new();
    let mut storage = Storage::with_tree(tree.clone());
    storage.load_markup(MIXED_SCENE).unwrap();

    assert_eq!(
        tree.outline(),
        "[ ] Circle 3\n[ ] Group 2\n  [ ] Rectangle 7\n  [ ] Triangle 5\n"
    );
    let top = tree.children(tree.root());
    assert_eq!(top.len(), 2);
    for (node, item) in top.iter().zip(storage.iter()) {
        assert!(Rc::ptr_eq(&tree.entity(*node).unwrap(), item));
    }
    let circle = top[0];
    assert_eq!(tree.foreground(circle), Some(ShapeColor::new(0xff, 0x88, 0x00)));
}

#[test]
fn reload_replaces_tree() {
    let tree = SceneTree::new();
    let mut storage = Storage::with_tree(tree.clone());
    storage.load_markup(MIXED_SCENE).unwrap();
    storage.load_markup(MIXED_SCENE).unwrap();
    assert_eq!(tree.len(), 4);

    assert!(storage.load_markup("<storage><items>").is_err());
    assert_eq!(tree.len(), 4);
}

#[test]
fn checking_group_activates_all_members() {
    let tree = SceneTree::new();
    let mut storage = Storage::with_tree(tree.clone());
    storage.load_markup(MIXED_SCENE).unwrap();
    let group_node = tree.children(tree.root())[1];

    tree.set_check_state(group_node, CheckState::Checked);

    let active: Vec<_> = storage.active_items().collect();
    assert_eq!(active.len(), 1);
    let group = active[0].borrow();
    for child in group.as_group().unwrap().children() {
        assert!(child.borrow().is_active());
    }
    assert_eq!(
        tree.outline(),
        "[ ] Circle 3\n[x] Group 2\n  [x] Rectangle 7\n  [x] Triangle 5\n"
    );
}

#[test]
fn editor_actions_reach_the_tree() {
    let mut editor = Editor::new(Rect::new(0, 0, 800, 600), EditorConfig::default());
    editor.press(Point::new(400, 400), false);
    editor.press(Point::new(100, 100), true);
    editor.press(Point::new(200, 100), true);
    assert_eq!(editor.tree().len(), 3);

    let group = editor.group_active().unwrap();
    let node = editor.tree().node_for(&group).unwrap();
    assert_eq!(editor.tree().children(node).len(), 2);
    assert_eq!(editor.tree().children(editor.tree().root()).len(), 2);

    // Unchecking the group node deselects its members.
    editor.tree().set_check_state(node, CheckState::Unchecked);
    assert_eq!(editor.storage().active_items().len(), 0);

    editor.tree().set_check_state(node, CheckState::Checked);
    editor.key(EditorKey::Delete);
    assert_eq!(editor.storage().len(), 1);
    assert_eq!(editor.tree().len(), 1);
}

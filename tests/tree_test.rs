//! Tests for ConfigTree node wiring, container operations and walking

use conftree::util::testing::init_test_setup;
use conftree::{load, ConfigTree, Value};

// ============================================================
// Node Wiring Tests
// ============================================================

#[test]
fn given_appended_child_when_reading_then_parent_is_wired() {
    let mut tree = ConfigTree::new("node1");
    let node2 = tree.insert_node("node2", tree.root());

    let parent = tree.node(node2).unwrap().parent.unwrap();
    assert_eq!(tree.node(parent).unwrap().name, "node1");
}

#[test]
fn given_reference_child_when_reading_then_parent_stays_with_owner() {
    let mut tree = ConfigTree::new("node1");
    let node2 = tree.insert_node("node2", tree.root());
    let node3 = tree.insert_node("node3", tree.root());
    tree.append_reference(node2, node3);

    // node3 is still owned by the root, node2 only links to it
    assert_eq!(tree.node(node3).unwrap().parent, Some(tree.root()));
    assert_eq!(tree.get(node2, "node3").unwrap().as_node(), Some(node3));
}

#[test]
fn given_index_style_access_when_name_is_missing_then_error_names_the_path() {
    let mut tree = ConfigTree::new("node1");
    let node2 = tree.insert_node("node2", tree.root());

    let err = tree.get(node2, "nope").unwrap_err();
    assert_eq!(err.to_string(), "nope not in node1.node2");
}

// ============================================================
// Container Operation Tests
// ============================================================

#[test]
fn given_set_with_node_when_reading_then_it_lands_in_references() {
    let mut tree = ConfigTree::new("root");
    let a = tree.insert_node("a", tree.root());
    let b = tree.insert_node("b", tree.root());

    tree.set(a, "b", Value::Node(b));
    tree.set(a, "count", Value::from(7));

    let node = tree.node(a).unwrap();
    assert!(node.reference_children.contains_key("b"));
    assert_eq!(node.children.get("count").unwrap().as_i64(), Some(7));
}

#[test]
fn given_loaded_tree_when_setting_and_removing_then_both_maps_stay_consistent() {
    let mut tree = load("tests/resources/config1/dir2", "dir2").unwrap();
    let json1 = tree.lookup("json1").unwrap().as_node().unwrap();

    // ref1 resolved: link shadows the tombstoned literal, counted once
    let before = tree.len(json1);
    tree.remove(json1, "ref1").unwrap(); // drops the link
    tree.remove(json1, "ref1").unwrap(); // drops the literal
    assert!(tree.remove(json1, "ref1").is_err());
    assert_eq!(tree.len(json1), before - 1);

    tree.set(json1, "added", Value::from("x"));
    assert_eq!(tree.lookup("json1.added").unwrap().as_str(), Some("x"));
}

// ============================================================
// Walk Tests
// ============================================================

#[test]
fn given_loaded_tree_when_walking_then_visits_each_owned_node_once_in_order() {
    init_test_setup();
    let tree = load("tests/resources/config1/dir2", "dir2").unwrap();

    let names: Vec<String> = tree.walk().map(|(_, n)| n.name.clone()).collect();
    assert_eq!(names, vec!["dir2", "json1", "sub", "deep"]);
}

#[test]
fn given_reference_cycle_when_walking_then_traversal_terminates() {
    let tree = load("tests/resources/config1/dir3", "loopy").unwrap();

    let mut names: Vec<String> = tree.walk().map(|(_, n)| n.name.clone()).collect();
    assert_eq!(names, vec!["loopy", "loop1", "loop2"]);

    // restartable: a second walk yields the same sequence
    names.clear();
    names.extend(tree.walk().map(|(_, n)| n.name.clone()));
    assert_eq!(names, vec!["loopy", "loop1", "loop2"]);
}

// ============================================================
// Canonical Path Tests
// ============================================================

#[test]
fn given_nested_node_when_asking_canonical_path_then_names_join_from_root() {
    let tree = load("tests/resources/config1/dir2", "dir2").unwrap();
    let deep = tree.lookup("sub.deep").unwrap().as_node().unwrap();

    assert_eq!(tree.canonical_path(deep), "dir2.sub.deep");
}

// ============================================================
// Rendering Tests
// ============================================================

#[test]
fn given_resolved_tree_when_rendering_then_nodes_and_links_are_listed() {
    let tree = load("tests/resources/config1/dir3", "loopy").unwrap();
    let rendered = tree.to_string();

    assert!(rendered.contains("loopy"));
    assert!(rendered.contains("loop1"));
    assert!(rendered.contains("loop2 -> loopy.loop2"));
}

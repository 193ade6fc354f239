use glam::Vec3;
use serial_test::serial;
use std::sync::{Arc, Mutex};
use super::*;
use crate::bvh::{Binary, Wide};
use crate::error::Error;
use crate::log::{self, LogEntry, LogSeverity, Logger};

fn cube(x: f32, y: f32, z: f32, size: f32) -> AABB {
    AABB::from_center_size(Vec3::new(x, y, z), Vec3::splat(size))
}

/// Boxes spread along a line so every insertion has a clear cheapest spot
fn line_box(i: u32) -> AABB {
    cube(i as f32 * 3.0, (i % 3) as f32, 0.0, 1.0)
}

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_tree_is_empty() {
    let tree: Bvh<u32, Binary> = Bvh::new();
    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.node_count(), 0);
    assert_eq!(tree.depth(), 0);
    assert!(tree.root().is_none());
    assert!(tree.root_bounds().is_none());
    assert!(!tree.is_dirty());
    assert!(tree.validate().is_ok());
}

#[test]
fn test_with_config_rejects_invalid() {
    let config = BvhConfig { max_depth: 0, ..Default::default() };
    let result: Result<Bvh<u32, Wide>> = Bvh::with_config(config);
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn test_with_config_keeps_values() {
    let config = BvhConfig { leaf_padding: 0.5, ..Default::default() };
    let tree: Bvh<u32, Binary> = Bvh::with_config(config).unwrap();
    assert_eq!(tree.config().leaf_padding, 0.5);
}

// ============================================================================
// Add / remove (both variants)
// ============================================================================

fn check_add_pads_leaf<V: Variant>() {
    let mut tree: Bvh<u32, V> = Bvh::new();
    tree.add(1, cube(0.0, 0.0, 0.0, 1.0)).unwrap();

    let bounds = tree.leaf_bounds(1).unwrap();
    assert!(bounds.approx_eq(&cube(0.0, 0.0, 0.0, 1.01), 1e-6));
    assert_eq!(tree.root_bounds(), Some(bounds));
    assert_eq!(tree.len(), 1);
    assert!(tree.contains(1));
}

#[test]
fn test_add_pads_leaf_binary() {
    check_add_pads_leaf::<Binary>();
}

#[test]
fn test_add_pads_leaf_wide() {
    check_add_pads_leaf::<Wide>();
}

fn check_degenerate_box_is_padded<V: Variant>() {
    let mut tree: Bvh<u32, V> = Bvh::new();
    let flat = AABB::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 2.0, 3.0));
    tree.add(7, flat).unwrap();

    let bounds = tree.leaf_bounds(7).unwrap();
    assert!(bounds.size().cmpgt(Vec3::ZERO).all());
    assert!(bounds.half_extent().cmpge(Vec3::ZERO).all());
}

#[test]
fn test_degenerate_box_is_padded_binary() {
    check_degenerate_box_is_padded::<Binary>();
}

#[test]
fn test_degenerate_box_is_padded_wide() {
    check_degenerate_box_is_padded::<Wide>();
}

fn check_add_then_remove_all<V: Variant>() {
    let mut tree: Bvh<u32, V> = Bvh::new();
    for i in 0..40 {
        tree.add(i, line_box(i)).unwrap();
        tree.validate().unwrap();
    }
    assert_eq!(tree.len(), 40);

    for i in (0..40).step_by(3).chain((1..40).step_by(3)).chain((2..40).step_by(3)) {
        assert!(tree.remove(i).unwrap());
        assert!(!tree.contains(i));
        assert!(tree.leaf_bounds(i).is_none());
        tree.validate().unwrap();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.node_count(), 0);
}

#[test]
fn test_add_then_remove_all_binary() {
    check_add_then_remove_all::<Binary>();
}

#[test]
fn test_add_then_remove_all_wide() {
    check_add_then_remove_all::<Wide>();
}

fn check_remove_unknown_is_noop<V: Variant>() {
    let mut tree: Bvh<u32, V> = Bvh::new();
    assert!(!tree.remove(3).unwrap());

    tree.add(1, cube(0.0, 0.0, 0.0, 1.0)).unwrap();
    tree.take_dirty();
    assert!(!tree.remove(3).unwrap());
    assert!(!tree.is_dirty());
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_remove_unknown_is_noop_binary() {
    check_remove_unknown_is_noop::<Binary>();
}

#[test]
fn test_remove_unknown_is_noop_wide() {
    check_remove_unknown_is_noop::<Wide>();
}

fn check_readd_moves_payload<V: Variant>() {
    let mut tree: Bvh<u32, V> = Bvh::new();
    for i in 0..12 {
        tree.add(i, line_box(i)).unwrap();
    }

    let moved = cube(100.0, 0.0, 0.0, 1.0);
    tree.add(4, moved).unwrap();

    assert_eq!(tree.len(), 12);
    assert!(tree.leaf_bounds(4).unwrap().approx_eq(&moved.padded(0.01), 1e-6));
    assert!(tree.root_bounds().unwrap().contains(&moved));
    tree.validate().unwrap();
}

#[test]
fn test_readd_moves_payload_binary() {
    check_readd_moves_payload::<Binary>();
}

#[test]
fn test_readd_moves_payload_wide() {
    check_readd_moves_payload::<Wide>();
}

fn check_remove_readd_same_box<V: Variant>() {
    let mut tree: Bvh<u32, V> = Bvh::new();
    for i in 0..10 {
        tree.add(i, line_box(i)).unwrap();
    }
    tree.remove(5).unwrap();
    tree.add(5, line_box(5)).unwrap();

    assert_eq!(tree.len(), 10);
    assert!(tree.contains(5));
    tree.validate().unwrap();
}

#[test]
fn test_remove_readd_same_box_binary() {
    check_remove_readd_same_box::<Binary>();
}

#[test]
fn test_remove_readd_same_box_wide() {
    check_remove_readd_same_box::<Wide>();
}

// ============================================================================
// Dirty flag / clear
// ============================================================================

#[test]
fn test_dirty_flag_tracks_mutations() {
    let mut tree: Bvh<u32, Binary> = Bvh::new();
    tree.add(1, cube(0.0, 0.0, 0.0, 1.0)).unwrap();
    assert!(tree.is_dirty());
    assert!(tree.take_dirty());
    assert!(!tree.is_dirty());

    tree.remove(1).unwrap();
    assert!(tree.take_dirty());
}

#[test]
fn test_clear_resets_everything() {
    let mut tree: Bvh<u32, Wide> = Bvh::new();
    for i in 0..20 {
        tree.add(i, line_box(i)).unwrap();
    }
    tree.take_dirty();
    tree.clear();

    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.node_count(), 0);
    assert!(tree.is_dirty());
    assert!(tree.validate().is_ok());

    tree.add(3, line_box(3)).unwrap();
    assert_eq!(tree.len(), 1);
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_depth_counts_nodes() {
    let mut tree: Bvh<u32, Binary> = Bvh::new();
    tree.add(0, cube(0.0, 0.0, 0.0, 1.0)).unwrap();
    assert_eq!(tree.depth(), 1);

    tree.add(1, cube(10.0, 0.0, 0.0, 1.0)).unwrap();
    assert_eq!(tree.depth(), 2);
}

#[test]
fn test_ancestors_leaf_to_root() {
    let mut tree: Bvh<u32, Binary> = Bvh::new();
    tree.add(0, cube(0.0, 0.0, 0.0, 1.0)).unwrap();
    tree.add(1, cube(10.0, 0.0, 0.0, 1.0)).unwrap();

    let chain = tree.ancestors(1);
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0], tree.leaf_bounds(1).unwrap());
    assert_eq!(chain[1], tree.root_bounds().unwrap());
    assert!(tree.ancestors(99).is_empty());
}

#[test]
fn test_payloads_lists_indexed() {
    let mut tree: Bvh<u32, Wide> = Bvh::new();
    for i in 0..5 {
        tree.add(i, line_box(i)).unwrap();
    }
    let mut payloads: Vec<u32> = tree.payloads().collect();
    payloads.sort();
    assert_eq!(payloads, vec![0, 1, 2, 3, 4]);
}

// ============================================================================
// Attach guards
// ============================================================================

#[test]
fn test_attach_rejects_ancestor() {
    let mut tree: Bvh<u32, Binary> = Bvh::new();
    tree.add(0, cube(0.0, 0.0, 0.0, 1.0)).unwrap();
    tree.add(1, cube(10.0, 0.0, 0.0, 1.0)).unwrap();
    let root = tree.root().unwrap();
    let leaf = tree.leaf(0).unwrap();

    let result = tree.attach(leaf, 0, root);
    assert!(matches!(result, Err(Error::CycleDetected(_))));
}

#[test]
fn test_attach_rejects_second_parent() {
    let mut tree: Bvh<u32, Wide> = Bvh::new();
    for i in 0..3 {
        tree.add(i, line_box(i)).unwrap();
    }
    let root = tree.root().unwrap();
    let leaf = tree.leaf(0).unwrap();

    let result = tree.attach(root, 5, leaf);
    assert!(matches!(result, Err(Error::CycleDetected(_))));
    tree.validate().unwrap();
}

#[test]
fn test_attach_rejects_self() {
    let mut tree: Bvh<u32, Wide> = Bvh::new();
    tree.add(0, line_box(0)).unwrap();
    tree.add(1, line_box(1)).unwrap();
    let root = tree.root().unwrap();

    assert!(matches!(tree.attach(root, 4, root), Err(Error::CycleDetected(_))));
}

// ============================================================================
// Structural defects
// ============================================================================

#[test]
#[serial]
fn test_binary_missing_sibling_aborts_without_mutation() {
    let mut tree: Bvh<u32, Binary> = Bvh::new();
    tree.add(0, cube(0.0, 0.0, 0.0, 1.0)).unwrap();
    tree.add(1, cube(10.0, 0.0, 0.0, 1.0)).unwrap();
    let root = tree.root().unwrap();
    let sibling_slot = tree.nodes[root].slot_of(tree.leaf(1).unwrap()).unwrap();

    // Drop the sibling link by hand
    tree.nodes[root].slots[sibling_slot] = None;
    let node_count = tree.node_count();
    tree.take_dirty();

    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { entries: entries.clone() });
    let result = tree.remove(0);
    log::reset_logger();

    assert!(matches!(result, Err(Error::StructuralDefect(_))));
    assert!(tree.contains(0));
    assert_eq!(tree.node_count(), node_count);
    assert!(!tree.is_dirty());

    let entries = entries.lock().unwrap();
    assert!(entries.iter().any(|e| e.severity == LogSeverity::Warn && e.source == "galaxy3d::bvh"));
}

#[test]
#[serial]
fn test_collapse_with_missing_sibling_aborts_without_mutation() {
    let mut tree: Bvh<u32, Wide> = Bvh::new();
    for i in 0..8 {
        tree.add(i, line_box(i)).unwrap();
    }
    tree.add(8, line_box(3)).unwrap();
    let inner = tree.node(tree.leaf(8).unwrap()).unwrap().parent().unwrap();
    let root = tree.root().unwrap();

    // Lose the sibling of payload 8 from the arena, leaving its slot dangling
    let sibling = tree.leaf(3).unwrap();
    tree.nodes.remove(sibling);
    let node_count = tree.node_count();
    tree.take_dirty();

    let result = tree.remove(8);

    assert!(matches!(result, Err(Error::StructuralDefect(_))));
    assert!(tree.contains(8));
    assert_eq!(tree.node_count(), node_count);
    assert_eq!(tree.node(tree.leaf(8).unwrap()).unwrap().parent(), Some(inner));
    assert!(tree.node(root).unwrap().slot_of(inner).is_some());
    assert!(!tree.is_dirty());
}

#[test]
fn test_collapse_promotes_into_grandparent_slot() {
    let mut tree: Bvh<u32, Binary> = Bvh::new();
    tree.add(0, cube(-20.0, 0.0, 0.0, 1.0)).unwrap();
    tree.add(1, cube(5.0, 0.0, 0.0, 1.0)).unwrap();
    tree.add(2, cube(6.0, 0.0, 0.0, 1.0)).unwrap();
    let root = tree.root().unwrap();
    let inner = tree.node(tree.leaf(2).unwrap()).unwrap().parent().unwrap();
    let slot = tree.node(root).unwrap().slot_of(inner).unwrap();

    assert!(tree.remove(2).unwrap());

    let survivor = tree.leaf(1).unwrap();
    assert_eq!(tree.node(root).unwrap().slots()[slot], Some(survivor));
    assert_eq!(tree.node(survivor).unwrap().parent(), Some(root));
    assert!(tree.node(inner).is_none());
    tree.validate().unwrap();
}

#[test]
#[serial]
fn test_validate_reports_loose_box() {
    let mut tree: Bvh<u32, Binary> = Bvh::new();
    tree.add(0, cube(0.0, 0.0, 0.0, 1.0)).unwrap();
    tree.add(1, cube(10.0, 0.0, 0.0, 1.0)).unwrap();
    let root = tree.root().unwrap();
    tree.nodes[root].aabb = cube(0.0, 0.0, 0.0, 100.0);

    assert!(matches!(tree.validate(), Err(Error::StructuralDefect(_))));
}

#[test]
#[serial]
fn test_validate_reports_stale_index() {
    let mut tree: Bvh<u32, Wide> = Bvh::new();
    for i in 0..4 {
        tree.add(i, line_box(i)).unwrap();
    }
    let other = tree.leaf(2).unwrap();
    tree.index.insert(1, other);

    assert!(matches!(tree.validate(), Err(Error::StructuralDefect(_))));
}

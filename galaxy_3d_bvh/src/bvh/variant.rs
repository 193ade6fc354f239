/// Variant trait: the small set of hooks that distinguish the binary tree
/// from the 8-way tree.
///
/// `Bvh` owns the whole add/remove/refit/flatten control flow. A variant
/// only decides where a new leaf goes, what happens to a parent that lost a
/// child, and how the `full` flag is maintained.

use std::fmt::Debug;
use crate::error::Result;
use crate::math::AABB;
use super::node::{Node, NodeKey, Payload};
use super::tree::Bvh;

/// Where a new leaf is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Split this leaf: it becomes internal, and its payload moves to a new
    /// child next to the new leaf (slots given by `Variant::SPLIT_SLOTS`).
    Split(NodeKey),
    /// Attach the new leaf to an empty slot of an internal node.
    Attach { parent: NodeKey, slot: usize },
}

/// What removal does to the parent of the removed leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shrink {
    /// Parent stays; refit from it
    Keep,
    /// Parent is dropped and its sole remaining child takes its place
    Collapse,
    /// Parent is the root and has no child left: the tree becomes empty
    Clear,
    /// Linkage is inconsistent; abort without touching the tree
    Defect,
}

/// Hooks implemented by `Binary` and `Wide`.
pub trait Variant: Sized + 'static {
    /// Fixed-size child slot array
    type Slots: Copy + Default + Debug + AsRef<[Option<NodeKey>]> + AsMut<[Option<NodeKey>]>;

    /// Number of child slots per internal node
    const ARITY: usize;

    /// Fewest children a settled internal node may keep
    const MIN_CHILDREN: usize;

    /// Name used in log messages
    const NAME: &'static str;

    /// Slots of a split leaf's old payload and of the new leaf, in that order
    const SPLIT_SLOTS: (usize, usize);

    /// Descend from the root and decide where a leaf with `aabb` goes.
    ///
    /// Must not mutate the tree. Only called on a non-empty tree.
    fn find_placement<P: Payload>(tree: &Bvh<P, Self>, aabb: &AABB) -> Result<Placement>;

    /// Decide the fate of a parent left with `remaining` children.
    fn shrink_action(remaining: usize, parent_is_root: bool) -> Shrink;

    /// Expected `full` flag of `key` sitting at `depth` (root = 0).
    fn expected_full<P: Payload>(_tree: &Bvh<P, Self>, _key: NodeKey, _depth: usize) -> bool {
        false
    }

    /// Refresh `full` flags after the children of `from` changed.
    ///
    /// `moved` is set when `from` was just promoted one level up, so every
    /// depth in its subtree changed.
    fn update_full<P: Payload>(_tree: &mut Bvh<P, Self>, _from: NodeKey, _moved: bool) {}
}

/// Pick the child of `parent` to descend into.
///
/// A child whose box already encloses `aabb` wins (first in slot order).
/// Otherwise the child with the smallest union surface area wins, ties
/// going to the lower slot. Children rejected by `eligible` are skipped.
pub(crate) fn choose_child<P, V>(
    tree: &Bvh<P, V>,
    parent: &Node<P, V::Slots>,
    aabb: &AABB,
    eligible: impl Fn(&Node<P, V::Slots>) -> bool,
) -> Option<NodeKey>
where
    P: Payload,
    V: Variant,
{
    let mut best: Option<(NodeKey, f32)> = None;

    for key in parent.children() {
        let Some(child) = tree.node(key) else { continue };
        if !eligible(child) {
            continue;
        }
        if child.aabb.contains(aabb) {
            return Some(key);
        }
        let cost = child.aabb.union_surface_area(aabb);
        if best.map_or(true, |(_, best_cost)| cost < best_cost) {
            best = Some((key, cost));
        }
    }

    best.map(|(key, _)| key)
}

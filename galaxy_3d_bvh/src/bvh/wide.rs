/// Wide variant: 8 child slots per internal node.
///
/// Insertion fills empty slots before it descends, so the first eight
/// payloads under a node sit side by side without any cost comparison.
/// Once a node is saturated the new leaf descends into the cheapest child,
/// skipping children flagged `full` under `FullPolicy::Prune`.
///
/// A node is `full` when it sits at depth `max_depth - 1` or deeper, or when
/// all eight of its slots hold `full` children. Leaves above the depth cap
/// are never full, so they stay splittable.

use crate::error::Result;
use crate::math::AABB;
use crate::{bvh_err, bvh_warn_err};
use super::config::FullPolicy;
use super::node::{NodeKey, Payload};
use super::tree::{Bvh, LOG_SOURCE};
use super::variant::{choose_child, Placement, Shrink, Variant};

/// 8-ary tree variant
#[derive(Debug, Clone, Copy, Default)]
pub struct Wide;

impl Variant for Wide {
    type Slots = [Option<NodeKey>; 8];

    const ARITY: usize = 8;
    const MIN_CHILDREN: usize = 1;
    const NAME: &'static str = "Wide";
    const SPLIT_SLOTS: (usize, usize) = (0, 1);

    fn find_placement<P: Payload>(tree: &Bvh<P, Self>, aabb: &AABB) -> Result<Placement> {
        let Some(mut current) = tree.root() else {
            return Err(bvh_err!(LOG_SOURCE, StructuralDefect, "Wide BVH: placement on an empty tree"));
        };
        let prune = tree.config().full_policy == FullPolicy::Prune;

        for _ in 0..=tree.node_count() {
            let Some(node) = tree.node(current) else {
                return Err(bvh_err!(LOG_SOURCE, StructuralDefect,
                    "Wide BVH: descent reached missing node {:?}", current));
            };

            if node.is_leaf() {
                return Ok(Placement::Split(current));
            }
            if let Some(slot) = node.first_free_slot() {
                return Ok(Placement::Attach { parent: current, slot });
            }

            match choose_child(tree, node, aabb, |child| !prune || !child.is_full()) {
                Some(next) => current = next,
                None => {
                    return Err(bvh_warn_err!(LOG_SOURCE, CapacityExhausted,
                        "Wide BVH: every child of {:?} is full (max_depth {})",
                        current, tree.config().max_depth));
                }
            }
        }

        Err(bvh_err!(LOG_SOURCE, CycleDetected, "Wide BVH: insertion descent did not terminate"))
    }

    fn shrink_action(remaining: usize, parent_is_root: bool) -> Shrink {
        match (remaining, parent_is_root) {
            (0, true) => Shrink::Clear,
            (0, false) => Shrink::Defect,
            (1, false) => Shrink::Collapse,
            _ => Shrink::Keep,
        }
    }

    fn expected_full<P: Payload>(tree: &Bvh<P, Self>, key: NodeKey, depth: usize) -> bool {
        if depth + 1 >= tree.config().max_depth {
            return true;
        }
        let Some(node) = tree.node(key) else { return false };
        if node.is_leaf() {
            return false;
        }
        node.slots().iter().all(|slot| {
            slot.and_then(|child| tree.node(child)).is_some_and(|child| child.is_full())
        })
    }

    fn update_full<P: Payload>(tree: &mut Bvh<P, Self>, from: NodeKey, moved: bool) {
        let depth = tree.depth_of(from);

        if moved {
            refresh_subtree(tree, from, depth);
        } else {
            let leaves: Vec<NodeKey> = tree.node(from)
                .map(|node| node.children().collect())
                .unwrap_or_default();
            for leaf in leaves {
                if tree.node(leaf).is_some_and(|node| node.is_leaf()) {
                    set_full(tree, leaf, depth + 1);
                }
            }
        }

        // Always settle `from` and its parent, then climb while flags flip
        let limit = tree.config().max_depth;
        let mut current = Some(from);
        let mut depth = depth;
        let mut steps = 0;
        while let Some(key) = current {
            let changed = set_full(tree, key, depth);
            if !changed && steps > 0 {
                break;
            }
            steps += 1;
            if steps > limit {
                break;
            }
            current = tree.node(key).and_then(|node| node.parent());
            depth = depth.saturating_sub(1);
        }
    }
}

/// Recompute `key`'s flag. Returns true if it flipped.
fn set_full<P: Payload>(tree: &mut Bvh<P, Wide>, key: NodeKey, depth: usize) -> bool {
    let full = Wide::expected_full(tree, key, depth);
    match tree.nodes.get_mut(key) {
        Some(node) if node.full != full => {
            node.full = full;
            true
        }
        _ => false,
    }
}

/// Recompute every flag under `root` bottom-up (children before parents).
fn refresh_subtree<P: Payload>(tree: &mut Bvh<P, Wide>, root: NodeKey, depth: usize) {
    let mut order = Vec::new();
    let mut stack = vec![(root, depth)];
    while let Some((key, depth)) = stack.pop() {
        order.push((key, depth));
        if order.len() > tree.node_count() {
            break;
        }
        if let Some(node) = tree.node(key) {
            stack.extend(node.children().map(|child| (child, depth + 1)));
        }
    }

    for (key, depth) in order.into_iter().rev() {
        set_full(tree, key, depth);
    }
}

/// Wide BVH over payload handles `P`
pub type WideBvh<P> = Bvh<P, Wide>;

#[cfg(test)]
#[path = "wide_tests.rs"]
mod tests;

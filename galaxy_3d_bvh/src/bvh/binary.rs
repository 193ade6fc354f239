/// Binary variant: every internal node has exactly two children.
///
/// A new leaf descends by enclosure, then by smallest union surface area,
/// until it reaches a leaf, which is split: the new leaf takes slot 0 and
/// the old payload moves to slot 1. Removing a leaf always promotes
/// its sibling into the parent's place.

use crate::error::Result;
use crate::math::AABB;
use crate::bvh_err;
use super::node::{NodeKey, Payload};
use super::tree::{Bvh, LOG_SOURCE};
use super::variant::{choose_child, Placement, Shrink, Variant};

/// 2-ary tree variant
#[derive(Debug, Clone, Copy, Default)]
pub struct Binary;

impl Variant for Binary {
    type Slots = [Option<NodeKey>; 2];

    const ARITY: usize = 2;
    const MIN_CHILDREN: usize = 2;
    const NAME: &'static str = "Binary";
    const SPLIT_SLOTS: (usize, usize) = (1, 0);

    fn find_placement<P: Payload>(tree: &Bvh<P, Self>, aabb: &AABB) -> Result<Placement> {
        let Some(mut current) = tree.root() else {
            return Err(bvh_err!(LOG_SOURCE, StructuralDefect, "Binary BVH: placement on an empty tree"));
        };

        // A path longer than the node count means the links loop
        for _ in 0..=tree.node_count() {
            let Some(node) = tree.node(current) else {
                return Err(bvh_err!(LOG_SOURCE, StructuralDefect,
                    "Binary BVH: descent reached missing node {:?}", current));
            };

            if node.is_leaf() {
                return Ok(Placement::Split(current));
            }
            if let Some(slot) = node.first_free_slot() {
                return Ok(Placement::Attach { parent: current, slot });
            }

            match choose_child(tree, node, aabb, |_| true) {
                Some(next) => current = next,
                None => {
                    return Err(bvh_err!(LOG_SOURCE, StructuralDefect,
                        "Binary BVH: internal node {:?} has no reachable child", current));
                }
            }
        }

        Err(bvh_err!(LOG_SOURCE, CycleDetected, "Binary BVH: insertion descent did not terminate"))
    }

    fn shrink_action(remaining: usize, _parent_is_root: bool) -> Shrink {
        match remaining {
            0 => Shrink::Defect,
            1 => Shrink::Collapse,
            _ => Shrink::Keep,
        }
    }
}

/// Binary BVH over payload handles `P`
pub type BinaryBvh<P> = Bvh<P, Binary>;

#[cfg(test)]
#[path = "binary_tests.rs"]
mod tests;

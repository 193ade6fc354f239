/// Flatten - pre-order serialization of a tree into an index-addressed array.
///
/// The root is always element 0. Each node is followed by its subtrees in
/// slot order, and child references are translated to positions in the
/// output array while walking. Nodes deeper than `flatten_depth_limit` are
/// left out and counted in `FlatBvh::truncated`.
///
/// A node reached twice is a hard consistency error (`CycleDetected`), not
/// something to skip.

use rustc_hash::FxHashSet;
use crate::error::Result;
use crate::math::AABB;
use crate::{bvh_err, bvh_warn};
use super::gpu::{GpuBvhNode, GpuNodeFlags, GPU_NONE};
use super::node::{NodeKey, Payload};
use super::tree::{Bvh, LOG_SOURCE};
use super::variant::Variant;

/// Largest arity across variants (width of `FlatNode::children`)
pub const MAX_ARITY: usize = 8;

/// One node of a flattened tree
#[derive(Debug, Clone, PartialEq)]
pub struct FlatNode<P> {
    /// Node box
    pub aabb: AABB,
    /// Position of the parent in the flat array (None for the root)
    pub parent: Option<u32>,
    /// Positions of the children, indexed by slot
    ///
    /// Slots past the variant's arity, empty slots and children cut by the
    /// depth limit are None.
    pub children: [Option<u32>; MAX_ARITY],
    /// Payload of a leaf
    pub payload: Option<P>,
    /// Depth below the root (root = 0)
    pub depth: u32,
    /// Wide-variant saturation flag
    pub full: bool,
}

impl<P: Payload> FlatNode<P> {
    /// Whether this node holds a payload
    pub fn is_leaf(&self) -> bool {
        self.payload.is_some()
    }

    /// Emitted children in slot order
    pub fn child_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.children.iter().flatten().copied()
    }
}

/// Flattened tree, ready for a buffer builder
#[derive(Debug, Clone)]
pub struct FlatBvh<P> {
    nodes: Vec<FlatNode<P>>,
    truncated: usize,
}

impl<P> Default for FlatBvh<P> {
    fn default() -> Self {
        Self { nodes: Vec::new(), truncated: 0 }
    }
}

impl<P: Payload> FlatBvh<P> {
    /// Nodes in pre-order (root first)
    pub fn nodes(&self) -> &[FlatNode<P>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root node, None for an empty tree
    pub fn root(&self) -> Option<&FlatNode<P>> {
        self.nodes.first()
    }

    /// Number of subtrees left out by the depth limit
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    /// Number of emitted leaves
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Emitted payloads in flatten order
    pub fn payloads(&self) -> impl Iterator<Item = P> + '_ {
        self.nodes.iter().filter_map(|node| node.payload)
    }

    /// Pack into GPU records, numbering payloads in flatten order.
    pub fn pack(&self) -> Vec<GpuBvhNode> {
        let mut next = 0u32;
        self.pack_with(|_| {
            let index = next;
            next += 1;
            Some(index)
        })
    }

    /// Pack into GPU records, asking `payload_index` for each leaf's slot in
    /// the caller's payload buffer. None is written as `GPU_NONE`.
    pub fn pack_with(&self, mut payload_index: impl FnMut(&P) -> Option<u32>) -> Vec<GpuBvhNode> {
        self.nodes.iter().map(|node| {
            let mut flags = GpuNodeFlags::empty();
            flags.set(GpuNodeFlags::LEAF, node.is_leaf());
            flags.set(GpuNodeFlags::FULL, node.full);
            flags.set(GpuNodeFlags::ROOT, node.parent.is_none());

            GpuBvhNode {
                children: node.children.map(gpu_index),
                payload_index: gpu_index(node.payload.as_ref().and_then(&mut payload_index)),
                parent: gpu_index(node.parent),
                min: node.aabb.min.to_array(),
                depth: node.depth,
                max: node.aabb.max.to_array(),
                flags: flags.bits(),
                ..Default::default()
            }
        }).collect()
    }
}

fn gpu_index(index: Option<u32>) -> i32 {
    index.and_then(|index| i32::try_from(index).ok()).unwrap_or(GPU_NONE)
}

impl<P: Payload, V: Variant> Bvh<P, V> {
    /// Serialize the tree in pre-order.
    ///
    /// # Errors
    ///
    /// - `CycleDetected` if a node is reached twice
    /// - `StructuralDefect` if a child link points to a missing node
    /// - `CapacityExhausted` if the node count does not fit a `u32` index
    pub fn flatten(&self) -> Result<FlatBvh<P>> {
        let mut flat = FlatBvh::default();
        let Some(root) = self.root() else {
            return Ok(flat);
        };

        let limit = self.config().flatten_depth_limit;
        let mut visited: FxHashSet<NodeKey> = FxHashSet::default();
        // (node, parent position, slot in parent, depth)
        let mut stack: Vec<(NodeKey, Option<u32>, usize, usize)> = vec![(root, None, 0, 0)];
        flat.nodes.reserve(self.node_count());

        while let Some((key, parent, slot, depth)) = stack.pop() {
            if !visited.insert(key) {
                return Err(bvh_err!(LOG_SOURCE, CycleDetected,
                    "{} BVH: {:?} reached twice while flattening", V::NAME, key));
            }
            let Some(node) = self.node(key) else {
                return Err(bvh_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: flatten reached missing node {:?}", V::NAME, key));
            };
            let Ok(index) = u32::try_from(flat.nodes.len()) else {
                return Err(bvh_err!(LOG_SOURCE, CapacityExhausted,
                    "{} BVH: too many nodes to flatten", V::NAME));
            };

            if let Some(parent) = parent {
                if let Some(entry) = flat.nodes.get_mut(parent as usize).and_then(|p| p.children.get_mut(slot)) {
                    *entry = Some(index);
                }
            }

            flat.nodes.push(FlatNode {
                aabb: node.aabb,
                parent,
                children: [None; MAX_ARITY],
                payload: node.payload,
                depth: depth as u32,
                full: node.full,
            });

            if depth + 1 >= limit {
                flat.truncated += node.child_count();
                continue;
            }

            // Reverse push so children pop in slot order
            for (slot, child) in node.slots().iter().enumerate().rev() {
                if let Some(child) = child {
                    stack.push((*child, Some(index), slot, depth + 1));
                }
            }
        }

        if flat.truncated > 0 {
            bvh_warn!(LOG_SOURCE, "{} BVH: flatten depth limit {} left out {} subtrees",
                V::NAME, limit, flat.truncated);
        }
        Ok(flat)
    }
}

#[cfg(test)]
#[path = "flatten_tests.rs"]
mod tests;

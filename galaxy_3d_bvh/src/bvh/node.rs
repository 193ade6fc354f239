/// Tree node stored in the BVH arena.
///
/// Nodes never own each other: the arena owns every node, and parent/child
/// links are plain `NodeKey`s. A node is a leaf when it carries a payload,
/// internal otherwise.

use std::fmt::Debug;
use std::hash::Hash;
use slotmap::new_key_type;
use crate::math::AABB;

new_key_type! {
    /// Stable key of a node inside a tree's arena
    pub struct NodeKey;
}

/// Requirements for a payload handle stored in a leaf.
///
/// Any small copyable identity works: a slotmap key from the host scene,
/// an entity id, an index.
pub trait Payload: Copy + Eq + Hash + Debug {}

impl<T: Copy + Eq + Hash + Debug> Payload for T {}

/// A single BVH node.
///
/// `S` is the fixed-size child slot array of the tree variant.
#[derive(Debug, Clone)]
pub struct Node<P, S> {
    /// Padded payload box for a leaf, union of the children for an internal node
    pub(crate) aabb: AABB,
    /// Back-reference to the parent (None for the root)
    pub(crate) parent: Option<NodeKey>,
    /// Child slots (all None for a leaf)
    pub(crate) slots: S,
    /// Payload handle (Some iff leaf)
    pub(crate) payload: Option<P>,
    /// Subtree saturation flag (wide variant only, always false for binary)
    pub(crate) full: bool,
}

impl<P: Payload, S: Default + AsRef<[Option<NodeKey>]>> Node<P, S> {
    pub(crate) fn leaf(payload: P, aabb: AABB) -> Self {
        Self {
            aabb,
            parent: None,
            slots: S::default(),
            payload: Some(payload),
            full: false,
        }
    }

    /// World-space box of this node
    pub fn aabb(&self) -> &AABB {
        &self.aabb
    }

    /// Parent key (None for the root)
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Raw child slots, empty slots included
    pub fn slots(&self) -> &[Option<NodeKey>] {
        self.slots.as_ref()
    }

    /// Occupied child slots in slot order
    pub fn children(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.slots.as_ref().iter().flatten().copied()
    }

    /// Number of occupied child slots
    pub fn child_count(&self) -> usize {
        self.slots.as_ref().iter().filter(|slot| slot.is_some()).count()
    }

    /// Index of the first empty child slot
    pub fn first_free_slot(&self) -> Option<usize> {
        self.slots.as_ref().iter().position(|slot| slot.is_none())
    }

    /// Slot holding `child`, if any
    pub fn slot_of(&self, child: NodeKey) -> Option<usize> {
        self.slots.as_ref().iter().position(|slot| *slot == Some(child))
    }

    /// Payload handle of a leaf
    pub fn payload(&self) -> Option<P> {
        self.payload
    }

    /// Whether this node holds a payload
    pub fn is_leaf(&self) -> bool {
        self.payload.is_some()
    }

    /// Wide-variant saturation flag
    pub fn is_full(&self) -> bool {
        self.full
    }
}

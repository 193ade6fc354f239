/// Bvh - dynamic bounding volume hierarchy shared by both arities.
///
/// The tree owns every node in a slotmap arena and keeps a reverse lookup
/// from payload to its leaf so that removal never searches the tree.
/// Variant-specific decisions (where a new leaf goes, how a parent shrinks,
/// `full` flag upkeep) are delegated to the `Variant` type parameter; the
/// rest of the control flow lives here once:
///
/// - **add**: pad the box, find a placement, split or attach, refit upward
/// - **remove**: detach the leaf, keep or collapse the parent, refit upward
/// - **refit**: walk parent links to the root, unioning existing children
///
/// New nodes are only ever linked through `attach`, which refuses to give a
/// node a second parent or to make a node its own ancestor. A collapse only
/// moves an existing child up into the slot its parent held. Sharing and
/// cycles therefore cannot be built.

use std::marker::PhantomData;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use crate::error::Result;
use crate::math::AABB;
use crate::{bvh_err, bvh_warn, bvh_warn_err};
use super::config::{BvhConfig, FullPolicy};
use super::node::{Node, NodeKey, Payload};
use super::variant::{Placement, Shrink, Variant};

pub(crate) const LOG_SOURCE: &str = "galaxy3d::bvh";

/// Dynamic BVH over payload handles `P`, with arity chosen by `V`.
pub struct Bvh<P, V: Variant> {
    /// Node arena (the registry of every live node)
    pub(crate) nodes: SlotMap<NodeKey, Node<P, V::Slots>>,
    /// Root node (None when empty)
    root: Option<NodeKey>,
    /// Reverse lookup: payload → owning leaf
    index: FxHashMap<P, NodeKey>,
    config: BvhConfig,
    /// Set by every structural change, cleared by `take_dirty`
    dirty: bool,
    _variant: PhantomData<V>,
}

impl<P: Payload, V: Variant> Default for Bvh<P, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Payload, V: Variant> Bvh<P, V> {
    /// Create an empty tree with the default configuration.
    pub fn new() -> Self {
        Self::build(BvhConfig::default())
    }

    /// Create an empty tree with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `config` does not validate.
    pub fn with_config(config: BvhConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: BvhConfig) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            index: FxHashMap::default(),
            config,
            dirty: false,
            _variant: PhantomData,
        }
    }

    // ===== MUTATION =====

    /// Insert `payload` with its world-space box.
    ///
    /// The box is normalized and padded by `leaf_padding` before it is
    /// stored. A payload that is already indexed is removed first, so
    /// calling `add` again is how a moved object is re-indexed.
    ///
    /// # Errors
    ///
    /// - `CapacityExhausted` if the wide variant finds every candidate
    ///   subtree full. The tree is unchanged apart from the removal of a
    ///   previous entry for the same payload.
    /// - `StructuralDefect` if removing the previous entry failed.
    pub fn add(&mut self, payload: P, aabb: AABB) -> Result<()> {
        if self.index.contains_key(&payload) {
            self.remove(payload)?;
        }

        let leaf_box = aabb.padded(self.config.leaf_padding);

        if self.root.is_none() {
            let leaf = self.nodes.insert(Node::leaf(payload, leaf_box));
            self.root = Some(leaf);
            self.index.insert(payload, leaf);
            V::update_full(self, leaf, false);
            self.dirty = true;
            return Ok(());
        }

        let placement = V::find_placement(self, &leaf_box)?;
        let leaf = self.nodes.insert(Node::leaf(payload, leaf_box));

        let linked = match placement {
            Placement::Split(target) => self.split(target, leaf),
            Placement::Attach { parent, slot } => self.attach(parent, slot, leaf).map(|()| parent),
        };
        let parent = match linked {
            Ok(parent) => parent,
            Err(err) => {
                self.nodes.remove(leaf);
                return Err(err);
            }
        };

        self.index.insert(payload, leaf);
        self.refit_from(Some(parent));
        V::update_full(self, parent, false);
        self.dirty = true;
        Ok(())
    }

    /// Remove `payload` from the tree.
    ///
    /// Returns `Ok(false)` when the payload is not indexed (no-op) and
    /// `Ok(true)` when its leaf was removed.
    ///
    /// # Errors
    ///
    /// Returns `StructuralDefect` (logged as a warning) when the leaf's
    /// linkage is inconsistent. Nothing is mutated in that case, so the
    /// caller may fall back to a full rebuild.
    pub fn remove(&mut self, payload: P) -> Result<bool> {
        let Some(&leaf) = self.index.get(&payload) else {
            return Ok(false);
        };

        let Some(parent) = self.nodes.get(leaf).map(|node| node.parent) else {
            return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                "{} BVH: index entry for {:?} points to a missing node", V::NAME, payload));
        };

        match parent {
            None if self.root == Some(leaf) => {
                self.nodes.remove(leaf);
                self.root = None;
            }
            None => {
                return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: leaf of {:?} has no parent but is not the root", V::NAME, payload));
            }
            Some(parent) => self.detach_leaf(payload, leaf, parent)?,
        }

        self.index.remove(&payload);
        self.dirty = true;
        Ok(true)
    }

    /// Remove every node and payload.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.root = None;
        self.dirty = true;
    }

    /// Unlink `leaf` from `parent` and restructure according to the variant.
    ///
    /// Every lookup happens before the first mutation.
    fn detach_leaf(&mut self, payload: P, leaf: NodeKey, parent: NodeKey) -> Result<()> {
        let Some(parent_node) = self.nodes.get(parent) else {
            return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                "{} BVH: parent of {:?} is missing from the arena", V::NAME, payload));
        };
        let Some(slot) = parent_node.slot_of(leaf) else {
            return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                "{} BVH: leaf of {:?} is not among its parent's children", V::NAME, payload));
        };
        let remaining = parent_node.child_count() - 1;
        let survivor = parent_node.children().find(|&child| child != leaf);
        let grandparent = parent_node.parent;
        let parent_is_root = self.root == Some(parent);

        match V::shrink_action(remaining, parent_is_root) {
            Shrink::Defect => Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                "{} BVH: removing {:?} would leave {:?} with {} children",
                V::NAME, payload, parent, remaining)),

            Shrink::Keep => {
                self.clear_slot(parent, slot);
                self.nodes.remove(leaf);
                self.refit_from(Some(parent));
                V::update_full(self, parent, false);
                Ok(())
            }

            Shrink::Collapse => {
                let Some(survivor) = survivor else {
                    return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                        "{} BVH: no sibling left to promote when removing {:?}", V::NAME, payload));
                };
                let grandparent_slot = match grandparent {
                    Some(grandparent) => {
                        let slot = self.nodes.get(grandparent).and_then(|node| node.slot_of(parent));
                        match slot {
                            Some(slot) => Some((grandparent, slot)),
                            None => {
                                return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                                    "{} BVH: {:?} is not among its parent's children", V::NAME, parent));
                            }
                        }
                    }
                    None => None,
                };

                if !self.nodes.contains_key(survivor) {
                    return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                        "{} BVH: sibling {:?} of {:?} is missing from the arena", V::NAME, survivor, payload));
                }

                // The survivor takes the parent's place in a single rewrite
                self.nodes.remove(leaf);
                self.nodes.remove(parent);
                if let Some(node) = self.nodes.get_mut(survivor) {
                    node.parent = grandparent_slot.map(|(grandparent, _)| grandparent);
                }
                match grandparent_slot {
                    Some((grandparent, slot)) => {
                        if let Some(entry) = self.nodes.get_mut(grandparent).and_then(|node| node.slots.as_mut().get_mut(slot)) {
                            *entry = Some(survivor);
                        }
                    }
                    None => self.root = Some(survivor),
                }

                self.refit_from(Some(survivor));
                V::update_full(self, survivor, true);
                Ok(())
            }

            Shrink::Clear => {
                self.nodes.remove(leaf);
                self.nodes.remove(parent);
                self.root = None;
                Ok(())
            }
        }
    }

    /// Turn leaf `target` into an internal node holding its old payload and
    /// `leaf` in the variant's split slots. Returns `target`.
    fn split(&mut self, target: NodeKey, leaf: NodeKey) -> Result<NodeKey> {
        let (old_payload, old_box) = match self.nodes.get(target) {
            Some(node) if node.child_count() == 0 => match node.payload {
                Some(payload) => (payload, node.aabb),
                None => {
                    return Err(bvh_err!(LOG_SOURCE, StructuralDefect,
                        "{} BVH: split target {:?} holds no payload", V::NAME, target));
                }
            },
            _ => {
                return Err(bvh_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: split target {:?} is not a leaf", V::NAME, target));
            }
        };

        let sibling = self.nodes.insert(Node::leaf(old_payload, old_box));
        if let Some(node) = self.nodes.get_mut(target) {
            node.payload = None;
            node.full = false;
        }
        let (old_slot, new_slot) = V::SPLIT_SLOTS;
        self.attach(target, old_slot, sibling)?;
        self.attach(target, new_slot, leaf)?;
        self.index.insert(old_payload, sibling);
        Ok(target)
    }

    /// Link `child` into `slot` of `parent`.
    ///
    /// The only way a new node gains a parent. Refuses a child that already has
    /// a parent, is the root, or is `parent` itself or one of its ancestors.
    fn attach(&mut self, parent: NodeKey, slot: usize, child: NodeKey) -> Result<()> {
        if parent == child || self.is_ancestor(child, parent) {
            return Err(bvh_err!(LOG_SOURCE, CycleDetected,
                "{} BVH: attaching {:?} under {:?} would create a cycle", V::NAME, child, parent));
        }
        match self.nodes.get(child) {
            Some(node) if node.parent.is_none() && self.root != Some(child) => {}
            Some(_) => {
                return Err(bvh_err!(LOG_SOURCE, CycleDetected,
                    "{} BVH: {:?} is already attached", V::NAME, child));
            }
            None => {
                return Err(bvh_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: cannot attach missing node {:?}", V::NAME, child));
            }
        }

        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return Err(bvh_err!(LOG_SOURCE, StructuralDefect,
                "{} BVH: cannot attach under missing node {:?}", V::NAME, parent));
        };
        match parent_node.slots.as_mut().get_mut(slot) {
            Some(entry) if entry.is_none() => *entry = Some(child),
            _ => {
                return Err(bvh_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: slot {} of {:?} is occupied or out of range", V::NAME, slot, parent));
            }
        }

        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    fn clear_slot(&mut self, parent: NodeKey, slot: usize) {
        if let Some(entry) = self.nodes.get_mut(parent).and_then(|node| node.slots.as_mut().get_mut(slot)) {
            *entry = None;
        }
    }

    /// Whether `candidate` is `node` or lies on the parent chain above it.
    fn is_ancestor(&self, candidate: NodeKey, node: NodeKey) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(key) = current {
            if key == candidate {
                return true;
            }
            current = self.nodes.get(key).and_then(|node| node.parent);
            steps += 1;
            if steps > self.nodes.len() {
                return true;
            }
        }
        false
    }

    /// Recompute boxes from `start` up to the root.
    ///
    /// Leaves keep their padded snapshot; internal nodes become the union of
    /// their existing children.
    pub(crate) fn refit_from(&mut self, start: Option<NodeKey>) {
        let mut current = start;
        let mut steps = 0;

        while let Some(key) = current {
            let Some(node) = self.nodes.get(key) else { break };
            let parent = node.parent;

            if !node.is_leaf() {
                let union = node.children()
                    .filter_map(|child| self.nodes.get(child).map(|child| child.aabb))
                    .reduce(|acc, aabb| acc.union(&aabb));
                if let (Some(union), Some(node)) = (union, self.nodes.get_mut(key)) {
                    node.aabb = union;
                }
            }

            current = parent;
            steps += 1;
            if steps > self.nodes.len() {
                bvh_warn!(LOG_SOURCE, "{} BVH: refit walked more steps than there are nodes", V::NAME);
                break;
            }
        }
    }

    // ===== QUERIES =====

    /// Number of indexed payloads
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the tree holds no payload
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Whether `payload` is indexed
    pub fn contains(&self, payload: P) -> bool {
        self.index.contains_key(&payload)
    }

    /// Number of live nodes (leaves and internal)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Root node key
    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    /// Read access to a node
    pub fn node(&self, key: NodeKey) -> Option<&Node<P, V::Slots>> {
        self.nodes.get(key)
    }

    /// Leaf key currently holding `payload`
    pub fn leaf(&self, payload: P) -> Option<NodeKey> {
        self.index.get(&payload).copied()
    }

    /// Indexed payloads (arbitrary order)
    pub fn payloads(&self) -> impl Iterator<Item = P> + '_ {
        self.index.keys().copied()
    }

    /// Box of the root (union of everything), None when empty
    pub fn root_bounds(&self) -> Option<AABB> {
        self.root.and_then(|root| self.nodes.get(root)).map(|node| node.aabb)
    }

    /// Padded box stored for `payload`
    pub fn leaf_bounds(&self, payload: P) -> Option<AABB> {
        self.leaf(payload).and_then(|leaf| self.nodes.get(leaf)).map(|node| node.aabb)
    }

    /// Depth of `key` (root = 0)
    pub(crate) fn depth_of(&self, key: NodeKey) -> usize {
        let mut depth = 0;
        let mut current = self.nodes.get(key).and_then(|node| node.parent);
        while let Some(parent) = current {
            depth += 1;
            if depth > self.nodes.len() {
                break;
            }
            current = self.nodes.get(parent).and_then(|node| node.parent);
        }
        depth
    }

    /// Deepest leaf, counted in nodes (a lone root leaf is 1, empty is 0).
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else { return 0 };
        let mut max_depth = 0;
        let mut stack = vec![(root, 1usize)];

        while let Some((key, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(key) else { continue };
            if node.is_leaf() {
                max_depth = max_depth.max(depth);
            }
            if depth <= self.nodes.len() {
                stack.extend(node.children().map(|child| (child, depth + 1)));
            }
        }
        max_depth
    }

    /// Boxes from the leaf of `payload` up to the root, leaf first.
    ///
    /// Empty when the payload is not indexed.
    pub fn ancestors(&self, payload: P) -> Vec<AABB> {
        let mut chain = Vec::new();
        let mut current = self.leaf(payload);
        while let Some(key) = current {
            let Some(node) = self.nodes.get(key) else { break };
            chain.push(node.aabb);
            if chain.len() > self.nodes.len() {
                break;
            }
            current = node.parent;
        }
        chain
    }

    /// Tree configuration
    pub fn config(&self) -> &BvhConfig {
        &self.config
    }

    /// Whether the structure changed since the last `take_dirty`
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return the dirty flag and clear it
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // ===== CONSISTENCY =====

    /// Check every structural and bounding invariant.
    ///
    /// - internal boxes are the exact union of their children
    /// - parent links match child slots, the root has no parent
    /// - internal nodes hold between `MIN_CHILDREN` and `ARITY` children
    /// - every node is reachable exactly once from the root
    /// - the payload index maps each payload to its own leaf
    /// - `full` flags are current (wide variant under `FullPolicy::Prune`)
    ///
    /// # Errors
    ///
    /// Returns `StructuralDefect` (or `CycleDetected` for a node reached
    /// twice) describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = self.root else {
            if !self.nodes.is_empty() || !self.index.is_empty() {
                return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: empty tree still holds {} nodes and {} payloads",
                    V::NAME, self.nodes.len(), self.index.len()));
            }
            return Ok(());
        };

        match self.nodes.get(root) {
            Some(node) if node.parent.is_none() => {}
            _ => {
                return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: root {:?} is missing or has a parent", V::NAME, root));
            }
        }

        let check_full = self.config.full_policy == FullPolicy::Prune;
        let mut visited = FxHashSet::default();
        let mut leaves = 0usize;
        let mut stack = vec![(root, 0usize)];

        while let Some((key, depth)) = stack.pop() {
            if !visited.insert(key) {
                return Err(bvh_err!(LOG_SOURCE, CycleDetected,
                    "{} BVH: {:?} is reachable twice", V::NAME, key));
            }
            let Some(node) = self.nodes.get(key) else {
                return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: child {:?} is missing from the arena", V::NAME, key));
            };

            if check_full && node.full != V::expected_full(self, key, depth) {
                return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: stale full flag on {:?} at depth {}", V::NAME, key, depth));
            }

            if let Some(payload) = node.payload {
                if node.child_count() != 0 {
                    return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                        "{} BVH: leaf {:?} also has children", V::NAME, key));
                }
                if self.index.get(&payload) != Some(&key) {
                    return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                        "{} BVH: index does not map {:?} to its leaf", V::NAME, payload));
                }
                leaves += 1;
                continue;
            }

            let count = node.child_count();
            if count < V::MIN_CHILDREN || count > V::ARITY {
                return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: internal node {:?} has {} children", V::NAME, key, count));
            }

            let mut union: Option<AABB> = None;
            for child in node.children() {
                let Some(child_node) = self.nodes.get(child) else {
                    return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                        "{} BVH: child {:?} is missing from the arena", V::NAME, child));
                };
                if child_node.parent != Some(key) {
                    return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                        "{} BVH: {:?} does not point back to its parent {:?}", V::NAME, child, key));
                }
                union = Some(match union {
                    Some(acc) => acc.union(&child_node.aabb),
                    None => child_node.aabb,
                });
                stack.push((child, depth + 1));
            }
            if union != Some(node.aabb) {
                return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                    "{} BVH: box of {:?} is not the union of its children", V::NAME, key));
            }
        }

        if visited.len() != self.nodes.len() {
            return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                "{} BVH: {} nodes live but only {} reachable", V::NAME, self.nodes.len(), visited.len()));
        }
        if leaves != self.index.len() {
            return Err(bvh_warn_err!(LOG_SOURCE, StructuralDefect,
                "{} BVH: {} leaves but {} indexed payloads", V::NAME, leaves, self.index.len()));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;

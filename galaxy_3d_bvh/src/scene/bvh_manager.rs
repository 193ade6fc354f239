/// BvhManager - per-cycle driver around a `Bvh`.
///
/// Keeps the set of payloads the host wants indexed together with the raw
/// box each was inserted with, runs the refresh policy, and caches one
/// flattened view per cycle:
///
/// ```text
/// add / remove / refresh / sync   (any number of times)
/// update()                        (once per cycle: flatten if dirty)
/// flattened(), stats()            (read until the next update)
/// ```
///
/// A structural defect reported by the tree during removal is answered with
/// a full rebuild from the tracked set.

use rustc_hash::{FxHashMap, FxHashSet};
use crate::bvh::{Bvh, BvhConfig, FlatBvh, Payload, Variant};
use crate::error::{Error, Result};
use crate::math::AABB;
use crate::{bvh_info, bvh_warn};
use super::refresh::{BoundsProvider, HysteresisPolicy, RefreshPolicy};

const LOG_SOURCE: &str = "galaxy3d::bvh::manager";

/// Tree statistics refreshed by `BvhManager::update`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    /// Number of flattened nodes
    pub node_count: usize,
    /// Number of flattened leaves
    pub leaf_count: usize,
    /// Deepest leaf, counted in nodes
    pub depth: usize,
    /// Subtrees left out by the flatten depth limit
    pub truncated: usize,
}

/// Owns a tree, its refresh policy and the last flattened view.
pub struct BvhManager<P: Payload, V: Variant> {
    tree: Bvh<P, V>,
    policy: Box<dyn RefreshPolicy>,
    /// Payloads the host wants indexed → raw box they were inserted with
    tracked: FxHashMap<P, AABB>,
    flat: FlatBvh<P>,
    stats: BvhStats,
}

impl<P: Payload, V: Variant> Default for BvhManager<P, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Payload, V: Variant> BvhManager<P, V> {
    /// Create a manager with the default tree configuration and a
    /// `HysteresisPolicy`.
    pub fn new() -> Self {
        Self::from_tree(Bvh::new())
    }

    /// Create a manager around a tree built from `config`.
    pub fn with_config(config: BvhConfig) -> Result<Self> {
        Ok(Self::from_tree(Bvh::with_config(config)?))
    }

    fn from_tree(tree: Bvh<P, V>) -> Self {
        Self {
            tree,
            policy: Box::new(HysteresisPolicy::default()),
            tracked: FxHashMap::default(),
            flat: FlatBvh::default(),
            stats: BvhStats::default(),
        }
    }

    /// Replace the refresh policy (builder style).
    pub fn with_policy(mut self, policy: impl RefreshPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replace the refresh policy.
    pub fn set_policy(&mut self, policy: impl RefreshPolicy + 'static) {
        self.policy = Box::new(policy);
    }

    // ===== MUTATION =====

    /// Track `payload` and (re-)insert it with `aabb`.
    ///
    /// The payload stays tracked even if the tree rejects it with
    /// `CapacityExhausted`, so a later `rebuild` retries it. A
    /// `StructuralDefect` while dropping the previous entry triggers a
    /// rebuild, which inserts the new box.
    pub fn add(&mut self, payload: P, aabb: AABB) -> Result<()> {
        self.tracked.insert(payload, aabb);

        match self.tree.add(payload, aabb) {
            Err(Error::StructuralDefect(message)) => {
                bvh_warn!(LOG_SOURCE, "Rebuilding after failed re-insertion: {}", message);
                self.rebuild()
            }
            result => result,
        }
    }

    /// Stop tracking `payload` and remove it from the tree.
    ///
    /// Returns false if the payload was neither tracked nor indexed.
    /// A `StructuralDefect` from the tree triggers a rebuild.
    pub fn remove(&mut self, payload: P) -> Result<bool> {
        let was_tracked = self.tracked.remove(&payload).is_some();

        match self.tree.remove(payload) {
            Ok(removed) => Ok(removed || was_tracked),
            Err(Error::StructuralDefect(message)) => {
                bvh_warn!(LOG_SOURCE, "Rebuilding after failed removal: {}", message);
                self.rebuild()?;
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    /// Re-insert `payload` if the refresh policy says its bounds drifted.
    ///
    /// Untracked (or rejected) payloads are always inserted. Returns true
    /// when the tree was touched.
    pub fn refresh(&mut self, payload: P, aabb: AABB) -> Result<bool> {
        let reinsert = match self.tracked.get(&payload) {
            Some(indexed) if self.tree.contains(payload) => self.policy.needs_reinsert(indexed, &aabb),
            _ => true,
        };
        if !reinsert {
            return Ok(false);
        }
        self.add(payload, aabb)?;
        Ok(true)
    }

    /// Bring the tree in line with the live payload set.
    ///
    /// Every payload in `payloads` is refreshed from `provider`; a payload
    /// with no bounds, or a tracked payload missing from `payloads`, is
    /// removed. Returns the number of insertions and removals performed.
    pub fn sync<B, I>(&mut self, provider: &B, payloads: I) -> Result<usize>
    where
        B: BoundsProvider<P>,
        I: IntoIterator<Item = P>,
    {
        let mut changes = 0;
        let mut live = FxHashSet::default();

        for payload in payloads {
            match provider.bounds(payload) {
                Some(aabb) => {
                    live.insert(payload);
                    if self.refresh(payload, aabb)? {
                        changes += 1;
                    }
                }
                None => {
                    if self.remove(payload)? {
                        changes += 1;
                    }
                }
            }
        }

        let stale: Vec<P> = self.tracked.keys().filter(|p| !live.contains(*p)).copied().collect();
        for payload in stale {
            if self.remove(payload)? {
                changes += 1;
            }
        }

        Ok(changes)
    }

    /// Clear the tree and re-insert every tracked payload.
    ///
    /// Payloads rejected with `CapacityExhausted` stay tracked but
    /// unindexed; any other error aborts the rebuild.
    pub fn rebuild(&mut self) -> Result<()> {
        self.tree.clear();
        let entries: Vec<(P, AABB)> = self.tracked.iter().map(|(p, aabb)| (*p, *aabb)).collect();
        let mut rejected = 0;

        for (payload, aabb) in entries {
            match self.tree.add(payload, aabb) {
                Ok(()) => {}
                Err(Error::CapacityExhausted(_)) => rejected += 1,
                Err(err) => return Err(err),
            }
        }

        bvh_info!(LOG_SOURCE, "Rebuilt {} BVH with {} payloads ({} rejected)",
            V::NAME, self.tree.len(), rejected);
        Ok(())
    }

    // ===== PER-CYCLE =====

    /// Flatten the tree if it changed since the last update.
    ///
    /// Returns true when a new flattened view was produced.
    pub fn update(&mut self) -> Result<bool> {
        if !self.tree.is_dirty() {
            return Ok(false);
        }

        let flat = self.tree.flatten()?;
        self.tree.take_dirty();

        self.stats = BvhStats {
            node_count: flat.len(),
            leaf_count: flat.leaf_count(),
            depth: self.tree.depth(),
            truncated: flat.truncated(),
        };
        self.flat = flat;
        Ok(true)
    }

    // ===== ACCESSORS =====

    /// Flattened view from the last `update`
    pub fn flattened(&self) -> &FlatBvh<P> {
        &self.flat
    }

    /// Statistics from the last `update`
    pub fn stats(&self) -> BvhStats {
        self.stats
    }

    /// Underlying tree
    pub fn tree(&self) -> &Bvh<P, V> {
        &self.tree
    }

    /// Raw box `payload` was last inserted with
    pub fn tracked_bounds(&self, payload: P) -> Option<AABB> {
        self.tracked.get(&payload).copied()
    }

    /// Number of tracked payloads
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}

#[cfg(test)]
#[path = "bvh_manager_tests.rs"]
mod tests;

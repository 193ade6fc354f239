/// Tree configuration.
///
/// Plain value type with sensible defaults. Validated once when a tree is
/// created with `Bvh::with_config`.

use crate::error::Result;
use crate::bvh_err;

/// How the wide variant treats `full` children during insertion descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullPolicy {
    /// Skip full children. Insertion fails with `CapacityExhausted` when
    /// every child of a saturated node is full.
    #[default]
    Prune,
    /// Consider every child. The tree may grow past `max_depth`.
    Ignore,
}

/// BVH configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhConfig {
    /// Added to the full size of every leaf box on each axis
    pub leaf_padding: f32,
    /// Traversal stack size of the wide variant (root = depth 0).
    /// Nodes at depth `max_depth - 1` or deeper are `full`.
    pub max_depth: usize,
    /// Flatten stops descending below this depth
    pub flatten_depth_limit: usize,
    /// Full-flag pruning behavior for the wide variant
    pub full_policy: FullPolicy,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            leaf_padding: 0.01,
            max_depth: 15,
            flatten_depth_limit: 200,
            full_policy: FullPolicy::Prune,
        }
    }
}

impl BvhConfig {
    /// Check that the configuration can drive a tree.
    pub fn validate(&self) -> Result<()> {
        if !self.leaf_padding.is_finite() || self.leaf_padding < 0.0 {
            return Err(bvh_err!("galaxy3d::bvh", InvalidConfig,
                "leaf_padding must be finite and non-negative (got {})", self.leaf_padding));
        }
        if self.max_depth < 2 {
            return Err(bvh_err!("galaxy3d::bvh", InvalidConfig,
                "max_depth must be at least 2 (got {})", self.max_depth));
        }
        if self.flatten_depth_limit == 0 {
            return Err(bvh_err!("galaxy3d::bvh", InvalidConfig,
                "flatten_depth_limit must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

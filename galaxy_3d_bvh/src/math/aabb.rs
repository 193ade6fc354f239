//! Axis-aligned bounding box used by every tree operation.
//!
//! Stored as min/max corners. Center and half-extent are derived on demand,
//! so a box built from center + half-extent and one built from corners are
//! the same value.

use glam::{Mat4, Vec3};

/// Axis-Aligned Bounding Box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl AABB {
    /// Create a box from its corners (no normalization).
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a box from its center and full size.
    ///
    /// Negative size components are treated as their absolute value.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        Self::from_center_half_extent(center, size * 0.5)
    }

    /// Create a box from its center and half-extent.
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        let half_extent = half_extent.abs();
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Center point of this box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-extent of this box (non-negative for a normalized box).
    pub fn half_extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Full size of this box.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Same box with min/max swapped per axis where they were inverted.
    pub fn normalized(&self) -> AABB {
        AABB {
            min: self.min.min(self.max),
            max: self.max.max(self.min),
        }
    }

    /// Smallest box enclosing both `self` and `other`.
    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Test if this AABB fully contains another AABB.
    ///
    /// Returns `true` if `other` is entirely within `self` (touching faces count).
    pub fn contains(&self, other: &AABB) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x
        && self.min.y <= other.min.y && self.max.y >= other.max.y
        && self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// Test if a point lies inside or on the surface of this box.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.x <= point.x && point.x <= self.max.x
        && self.min.y <= point.y && point.y <= self.max.y
        && self.min.z <= point.z && point.z <= self.max.z
    }

    /// Surface area: `2 (xy + yz + zx)` of the box size.
    pub fn surface_area(&self) -> f32 {
        let s = self.size();
        2.0 * (s.x * s.y + s.y * s.z + s.z * s.x)
    }

    /// Surface area of the union of `self` and `other`.
    ///
    /// This is the insertion cost both tree variants minimize.
    pub fn union_surface_area(&self, other: &AABB) -> f32 {
        self.union(other).surface_area()
    }

    /// Normalize, then grow the full size by `padding` on every axis.
    ///
    /// Leaf boxes are always stored padded so that flat or inverted input
    /// never produces a zero-volume node.
    pub fn padded(&self, padding: f32) -> AABB {
        let normalized = self.normalized();
        AABB::from_center_half_extent(
            normalized.center(),
            normalized.half_extent() + Vec3::splat(padding * 0.5),
        )
    }

    /// Scale the box about its own center.
    pub fn scaled(&self, factor: f32) -> AABB {
        AABB::from_center_half_extent(self.center(), self.half_extent() * factor)
    }

    /// Component-wise comparison of both corners within `epsilon`.
    pub fn approx_eq(&self, other: &AABB, epsilon: f32) -> bool {
        self.min.abs_diff_eq(other.min, epsilon) && self.max.abs_diff_eq(other.max, epsilon)
    }

    /// Transform this local-space AABB by a matrix, returning a new AABB.
    ///
    /// Uses the Arvo method: projects each matrix axis onto the AABB extents
    /// for an exact (tight) result without transforming all 8 corners.
    /// Bounds providers use this to turn a mesh's local box into the world
    /// box handed to the tree.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        let translation = matrix.col(3).truncate();
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = matrix.col(i).truncate();
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        AABB { min: new_min, max: new_max }
    }
}

#[cfg(test)]
#[path = "aabb_tests.rs"]
mod tests;

//! Math module - bounding volume primitives shared by the tree and its callers.

mod aabb;

pub use aabb::AABB;

//! BVH module
//!
//! Dynamic bounding volume hierarchy with two arities sharing one control
//! flow: `BinaryBvh` (2 children per internal node) and `WideBvh` (8).

mod config;
mod node;
mod variant;
mod tree;
mod binary;
mod wide;
mod flatten;
mod gpu;

pub use config::{BvhConfig, FullPolicy};
pub use node::{Node, NodeKey, Payload};
pub use variant::{Placement, Shrink, Variant};
pub use tree::Bvh;
pub use binary::{Binary, BinaryBvh};
pub use wide::{Wide, WideBvh};
pub use flatten::{FlatBvh, FlatNode, MAX_ARITY};
pub use gpu::{as_bytes, GpuBvhNode, GpuNodeFlags, GPU_NONE};

//! Scene module
//!
//! Host-side glue around the tree: refresh policies deciding when a moved
//! payload is re-inserted, bounds providers, and the per-cycle manager.

mod refresh;
mod bvh_manager;

pub use refresh::{RefreshPolicy, HysteresisPolicy, AlwaysReinsert, BoundsProvider};
pub use bvh_manager::{BvhManager, BvhStats};

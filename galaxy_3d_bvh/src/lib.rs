/*!
# Galaxy 3D BVH

Dynamic bounding volume hierarchy for the Galaxy 3D engine.

Tracks moving scene objects so that ray tracers, voxelizers and distance
field samplers can bound-test or enumerate them without a full rebuild
every frame. Objects are inserted and removed incrementally; once per
frame the tree is flattened into an index-addressed array ready for GPU
upload.

## Architecture

- **AABB**: Axis-aligned box (min/max corners) with union, containment and surface area
- **Bvh**: Arena-backed tree with a payload → leaf index, generic over its arity
- **BinaryBvh / WideBvh**: 2-way and 8-way variants sharing one add/remove/refit flow
- **FlatBvh**: Pre-order flattened view, packable into `GpuBvhNode` records
- **BvhManager**: Per-frame driver with a pluggable refresh policy (hysteresis by default)

## Example

```no_run
use galaxy_3d_bvh::galaxy3d::{WideBvh, AABB};
use galaxy_3d_bvh::glam::Vec3;

let mut tree: WideBvh<u32> = WideBvh::new();
tree.add(1, AABB::from_center_size(Vec3::ZERO, Vec3::ONE))?;
tree.add(2, AABB::from_center_size(Vec3::new(10.0, 0.0, 0.0), Vec3::ONE))?;

let flat = tree.flatten()?;
let gpu_nodes = flat.pack();
# Ok::<(), galaxy_3d_bvh::galaxy3d::Error>(())
```
*/

// Internal modules
mod error;
pub mod log;
pub mod math;
pub mod bvh;
pub mod scene;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Math primitives
    pub use crate::math::AABB;

    // Tree types
    pub use crate::bvh::{
        Bvh, BinaryBvh, WideBvh, Binary, Wide, Variant,
        BvhConfig, FullPolicy, Node, NodeKey, Payload,
        FlatBvh, FlatNode,
    };

    // Logging sub-module (types and logger control, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger,
            set_logger, reset_logger, log, log_detailed,
        };
    }

    // GPU sub-module
    pub mod gpu {
        pub use crate::bvh::{as_bytes, GpuBvhNode, GpuNodeFlags, GPU_NONE};
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;

/// GPU-ready node record.
///
/// One `GpuBvhNode` per flattened node, laid out as five 16-byte rows so it
/// can be copied straight into a storage buffer. Building and binding the
/// buffer is left to the renderer.

use bytemuck::{Pod, Zeroable};

bitflags::bitflags! {
    /// Per-node flags stored in `GpuBvhNode::flags`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct GpuNodeFlags: u32 {
        /// Node holds a payload
        const LEAF = 0b0000_0001;
        /// Subtree is saturated (wide variant)
        const FULL = 0b0000_0010;
        /// Node is the root
        const ROOT = 0b0000_0100;
    }
}

/// Index value meaning "no node" / "no payload".
pub const GPU_NONE: i32 = -1;

/// Flattened BVH node in GPU layout (80 bytes, std430 compatible).
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GpuBvhNode {
    /// Child node indices in slot order (`GPU_NONE` for empty slots)
    pub children: [i32; 8],
    /// Payload buffer index for a leaf (`GPU_NONE` for internal nodes)
    pub payload_index: i32,
    /// Parent node index (`GPU_NONE` for the root)
    pub parent: i32,
    pub _padding: [u32; 2],
    /// Box minimum corner
    pub min: [f32; 3],
    /// Depth below the root (root = 0)
    pub depth: u32,
    /// Box maximum corner
    pub max: [f32; 3],
    /// `GpuNodeFlags` bits
    pub flags: u32,
}

impl Default for GpuBvhNode {
    fn default() -> Self {
        Self {
            children: [GPU_NONE; 8],
            payload_index: GPU_NONE,
            parent: GPU_NONE,
            _padding: [0; 2],
            min: [0.0; 3],
            depth: 0,
            max: [0.0; 3],
            flags: 0,
        }
    }
}

impl GpuBvhNode {
    /// Decoded flag bits
    pub fn node_flags(&self) -> GpuNodeFlags {
        GpuNodeFlags::from_bits_truncate(self.flags)
    }
}

/// View a packed node array as raw bytes for upload.
pub fn as_bytes(nodes: &[GpuBvhNode]) -> &[u8] {
    bytemuck::cast_slice(nodes)
}

#[cfg(test)]
#[path = "gpu_tests.rs"]
mod tests;

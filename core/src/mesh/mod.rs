//! CPU-side mesh types and geometry passes.
//!
//! This module provides GPU-agnostic mesh data structures:
//!
//! - [`VertexLayout`] - Describes vertex attributes across multiple buffers
//! - [`CpuMesh`] - CPU-side mesh data (vertex bytes, index bytes, submeshes)
//! - [`geometry`] - Winding, normal, tangent, ordering and precision passes

mod data;
pub mod geometry;
mod layout;

pub use data::{Aabb, CpuMesh, IndexFormat, PrimitiveTopology, SubMesh};
pub use geometry::MeshCompression;
pub use layout::{
    VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic, VertexBufferLayout,
    VertexLayout,
};

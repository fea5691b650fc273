//! Binary glTF 2.0 (`.glb`) export of imported meshes.
//!
//! Every vertex buffer of the [`CpuMesh`] becomes one strided buffer view and
//! every [`SubMesh`](crate::mesh::SubMesh) becomes one primitive sharing the
//! index buffer view. The document holds a single mesh, node and scene.
//!
//! Blend indices are stored as `u16` joints since glTF has no signed 32-bit
//! joint format. Texture coordinate sets that are not two-component are left
//! out of the document.
//!
//! # Example
//!
//! ```ignore
//! use redlilium_core::gltf::save_mesh_glb;
//!
//! let glb = save_mesh_glb(&mesh)?;
//! std::fs::write("capture.glb", &glb)?;
//! ```

mod error;
mod exporter;
#[cfg(test)]
mod tests;

pub use error::GltfError;

use crate::mesh::CpuMesh;

/// Export a mesh to binary glTF (`.glb`) bytes.
pub fn save_mesh_glb(mesh: &CpuMesh) -> Result<Vec<u8>, GltfError> {
    let mut ctx = exporter::ExportContext::new();

    ctx.build_mesh(mesh)?;
    ctx.build_scene(mesh.label());
    ctx.finalize_buffer();
    ctx.to_glb()
}

use std::sync::Arc;

use crate::mesh::{
    CpuMesh, SubMesh, VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic,
    VertexBufferLayout, VertexLayout,
};


/// Two quads (two submeshes) with geometry, surface and skinning streams.
///
/// - Buffer 0: position + normal (24 bytes)
/// - Buffer 1: texcoord0 float2 + texcoord1 float3 (20 bytes)
/// - Buffer 2: blend weight float4 + blend indices int4 (32 bytes)
fn two_quad_mesh() -> CpuMesh {
    let layout = Arc::new(
        VertexLayout::new()
            .with_buffer(VertexBufferLayout::new(24))
            .with_buffer(VertexBufferLayout::new(20))
            .with_buffer(VertexBufferLayout::new(32))
            .with_attribute(VertexAttribute::position(0))
            .with_attribute(VertexAttribute::normal(12))
            .with_attribute(VertexAttribute::new(
                VertexAttributeSemantic::TexCoord0,
                VertexAttributeFormat::Float2,
                0,
                1,
            ))
            .with_attribute(VertexAttribute::new(
                VertexAttributeSemantic::TexCoord1,
                VertexAttributeFormat::Float3,
                8,
                1,
            ))
            .with_attribute(VertexAttribute::new(
                VertexAttributeSemantic::BlendWeight,
                VertexAttributeFormat::Float4,
                0,
                2,
            ))
            .with_attribute(VertexAttribute::new(
                VertexAttributeSemantic::BlendIndices,
                VertexAttributeFormat::Int4,
                16,
                2,
            ))
            .with_label("two_quads"),
    );

    let mut geometry: Vec<f32> = Vec::new();
    let mut surface: Vec<f32> = Vec::new();
    let mut skinning: Vec<u8> = Vec::new();
    for quad in 0..2 {
        let z = quad as f32;
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            geometry.extend_from_slice(&[x, y, z, 0.0, 0.0, 1.0]);
            surface.extend_from_slice(&[x, y, 0.5, 0.5, 0.5]);
            skinning.extend_from_slice(bytemuck::cast_slice(&[1.0f32, 0.0, 0.0, 0.0]));
            skinning.extend_from_slice(bytemuck::cast_slice(&[quad as i32, -1, 70_000, 0]));
        }
    }

    CpuMesh::new(layout)
        .with_vertex_data(0, bytemuck::cast_slice(&geometry).to_vec())
        .with_vertex_data(1, bytemuck::cast_slice(&surface).to_vec())
        .with_vertex_data(2, skinning)
        .with_indices_u16(&[0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7])
        .with_submeshes(vec![SubMesh::triangles(0, 6), SubMesh::triangles(6, 6)])
        .with_label("two_quads")
}

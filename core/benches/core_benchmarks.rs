use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use redlilium_core::gltf::save_mesh_glb;
use redlilium_core::mesh::geometry::{
    compress, optimize_vertex_order, recalculate_normals, recalculate_tangents,
};
use redlilium_core::mesh::{
    CpuMesh, MeshCompression, VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic,
    VertexBufferLayout, VertexLayout,
};

/// Wavy `size x size` grid with positions in buffer 0 and UVs in buffer 1.
fn grid(size: u32) -> CpuMesh {
    let layout = Arc::new(
        VertexLayout::new()
            .with_buffer(VertexBufferLayout::new(12))
            .with_buffer(VertexBufferLayout::new(8))
            .with_attribute(VertexAttribute::position(0))
            .with_attribute(VertexAttribute::new(
                VertexAttributeSemantic::TexCoord0,
                VertexAttributeFormat::Float2,
                0,
                1,
            ))
            .with_label("grid"),
    );

    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    for y in 0..=size {
        for x in 0..=size {
            let (u, v) = (x as f32 / size as f32, y as f32 / size as f32);
            positions.push([u, v, (u * 12.0).sin() * (v * 7.0).cos() * 0.1]);
            uvs.push([u, v]);
        }
    }

    let row = size + 1;
    let mut indices = Vec::new();
    for y in 0..size {
        for x in 0..size {
            let i = y * row + x;
            indices.extend_from_slice(&[i, i + 1, i + row + 1, i, i + row + 1, i + row]);
        }
    }
    // reverse so the optimizer has work to do
    indices.reverse();

    CpuMesh::new(layout)
        .with_vertex_data(0, bytemuck::cast_slice(&positions).to_vec())
        .with_vertex_data(1, bytemuck::cast_slice(&uvs).to_vec())
        .with_indices_u32(&indices)
}

// ---------------------------------------------------------------------------
// Geometry passes
// ---------------------------------------------------------------------------

fn bench_recalculate_normals(c: &mut Criterion) {
    let mesh = grid(128);
    c.bench_function("recalculate_normals_128x128", |b| {
        b.iter(|| {
            let mut mesh = mesh.clone();
            recalculate_normals(black_box(&mut mesh));
            mesh
        });
    });
}

fn bench_recalculate_tangents(c: &mut Criterion) {
    let mut mesh = grid(128);
    recalculate_normals(&mut mesh);
    c.bench_function("recalculate_tangents_128x128", |b| {
        b.iter(|| {
            let mut mesh = mesh.clone();
            recalculate_tangents(black_box(&mut mesh));
            mesh
        });
    });
}

fn bench_optimize_vertex_order(c: &mut Criterion) {
    let mesh = grid(128);
    c.bench_function("optimize_vertex_order_128x128", |b| {
        b.iter(|| {
            let mut mesh = mesh.clone();
            optimize_vertex_order(black_box(&mut mesh));
            mesh
        });
    });
}

fn bench_compress(c: &mut Criterion) {
    let mesh = grid(128);
    c.bench_function("compress_high_128x128", |b| {
        b.iter(|| {
            let mut mesh = mesh.clone();
            compress(black_box(&mut mesh), MeshCompression::High);
            mesh
        });
    });
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

fn bench_save_mesh_glb(c: &mut Criterion) {
    let mesh = grid(128);
    c.bench_function("save_mesh_glb_128x128", |b| {
        b.iter(|| save_mesh_glb(black_box(&mesh)));
    });
}

criterion_group!(
    benches,
    bench_recalculate_normals,
    bench_recalculate_tangents,
    bench_optimize_vertex_order,
    bench_compress,
    bench_save_mesh_glb,
);
criterion_main!(benches);

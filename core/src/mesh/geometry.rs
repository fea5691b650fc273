//! Geometry passes over [`CpuMesh`] data.
//!
//! These run after a mesh has been assembled and before it is persisted:
//!
//! - [`flip_triangle_winding`] - reverse the winding of every triangle
//! - [`recalculate_normals`] - area-weighted smooth normals
//! - [`recalculate_tangents`] - UV-gradient tangents with handedness in `w`
//! - [`optimize_vertex_order`] - renumber vertices in first-use order
//! - [`compress`] - reduce float precision of vertex attributes
//!
//! All passes only consider triangle-list submeshes.

use crate::math::{Vec2, Vec3, Vec4};

use super::data::{CpuMesh, PrimitiveTopology};
use super::layout::{VertexAttributeFormat, VertexAttributeSemantic};

/// Precision reduction applied to float vertex attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MeshCompression {
    /// Keep full 32-bit precision.
    #[default]
    Off,
    /// Keep 16 mantissa bits.
    Low,
    /// Keep 12 mantissa bits.
    Medium,
    /// Keep 8 mantissa bits.
    High,
}

impl MeshCompression {
    /// Number of mantissa bits kept, `None` when compression is off.
    pub fn mantissa_bits(&self) -> Option<u32> {
        match self {
            Self::Off => None,
            Self::Low => Some(16),
            Self::Medium => Some(12),
            Self::High => Some(8),
        }
    }
}

/// Swap the first and third index of every complete triangle.
///
/// A trailing partial triangle is left untouched.
pub fn flip_triangle_winding<T>(indices: &mut [T]) {
    for triangle in indices.chunks_exact_mut(3) {
        triangle.swap(0, 2);
    }
}

/// Collect the triangles of all triangle-list submeshes.
///
/// Triangles referencing a vertex outside the mesh are skipped.
pub fn triangles(mesh: &CpuMesh) -> Vec<[u32; 3]> {
    let indices = mesh.indices();
    let vertex_count = mesh.vertex_count();
    let mut out = Vec::with_capacity(indices.len() / 3);
    for submesh in mesh.submeshes() {
        if submesh.topology != PrimitiveTopology::TriangleList {
            continue;
        }
        let start = submesh.index_start as usize;
        let end = (submesh.index_end() as usize).min(indices.len());
        let Some(range) = indices.get(start..end) else {
            continue;
        };
        out.extend(
            range
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .filter(|t| t.iter().all(|&i| i < vertex_count)),
        );
    }
    out
}

/// Area-weighted smooth normals.
///
/// Each triangle adds its unnormalized face normal (whose length is twice its
/// area) to its three vertices. Vertices not used by any triangle get a zero
/// normal.
pub fn smooth_normals(positions: &[[f32; 3]], triangles: &[[u32; 3]]) -> Vec<[f32; 3]> {
    let mut accumulated = vec![Vec3::zeros(); positions.len()];
    for &[a, b, c] in triangles {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        let pa = Vec3::from(positions[a]);
        let pb = Vec3::from(positions[b]);
        let pc = Vec3::from(positions[c]);
        let face = (pb - pa).cross(&(pc - pa));
        accumulated[a] += face;
        accumulated[b] += face;
        accumulated[c] += face;
    }
    accumulated
        .into_iter()
        .map(|n| {
            let n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
            [n.x, n.y, n.z]
        })
        .collect()
}

/// Tangent frame derived from texture coordinate gradients.
///
/// The tangent is orthogonalized against the normal (Gram-Schmidt) and `w`
/// holds the bitangent handedness. Vertices without a usable UV gradient get
/// a tangent derived from the dominant normal axis.
pub fn uv_tangents(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    uvs: Option<&[[f32; 2]]>,
    triangles: &[[u32; 3]],
) -> Vec<[f32; 4]> {
    let count = positions.len();
    let mut tangents = vec![Vec3::zeros(); count];
    let mut bitangents = vec![Vec3::zeros(); count];

    if let Some(uvs) = uvs {
        for &[a, b, c] in triangles {
            let (a, b, c) = (a as usize, b as usize, c as usize);
            let p0 = Vec3::from(positions[a]);
            let dp1 = Vec3::from(positions[b]) - p0;
            let dp2 = Vec3::from(positions[c]) - p0;
            let uv0 = Vec2::from(uvs[a]);
            let duv1 = Vec2::from(uvs[b]) - uv0;
            let duv2 = Vec2::from(uvs[c]) - uv0;

            let det = duv1.x * duv2.y - duv1.y * duv2.x;
            if det.abs() < 1e-8 {
                continue;
            }
            let inv_det = 1.0 / det;
            let t = (dp1 * duv2.y - dp2 * duv1.y) * inv_det;
            let bt = (dp2 * duv1.x - dp1 * duv2.x) * inv_det;
            for i in [a, b, c] {
                tangents[i] += t;
                bitangents[i] += bt;
            }
        }
    }

    (0..count)
        .map(|i| {
            let n = Vec3::from(normals[i]);
            let t = tangents[i];
            let ortho = (t - n * n.dot(&t)).try_normalize(1e-10);
            let tangent = match ortho {
                Some(ortho) => {
                    let w = if n.cross(&ortho).dot(&bitangents[i]) < 0.0 {
                        -1.0
                    } else {
                        1.0
                    };
                    Vec4::new(ortho.x, ortho.y, ortho.z, w)
                }
                None => axis_tangent(n),
            };
            [tangent.x, tangent.y, tangent.z, tangent.w]
        })
        .collect()
}

/// Tangent perpendicular to `normal`, built from the axis least aligned with it.
fn axis_tangent(normal: Vec3) -> Vec4 {
    let abs = normal.abs();
    let axis = if abs.x >= abs.y && abs.x >= abs.z {
        Vec3::y()
    } else {
        Vec3::x()
    };
    let t = (axis - normal * normal.dot(&axis))
        .try_normalize(f32::EPSILON)
        .unwrap_or(axis);
    Vec4::new(t.x, t.y, t.z, 1.0)
}

/// Replace (or add) the normal attribute with smooth normals.
///
/// Returns `false` if the mesh has no float3 positions or the existing normal
/// attribute is not float3.
pub fn recalculate_normals(mesh: &mut CpuMesh) -> bool {
    let Some(positions) = mesh.read_attribute::<3>(VertexAttributeSemantic::Position) else {
        log::warn!("Cannot recalculate normals of {:?}: no positions", mesh.label());
        return false;
    };
    let normals = smooth_normals(&positions, &triangles(mesh));
    mesh.insert_attribute(VertexAttributeSemantic::Normal, VertexAttributeFormat::Float3);
    mesh.write_attribute(VertexAttributeSemantic::Normal, &normals)
}

/// Replace (or add) the tangent attribute.
///
/// Uses texture coordinate set 0 when it has at least two components. When
/// the mesh has no normals, smooth normals are derived for the computation
/// without being stored.
pub fn recalculate_tangents(mesh: &mut CpuMesh) -> bool {
    let Some(positions) = mesh.read_attribute::<3>(VertexAttributeSemantic::Position) else {
        log::warn!("Cannot recalculate tangents of {:?}: no positions", mesh.label());
        return false;
    };
    let tris = triangles(mesh);
    let normals = mesh
        .read_attribute::<3>(VertexAttributeSemantic::Normal)
        .unwrap_or_else(|| smooth_normals(&positions, &tris));
    let uvs: Option<Vec<[f32; 2]>> = mesh
        .read_components(VertexAttributeSemantic::TexCoord0)
        .filter(|(components, _)| *components >= 2)
        .map(|(components, values)| {
            values
                .chunks_exact(components)
                .map(|c| [c[0], c[1]])
                .collect()
        });
    if uvs.is_none() {
        log::debug!("No usable TexCoord0, tangents fall back to normal-derived axes");
    }
    let tangents = uv_tangents(&positions, &normals, uvs.as_deref(), &tris);
    mesh.insert_attribute(VertexAttributeSemantic::Tangent, VertexAttributeFormat::Float4);
    mesh.write_attribute(VertexAttributeSemantic::Tangent, &tangents)
}

/// Renumber vertices in the order the index buffer first references them.
///
/// Vertices never referenced keep their relative order after all referenced
/// ones. Improves vertex fetch locality without changing any triangle.
pub fn optimize_vertex_order(mesh: &mut CpuMesh) {
    let vertex_count = mesh.vertex_count() as usize;
    let indices = mesh.indices();
    let mut remap = vec![u32::MAX; vertex_count];
    let mut order = Vec::with_capacity(vertex_count);

    let referenced = indices.iter().copied();
    let rest = 0..vertex_count as u32;
    for vertex in referenced.chain(rest) {
        if let Some(slot) = remap.get_mut(vertex as usize) {
            if *slot == u32::MAX {
                *slot = order.len() as u32;
                order.push(vertex);
            }
        }
    }

    mesh.permute_vertices(&order);
    let remapped: Vec<u32> = indices
        .iter()
        .map(|&i| remap.get(i as usize).copied().unwrap_or(i))
        .collect();
    mesh.set_indices(&remapped);
}

/// Round `value` to `bits` mantissa bits (round half away from zero).
pub fn quantize_mantissa(value: f32, bits: u32) -> f32 {
    if !value.is_finite() || bits >= 23 {
        return value;
    }
    let dropped = 23 - bits;
    let half = 1u32 << (dropped - 1);
    let mask = !((1u32 << dropped) - 1);
    f32::from_bits(value.to_bits().wrapping_add(half) & mask)
}

/// Reduce the precision of every float vertex attribute.
pub fn compress(mesh: &mut CpuMesh, compression: MeshCompression) {
    if let Some(bits) = compression.mantissa_bits() {
        mesh.map_float_components(|v| quantize_mantissa(v, bits));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mesh::{SubMesh, VertexAttribute, VertexBufferLayout, VertexLayout};

    /// Unit quad in the XY plane facing +Z, with UVs in a second buffer.
    fn quad() -> CpuMesh {
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
                )),
        );
        let positions: [[f32; 3]; 4] = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let uvs: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        CpuMesh::new(layout)
            .with_vertex_data(0, bytemuck::cast_slice(&positions).to_vec())
            .with_vertex_data(1, bytemuck::cast_slice(&uvs).to_vec())
            .with_indices_u16(&[0, 1, 2, 0, 2, 3])
    }

    fn assert_close(a: &[f32], b: &[f32]) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_flip_winding_twice_is_identity() {
        let original = [0u32, 1, 2, 3, 4, 5, 6, 7, 8];
        let mut indices = original;
        flip_triangle_winding(&mut indices);
        assert_eq!(indices, [2, 1, 0, 5, 4, 3, 8, 7, 6]);
        flip_triangle_winding(&mut indices);
        assert_eq!(indices, original);
    }

    #[test]
    fn test_flip_winding_leaves_partial_triangle() {
        let mut indices = [0u16, 1, 2, 3, 4];
        flip_triangle_winding(&mut indices);
        assert_eq!(indices, [2, 1, 0, 3, 4]);
    }

    #[test]
    fn test_triangles_respect_submeshes() {
        let mesh = quad().with_submeshes(vec![SubMesh::triangles(3, 3)]);
        assert_eq!(triangles(&mesh), vec![[0, 2, 3]]);
    }

    #[test]
    fn test_recalculate_normals_adds_attribute() {
        let mut mesh = quad();
        assert!(recalculate_normals(&mut mesh));
        assert_eq!(mesh.layout().buffer_stride(0), 24);
        let normals = mesh
            .read_attribute::<3>(VertexAttributeSemantic::Normal)
            .unwrap();
        for n in normals {
            assert_close(&n, &[0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_smooth_normals_area_weighted() {
        // A large triangle facing +Z and a small one facing +X share vertex 0.
        let positions = [
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [0.0, 10.0, 0.0],
            [0.0, 0.1, 0.0],
            [0.0, 0.0, 0.1],
        ];
        let normals = smooth_normals(&positions, &[[0, 1, 2], [0, 3, 4]]);
        let n0 = Vec3::from(normals[0]);
        assert!(n0.z > 0.99);
        assert!(n0.x > 0.0);
    }

    #[test]
    fn test_recalculate_tangents_follow_u_axis() {
        let mut mesh = quad();
        assert!(recalculate_tangents(&mut mesh));
        assert!(!mesh.layout().has_semantic(VertexAttributeSemantic::Normal));
        let tangents = mesh
            .read_attribute::<4>(VertexAttributeSemantic::Tangent)
            .unwrap();
        for t in tangents {
            assert_close(&t, &[1.0, 0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_tangents_fallback_without_uvs() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normals = [[0.0, 0.0, 1.0]; 3];
        let tangents = uv_tangents(&positions, &normals, None, &[[0, 1, 2]]);
        for t in tangents {
            assert_close(&t, &[1.0, 0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_optimize_vertex_order() {
        let mut mesh = quad();
        mesh.set_indices(&[3, 2, 0]);
        optimize_vertex_order(&mut mesh);
        assert_eq!(mesh.indices(), vec![0, 1, 2]);
        let positions = mesh
            .read_attribute::<3>(VertexAttributeSemantic::Position)
            .unwrap();
        assert_eq!(positions[0], [0.0, 1.0, 0.0]);
        assert_eq!(positions[1], [1.0, 1.0, 0.0]);
        assert_eq!(positions[2], [0.0, 0.0, 0.0]);
        assert_eq!(positions[3], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_quantize_mantissa() {
        assert_eq!(quantize_mantissa(1.0, 8), 1.0);
        assert_eq!(quantize_mantissa(-2.5, 8), -2.5);
        assert!(quantize_mantissa(f32::NAN, 8).is_nan());
        let value = 1.234_567_9_f32;
        let coarse = quantize_mantissa(value, 8);
        assert!((coarse - value).abs() <= value * 2f32.powi(-9));
        assert_eq!(coarse.to_bits() & ((1 << 15) - 1), 0);
    }

    #[test]
    fn test_compress_off_is_noop() {
        let mut mesh = quad();
        let before = mesh.vertex_buffer_data(0).unwrap().to_vec();
        compress(&mut mesh, MeshCompression::Off);
        assert_eq!(mesh.vertex_buffer_data(0).unwrap(), before.as_slice());
        assert_eq!(MeshCompression::Medium.mantissa_bits(), Some(12));
    }
}

//! CPU-side mesh data structures.
//!
//! This module provides:
//! - [`PrimitiveTopology`] - How vertices are assembled into primitives
//! - [`IndexFormat`] - Index data format (u16 or u32)
//! - [`SubMesh`] - A contiguous index range drawn with one topology
//! - [`Aabb`] - Axis-aligned bounds of the vertex positions
//! - [`CpuMesh`] - CPU-side mesh holding raw vertex and index data

use std::sync::Arc;

use crate::math::Vec3;

use super::layout::{
    VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic, VertexBufferLayout,
    VertexLayout,
};

/// Primitive topology describing how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a separate point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
}

impl PrimitiveTopology {
    /// Get the number of vertices per primitive.
    pub fn vertices_per_primitive(&self) -> u32 {
        match self {
            Self::PointList => 1,
            Self::LineList => 2,
            Self::TriangleList => 3,
        }
    }
}

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers.
    #[default]
    Uint16,
    /// 32-bit unsigned integers.
    Uint32,
}

impl IndexFormat {
    /// Largest index count stored with 16-bit indices.
    pub const MAX_U16_COUNT: usize = u16::MAX as usize;

    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// Narrowest format for a buffer of `index_count` indices.
    pub fn for_index_count(index_count: usize) -> Self {
        if index_count > Self::MAX_U16_COUNT {
            Self::Uint32
        } else {
            Self::Uint16
        }
    }
}

/// A contiguous range of the index buffer drawn as one part of the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SubMesh {
    /// First index of the range.
    pub index_start: u32,
    /// Number of indices in the range.
    pub index_count: u32,
    /// Primitive topology of the range.
    pub topology: PrimitiveTopology,
}

impl SubMesh {
    /// Create a triangle-list submesh.
    pub fn triangles(index_start: u32, index_count: u32) -> Self {
        Self {
            index_start,
            index_count,
            topology: PrimitiveTopology::TriangleList,
        }
    }

    /// One past the last index of the range.
    pub fn index_end(&self) -> u32 {
        self.index_start + self.index_count
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing every point, `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = [f32; 3]>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = Vec3::from(points.next()?);
        let (min, max) = points.fold((first, first), |(min, max), p| {
            let p = Vec3::from(p);
            (min.inf(&p), max.sup(&p))
        });
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// A CPU-side mesh holding raw vertex and index data.
///
/// This is the GPU-agnostic representation of an imported mesh. Each vertex
/// buffer slot of the [`VertexLayout`] stores its raw little-endian bytes.
/// The index buffer is shared by all [`SubMesh`] ranges.
#[derive(Clone)]
pub struct CpuMesh {
    layout: Arc<VertexLayout>,
    vertex_buffers: Vec<Vec<u8>>,
    vertex_count: u32,
    index_data: Option<Vec<u8>>,
    index_format: Option<IndexFormat>,
    index_count: u32,
    submeshes: Vec<SubMesh>,
    bounds: Option<Aabb>,
    label: Option<String>,
}

impl CpuMesh {
    /// Create a new empty CpuMesh with the given layout.
    ///
    /// Vertex buffers are initialized as empty vectors matching
    /// the layout's buffer count.
    pub fn new(layout: Arc<VertexLayout>) -> Self {
        let buffer_count = layout.buffer_count();
        Self {
            layout,
            vertex_buffers: vec![Vec::new(); buffer_count],
            vertex_count: 0,
            index_data: None,
            index_format: None,
            index_count: 0,
            submeshes: Vec::new(),
            bounds: None,
            label: None,
        }
    }

    /// Set raw vertex data for a specific buffer slot.
    ///
    /// Vertex count is inferred from the data length and stride.
    pub fn with_vertex_data(mut self, buffer_index: usize, data: Vec<u8>) -> Self {
        let stride = self.layout.buffer_stride(buffer_index) as usize;
        if stride > 0 {
            self.vertex_count = (data.len() / stride) as u32;
        }
        if buffer_index < self.vertex_buffers.len() {
            self.vertex_buffers[buffer_index] = data;
        }
        self
    }

    /// Set index data as u16 indices.
    pub fn with_indices_u16(mut self, indices: &[u16]) -> Self {
        self.index_data = Some(bytemuck::cast_slice(indices).to_vec());
        self.index_format = Some(IndexFormat::Uint16);
        self.index_count = indices.len() as u32;
        self
    }

    /// Set index data as u32 indices.
    pub fn with_indices_u32(mut self, indices: &[u32]) -> Self {
        self.index_data = Some(bytemuck::cast_slice(indices).to_vec());
        self.index_format = Some(IndexFormat::Uint32);
        self.index_count = indices.len() as u32;
        self
    }

    /// Set the submesh ranges.
    pub fn with_submeshes(mut self, submeshes: Vec<SubMesh>) -> Self {
        self.submeshes = submeshes;
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the vertex layout.
    pub fn layout(&self) -> &Arc<VertexLayout> {
        &self.layout
    }

    /// Get raw vertex data for a specific buffer slot.
    pub fn vertex_buffer_data(&self, index: usize) -> Option<&[u8]> {
        self.vertex_buffers.get(index).map(|v| v.as_slice())
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Get the raw index data.
    pub fn index_data(&self) -> Option<&[u8]> {
        self.index_data.as_deref()
    }

    /// Get the index format.
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.index_format
    }

    /// Get the number of indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Check if this mesh uses indexed drawing.
    pub fn is_indexed(&self) -> bool {
        self.index_data.is_some()
    }

    /// Submesh ranges. A mesh without explicit ranges is one triangle list
    /// over the whole index buffer.
    pub fn submeshes(&self) -> Vec<SubMesh> {
        if self.submeshes.is_empty() {
            vec![SubMesh::triangles(0, self.index_count)]
        } else {
            self.submeshes.clone()
        }
    }

    /// Bounds computed by the last call to [`CpuMesh::recalculate_bounds`].
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Recompute bounds from the position attribute.
    pub fn recalculate_bounds(&mut self) {
        self.bounds = self
            .read_attribute::<3>(VertexAttributeSemantic::Position)
            .and_then(Aabb::from_points);
    }

    /// Get the debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the number of vertex buffers.
    pub fn buffer_count(&self) -> usize {
        self.vertex_buffers.len()
    }

    /// Decode the index buffer into `u32` values.
    pub fn indices(&self) -> Vec<u32> {
        let (Some(data), Some(format)) = (&self.index_data, self.index_format) else {
            return Vec::new();
        };
        match format {
            IndexFormat::Uint16 => data
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect(),
            IndexFormat::Uint32 => data
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        }
    }

    /// Replace index values, keeping the current index format.
    ///
    /// Values that do not fit a 16-bit buffer promote it to 32-bit.
    pub fn set_indices(&mut self, indices: &[u32]) {
        let fits_u16 = indices.iter().all(|&i| i <= u16::MAX as u32);
        match self.index_format {
            Some(IndexFormat::Uint16) if fits_u16 => {
                let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
                self.index_data = Some(bytemuck::cast_slice(&narrow).to_vec());
                self.index_format = Some(IndexFormat::Uint16);
            }
            _ => {
                self.index_data = Some(bytemuck::cast_slice(indices).to_vec());
                self.index_format = Some(IndexFormat::Uint32);
            }
        }
        self.index_count = indices.len() as u32;
    }

    /// Read the raw 32-bit components of an attribute as floats.
    ///
    /// Returns the component count and a flat list of
    /// `vertex_count * components` values. Integer attributes are returned
    /// as `None`.
    pub fn read_components(&self, semantic: VertexAttributeSemantic) -> Option<(usize, Vec<f32>)> {
        let attr = self.layout.get_attribute(semantic)?;
        if !attr.format.is_float() {
            return None;
        }
        let stride = self.layout.buffer_stride(attr.buffer_index as usize);
        let data = self.vertex_buffers.get(attr.buffer_index as usize)?;
        let components = attr.format.component_count();
        let mut values = Vec::with_capacity(self.vertex_count as usize * components);
        for v in 0..self.vertex_count as usize {
            let bytes = data.get(attr.byte_range(stride, v))?;
            values.extend(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])),
            );
        }
        Some((components, values))
    }

    /// Read a float attribute with exactly `N` components.
    pub fn read_attribute<const N: usize>(
        &self,
        semantic: VertexAttributeSemantic,
    ) -> Option<Vec<[f32; N]>> {
        let (components, values) = self.read_components(semantic)?;
        if components != N {
            return None;
        }
        Some(
            values
                .chunks_exact(N)
                .map(|c| {
                    let mut out = [0.0; N];
                    out.copy_from_slice(c);
                    out
                })
                .collect(),
        )
    }

    /// Overwrite a float attribute with exactly `N` components.
    ///
    /// Returns `false` if the attribute is missing, has a different width,
    /// or `values` does not hold one entry per vertex.
    pub fn write_attribute<const N: usize>(
        &mut self,
        semantic: VertexAttributeSemantic,
        values: &[[f32; N]],
    ) -> bool {
        let Some(attr) = self.layout.get_attribute(semantic).cloned() else {
            return false;
        };
        if !attr.format.is_float()
            || attr.format.component_count() != N
            || values.len() != self.vertex_count as usize
        {
            return false;
        }
        let stride = self.layout.buffer_stride(attr.buffer_index as usize);
        let Some(data) = self.vertex_buffers.get_mut(attr.buffer_index as usize) else {
            return false;
        };
        for (v, value) in values.iter().enumerate() {
            let Some(slot) = data.get_mut(attr.byte_range(stride, v)) else {
                return false;
            };
            slot.copy_from_slice(bytemuck::cast_slice(value));
        }
        true
    }

    /// Apply `f` to every float component of every float attribute.
    pub fn map_float_components(&mut self, mut f: impl FnMut(f32) -> f32) {
        let layout = self.layout.clone();
        for attr in layout.attributes.iter().filter(|a| a.format.is_float()) {
            let stride = layout.buffer_stride(attr.buffer_index as usize);
            let Some(data) = self.vertex_buffers.get_mut(attr.buffer_index as usize) else {
                continue;
            };
            for v in 0..self.vertex_count as usize {
                let Some(bytes) = data.get_mut(attr.byte_range(stride, v)) else {
                    break;
                };
                for c in bytes.chunks_exact_mut(4) {
                    let value = f(f32::from_le_bytes([c[0], c[1], c[2], c[3]]));
                    c.copy_from_slice(&value.to_le_bytes());
                }
            }
        }
    }

    /// Reorder vertices so that new vertex `i` is old vertex `order[i]`.
    ///
    /// `order` must be a permutation of `0..vertex_count`. Index values are
    /// not touched.
    pub fn permute_vertices(&mut self, order: &[u32]) {
        if order.len() != self.vertex_count as usize {
            log::warn!(
                "Ignoring vertex permutation of length {} for {} vertices",
                order.len(),
                self.vertex_count
            );
            return;
        }
        for (buffer_index, data) in self.vertex_buffers.iter_mut().enumerate() {
            let stride = self.layout.buffer_stride(buffer_index) as usize;
            if stride == 0 {
                continue;
            }
            let mut reordered = Vec::with_capacity(data.len());
            for &old in order {
                let start = old as usize * stride;
                if let Some(chunk) = data.get(start..start + stride) {
                    reordered.extend_from_slice(chunk);
                }
            }
            *data = reordered;
        }
    }

    /// Add a zero-filled attribute to the buffer that holds positions.
    ///
    /// The buffer is repacked in canonical semantic order, so existing
    /// attributes of that buffer may move. Does nothing if the attribute
    /// already exists.
    pub fn insert_attribute(
        &mut self,
        semantic: VertexAttributeSemantic,
        format: VertexAttributeFormat,
    ) {
        if self.layout.has_semantic(semantic) {
            return;
        }
        let buffer_index = self
            .layout
            .get_attribute(VertexAttributeSemantic::Position)
            .map(|a| a.buffer_index)
            .unwrap_or(0);

        let mut packed: Vec<VertexAttribute> = self
            .layout
            .attributes_for_buffer(buffer_index)
            .cloned()
            .collect();
        packed.push(VertexAttribute::new(semantic, format, u32::MAX, buffer_index));
        packed.sort_by_key(|a| a.semantic);

        let old_stride = self.layout.buffer_stride(buffer_index as usize) as usize;
        let mut offset = 0u32;
        let mut moves = Vec::with_capacity(packed.len());
        for attr in &mut packed {
            moves.push((attr.offset, offset, attr.format.size()));
            attr.offset = offset;
            offset += attr.format.size() as u32;
        }
        let new_stride = offset as usize;

        let vertex_count = self.vertex_count as usize;
        let old_data = self
            .vertex_buffers
            .get(buffer_index as usize)
            .cloned()
            .unwrap_or_default();
        let mut new_data = vec![0u8; vertex_count * new_stride];
        for v in 0..vertex_count {
            for &(old_offset, new_offset, size) in &moves {
                if old_offset == u32::MAX {
                    continue;
                }
                let src = v * old_stride + old_offset as usize;
                let dst = v * new_stride + new_offset as usize;
                if let Some(bytes) = old_data.get(src..src + size) {
                    new_data[dst..dst + size].copy_from_slice(bytes);
                }
            }
        }

        let mut layout = (*self.layout).clone();
        layout.attributes.retain(|a| a.buffer_index != buffer_index);
        layout.attributes.extend(packed);
        layout.attributes.sort_by_key(|a| (a.buffer_index, a.offset));
        if let Some(buffer) = layout.buffers.get_mut(buffer_index as usize) {
            *buffer = VertexBufferLayout::new(new_stride as u32);
        } else {
            layout.buffers.push(VertexBufferLayout::new(new_stride as u32));
            self.vertex_buffers.push(Vec::new());
        }
        log::debug!(
            "Inserted {:?} into vertex buffer {} (stride {} -> {})",
            semantic,
            buffer_index,
            old_stride,
            new_stride
        );
        if let Some(slot) = self.vertex_buffers.get_mut(buffer_index as usize) {
            *slot = new_data;
        }
        self.layout = Arc::new(layout);
    }
}

impl std::fmt::Debug for CpuMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuMesh")
            .field("label", &self.label)
            .field("vertex_count", &self.vertex_count)
            .field("buffer_count", &self.vertex_buffers.len())
            .field("index_count", &self.index_count)
            .field("index_format", &self.index_format)
            .field("submeshes", &self.submeshes.len())
            .field("layout", &self.layout.label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_only() -> Arc<VertexLayout> {
        Arc::new(
            VertexLayout::new()
                .with_buffer(VertexBufferLayout::new(12))
                .with_attribute(VertexAttribute::position(0))
                .with_label("position_only"),
        )
    }

    fn triangle() -> CpuMesh {
        let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, -1.0]];
        CpuMesh::new(position_only())
            .with_vertex_data(0, bytemuck::cast_slice(&positions).to_vec())
            .with_indices_u16(&[0, 1, 2])
    }

    #[test]
    fn test_primitive_topology_vertices() {
        assert_eq!(PrimitiveTopology::PointList.vertices_per_primitive(), 1);
        assert_eq!(PrimitiveTopology::LineList.vertices_per_primitive(), 2);
        assert_eq!(PrimitiveTopology::TriangleList.vertices_per_primitive(), 3);
    }

    #[test]
    fn test_index_format_selection() {
        assert_eq!(IndexFormat::Uint16.size(), 2);
        assert_eq!(IndexFormat::Uint32.size(), 4);
        assert_eq!(IndexFormat::for_index_count(3), IndexFormat::Uint16);
        assert_eq!(IndexFormat::for_index_count(65535), IndexFormat::Uint16);
        assert_eq!(IndexFormat::for_index_count(65536), IndexFormat::Uint32);
    }

    #[test]
    fn test_cpu_mesh_basic() {
        let mesh = triangle().with_label("test");
        assert_eq!(mesh.vertex_count(), 3);
        assert!(mesh.is_indexed());
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.index_format(), Some(IndexFormat::Uint16));
        assert_eq!(mesh.label(), Some("test"));
        assert_eq!(mesh.indices(), vec![0, 1, 2]);
        assert_eq!(mesh.submeshes(), vec![SubMesh::triangles(0, 3)]);
    }

    #[test]
    fn test_bounds() {
        let mut mesh = triangle();
        assert!(mesh.bounds().is_none());
        mesh.recalculate_bounds();
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(bounds.center(), Vec3::new(0.5, 1.0, -0.5));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_set_indices_promotes_format() {
        let mut mesh = triangle();
        mesh.set_indices(&[2, 1, 0]);
        assert_eq!(mesh.index_format(), Some(IndexFormat::Uint16));
        assert_eq!(mesh.indices(), vec![2, 1, 0]);

        mesh.set_indices(&[0, 1, 70_000]);
        assert_eq!(mesh.index_format(), Some(IndexFormat::Uint32));
        assert_eq!(mesh.indices(), vec![0, 1, 70_000]);
    }

    #[test]
    fn test_read_write_attribute() {
        let mut mesh = triangle();
        let positions = mesh
            .read_attribute::<3>(VertexAttributeSemantic::Position)
            .unwrap();
        assert_eq!(positions[2], [0.0, 2.0, -1.0]);
        assert!(mesh
            .read_attribute::<4>(VertexAttributeSemantic::Position)
            .is_none());

        let moved = [[1.0, 1.0, 1.0]; 3];
        assert!(mesh.write_attribute(VertexAttributeSemantic::Position, &moved));
        assert!(!mesh.write_attribute(VertexAttributeSemantic::Normal, &moved));
        assert!(!mesh.write_attribute(VertexAttributeSemantic::Position, &moved[..2]));
        assert_eq!(
            mesh.read_attribute::<3>(VertexAttributeSemantic::Position)
                .unwrap(),
            moved.to_vec()
        );
    }

    #[test]
    fn test_permute_vertices() {
        let mut mesh = triangle();
        mesh.permute_vertices(&[2, 0, 1]);
        let positions = mesh
            .read_attribute::<3>(VertexAttributeSemantic::Position)
            .unwrap();
        assert_eq!(positions[0], [0.0, 2.0, -1.0]);
        assert_eq!(positions[1], [0.0, 0.0, 0.0]);
        assert_eq!(positions[2], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_insert_attribute_repacks_canonical_order() {
        // position + tangent, normal gets inserted between them
        let layout = Arc::new(
            VertexLayout::new()
                .with_buffer(VertexBufferLayout::new(28))
                .with_attribute(VertexAttribute::position(0))
                .with_attribute(VertexAttribute::tangent(12)),
        );
        let mut data = Vec::new();
        data.extend_from_slice(bytemuck::cast_slice(&[1.0f32, 2.0, 3.0]));
        data.extend_from_slice(bytemuck::cast_slice(&[0.0f32, 1.0, 0.0, -1.0]));
        let mut mesh = CpuMesh::new(layout).with_vertex_data(0, data);

        mesh.insert_attribute(
            VertexAttributeSemantic::Normal,
            VertexAttributeFormat::Float3,
        );

        let layout = mesh.layout();
        assert_eq!(layout.buffer_stride(0), 40);
        assert_eq!(
            layout
                .get_attribute(VertexAttributeSemantic::Normal)
                .unwrap()
                .offset,
            12
        );
        assert_eq!(
            layout
                .get_attribute(VertexAttributeSemantic::Tangent)
                .unwrap()
                .offset,
            24
        );
        assert!(layout.validate().is_ok());
        assert_eq!(
            mesh.read_attribute::<3>(VertexAttributeSemantic::Position),
            Some(vec![[1.0, 2.0, 3.0]])
        );
        assert_eq!(
            mesh.read_attribute::<3>(VertexAttributeSemantic::Normal),
            Some(vec![[0.0, 0.0, 0.0]])
        );
        assert_eq!(
            mesh.read_attribute::<4>(VertexAttributeSemantic::Tangent),
            Some(vec![[0.0, 1.0, 0.0, -1.0]])
        );
    }
}

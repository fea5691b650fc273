//! Packed vertex and index buffer builder.
//!
//! The builder is sized from a [`MeshAssemblyPlan`] before any row is read.
//! Vertex attributes are packed into up to three streams:
//!
//! | Stream group | Attributes |
//! |--------------|------------|
//! | geometry     | position, normal, tangent |
//! | surface      | color, texcoord 0-7 |
//! | skinning     | blend weight, blend indices |
//!
//! Groups without an enabled attribute take no stream, so stream numbers are
//! always consecutive from 0. Inside a stream attributes follow the canonical
//! semantic order.
//!
//! Each vertex is written by the first row that names it. Later rows with the
//! same vertex id only contribute their index slot.

use std::sync::Arc;

use redlilium_core::mesh::geometry::flip_triangle_winding;
use redlilium_core::mesh::{
    CpuMesh, IndexFormat, VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic,
    VertexBufferLayout, VertexLayout,
};

use crate::csv;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ImportError;
use crate::merge::MeshAssemblyPlan;
use crate::plan::TableIndexPlan;
use crate::transform::ComponentTransform;

use VertexAttributeSemantic as S;

/// Attributes of each stream group, in packing order.
const STREAM_GROUPS: [&[VertexAttributeSemantic]; 3] = [
    &[S::Position, S::Normal, S::Tangent],
    &[
        S::Color,
        S::TexCoord0,
        S::TexCoord1,
        S::TexCoord2,
        S::TexCoord3,
        S::TexCoord4,
        S::TexCoord5,
        S::TexCoord6,
        S::TexCoord7,
    ],
    &[S::BlendWeight, S::BlendIndices],
];

/// Where one enabled attribute comes from and where it is stored.
#[derive(Debug, Clone)]
struct PackedAttribute {
    semantic: VertexAttributeSemantic,
    buffer: usize,
    offset: usize,
    stride: usize,
    /// Source column per stored component.
    columns: Vec<usize>,
    /// Present when the attribute is modified.
    transforms: Option<Vec<ComponentTransform>>,
}

impl PackedAttribute {
    fn is_integer(&self) -> bool {
        self.semantic == S::BlendIndices
    }

    fn byte_range(&self, vertex: usize) -> std::ops::Range<usize> {
        let start = vertex * self.stride + self.offset;
        start..start + self.columns.len() * 4
    }
}

fn attribute_format(
    semantic: VertexAttributeSemantic,
    components: usize,
) -> Option<VertexAttributeFormat> {
    if components == 0 {
        None
    } else if semantic == S::BlendIndices {
        Some(VertexAttributeFormat::Int4)
    } else {
        VertexAttributeFormat::float(components)
    }
}

/// Compute the stream layout for a column plan.
fn pack_attributes(plan: &TableIndexPlan) -> (VertexLayout, Vec<PackedAttribute>) {
    let mut layout = VertexLayout::new().with_label("capture");
    let mut packed = Vec::new();

    for group in STREAM_GROUPS {
        let buffer = layout.buffer_count();
        let mut offset = 0usize;
        let first = packed.len();
        for &semantic in group {
            let components = plan.enabled_components(semantic);
            let Some(format) = attribute_format(semantic, components) else {
                continue;
            };
            let slots = plan.slots(semantic);
            let columns: Vec<usize> = slots.columns[..components]
                .iter()
                .flatten()
                .copied()
                .collect();
            let transforms = slots.transforms.iter().any(Option::is_some).then(|| {
                slots.transforms[..components]
                    .iter()
                    .enumerate()
                    .map(|(c, t)| t.unwrap_or_else(|| ComponentTransform::identity(c)))
                    .collect()
            });
            layout = layout.with_attribute(VertexAttribute::new(
                semantic,
                format,
                offset as u32,
                buffer as u32,
            ));
            packed.push(PackedAttribute {
                semantic,
                buffer,
                offset,
                stride: 0,
                columns,
                transforms,
            });
            offset += format.size();
        }
        if packed.len() > first {
            for attribute in &mut packed[first..] {
                attribute.stride = offset;
            }
            layout = layout.with_buffer(VertexBufferLayout::new(offset as u32));
        }
    }

    (layout, packed)
}

/// Index value type of a packed index buffer.
pub trait IndexValue: Copy + Default + bytemuck::Pod + Into<u32> {
    /// Narrow a vertex slot. Callers guarantee it fits.
    fn from_slot(slot: usize) -> Self;
}

impl IndexValue for u16 {
    fn from_slot(slot: usize) -> Self {
        slot as u16
    }
}

impl IndexValue for u32 {
    fn from_slot(slot: usize) -> Self {
        slot as u32
    }
}

/// Outcome of writing one index slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWrite {
    /// The slot was empty.
    First,
    /// The slot was already written and held this vertex.
    Replaced(u32),
    /// The slot lies outside the buffer. Nothing was stored.
    OutOfRange,
}

/// Index buffer with a written flag per slot.
#[derive(Debug, Clone)]
pub struct IndexStorage<T> {
    values: Vec<T>,
    written: Vec<bool>,
    written_count: usize,
}

impl<T: IndexValue> IndexStorage<T> {
    pub fn new(count: usize) -> Self {
        Self {
            values: vec![T::default(); count],
            written: vec![false; count],
            written_count: 0,
        }
    }

    /// Store `vertex` at `slot`.
    pub fn write(&mut self, slot: usize, vertex: usize) -> IndexWrite {
        let (Some(value), Some(written)) = (self.values.get_mut(slot), self.written.get_mut(slot))
        else {
            return IndexWrite::OutOfRange;
        };
        let previous = (*value).into();
        *value = T::from_slot(vertex);
        if std::mem::replace(written, true) {
            IndexWrite::Replaced(previous)
        } else {
            self.written_count += 1;
            IndexWrite::First
        }
    }

    pub fn written_count(&self) -> usize {
        self.written_count
    }

    pub fn first_missing(&self) -> Option<usize> {
        self.written.iter().position(|w| !w)
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }
}

/// Index buffer in the width chosen for the import.
#[derive(Debug, Clone)]
pub enum PackedIndices {
    U16(IndexStorage<u16>),
    U32(IndexStorage<u32>),
}

impl PackedIndices {
    /// 16-bit when the index count allows it and every vertex slot fits.
    pub fn new(count: usize, vertex_count: usize) -> Self {
        let format = match IndexFormat::for_index_count(count) {
            IndexFormat::Uint16 if vertex_count > u16::MAX as usize + 1 => IndexFormat::Uint32,
            format => format,
        };
        match format {
            IndexFormat::Uint16 => Self::U16(IndexStorage::new(count)),
            IndexFormat::Uint32 => Self::U32(IndexStorage::new(count)),
        }
    }

    pub fn format(&self) -> IndexFormat {
        match self {
            Self::U16(_) => IndexFormat::Uint16,
            Self::U32(_) => IndexFormat::Uint32,
        }
    }

    fn write(&mut self, slot: usize, vertex: usize) -> IndexWrite {
        match self {
            Self::U16(storage) => storage.write(slot, vertex),
            Self::U32(storage) => storage.write(slot, vertex),
        }
    }

    fn written_count(&self) -> usize {
        match self {
            Self::U16(storage) => storage.written_count(),
            Self::U32(storage) => storage.written_count(),
        }
    }

    fn first_missing(&self) -> Option<usize> {
        match self {
            Self::U16(storage) => storage.first_missing(),
            Self::U32(storage) => storage.first_missing(),
        }
    }

    fn flip_winding(&mut self) {
        match self {
            Self::U16(storage) => flip_triangle_winding(storage.values_mut()),
            Self::U32(storage) => flip_triangle_winding(storage.values_mut()),
        }
    }

    fn attach(&self, mesh: CpuMesh) -> CpuMesh {
        match self {
            Self::U16(storage) => mesh.with_indices_u16(storage.values()),
            Self::U32(storage) => mesh.with_indices_u32(storage.values()),
        }
    }
}

/// Accumulates rows of all tables into packed buffers.
pub struct PackedMeshBuilder {
    assembly: MeshAssemblyPlan,
    vertex_id_column: usize,
    index_id_column: usize,
    layout: Arc<VertexLayout>,
    attributes: Vec<PackedAttribute>,
    buffers: Vec<Vec<u8>>,
    vertex_written: Vec<bool>,
    vertices_written: usize,
    indices: PackedIndices,
}

impl PackedMeshBuilder {
    /// Allocate zeroed buffers for a validated plan.
    ///
    /// `table` names the table the plan was read from, for errors.
    pub fn new(
        table: &str,
        plan: &TableIndexPlan,
        assembly: MeshAssemblyPlan,
    ) -> Result<Self, ImportError> {
        let (Some(vertex_id_column), Some(index_id_column)) =
            (plan.vertex_id_column, plan.index_id_column)
        else {
            return Err(ImportError::InvalidTableHeader {
                table: table.to_string(),
                reason: "id columns missing".into(),
            });
        };
        let (layout, attributes) = pack_attributes(plan);
        let buffers = (0..layout.buffer_count())
            .map(|b| vec![0u8; layout.buffer_stride(b) as usize * assembly.vertex_count])
            .collect();
        log::debug!(
            "Packed layout: {} streams, strides {:?}, attributes {:?}",
            layout.buffer_count(),
            layout.buffers.iter().map(|b| b.stride).collect::<Vec<_>>(),
            attributes.iter().map(|a| a.semantic).collect::<Vec<_>>()
        );
        let indices = PackedIndices::new(assembly.index_count, assembly.vertex_count);

        Ok(Self {
            vertex_written: vec![false; assembly.vertex_count],
            vertices_written: 0,
            vertex_id_column,
            index_id_column,
            layout: Arc::new(layout),
            attributes,
            buffers,
            indices,
            assembly,
        })
    }

    pub fn layout(&self) -> &Arc<VertexLayout> {
        &self.layout
    }

    pub fn index_format(&self) -> IndexFormat {
        self.indices.format()
    }

    /// Feed one data row of table `table`.
    ///
    /// Returns `false` when the row was dropped for unusable or out of range
    /// ids.
    pub fn ingest_row(&mut self, table: usize, line: &str, diagnostics: &mut Diagnostics) -> bool {
        let fields = csv::split_row(csv::trim_line_end(line));
        let field = |column: usize| fields.get(column).copied().unwrap_or("");

        let Some(vertex_id) = csv::parse_id(field(self.vertex_id_column)) else {
            return false;
        };
        let Some(index_id) = csv::parse_id(field(self.index_id_column)) else {
            return false;
        };
        let Some(vertex) = self.assembly.vertex_slot(vertex_id) else {
            return false;
        };
        let Some(slot) = self.assembly.index_slot(table, index_id) else {
            return false;
        };

        match self.indices.write(slot, vertex) {
            IndexWrite::OutOfRange => return false,
            IndexWrite::First => {}
            IndexWrite::Replaced(previous) => {
                diagnostics.push(Diagnostic::DuplicateIndexWrite {
                    table,
                    slot,
                    previous,
                    vertex: vertex as u32,
                });
            }
        }

        if !self.vertex_written[vertex] {
            self.write_vertex(vertex, &fields, diagnostics);
            self.vertex_written[vertex] = true;
            self.vertices_written += 1;
        }
        true
    }

    fn write_vertex(&mut self, vertex: usize, fields: &[&str], diagnostics: &mut Diagnostics) {
        let field = |column: usize| fields.get(column).copied().unwrap_or("");

        for attribute in &self.attributes {
            let Some(target) = self
                .buffers
                .get_mut(attribute.buffer)
                .and_then(|b| b.get_mut(attribute.byte_range(vertex)))
            else {
                continue;
            };

            if attribute.is_integer() {
                let mut raw = [0i32; 4];
                for (value, &column) in raw.iter_mut().zip(&attribute.columns) {
                    *value = csv::parse_int(field(column), 0, diagnostics);
                }
                let raw = &raw[..attribute.columns.len()];
                let mut stored = [0i32; 4];
                for (c, value) in stored.iter_mut().take(raw.len()).enumerate() {
                    *value = match &attribute.transforms {
                        Some(transforms) => transforms[c].apply_int(raw),
                        None => raw[c],
                    };
                }
                target.copy_from_slice(bytemuck::cast_slice(&stored[..raw.len()]));
            } else {
                let mut raw = [0f32; 4];
                for (value, &column) in raw.iter_mut().zip(&attribute.columns) {
                    *value = csv::parse_float(field(column), 0.0, diagnostics);
                }
                let raw = &raw[..attribute.columns.len()];
                let mut stored = [0f32; 4];
                for (c, value) in stored.iter_mut().take(raw.len()).enumerate() {
                    *value = match &attribute.transforms {
                        Some(transforms) => transforms[c].apply(raw),
                        None => raw[c],
                    };
                }
                target.copy_from_slice(bytemuck::cast_slice(&stored[..raw.len()]));
            }
        }
    }

    /// Validate completeness and hand the buffers over as a mesh.
    ///
    /// Winding is flipped before the mesh is built. Bounds are computed.
    pub fn finish(mut self, flip_winding: bool) -> Result<CpuMesh, ImportError> {
        if let Some(first_missing) = self.vertex_written.iter().position(|w| !w) {
            return Err(ImportError::IncompleteVertexData {
                expected: self.assembly.vertex_count,
                written: self.vertices_written,
                first_missing,
            });
        }
        if let Some(first_missing) = self.indices.first_missing() {
            return Err(ImportError::IncompleteIndexData {
                expected: self.assembly.index_count,
                written: self.indices.written_count(),
                first_missing,
            });
        }

        if flip_winding {
            self.indices.flip_winding();
        }

        let mut mesh = CpuMesh::new(self.layout.clone());
        for (index, data) in self.buffers.into_iter().enumerate() {
            mesh = mesh.with_vertex_data(index, data);
        }
        let mut mesh = self
            .indices
            .attach(mesh)
            .with_submeshes(self.assembly.mesh_submeshes());
        mesh.recalculate_bounds();
        Ok(mesh)
    }
}

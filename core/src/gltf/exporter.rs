//! glTF 2.0 exporter.
//!
//! Builds a glTF JSON document plus one binary buffer from a [`CpuMesh`].

use std::collections::BTreeMap;

use gltf_dep::json as gj;

use crate::mesh::{
    Aabb, CpuMesh, IndexFormat, PrimitiveTopology, VertexAttribute, VertexAttributeFormat,
    VertexAttributeSemantic,
};

use super::error::GltfError;

// ---------------------------------------------------------------------------
// Export context
// ---------------------------------------------------------------------------

pub(super) struct ExportContext {
    root: gj::Root,
    buffer_data: Vec<u8>,
}

impl ExportContext {
    pub(super) fn new() -> Self {
        Self {
            root: gj::Root::default(),
            buffer_data: Vec::new(),
        }
    }

    // -- Mesh ----------------------------------------------------------------

    pub(super) fn build_mesh(&mut self, mesh: &CpuMesh) -> Result<(), GltfError> {
        let layout = mesh.layout().clone();
        let vertex_count = mesh.vertex_count();

        let has_positions = layout
            .get_attribute(VertexAttributeSemantic::Position)
            .is_some_and(|a| a.format == VertexAttributeFormat::Float3);
        if !has_positions {
            return Err(GltfError::MissingPositions {
                mesh: mesh.label().map(String::from),
            });
        }
        let (Some(index_data), Some(index_format)) = (mesh.index_data(), mesh.index_format())
        else {
            return Err(GltfError::MissingIndices {
                mesh: mesh.label().map(String::from),
            });
        };

        // One strided view per vertex buffer.
        let mut buffer_views = Vec::with_capacity(layout.buffer_count());
        for buffer_index in 0..layout.buffer_count() {
            let data = mesh.vertex_buffer_data(buffer_index).unwrap_or(&[]);
            let view = (!data.is_empty()).then(|| {
                self.push_buffer_view_with_stride(
                    data,
                    layout.buffer_stride(buffer_index),
                    Some(gj::buffer::Target::ArrayBuffer),
                )
            });
            buffer_views.push(view);
        }

        let mut attributes = BTreeMap::new();
        for attr in &layout.attributes {
            let Some(semantic) = map_semantic(attr) else {
                log::warn!(
                    "Skipping {:?} ({:?}): no glTF equivalent",
                    attr.semantic,
                    attr.format
                );
                continue;
            };
            let acc_idx = if attr.semantic == VertexAttributeSemantic::BlendIndices {
                self.push_joints(mesh, attr)
            } else {
                let Some(Some(view_idx)) = buffer_views.get(attr.buffer_index as usize) else {
                    continue;
                };
                let (min, max) = if attr.semantic == VertexAttributeSemantic::Position {
                    compute_position_min_max(mesh)
                } else {
                    (None, None)
                };
                self.push_accessor(
                    *view_idx,
                    attr.offset,
                    vertex_count,
                    gj::accessor::ComponentType::F32,
                    map_accessor_type(attr.format),
                    min,
                    max,
                )
            };
            attributes.insert(
                gj::validation::Checked::Valid(semantic),
                gj::Index::new(acc_idx),
            );
        }

        let index_view =
            self.push_buffer_view(index_data, Some(gj::buffer::Target::ElementArrayBuffer));
        let component_type = match index_format {
            IndexFormat::Uint16 => gj::accessor::ComponentType::U16,
            IndexFormat::Uint32 => gj::accessor::ComponentType::U32,
        };

        let mut primitives = Vec::new();
        for (i, submesh) in mesh.submeshes().iter().enumerate() {
            if submesh.index_end() > mesh.index_count() {
                return Err(GltfError::SubMeshOutOfRange {
                    submesh: i,
                    end: submesh.index_end(),
                    index_count: mesh.index_count(),
                });
            }
            if submesh.index_count == 0 {
                log::warn!("Skipping empty submesh {i}");
                continue;
            }
            let acc_idx = self.push_accessor(
                index_view,
                submesh.index_start * index_format.size() as u32,
                submesh.index_count,
                component_type,
                gj::accessor::Type::Scalar,
                None,
                None,
            );
            primitives.push(gj::mesh::Primitive {
                attributes: attributes.clone(),
                extensions: None,
                extras: gj::Extras::default(),
                indices: Some(gj::Index::new(acc_idx)),
                material: None,
                mode: gj::validation::Checked::Valid(map_topology(submesh.topology)),
                targets: None,
            });
        }

        self.root.meshes.push(gj::Mesh {
            name: mesh.label().map(String::from),
            primitives,
            weights: None,
            extensions: None,
            extras: gj::Extras::default(),
        });
        Ok(())
    }

    /// Repack int4 blend indices as tightly packed u16x4 joints.
    fn push_joints(&mut self, mesh: &CpuMesh, attr: &VertexAttribute) -> u32 {
        let stride = mesh.layout().buffer_stride(attr.buffer_index as usize);
        let data = mesh
            .vertex_buffer_data(attr.buffer_index as usize)
            .unwrap_or(&[]);
        let mut clamped = 0usize;
        let mut joints: Vec<u16> = Vec::with_capacity(mesh.vertex_count() as usize * 4);
        for v in 0..mesh.vertex_count() as usize {
            let bytes = data.get(attr.byte_range(stride, v)).unwrap_or(&[]);
            for c in bytes.chunks_exact(4) {
                let value = i32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                let joint = value.clamp(0, u16::MAX as i32);
                if joint != value {
                    clamped += 1;
                }
                joints.push(joint as u16);
            }
        }
        if clamped > 0 {
            log::warn!("Clamped {clamped} blend indices to the u16 joint range");
        }
        let view_idx = self.push_buffer_view_with_stride(
            bytemuck::cast_slice(&joints),
            8,
            Some(gj::buffer::Target::ArrayBuffer),
        );
        self.push_accessor(
            view_idx,
            0,
            mesh.vertex_count(),
            gj::accessor::ComponentType::U16,
            gj::accessor::Type::Vec4,
            None,
            None,
        )
    }

    // -- Scene ---------------------------------------------------------------

    pub(super) fn build_scene(&mut self, name: Option<&str>) {
        let node_idx = self.root.nodes.len() as u32;
        self.root.nodes.push(gj::Node {
            name: name.map(String::from),
            mesh: Some(gj::Index::new(0)),
            ..gj::Node::default()
        });
        self.root.scenes.push(gj::Scene {
            name: name.map(String::from),
            nodes: vec![gj::Index::new(node_idx)],
            extensions: None,
            extras: gj::Extras::default(),
        });
        self.root.scene = Some(gj::Index::new(0));
        self.root.asset = gj::Asset {
            generator: Some("RedLilium Capture".into()),
            version: "2.0".into(),
            ..Default::default()
        };
    }

    // -- Buffer/accessor helpers ---------------------------------------------

    fn align_buffer(&mut self) {
        let padding = (4 - (self.buffer_data.len() % 4)) % 4;
        self.buffer_data.extend(std::iter::repeat_n(0u8, padding));
    }

    fn push_view(
        &mut self,
        data: &[u8],
        stride: Option<u32>,
        target: Option<gj::buffer::Target>,
    ) -> u32 {
        self.align_buffer();
        let offset = self.buffer_data.len();
        self.buffer_data.extend_from_slice(data);

        let view_idx = self.root.buffer_views.len() as u32;
        self.root.buffer_views.push(gj::buffer::View {
            buffer: gj::Index::new(0),
            byte_offset: Some(gj::validation::USize64(offset as u64)),
            byte_length: gj::validation::USize64(data.len() as u64),
            byte_stride: stride.map(|s| gj::buffer::Stride(s as usize)),
            target: target.map(gj::validation::Checked::Valid),
            name: None,
            extensions: None,
            extras: gj::Extras::default(),
        });

        view_idx
    }

    fn push_buffer_view(&mut self, data: &[u8], target: Option<gj::buffer::Target>) -> u32 {
        self.push_view(data, None, target)
    }

    fn push_buffer_view_with_stride(
        &mut self,
        data: &[u8],
        stride: u32,
        target: Option<gj::buffer::Target>,
    ) -> u32 {
        self.push_view(data, Some(stride), target)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_accessor(
        &mut self,
        buffer_view: u32,
        byte_offset: u32,
        count: u32,
        component_type: gj::accessor::ComponentType,
        type_: gj::accessor::Type,
        min: Option<gj::Value>,
        max: Option<gj::Value>,
    ) -> u32 {
        let acc_idx = self.root.accessors.len() as u32;
        self.root.accessors.push(gj::Accessor {
            buffer_view: Some(gj::Index::new(buffer_view)),
            byte_offset: Some(gj::validation::USize64(byte_offset as u64)),
            count: gj::validation::USize64(count as u64),
            component_type: gj::validation::Checked::Valid(gj::accessor::GenericComponentType(
                component_type,
            )),
            type_: gj::validation::Checked::Valid(type_),
            min,
            max,
            normalized: false,
            name: None,
            sparse: None,
            extensions: None,
            extras: gj::Extras::default(),
        });
        acc_idx
    }

    pub(super) fn finalize_buffer(&mut self) {
        if !self.buffer_data.is_empty() {
            self.root.buffers.push(gj::Buffer {
                byte_length: gj::validation::USize64(self.buffer_data.len() as u64),
                name: None,
                uri: None,
                extensions: None,
                extras: gj::Extras::default(),
            });
        }
    }

    // -- GLB assembly --------------------------------------------------------

    pub(super) fn to_glb(&self) -> Result<Vec<u8>, GltfError> {
        let json_bytes = self
            .root
            .to_vec()
            .map_err(|e| GltfError::ExportError(format!("JSON serialization failed: {e}")))?;

        let json_pad = (4 - (json_bytes.len() % 4)) % 4;
        let json_chunk_len = json_bytes.len() + json_pad;

        let bin_pad = (4 - (self.buffer_data.len() % 4)) % 4;
        let bin_chunk_len = self.buffer_data.len() + bin_pad;

        let has_bin = !self.buffer_data.is_empty();
        let total_length = 12 + 8 + json_chunk_len + if has_bin { 8 + bin_chunk_len } else { 0 };

        let mut glb = Vec::with_capacity(total_length);

        // Header
        glb.extend_from_slice(&0x46546C67u32.to_le_bytes()); // magic "glTF"
        glb.extend_from_slice(&2u32.to_le_bytes()); // version
        glb.extend_from_slice(&(total_length as u32).to_le_bytes());

        // JSON chunk
        glb.extend_from_slice(&(json_chunk_len as u32).to_le_bytes());
        glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
        glb.extend_from_slice(&json_bytes);
        glb.extend(std::iter::repeat_n(b' ', json_pad));

        // BIN chunk
        if has_bin {
            glb.extend_from_slice(&(bin_chunk_len as u32).to_le_bytes());
            glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
            glb.extend_from_slice(&self.buffer_data);
            glb.extend(std::iter::repeat_n(0u8, bin_pad));
        }

        Ok(glb)
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn map_accessor_type(format: VertexAttributeFormat) -> gj::accessor::Type {
    match format {
        VertexAttributeFormat::Float => gj::accessor::Type::Scalar,
        VertexAttributeFormat::Float2 => gj::accessor::Type::Vec2,
        VertexAttributeFormat::Float3 => gj::accessor::Type::Vec3,
        VertexAttributeFormat::Float4 | VertexAttributeFormat::Int4 => gj::accessor::Type::Vec4,
    }
}

/// glTF semantic for an attribute, `None` when glTF cannot represent its format.
fn map_semantic(attr: &VertexAttribute) -> Option<gj::mesh::Semantic> {
    use VertexAttributeFormat as F;
    use VertexAttributeSemantic as S;

    match (attr.semantic, attr.format) {
        (S::Position, F::Float3) => Some(gj::mesh::Semantic::Positions),
        (S::Normal, F::Float3) => Some(gj::mesh::Semantic::Normals),
        (S::Tangent, F::Float4) => Some(gj::mesh::Semantic::Tangents),
        (S::Color, F::Float3 | F::Float4) => Some(gj::mesh::Semantic::Colors(0)),
        (S::BlendWeight, F::Float4) => Some(gj::mesh::Semantic::Weights(0)),
        (S::BlendIndices, F::Int4) => Some(gj::mesh::Semantic::Joints(0)),
        (semantic, F::Float2) => semantic
            .texcoord_set()
            .map(|set| gj::mesh::Semantic::TexCoords(set as u32)),
        _ => None,
    }
}

fn map_topology(topology: PrimitiveTopology) -> gj::mesh::Mode {
    match topology {
        PrimitiveTopology::PointList => gj::mesh::Mode::Points,
        PrimitiveTopology::LineList => gj::mesh::Mode::Lines,
        PrimitiveTopology::TriangleList => gj::mesh::Mode::Triangles,
    }
}

/// Build a JSON array of f32 values (for accessor min/max).
fn json_f32_array(values: &[f32]) -> gj::Value {
    gj::Value::Array(values.iter().map(|&v| gj::Value::from(v as f64)).collect())
}

/// Compute min/max for the POSITION accessor.
fn compute_position_min_max(mesh: &CpuMesh) -> (Option<gj::Value>, Option<gj::Value>) {
    let bounds = mesh
        .read_attribute::<3>(VertexAttributeSemantic::Position)
        .and_then(Aabb::from_points);
    match bounds {
        Some(b) => (
            Some(json_f32_array(b.min.as_slice())),
            Some(json_f32_array(b.max.as_slice())),
        ),
        None => (None, None),
    }
}

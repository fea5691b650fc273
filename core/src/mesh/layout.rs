//! Vertex layout definitions for meshes.
//!
//! A layout describes how vertex attributes are packed into one or more
//! vertex buffers (streams). Imported capture meshes use up to three streams:
//!
//! - **Geometry**: position, normal, tangent
//! - **Surface**: color and texture coordinate sets 0-7
//! - **Skinning**: blend weights and blend indices
//!
//! Empty groups do not consume a stream slot, so a position-plus-skinning
//! mesh has two streams.
//!
//! Layouts are shared via `Arc` since many meshes produced by the same import
//! settings end up with the same layout.
//!
//! # Example
//!
//! ```ignore
//! let layout = Arc::new(VertexLayout::new()
//!     .with_buffer(VertexBufferLayout::new(24))
//!     .with_buffer(VertexBufferLayout::new(8))
//!     .with_attribute(VertexAttribute::position(0))
//!     .with_attribute(VertexAttribute::normal(12))
//!     .with_attribute(VertexAttribute::new(
//!         VertexAttributeSemantic::TexCoord0,
//!         VertexAttributeFormat::Float2,
//!         0,
//!         1,
//!     )));
//! ```

/// Semantic meaning of a vertex attribute.
///
/// The declaration order is the canonical packing order inside a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VertexAttributeSemantic {
    /// Vertex position (float3).
    Position,
    /// Vertex normal (float3).
    Normal,
    /// Vertex tangent (float4, w = handedness).
    Tangent,
    /// Vertex color (float4).
    Color,
    /// Texture coordinates set 0 (float1-float4).
    TexCoord0,
    /// Texture coordinates set 1.
    TexCoord1,
    /// Texture coordinates set 2.
    TexCoord2,
    /// Texture coordinates set 3.
    TexCoord3,
    /// Texture coordinates set 4.
    TexCoord4,
    /// Texture coordinates set 5.
    TexCoord5,
    /// Texture coordinates set 6.
    TexCoord6,
    /// Texture coordinates set 7.
    TexCoord7,
    /// Bone weights for skinning (float4).
    BlendWeight,
    /// Bone indices for skinning (int4).
    BlendIndices,
}

impl VertexAttributeSemantic {
    /// Number of texture coordinate sets.
    pub const TEXCOORD_SETS: usize = 8;

    /// Get a unique index for this semantic (canonical packing order).
    pub fn index(&self) -> u32 {
        *self as u32
    }

    /// Texture coordinate semantic for set `set`, if `set` is in `0..8`.
    pub fn texcoord(set: usize) -> Option<Self> {
        const SETS: [VertexAttributeSemantic; VertexAttributeSemantic::TEXCOORD_SETS] = [
            VertexAttributeSemantic::TexCoord0,
            VertexAttributeSemantic::TexCoord1,
            VertexAttributeSemantic::TexCoord2,
            VertexAttributeSemantic::TexCoord3,
            VertexAttributeSemantic::TexCoord4,
            VertexAttributeSemantic::TexCoord5,
            VertexAttributeSemantic::TexCoord6,
            VertexAttributeSemantic::TexCoord7,
        ];
        SETS.get(set).copied()
    }

    /// Texture coordinate set of this semantic, if it is one.
    pub fn texcoord_set(&self) -> Option<usize> {
        let first = Self::TexCoord0.index();
        let index = self.index();
        (first..first + Self::TEXCOORD_SETS as u32)
            .contains(&index)
            .then(|| (index - first) as usize)
    }

    /// Number of components the attribute can hold at most.
    pub fn max_components(&self) -> usize {
        match self {
            Self::Position | Self::Normal => 3,
            _ => 4,
        }
    }
}

/// Format of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeFormat {
    /// Single 32-bit float.
    Float,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Four 32-bit signed integers.
    Int4,
}

impl VertexAttributeFormat {
    /// Get the size in bytes of this format.
    pub fn size(&self) -> usize {
        self.component_count() * 4
    }

    /// Number of 32-bit components.
    pub fn component_count(&self) -> usize {
        match self {
            Self::Float => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 | Self::Int4 => 4,
        }
    }

    /// Whether the components are 32-bit floats.
    pub fn is_float(&self) -> bool {
        !matches!(self, Self::Int4)
    }

    /// Float format with `components` components (1-4).
    pub fn float(components: usize) -> Option<Self> {
        match components {
            1 => Some(Self::Float),
            2 => Some(Self::Float2),
            3 => Some(Self::Float3),
            4 => Some(Self::Float4),
            _ => None,
        }
    }
}

/// Describes a single vertex buffer binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout {
    /// Stride in bytes between consecutive vertices.
    pub stride: u32,
}

impl VertexBufferLayout {
    /// Create a new vertex buffer layout with the given stride.
    pub fn new(stride: u32) -> Self {
        Self { stride }
    }
}

/// A single vertex attribute description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Semantic meaning of this attribute.
    pub semantic: VertexAttributeSemantic,
    /// Data format of this attribute.
    pub format: VertexAttributeFormat,
    /// Byte offset within the vertex buffer.
    pub offset: u32,
    /// Index of the vertex buffer this attribute reads from.
    pub buffer_index: u32,
}

impl VertexAttribute {
    /// Create a new vertex attribute.
    pub fn new(
        semantic: VertexAttributeSemantic,
        format: VertexAttributeFormat,
        offset: u32,
        buffer_index: u32,
    ) -> Self {
        Self {
            semantic,
            format,
            offset,
            buffer_index,
        }
    }

    /// Create a position attribute (float3) at buffer 0.
    pub fn position(offset: u32) -> Self {
        Self::new(
            VertexAttributeSemantic::Position,
            VertexAttributeFormat::Float3,
            offset,
            0,
        )
    }

    /// Create a normal attribute (float3) at buffer 0.
    pub fn normal(offset: u32) -> Self {
        Self::new(
            VertexAttributeSemantic::Normal,
            VertexAttributeFormat::Float3,
            offset,
            0,
        )
    }

    /// Create a tangent attribute (float4) at buffer 0.
    pub fn tangent(offset: u32) -> Self {
        Self::new(
            VertexAttributeSemantic::Tangent,
            VertexAttributeFormat::Float4,
            offset,
            0,
        )
    }

    /// Set the buffer index for this attribute.
    pub fn at_buffer(mut self, buffer_index: u32) -> Self {
        self.buffer_index = buffer_index;
        self
    }

    /// Byte range of this attribute for vertex `vertex` in a buffer of `stride`.
    pub fn byte_range(&self, stride: u32, vertex: usize) -> std::ops::Range<usize> {
        let start = vertex * stride as usize + self.offset as usize;
        start..start + self.format.size()
    }
}

/// Describes the layout of vertex data across one or more buffers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    /// Descriptions of each vertex buffer binding.
    pub buffers: Vec<VertexBufferLayout>,
    /// The vertex attributes, each referencing a buffer by index.
    pub attributes: Vec<VertexAttribute>,
    /// Optional label for debugging.
    pub label: Option<String>,
}

impl VertexLayout {
    /// Create a new empty vertex layout.
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            attributes: Vec::new(),
            label: None,
        }
    }

    /// Add a vertex buffer binding.
    pub fn with_buffer(mut self, buffer: VertexBufferLayout) -> Self {
        self.buffers.push(buffer);
        self
    }

    /// Add a vertex attribute.
    pub fn with_attribute(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the number of vertex buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Get the stride for a specific buffer.
    pub fn buffer_stride(&self, buffer_index: usize) -> u32 {
        self.buffers
            .get(buffer_index)
            .map(|b| b.stride)
            .unwrap_or(0)
    }

    /// Check if this layout has a specific semantic.
    pub fn has_semantic(&self, semantic: VertexAttributeSemantic) -> bool {
        self.attributes.iter().any(|attr| attr.semantic == semantic)
    }

    /// Get an attribute by semantic.
    pub fn get_attribute(&self, semantic: VertexAttributeSemantic) -> Option<&VertexAttribute> {
        self.attributes
            .iter()
            .find(|attr| attr.semantic == semantic)
    }

    /// Get all attributes for a specific buffer.
    pub fn attributes_for_buffer(
        &self,
        buffer_index: u32,
    ) -> impl Iterator<Item = &VertexAttribute> {
        self.attributes
            .iter()
            .filter(move |attr| attr.buffer_index == buffer_index)
    }

    /// Validate the layout.
    ///
    /// Every attribute must reference an existing buffer and fit inside that
    /// buffer's stride, and no semantic may appear twice.
    pub fn validate(&self) -> Result<(), String> {
        for (i, attr) in self.attributes.iter().enumerate() {
            let Some(buffer) = self.buffers.get(attr.buffer_index as usize) else {
                return Err(format!(
                    "Attribute {:?} references buffer {} but only {} buffers defined",
                    attr.semantic,
                    attr.buffer_index,
                    self.buffers.len()
                ));
            };
            if attr.offset as usize + attr.format.size() > buffer.stride as usize {
                return Err(format!(
                    "Attribute {:?} at offset {} overflows stride {} of buffer {}",
                    attr.semantic, attr.offset, buffer.stride, attr.buffer_index
                ));
            }
            if self.attributes[..i]
                .iter()
                .any(|other| other.semantic == attr.semantic)
            {
                return Err(format!("Attribute {:?} declared twice", attr.semantic));
            }
        }
        Ok(())
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::new()
    }
}

//! Error types for glTF export.

/// Errors that can occur during glTF export.
#[derive(Debug)]
pub enum GltfError {
    /// The mesh has no float3 position attribute.
    MissingPositions {
        /// Label of the offending mesh, if any.
        mesh: Option<String>,
    },
    /// The mesh has no index buffer.
    MissingIndices {
        /// Label of the offending mesh, if any.
        mesh: Option<String>,
    },
    /// A submesh range lies outside the index buffer.
    SubMeshOutOfRange {
        /// Submesh position in the mesh.
        submesh: usize,
        /// One past the last index of the range.
        end: u32,
        /// Number of indices in the buffer.
        index_count: u32,
    },
    /// Error while serializing the document.
    ExportError(String),
}

impl std::fmt::Display for GltfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPositions { mesh } => {
                write!(f, "mesh {mesh:?} has no float3 POSITION attribute")
            }
            Self::MissingIndices { mesh } => write!(f, "mesh {mesh:?} has no index buffer"),
            Self::SubMeshOutOfRange {
                submesh,
                end,
                index_count,
            } => write!(
                f,
                "submesh {submesh} ends at index {end} but the buffer holds {index_count}"
            ),
            Self::ExportError(msg) => write!(f, "export error: {msg}"),
        }
    }
}

impl std::error::Error for GltfError {}

//! # RedLilium Capture
//!
//! Imports GPU capture exports (vertex tables written by frame debuggers such
//! as RenderDoc's mesh viewer) into RedLilium meshes.
//!
//! A vertex table has one row per index slot and one column per attribute
//! component:
//!
//! ```text
//! VTX, IDX, POSITION.x, POSITION.y, POSITION.z, TEXCOORD0.x, TEXCOORD0.y
//! 0,   0,   0.0,        0.0,        0.0,        0.0,         0.0
//! 1,   1,   1.0,        0.0,        0.0,        1.0,         0.0
//! ```
//!
//! `VTX` identifies the vertex and `IDX` its place in the index buffer.
//! Several tables with the same header merge into one mesh with one submesh
//! per table.
//!
//! # Modules
//!
//! - [`csv`] - Row splitting and numeric parsing
//! - [`header`] - Header interpretation and attribute speculation
//! - [`plan`] - Column plans
//! - [`scan`] - Id bounds scan
//! - [`merge`] - Multi-table merge planning
//! - [`builder`] - Packed vertex and index buffers
//! - [`generator`] - Import entry points and mesh sinks
//! - [`settings`] / [`preset`] - Import settings and saved mappings
//! - [`cbuffer`] - Constant-buffer tables
//!
//! # Example
//!
//! ```ignore
//! use redlilium_capture::{import_mesh_files, ImportSettings};
//!
//! let report = import_mesh_files(
//!     &["draw_12.csv", "draw_13.csv"],
//!     Path::new("out/character.glb"),
//!     &ImportSettings::default(),
//! )?;
//! println!("{} vertices, {} diagnostics", report.vertex_count, report.diagnostics.len());
//! ```

pub mod builder;
pub mod cbuffer;
pub mod csv;
pub mod diagnostics;
mod error;
pub mod generator;
pub mod header;
pub mod merge;
pub mod plan;
pub mod preset;
pub mod scan;
pub mod settings;
pub mod source;
pub mod transform;

pub use builder::{IndexStorage, IndexWrite, PackedMeshBuilder};
pub use cbuffer::{parse_constant_buffer, read_constant_buffer, ConstantBuffer};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{ImportError, SettingsError};
pub use generator::{
    build_mesh, generate_mesh, import_mesh_files, read_header_row, FinishSteps, GlbFileSink,
    ImportReport, ImportedMesh, MemorySink, MeshSink,
};
pub use header::{interpret_header, summarize_header, HeaderAttribute};
pub use merge::{verify_headers, MeshAssemblyPlan, SlotCoverage, SubmeshDescriptor};
pub use plan::{ComponentIndexError, ComponentSlots, TableIndexPlan};
pub use preset::{MappingPreset, PresetLibrary};
pub use scan::SubmeshBounds;
pub use settings::{AttributeMapping, CalcMode, ImportSettings};
pub use source::{FileTable, MemoryTable, TableSource};
pub use transform::{ComponentTransform, Manipulation, Swizzle, TransformPreset};

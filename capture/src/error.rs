//! Error types for capture imports.

use std::path::PathBuf;

use thiserror::Error;

use redlilium_core::gltf::GltfError;

/// Structural failures that abort an import.
///
/// When any of these is returned no buffers survive the call and nothing is
/// committed to the destination.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No source tables given")]
    NoTables,

    #[error("Source table not found: {0}")]
    MissingFile(PathBuf),

    #[error("Failed to read table {table}: {source}")]
    Io {
        table: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid header in table {table}: {reason}")]
    InvalidTableHeader { table: String, reason: String },

    #[error("Header of table {index} ({table}) differs from the first table")]
    HeaderMismatch { index: usize, table: String },

    #[error("Degenerate mesh: {index_count} indices, at least 3 required")]
    DegenerateMesh { index_count: usize },

    #[error(
        "Incomplete vertex data: {written} of {expected} vertices written, first missing vertex {first_missing}"
    )]
    IncompleteVertexData {
        expected: usize,
        written: usize,
        first_missing: usize,
    },

    #[error(
        "Incomplete index data: {written} of {expected} indices written, first missing slot {first_missing}"
    )]
    IncompleteIndexData {
        expected: usize,
        written: usize,
        first_missing: usize,
    },

    #[error("Failed to export mesh: {0}")]
    Export(#[from] GltfError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while loading or storing settings and mapping presets.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Ron {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("Failed to serialize preset {name}: {source}")]
    RonWrite {
        name: String,
        #[source]
        source: ron::Error,
    },

    #[error("Invalid preset name {0:?}")]
    InvalidPresetName(String),
}

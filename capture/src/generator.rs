//! Import entry points.
//!
//! An import runs in two passes over its tables. The first pass checks the
//! headers and scans id bounds so that every buffer can be allocated at its
//! final size. The second pass re-opens each table and feeds its rows, in
//! table order, into a [`PackedMeshBuilder`]. The finished mesh then goes
//! through the requested geometry passes and is committed to a [`MeshSink`].
//!
//! Any [`ImportError`] aborts the whole import and nothing is committed.

use std::path::{Path, PathBuf};

use redlilium_core::gltf::save_mesh_glb;
use redlilium_core::mesh::geometry::{
    compress, optimize_vertex_order, recalculate_normals, recalculate_tangents,
};
use redlilium_core::mesh::{CpuMesh, IndexFormat, MeshCompression, VertexAttributeSemantic};

use crate::builder::PackedMeshBuilder;
use crate::csv;
use crate::diagnostics::Diagnostics;
use crate::error::ImportError;
use crate::header::interpret_header;
use crate::merge::{read_table_header, verify_headers, MeshAssemblyPlan, SlotCoverage};
use crate::scan::scan_bounds;
use crate::settings::ImportSettings;
use crate::source::{for_each_row, read_header, FileTable, TableSource};

/// A mesh built from tables, before it is committed anywhere.
#[derive(Debug)]
pub struct ImportedMesh {
    pub mesh: CpuMesh,
    pub diagnostics: Diagnostics,
    /// Whether hosts should keep the CPU copy readable.
    pub read_write: bool,
}

/// Summary of a committed import.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub vertex_count: u32,
    pub index_count: u32,
    pub submesh_count: usize,
    pub index_format: Option<IndexFormat>,
    pub diagnostics: Diagnostics,
}

impl ImportReport {
    fn new(imported: ImportedMesh) -> Self {
        let mesh = &imported.mesh;
        Self {
            vertex_count: mesh.vertex_count(),
            index_count: mesh.index_count(),
            submesh_count: mesh.submeshes().len(),
            index_format: mesh.index_format(),
            diagnostics: imported.diagnostics,
        }
    }
}

/// Destination of a finished import.
pub trait MeshSink {
    fn commit(&mut self, imported: &ImportedMesh) -> Result<(), ImportError>;
}

/// Writes the mesh as a binary glTF file.
///
/// The file is written next to its destination first and renamed into place,
/// so a failed import never leaves a partial file behind.
#[derive(Debug, Clone)]
pub struct GlbFileSink {
    path: PathBuf,
}

impl GlbFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MeshSink for GlbFileSink {
    fn commit(&mut self, imported: &ImportedMesh) -> Result<(), ImportError> {
        let glb = save_mesh_glb(&imported.mesh)?;

        let write_error = |source| ImportError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        if let Err(source) = std::fs::write(&temp, &glb) {
            let _ = std::fs::remove_file(&temp);
            return Err(write_error(source));
        }
        if let Err(source) = std::fs::rename(&temp, &self.path) {
            let _ = std::fs::remove_file(&temp);
            return Err(write_error(source));
        }
        log::info!("Wrote {} ({} bytes)", self.path.display(), glb.len());
        Ok(())
    }
}

/// Keeps the committed mesh in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub mesh: Option<CpuMesh>,
}

impl MeshSink for MemorySink {
    fn commit(&mut self, imported: &ImportedMesh) -> Result<(), ImportError> {
        self.mesh = Some(imported.mesh.clone());
        Ok(())
    }
}

/// Geometry passes run after the buffers are committed to a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishSteps {
    pub normals: bool,
    pub tangents: bool,
    pub optimize: bool,
    pub compression: MeshCompression,
}

impl FinishSteps {
    /// Decide the passes for a freshly built mesh.
    pub fn decide(settings: &ImportSettings, mesh: &CpuMesh) -> Self {
        let layout = mesh.layout();
        Self {
            normals: settings
                .normals
                .should_compute(layout.has_semantic(VertexAttributeSemantic::Normal)),
            tangents: settings
                .tangents
                .should_compute(layout.has_semantic(VertexAttributeSemantic::Tangent)),
            optimize: settings.optimize,
            compression: settings.compression,
        }
    }

    /// Run the passes in order: normals, tangents, optimization, compression.
    pub fn apply(&self, mesh: &mut CpuMesh) {
        if self.normals && !recalculate_normals(mesh) {
            log::warn!("Normal recalculation skipped");
        }
        if self.tangents && !recalculate_tangents(mesh) {
            log::warn!("Tangent recalculation skipped");
        }
        if self.optimize {
            optimize_vertex_order(mesh);
        }
        compress(mesh, self.compression);
    }
}

fn mesh_label<S: TableSource>(table: &S) -> String {
    let name = table.name();
    Path::new(&name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .unwrap_or(name)
}

/// Build a mesh from tables without committing it.
///
/// Table `n` becomes submesh `n`. All tables must share the header of the
/// first one.
pub fn build_mesh<S: TableSource>(
    tables: &[S],
    settings: &ImportSettings,
) -> Result<ImportedMesh, ImportError> {
    let Some(first) = tables.first() else {
        return Err(ImportError::NoTables);
    };
    if let Some(missing) = tables.iter().find(|t| !t.exists()) {
        return Err(ImportError::MissingFile(PathBuf::from(missing.name())));
    }

    let header = verify_headers(tables)?;
    let mut diagnostics = Diagnostics::new();
    let plan = interpret_header(&header, settings, &mut diagnostics);
    plan.validate()
        .map_err(|missing| ImportError::InvalidTableHeader {
            table: first.name(),
            reason: format!("missing {}", missing.join(", ")),
        })?;
    let (Some(vertex_id_column), Some(index_id_column)) =
        (plan.vertex_id_column, plan.index_id_column)
    else {
        return Err(ImportError::InvalidTableHeader {
            table: first.name(),
            reason: "missing id columns".into(),
        });
    };

    let mut bounds = Vec::with_capacity(tables.len());
    for table in tables {
        let io_error = |source| ImportError::Io {
            table: table.name(),
            source,
        };
        let mut reader = table.open().map_err(io_error)?;
        read_header(&mut reader).map_err(io_error)?;
        let table_bounds =
            scan_bounds(&mut reader, vertex_id_column, index_id_column).map_err(io_error)?;
        log::debug!("{}: {:?}", table.name(), table_bounds);
        bounds.push(table_bounds);
    }

    let assembly = MeshAssemblyPlan::new(&bounds)?;
    log::debug!(
        "Merge plan: base vertex {}, {} vertices, {} indices",
        assembly.base_vertex_id,
        assembly.vertex_count,
        assembly.index_count
    );
    let rows: usize = bounds.iter().map(|b| b.rows).sum();
    if !assembly.can_complete(rows) {
        log::debug!("{rows} usable rows cannot fill the merge plan");
        check_coverage(tables, &assembly, vertex_id_column, index_id_column)?;
    }
    let mut builder = PackedMeshBuilder::new(&first.name(), &plan, assembly)?;

    for (index, table) in tables.iter().enumerate() {
        let io_error = |source| ImportError::Io {
            table: table.name(),
            source,
        };
        let mut reader = table.open().map_err(io_error)?;
        read_header(&mut reader).map_err(io_error)?;
        let mut dropped = 0usize;
        let rows = for_each_row(&mut reader, |row| {
            if !builder.ingest_row(index, row, &mut diagnostics) {
                dropped += 1;
            }
        })
        .map_err(io_error)?;
        if dropped > 0 {
            log::debug!("{}: dropped {dropped} of {rows} rows", table.name());
        }
    }

    let mut mesh = builder
        .finish(settings.flip_winding)?
        .with_label(mesh_label(first));
    FinishSteps::decide(settings, &mesh).apply(&mut mesh);

    log::info!(
        "Imported {} table(s): {} vertices, {} indices, {} diagnostic(s)",
        tables.len(),
        mesh.vertex_count(),
        mesh.index_count(),
        diagnostics.len()
    );

    Ok(ImportedMesh {
        mesh,
        diagnostics,
        read_write: settings.read_write,
    })
}

/// Report the completeness error of a plan too large for its rows without
/// allocating its buffers.
fn check_coverage<S: TableSource>(
    tables: &[S],
    assembly: &MeshAssemblyPlan,
    vertex_id_column: usize,
    index_id_column: usize,
) -> Result<(), ImportError> {
    let mut coverage = SlotCoverage::new();
    for (index, table) in tables.iter().enumerate() {
        let io_error = |source| ImportError::Io {
            table: table.name(),
            source,
        };
        let mut reader = table.open().map_err(io_error)?;
        read_header(&mut reader).map_err(io_error)?;
        for_each_row(&mut reader, |row| {
            let vertex = csv::parse_id(csv::field_at(row, vertex_id_column));
            let slot = csv::parse_id(csv::field_at(row, index_id_column));
            if let (Some(vertex), Some(slot)) = (vertex, slot) {
                coverage.include(assembly, index, vertex, slot);
            }
        })
        .map_err(io_error)?;
    }
    coverage.incomplete(assembly).map_or(Ok(()), Err)
}

/// Build a mesh from tables and commit it to `sink`.
pub fn generate_mesh<S: TableSource>(
    tables: &[S],
    sink: &mut dyn MeshSink,
    settings: &ImportSettings,
) -> Result<ImportReport, ImportError> {
    let imported = build_mesh(tables, settings)?;
    sink.commit(&imported)?;
    Ok(ImportReport::new(imported))
}

/// Import CSV files into a `.glb` file.
pub fn import_mesh_files<P: AsRef<Path>>(
    paths: &[P],
    destination: &Path,
    settings: &ImportSettings,
) -> Result<ImportReport, ImportError> {
    let tables: Vec<FileTable> = paths.iter().map(|p| FileTable::new(p.as_ref())).collect();
    let mut sink = GlbFileSink::new(destination);
    generate_mesh(&tables, &mut sink, settings)
}

/// Read the header row of a single table.
pub fn read_header_row<S: TableSource>(table: &S) -> Result<String, ImportError> {
    if !table.exists() {
        return Err(ImportError::MissingFile(PathBuf::from(table.name())));
    }
    read_table_header(table)
}

//! Command line arguments for `capture-import`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use redlilium_capture::{CalcMode, ImportSettings};
use redlilium_core::mesh::MeshCompression;

/// Directory searched for mapping presets when `--preset-dir` is not given.
pub const DEFAULT_PRESET_DIR: &str = "capture_presets";

#[derive(Debug, Parser)]
#[command(name = "capture-import")]
#[command(about = "Import GPU capture CSV exports into meshes")]
#[command(
    long_about = "Import vertex tables exported by frame debuggers (RenderDoc mesh viewer \
                  CSV) into binary glTF meshes.\n\n\
                  Every table becomes one submesh. All tables must share the same header."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a mesh from one or more vertex tables.
    Mesh(MeshArgs),
    /// Show the attributes found in a table header.
    Header(HeaderArgs),
    /// Read a constant-buffer table.
    Cbuffer(CbufferArgs),
    /// List or delete saved mapping presets.
    Presets(PresetArgs),
}

#[derive(Debug, Args)]
pub struct MeshArgs {
    /// Vertex tables, one submesh each, in order.
    #[arg(required = true, value_name = "CSV")]
    pub inputs: Vec<PathBuf>,

    /// Destination `.glb` file.
    #[arg(short, long, value_name = "GLB")]
    pub output: PathBuf,

    /// Settings file (TOML). Command line flags override it.
    #[arg(long, value_name = "TOML")]
    pub settings: Option<PathBuf>,

    /// Mapping preset appended to the settings mappings.
    #[arg(long)]
    pub preset: Option<String>,

    #[arg(long, value_name = "DIR", default_value = DEFAULT_PRESET_DIR)]
    pub preset_dir: PathBuf,

    /// Swap the first and third index of every triangle.
    #[arg(long)]
    pub flip_winding: bool,

    #[arg(long, value_enum)]
    pub normals: Option<CliCalcMode>,

    #[arg(long, value_enum)]
    pub tangents: Option<CliCalcMode>,

    /// Keep the vertex order of the tables.
    #[arg(long)]
    pub no_optimize: bool,

    #[arg(long, value_enum)]
    pub compression: Option<CliCompression>,

    /// Keep the mesh CPU-readable after import (`true` or `false`).
    #[arg(long, value_name = "BOOL")]
    pub read_write: Option<bool>,
}

impl MeshArgs {
    /// Apply the command line overrides on top of loaded settings.
    pub fn apply_overrides(&self, settings: &mut ImportSettings) {
        if self.flip_winding {
            settings.flip_winding = true;
        }
        if let Some(mode) = self.normals {
            settings.normals = mode.into();
        }
        if let Some(mode) = self.tangents {
            settings.tangents = mode.into();
        }
        if self.no_optimize {
            settings.optimize = false;
        }
        if let Some(compression) = self.compression {
            settings.compression = compression.into();
        }
        if let Some(read_write) = self.read_write {
            settings.read_write = read_write;
        }
    }
}

#[derive(Debug, Args)]
pub struct HeaderArgs {
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Save the speculated mappings as a preset with this name.
    #[arg(long, value_name = "NAME")]
    pub save_preset: Option<String>,

    #[arg(long, value_name = "DIR", default_value = DEFAULT_PRESET_DIR)]
    pub preset_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct CbufferArgs {
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Write the packed registers to this file instead of printing them.
    #[arg(short, long, value_name = "BIN")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PresetArgs {
    #[arg(long, value_name = "DIR", default_value = DEFAULT_PRESET_DIR)]
    pub preset_dir: PathBuf,

    /// Delete the named preset.
    #[arg(long, value_name = "NAME")]
    pub delete: Option<String>,
}

// ============================================================================
// CLI value enums
// ============================================================================

/// When to compute normals or tangents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliCalcMode {
    /// Keep what the tables provide.
    #[default]
    Never,
    /// Compute only when the tables have none.
    #[value(name = "if-absent")]
    IfAbsent,
    /// Always recompute.
    Always,
}

impl From<CliCalcMode> for CalcMode {
    fn from(cli: CliCalcMode) -> Self {
        match cli {
            CliCalcMode::Never => CalcMode::Never,
            CliCalcMode::IfAbsent => CalcMode::IfAbsent,
            CliCalcMode::Always => CalcMode::Always,
        }
    }
}

/// Precision of float vertex attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliCompression {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

impl From<CliCompression> for MeshCompression {
    fn from(cli: CliCompression) -> Self {
        match cli {
            CliCompression::Off => MeshCompression::Off,
            CliCompression::Low => MeshCompression::Low,
            CliCompression::Medium => MeshCompression::Medium,
            CliCompression::High => MeshCompression::High,
        }
    }
}

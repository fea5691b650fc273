//! `capture-import`: turn GPU capture CSV exports into meshes.
//!
//! ```bash
//! # Two draw calls merged into one mesh with two submeshes
//! capture-import mesh draw_12.csv draw_13.csv -o character.glb --normals if-absent
//!
//! # Inspect a header and keep the guessed mapping for later imports
//! capture-import header draw_12.csv --save-preset renderdoc_dx11
//! capture-import mesh draw_12.csv -o character.glb --preset renderdoc_dx11
//! ```

mod args;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use redlilium_capture::{
    import_mesh_files, interpret_header, read_constant_buffer, read_header_row, summarize_header,
    AttributeMapping, Diagnostics, FileTable, ImportError, ImportSettings, MappingPreset,
    PresetLibrary, SettingsError,
};

use args::{CbufferArgs, Cli, Command, HeaderArgs, MeshArgs, PresetArgs};

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Mesh(args) => run_mesh(&args),
        Command::Header(args) => run_header(&args),
        Command::Cbuffer(args) => run_cbuffer(&args),
        Command::Presets(args) => run_presets(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn load_settings(args: &MeshArgs) -> Result<ImportSettings, CliError> {
    let mut settings = match &args.settings {
        Some(path) => ImportSettings::load(path)?,
        None => ImportSettings::default(),
    };
    if let Some(name) = &args.preset {
        let preset = PresetLibrary::new(&args.preset_dir).load(name)?;
        log::info!("Using preset {name} ({} mappings)", preset.mappings.len());
        settings.mappings.extend(preset.mappings);
    }
    args.apply_overrides(&mut settings);
    Ok(settings)
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        println!("  warning: {diagnostic}");
    }
}

fn run_mesh(args: &MeshArgs) -> Result<(), CliError> {
    let settings = load_settings(args)?;
    let report = import_mesh_files(&args.inputs, &args.output, &settings)?;

    println!("Wrote {}", args.output.display());
    println!(
        "  {} vertices, {} indices ({:?}), {} submesh(es)",
        report.vertex_count,
        report.index_count,
        report.index_format,
        report.submesh_count
    );
    print_diagnostics(&report.diagnostics);
    Ok(())
}

fn run_header(args: &HeaderArgs) -> Result<(), CliError> {
    let header = read_header_row(&FileTable::new(&args.input))?;
    let attributes = summarize_header(&header);
    let mappings: Vec<AttributeMapping> =
        attributes.iter().map(AttributeMapping::speculated).collect();

    println!("{}", args.input.display());
    for (attribute, mapping) in attributes.iter().zip(&mappings) {
        let target = if mapping.enabled {
            format!("{:?}", mapping.attribute)
        } else {
            "-".to_string()
        };
        println!(
            "  {:<24} {} component(s)  -> {target}",
            attribute.name, attribute.components
        );
    }

    let mut diagnostics = Diagnostics::new();
    let plan = interpret_header(&header, &ImportSettings::default(), &mut diagnostics);
    match plan.validate() {
        Ok(()) => println!("Importable with default settings"),
        Err(missing) => println!("Not importable, missing {}", missing.join(", ")),
    }
    print_diagnostics(&diagnostics);

    if let Some(name) = &args.save_preset {
        PresetLibrary::new(&args.preset_dir).save(name, &MappingPreset { mappings })?;
        println!("Saved preset {name}");
    }
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, bytes).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn run_cbuffer(args: &CbufferArgs) -> Result<(), CliError> {
    let mut diagnostics = Diagnostics::new();
    let buffer = read_constant_buffer(&FileTable::new(&args.input), &mut diagnostics)?;

    match &args.output {
        Some(path) => {
            write_bytes(path, buffer.as_bytes())?;
            println!(
                "Wrote {} register(s) ({} bytes) to {}",
                buffer.len(),
                buffer.as_bytes().len(),
                path.display()
            );
        }
        None => {
            for (name, value) in buffer.names.iter().zip(&buffer.values) {
                println!(
                    "  {:<24} {} {} {} {}",
                    name, value[0], value[1], value[2], value[3]
                );
            }
        }
    }
    print_diagnostics(&diagnostics);
    Ok(())
}

fn run_presets(args: &PresetArgs) -> Result<(), CliError> {
    let library = PresetLibrary::new(&args.preset_dir);
    if let Some(name) = &args.delete {
        library.delete(name)?;
        println!("Deleted preset {name}");
        return Ok(());
    }

    let names = library.list()?;
    if names.is_empty() {
        println!("No presets in {}", library.dir().display());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

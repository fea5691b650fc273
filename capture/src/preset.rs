//! Saved attribute mappings.
//!
//! A preset library is a directory of `<name>.ron` files, each holding one
//! [`MappingPreset`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::settings::AttributeMapping;

const PRESET_EXTENSION: &str = "ron";

/// A reusable list of header mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingPreset {
    #[serde(default)]
    pub mappings: Vec<AttributeMapping>,
}

/// Directory of mapping presets.
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    dir: PathBuf,
}

impl PresetLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, SettingsError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(|c: char| c == '/' || c == '\\')
            && !name.starts_with('.');
        if !valid {
            return Err(SettingsError::InvalidPresetName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.{PRESET_EXTENSION}")))
    }

    /// Sorted names of the presets in the library.
    ///
    /// A missing directory is an empty library.
    pub fn list(&self) -> Result<Vec<String>, SettingsError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().is_some_and(|ext| ext == PRESET_EXTENSION)
            })
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn load(&self, name: &str) -> Result<MappingPreset, SettingsError> {
        let path = self.path_of(name)?;
        let text = std::fs::read_to_string(&path).map_err(|source| SettingsError::Io {
            path: path.clone(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| SettingsError::Ron { path, source })
    }

    /// Write a preset, creating the library directory if needed.
    pub fn save(&self, name: &str, preset: &MappingPreset) -> Result<(), SettingsError> {
        let path = self.path_of(name)?;
        let text = ron::ser::to_string_pretty(preset, ron::ser::PrettyConfig::default()).map_err(
            |source| SettingsError::RonWrite {
                name: name.to_string(),
                source,
            },
        )?;
        let io_error = |source| SettingsError::Io {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_error)?;
        std::fs::write(&path, text).map_err(io_error)?;
        log::info!("Saved mapping preset {name} to {}", path.display());
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<(), SettingsError> {
        let path = self.path_of(name)?;
        std::fs::remove_file(&path).map_err(|source| SettingsError::Io { path, source })?;
        log::info!("Deleted mapping preset {name}");
        Ok(())
    }
}

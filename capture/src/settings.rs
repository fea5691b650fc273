//! Import settings.
//!
//! Settings are an immutable value built before an import and passed by
//! reference through the whole pipeline. They load from TOML:
//!
//! ```toml
//! flip_winding = true
//! normals = "if_absent"
//! compression = "low"
//!
//! [[mappings]]
//! name = "in_POSITION0"
//! attribute = "position"
//!
//! [[mappings]]
//! name = "SV_Position"
//! enabled = false
//! ```

use std::path::Path;

use redlilium_core::mesh::{MeshCompression, VertexAttributeSemantic};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::header::{speculate_attribute, HeaderAttribute};
use crate::transform::ComponentTransform;

/// When a derived attribute is (re)computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalcMode {
    /// Keep whatever the tables provide.
    #[default]
    Never,
    /// Compute only when the tables provide no complete attribute.
    IfAbsent,
    /// Always replace.
    Always,
}

impl CalcMode {
    /// Whether to compute given that the mesh already `has` the attribute.
    pub fn should_compute(&self, has: bool) -> bool {
        match self {
            Self::Never => false,
            Self::IfAbsent => !has,
            Self::Always => true,
        }
    }
}

/// Override for one header base name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMapping {
    /// Header base name, without the component suffix.
    pub name: String,
    /// Disabled mappings drop the column.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_attribute")]
    pub attribute: VertexAttributeSemantic,
    /// Per-component transforms. Present means the attribute is modified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<[ComponentTransform; 4]>,
}

fn default_enabled() -> bool {
    true
}

fn default_attribute() -> VertexAttributeSemantic {
    VertexAttributeSemantic::Position
}

impl AttributeMapping {
    pub fn new(name: impl Into<String>, attribute: VertexAttributeSemantic) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            attribute,
            transform: None,
        }
    }

    /// Mapping that drops the column.
    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(name, default_attribute())
        }
    }

    pub fn with_transform(mut self, transform: [ComponentTransform; 4]) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Mapping prefilled from a header summary entry.
    ///
    /// Names that speculation cannot resolve come back disabled.
    pub fn speculated(attribute: &HeaderAttribute) -> Self {
        match speculate_attribute(&attribute.name) {
            Some(semantic) => Self::new(attribute.name.clone(), semantic),
            None => Self::disabled(attribute.name.clone()),
        }
    }
}

/// Everything that controls one import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Swap the first and third index of every triangle.
    pub flip_winding: bool,
    pub normals: CalcMode,
    pub tangents: CalcMode,
    /// Renumber vertices in index order.
    pub optimize: bool,
    /// Keep the CPU copy readable after upload. Carried as mesh metadata only.
    pub read_write: bool,
    pub compression: MeshCompression,
    /// Header overrides. For duplicate names the later entry wins.
    pub mappings: Vec<AttributeMapping>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            flip_winding: false,
            normals: CalcMode::Never,
            tangents: CalcMode::Never,
            optimize: true,
            read_write: true,
            compression: MeshCompression::Off,
            mappings: Vec::new(),
        }
    }
}

impl ImportSettings {
    /// Parse settings from TOML text. `path` only labels errors.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, SettingsError> {
        toml::from_str(text).map_err(|source| SettingsError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml(&text, path)?;
        log::info!(
            "Loaded import settings from {} ({} mappings)",
            path.display(),
            settings.mappings.len()
        );
        Ok(settings)
    }

    /// Look up the effective mapping for a header base name.
    pub fn mapping(&self, name: &str) -> Option<&AttributeMapping> {
        self.mappings.iter().rev().find(|m| m.name == name)
    }
}

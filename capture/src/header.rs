//! Header interpretation.
//!
//! A header field is `<BASE>` or `<BASE>.<x|y|z|w>`. The reserved bases `VTX`
//! and `IDX` locate the vertex id and index id columns. Every other base is
//! resolved to a vertex attribute through the settings' mappings, falling
//! back to prefix speculation on the engine's usual semantic names.

use redlilium_core::mesh::VertexAttributeSemantic;

use crate::csv;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::plan::TableIndexPlan;
use crate::settings::ImportSettings;
use crate::transform::ComponentTransform;

/// Base name of the vertex id column.
pub const VERTEX_ID_COLUMN: &str = "VTX";

/// Base name of the index id column.
pub const INDEX_ID_COLUMN: &str = "IDX";

const COMPONENT_SEPARATOR: char = '.';

const TEXCOORD_PREFIX: &str = "TEXCOORD";

/// Prefix speculation table, checked in order.
///
/// `None` marks the texture coordinate prefix, which also needs a set number.
const SPECULATION: [(&str, Option<VertexAttributeSemantic>); 7] = [
    ("POSITION", Some(VertexAttributeSemantic::Position)),
    ("NORMAL", Some(VertexAttributeSemantic::Normal)),
    ("TANGENT", Some(VertexAttributeSemantic::Tangent)),
    ("COLOR", Some(VertexAttributeSemantic::Color)),
    (TEXCOORD_PREFIX, None),
    ("BLENDINDICES", Some(VertexAttributeSemantic::BlendIndices)),
    ("BLENDWEIGHT", Some(VertexAttributeSemantic::BlendWeight)),
];

/// Split a trimmed header field into base name and component suffix.
pub fn split_field(field: &str) -> (&str, Option<&str>) {
    let field = field.trim();
    match field.split_once(COMPONENT_SEPARATOR) {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (field, None),
    }
}

/// Component slot of a suffix: exactly `x`, `y`, `z` or `w`.
pub fn parse_component(suffix: &str) -> Option<usize> {
    match suffix {
        "x" => Some(0),
        "y" => Some(1),
        "z" => Some(2),
        "w" => Some(3),
        _ => None,
    }
}

/// Guess the attribute of a base name from its prefix (case-sensitive).
pub fn speculate_attribute(name: &str) -> Option<VertexAttributeSemantic> {
    let (prefix, semantic) = SPECULATION
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))?;
    match semantic {
        Some(semantic) => Some(*semantic),
        None => {
            let rest = &name[prefix.len()..];
            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            rest[..digits]
                .parse::<usize>()
                .ok()
                .and_then(VertexAttributeSemantic::texcoord)
        }
    }
}

/// What one header column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    VertexId,
    IndexId,
    Attribute {
        semantic: VertexAttributeSemantic,
        component: usize,
        transform: Option<ComponentTransform>,
    },
    /// Dropped by a disabled mapping.
    Disabled,
    /// Attribute resolved but the component suffix is unusable.
    BadComponent,
    /// Base name matched nothing.
    Unrecognized,
}

/// Classify one header field.
pub fn classify_field(field: &str, settings: &ImportSettings) -> ColumnRole {
    // Id columns match the whole field, never a base name with a suffix.
    match field.trim() {
        INDEX_ID_COLUMN => return ColumnRole::IndexId,
        VERTEX_ID_COLUMN => return ColumnRole::VertexId,
        _ => {}
    }
    let (base, suffix) = split_field(field);

    let (semantic, transforms) = match settings.mapping(base) {
        Some(mapping) if !mapping.enabled => return ColumnRole::Disabled,
        Some(mapping) => (mapping.attribute, mapping.transform),
        None => match speculate_attribute(base) {
            Some(semantic) => (semantic, None),
            None => return ColumnRole::Unrecognized,
        },
    };

    match suffix.and_then(parse_component) {
        Some(component) if component < semantic.max_components() => ColumnRole::Attribute {
            semantic,
            component,
            transform: transforms.map(|t| t[component]),
        },
        _ => ColumnRole::BadComponent,
    }
}

/// Build the column plan for a header row.
///
/// Unrecognized base names are reported as diagnostics. The plan is not
/// validated here.
pub fn interpret_header(
    header: &str,
    settings: &ImportSettings,
    diagnostics: &mut Diagnostics,
) -> TableIndexPlan {
    let mut plan = TableIndexPlan::default();

    for (column, field) in csv::split_row(csv::trim_line_end(header))
        .into_iter()
        .enumerate()
    {
        match classify_field(field, settings) {
            ColumnRole::IndexId => plan.index_id_column = Some(column),
            ColumnRole::VertexId => plan.vertex_id_column = Some(column),
            ColumnRole::Attribute {
                semantic,
                component,
                transform,
            } => match plan.assign(semantic, component, column, transform) {
                Ok(Some(previous)) => log::debug!(
                    "Column {column} ({}) replaces column {previous} for {semantic:?}[{component}]",
                    field.trim()
                ),
                Ok(None) => {}
                Err(e) => log::warn!("Column {column} ({}) ignored: {e}", field.trim()),
            },
            ColumnRole::Disabled => {
                log::debug!("Column {column} ({}) disabled by mapping", field.trim())
            }
            ColumnRole::BadComponent => log::warn!(
                "Column {column} ({}) has no usable component suffix, ignored",
                field.trim()
            ),
            ColumnRole::Unrecognized => diagnostics.push(Diagnostic::UnrecognizedAttributeName {
                column,
                name: split_field(field).0.to_string(),
            }),
        }
    }

    plan
}

/// One attribute base name found in a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderAttribute {
    pub name: String,
    /// Number of header fields sharing the base name.
    pub components: usize,
}

/// List the attribute base names of a header in first-appearance order.
///
/// The id columns are left out.
pub fn summarize_header(header: &str) -> Vec<HeaderAttribute> {
    let mut attributes: Vec<HeaderAttribute> = Vec::new();
    for field in csv::split_row(csv::trim_line_end(header)) {
        if matches!(field.trim(), INDEX_ID_COLUMN | VERTEX_ID_COLUMN) {
            continue;
        }
        let (base, _) = split_field(field);
        match attributes.iter_mut().find(|a| a.name == base) {
            Some(attribute) => attribute.components += 1,
            None => attributes.push(HeaderAttribute {
                name: base.to_string(),
                components: 1,
            }),
        }
    }
    attributes
}

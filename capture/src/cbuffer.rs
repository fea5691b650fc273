//! Constant-buffer tables.
//!
//! A capture tool exports a bound constant buffer as one row per variable,
//! with the variable's components packed into a single quoted `Value` field:
//!
//! ```text
//! Name,Value,Byte Offset,Type
//! _Color,"1, 0.5, 0.25, 1",0,float4
//! _Scale,"2",16,float
//! ```
//!
//! Each row becomes one `float4` register.

use std::io::BufRead;

use crate::csv;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ImportError;
use crate::source::TableSource;

const NAME_COLUMN: &str = "Name";
const VALUE_COLUMN: &str = "Value";
const TYPE_COLUMN: &str = "Type";
const BYTE_OFFSET_COLUMN: &str = "Byte Offset";

/// Decoded constant buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantBuffer {
    /// Variable name per register. Empty when the table has no `Name` column.
    pub names: Vec<String>,
    pub values: Vec<[f32; 4]>,
}

impl ConstantBuffer {
    /// Packed `float4` registers.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Default)]
struct CbufferColumns {
    name: Option<usize>,
    value: Option<usize>,
}

fn interpret_cbuffer_header(header: &str, diagnostics: &mut Diagnostics) -> CbufferColumns {
    let mut columns = CbufferColumns::default();
    for (column, field) in csv::split_row(csv::trim_line_end(header))
        .into_iter()
        .enumerate()
    {
        match field.trim() {
            NAME_COLUMN => columns.name = Some(column),
            VALUE_COLUMN => columns.value = Some(column),
            TYPE_COLUMN | BYTE_OFFSET_COLUMN => {}
            other => diagnostics.push(Diagnostic::UnrecognizedAttributeName {
                column,
                name: other.to_string(),
            }),
        }
    }
    columns
}

/// Split a `Value` field into up to four floats. Missing components are 0.
fn parse_register(value: &str, diagnostics: &mut Diagnostics) -> [f32; 4] {
    let mut register = [0.0; 4];
    let text = value.trim().trim_matches(csv::QUOTE as char);
    for (slot, part) in register.iter_mut().zip(csv::split_row(text)) {
        *slot = csv::parse_float(part, 0.0, diagnostics);
    }
    register
}

/// Parse a constant-buffer table.
///
/// Data rows run until EOF or the first blank line. A table without a
/// `Value` column yields an empty buffer.
pub fn parse_constant_buffer(text: &str, diagnostics: &mut Diagnostics) -> ConstantBuffer {
    let mut lines = text.lines();
    let Some(header) = lines.next() else {
        return ConstantBuffer::default();
    };
    read_rows(header, lines.map(str::to_string), diagnostics)
}

/// Read a constant-buffer table from a source.
pub fn read_constant_buffer<S: TableSource>(
    table: &S,
    diagnostics: &mut Diagnostics,
) -> Result<ConstantBuffer, ImportError> {
    let io_error = |source| ImportError::Io {
        table: table.name(),
        source,
    };
    let reader = table.open().map_err(io_error)?;
    let lines = reader.lines().collect::<Result<Vec<_>, _>>().map_err(io_error)?;
    let mut lines = lines.into_iter();
    let Some(header) = lines.next() else {
        return Ok(ConstantBuffer::default());
    };
    let buffer = read_rows(&header, lines, diagnostics);
    log::info!("Read {} registers from {}", buffer.len(), table.name());
    Ok(buffer)
}

fn read_rows(
    header: &str,
    lines: impl Iterator<Item = String>,
    diagnostics: &mut Diagnostics,
) -> ConstantBuffer {
    let columns = interpret_cbuffer_header(header, diagnostics);
    let Some(value_column) = columns.value else {
        log::warn!("Constant buffer table has no {VALUE_COLUMN} column");
        return ConstantBuffer::default();
    };

    let mut buffer = ConstantBuffer::default();
    for line in lines {
        let row = csv::trim_line_end(&line);
        if row.is_empty() {
            break;
        }
        buffer
            .values
            .push(parse_register(csv::field_at(row, value_column), diagnostics));
        if let Some(name_column) = columns.name {
            buffer
                .names
                .push(csv::field_at(row, name_column).trim().to_string());
        }
    }
    buffer
}

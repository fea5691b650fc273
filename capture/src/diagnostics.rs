//! Non-fatal findings collected during an import.
//!
//! Every diagnostic is logged at warn level the moment it is recorded, so
//! a host that only watches the log sees the same information as one that
//! inspects the returned [`Diagnostics`].

use std::fmt;

/// A recoverable problem found while reading tables.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// An index slot was written more than once; the later row wins.
    DuplicateIndexWrite {
        /// Index of the table the second write came from.
        table: usize,
        /// Slot in the merged index buffer.
        slot: usize,
        /// Vertex the slot held before.
        previous: u32,
        /// Vertex the slot holds now.
        vertex: u32,
    },
    /// A header field matched neither the mapping nor a known prefix.
    UnrecognizedAttributeName {
        /// Column of the field in the header row.
        column: usize,
        /// Base name of the field.
        name: String,
    },
    /// A numeric field could not be used as written.
    NumericParseFailure {
        /// The trimmed field text.
        text: String,
        /// The value stored instead.
        substituted: f32,
    },
}

/// Discriminant of a [`Diagnostic`], for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    DuplicateIndexWrite,
    UnrecognizedAttributeName,
    NumericParseFailure,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::DuplicateIndexWrite { .. } => DiagnosticKind::DuplicateIndexWrite,
            Self::UnrecognizedAttributeName { .. } => DiagnosticKind::UnrecognizedAttributeName,
            Self::NumericParseFailure { .. } => DiagnosticKind::NumericParseFailure,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIndexWrite {
                table,
                slot,
                previous,
                vertex,
            } => write!(
                f,
                "table {table}: index slot {slot} written twice (vertex {previous} replaced by {vertex})"
            ),
            Self::UnrecognizedAttributeName { column, name } => {
                write!(f, "column {column}: unrecognized attribute name {name:?}")
            }
            Self::NumericParseFailure { text, substituted } => {
                write!(f, "cannot use {text:?} as a number, stored {substituted}")
            }
        }
    }
}

/// Ordered collection of diagnostics from one import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    /// Number of recorded diagnostics of `kind`.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

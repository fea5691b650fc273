//! First pass over a table: id bounds.

use std::io::{self, BufRead};

use crate::csv;
use crate::source::for_each_row;

/// Inclusive range of ids seen in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub min: u32,
    pub max: u32,
}

impl IdRange {
    pub fn single(id: u32) -> Self {
        Self { min: id, max: id }
    }

    pub fn include(&mut self, id: u32) {
        self.min = self.min.min(id);
        self.max = self.max.max(id);
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Number of ids covered.
    pub fn count(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    pub fn contains(&self, id: u32) -> bool {
        (self.min..=self.max).contains(&id)
    }
}

/// Vertex and index id bounds of one table.
///
/// Only rows where both ids are usable count, since those are the only rows
/// the data pass stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmeshBounds {
    pub vertex_ids: Option<IdRange>,
    pub index_ids: Option<IdRange>,
    /// Rows that contributed.
    pub rows: usize,
}

impl SubmeshBounds {
    /// Index slots the table occupies in the merged buffer.
    pub fn index_slot_count(&self) -> usize {
        self.index_ids.map_or(0, |r| r.count())
    }

    /// Record the ids of one row.
    pub fn include(&mut self, vertex_id: u32, index_id: u32) {
        match &mut self.vertex_ids {
            Some(range) => range.include(vertex_id),
            None => self.vertex_ids = Some(IdRange::single(vertex_id)),
        }
        match &mut self.index_ids {
            Some(range) => range.include(index_id),
            None => self.index_ids = Some(IdRange::single(index_id)),
        }
        self.rows += 1;
    }
}

/// Scan the data rows of a table whose header was already consumed.
///
/// Reads until EOF or the first blank line, extracting only the id columns.
pub fn scan_bounds(
    reader: &mut dyn BufRead,
    vertex_id_column: usize,
    index_id_column: usize,
) -> io::Result<SubmeshBounds> {
    let mut bounds = SubmeshBounds::default();
    for_each_row(reader, |row| {
        let vertex = csv::parse_id(csv::field_at(row, vertex_id_column));
        let index = csv::parse_id(csv::field_at(row, index_id_column));
        if let (Some(vertex), Some(index)) = (vertex, index) {
            bounds.include(vertex, index);
        }
    })?;
    Ok(bounds)
}

//! Merge planning across tables.
//!
//! All tables of an import share one vertex id space and append their index
//! ranges one after another, so table `n` becomes submesh `n`.

use std::collections::HashSet;

use redlilium_core::mesh::SubMesh;

use crate::error::ImportError;
use crate::scan::{IdRange, SubmeshBounds};
use crate::source::{read_header, TableSource};

/// Check that every table starts with the same header row.
///
/// Returns the header of the first table. Comparison is exact, after
/// stripping the line ending.
pub fn verify_headers<S: TableSource>(tables: &[S]) -> Result<String, ImportError> {
    let mut first: Option<String> = None;
    for (index, table) in tables.iter().enumerate() {
        let header = read_table_header(table)?;
        match &first {
            None => first = Some(header),
            Some(expected) if *expected != header => {
                return Err(ImportError::HeaderMismatch {
                    index,
                    table: table.name(),
                });
            }
            Some(_) => {}
        }
    }
    first.ok_or(ImportError::NoTables)
}

/// Read the header row of one table. Missing or empty headers are invalid.
pub(crate) fn read_table_header<S: TableSource>(table: &S) -> Result<String, ImportError> {
    let io_error = |source| ImportError::Io {
        table: table.name(),
        source,
    };
    let mut reader = table.open().map_err(io_error)?;
    match read_header(&mut reader).map_err(io_error)? {
        Some(header) if !header.trim().is_empty() => Ok(header),
        _ => Err(ImportError::InvalidTableHeader {
            table: table.name(),
            reason: "missing header row".into(),
        }),
    }
}

/// Placement of one table in the merged index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmeshDescriptor {
    pub index_start: usize,
    pub index_count: usize,
}

/// Sizes and placement of the merged mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshAssemblyPlan {
    /// Smallest vertex id across all tables, stored as vertex 0.
    pub base_vertex_id: u32,
    pub vertex_count: usize,
    pub index_count: usize,
    pub submeshes: Vec<SubmeshDescriptor>,
}

impl MeshAssemblyPlan {
    /// Plan the merge from per-table bounds, in table order.
    pub fn new(bounds: &[SubmeshBounds]) -> Result<Self, ImportError> {
        let mut submeshes = Vec::with_capacity(bounds.len());
        let mut index_start = 0usize;
        for table in bounds {
            let index_count = table.index_slot_count();
            submeshes.push(SubmeshDescriptor {
                index_start,
                index_count,
            });
            index_start += index_count;
        }
        let index_count = index_start;

        let vertex_ids = bounds
            .iter()
            .filter_map(|b| b.vertex_ids)
            .reduce(IdRange::merge);
        let vertex_ids = match vertex_ids {
            Some(range) if index_count >= 3 => range,
            _ => return Err(ImportError::DegenerateMesh { index_count }),
        };

        let vertex_count = vertex_ids.count();
        Ok(Self {
            base_vertex_id: vertex_ids.min,
            vertex_count,
            index_count,
            submeshes,
        })
    }

    /// Merged index slot of an index id of table `table`.
    ///
    /// Index ids are placed as-is after the start of the table's range. Slots
    /// at or past the total index count are unusable.
    pub fn index_slot(&self, table: usize, index_id: u32) -> Option<usize> {
        let start = self.submeshes.get(table)?.index_start;
        let slot = start.checked_add(index_id as usize)?;
        (slot < self.index_count).then_some(slot)
    }

    /// Vertex slot of a vertex id.
    pub fn vertex_slot(&self, vertex_id: u32) -> Option<usize> {
        let slot = vertex_id.checked_sub(self.base_vertex_id)? as usize;
        (slot < self.vertex_count).then_some(slot)
    }

    /// Whether `rows` rows can fill every vertex and index slot.
    ///
    /// A row fills at most one of each, so a plan that fails this can never
    /// complete and must not be allocated.
    pub fn can_complete(&self, rows: usize) -> bool {
        self.vertex_count <= rows && self.index_count <= rows
    }

    /// Submesh ranges for the finished mesh.
    pub fn mesh_submeshes(&self) -> Vec<SubMesh> {
        self.submeshes
            .iter()
            .map(|d| SubMesh::triangles(d.index_start as u32, d.index_count as u32))
            .collect()
    }
}

/// Slots filled by the rows of a plan, tracked without dense buffers.
///
/// Used instead of the packed builder when the plan cannot complete, to
/// report the same completeness error the builder would.
#[derive(Debug, Default)]
pub struct SlotCoverage {
    vertices: HashSet<usize>,
    indices: HashSet<usize>,
}

impl SlotCoverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one row of table `table`. Returns `false` when the row would be
    /// dropped.
    pub fn include(
        &mut self,
        plan: &MeshAssemblyPlan,
        table: usize,
        vertex_id: u32,
        index_id: u32,
    ) -> bool {
        let (Some(vertex), Some(slot)) =
            (plan.vertex_slot(vertex_id), plan.index_slot(table, index_id))
        else {
            return false;
        };
        self.vertices.insert(vertex);
        self.indices.insert(slot);
        true
    }

    /// Completeness error for `plan`. Vertices are checked first.
    pub fn incomplete(&self, plan: &MeshAssemblyPlan) -> Option<ImportError> {
        if let Some(first_missing) = lowest_unwritten(&self.vertices, plan.vertex_count) {
            return Some(ImportError::IncompleteVertexData {
                expected: plan.vertex_count,
                written: self.vertices.len(),
                first_missing,
            });
        }
        lowest_unwritten(&self.indices, plan.index_count).map(|first_missing| {
            ImportError::IncompleteIndexData {
                expected: plan.index_count,
                written: self.indices.len(),
                first_missing,
            }
        })
    }
}

/// Smallest slot below `count` missing from `written`.
fn lowest_unwritten(written: &HashSet<usize>, count: usize) -> Option<usize> {
    // A gap always exists at or below `written.len()`.
    (0..count.min(written.len() + 1)).find(|slot| !written.contains(slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryTable;

    fn bounds(vertex: (u32, u32), index: (u32, u32)) -> SubmeshBounds {
        SubmeshBounds {
            vertex_ids: Some(IdRange {
                min: vertex.0,
                max: vertex.1,
            }),
            index_ids: Some(IdRange {
                min: index.0,
                max: index.1,
            }),
            rows: 1,
        }
    }

    #[test]
    fn test_merge_overlapping_tables() {
        let plan = MeshAssemblyPlan::new(&[bounds((0, 9), (0, 5)), bounds((5, 14), (0, 8))]).unwrap();
        assert_eq!(plan.base_vertex_id, 0);
        assert_eq!(plan.vertex_count, 15);
        assert_eq!(plan.index_count, 15);
        assert_eq!(plan.submeshes[1].index_start, plan.submeshes[0].index_count);
        assert_eq!(
            plan.mesh_submeshes(),
            vec![SubMesh::triangles(0, 6), SubMesh::triangles(6, 9)]
        );
    }

    #[test]
    fn test_slots() {
        let plan = MeshAssemblyPlan::new(&[bounds((10, 12), (100, 102)), bounds((11, 13), (3, 5))])
            .unwrap();
        assert_eq!(plan.base_vertex_id, 10);
        assert_eq!(plan.vertex_slot(10), Some(0));
        assert_eq!(plan.vertex_slot(13), Some(3));
        assert_eq!(plan.vertex_slot(14), None);
        assert_eq!(plan.vertex_slot(9), None);

        // Index ids are not rebased: slot = start of the table + id.
        assert_eq!(plan.index_count, 6);
        assert_eq!(plan.index_slot(1, 0), Some(3));
        assert_eq!(plan.index_slot(1, 2), Some(5));
        assert_eq!(plan.index_slot(1, 3), None);
        assert_eq!(plan.index_slot(0, 2), Some(2));
        assert_eq!(plan.index_slot(0, 100), None);
        assert_eq!(plan.index_slot(2, 0), None);
    }

    #[test]
    fn test_can_complete() {
        let plan = MeshAssemblyPlan::new(&[bounds((0, 4_000_000_000), (0, 2))]).unwrap();
        assert!(!plan.can_complete(3));

        let plan = MeshAssemblyPlan::new(&[bounds((0, 2), (0, u32::MAX))]).unwrap();
        assert!(!plan.can_complete(3));

        let plan = MeshAssemblyPlan::new(&[bounds((0, 2), (0, 2))]).unwrap();
        assert!(plan.can_complete(3));
        assert!(!plan.can_complete(2));
    }

    #[test]
    fn test_slot_coverage() {
        let plan = MeshAssemblyPlan::new(&[bounds((0, 4_000_000_000), (0, 2))]).unwrap();
        let mut coverage = SlotCoverage::new();
        assert!(coverage.include(&plan, 0, 0, 0));
        assert!(coverage.include(&plan, 0, 1, 1));
        assert!(coverage.include(&plan, 0, 4_000_000_000, 2));
        assert!(!coverage.include(&plan, 0, 0, 3));
        assert!(!coverage.include(&plan, 1, 0, 0));
        match coverage.incomplete(&plan) {
            Some(ImportError::IncompleteVertexData {
                expected,
                written,
                first_missing,
            }) => assert_eq!((expected, written, first_missing), (4_000_000_001, 3, 2)),
            other => panic!("expected incomplete vertex data, got {other:?}"),
        }

        let plan = MeshAssemblyPlan::new(&[bounds((0, 1), (0, 9))]).unwrap();
        let mut coverage = SlotCoverage::new();
        for (vertex, index) in [(0, 0), (1, 1), (0, 3)] {
            coverage.include(&plan, 0, vertex, index);
        }
        assert!(matches!(
            coverage.incomplete(&plan),
            Some(ImportError::IncompleteIndexData {
                expected: 10,
                written: 3,
                first_missing: 2
            })
        ));

        let plan = MeshAssemblyPlan::new(&[bounds((0, 2), (0, 2))]).unwrap();
        let mut coverage = SlotCoverage::new();
        for slot in 0..3 {
            coverage.include(&plan, 0, slot, slot);
        }
        assert!(coverage.incomplete(&plan).is_none());
    }

    #[test]
    fn test_empty_table_contributes_nothing() {
        let plan = MeshAssemblyPlan::new(&[
            bounds((0, 2), (0, 2)),
            SubmeshBounds::default(),
            bounds((0, 2), (0, 2)),
        ])
        .unwrap();
        assert_eq!(plan.submeshes[1].index_count, 0);
        assert_eq!(plan.submeshes[2].index_start, 3);
        assert_eq!(plan.index_count, 6);
    }

    #[test]
    fn test_degenerate() {
        assert!(matches!(
            MeshAssemblyPlan::new(&[bounds((0, 1), (0, 1))]),
            Err(ImportError::DegenerateMesh { index_count: 2 })
        ));
        assert!(matches!(
            MeshAssemblyPlan::new(&[SubmeshBounds::default()]),
            Err(ImportError::DegenerateMesh { index_count: 0 })
        ));
    }

    #[test]
    fn test_verify_headers() {
        let a = MemoryTable::new("a", "VTX,IDX,POSITION.x\r\n0,0,1\n");
        let b = MemoryTable::new("b", "VTX,IDX,POSITION.x\n5,5,1\n");
        let c = MemoryTable::new("c", "VTX,IDX,POSITION.y\n");
        assert_eq!(
            verify_headers(&[a.clone(), b.clone()]).unwrap(),
            "VTX,IDX,POSITION.x"
        );
        assert!(matches!(
            verify_headers(&[a.clone(), b, c]),
            Err(ImportError::HeaderMismatch { index: 2, .. })
        ));
        assert!(matches!(
            verify_headers(&[a, MemoryTable::new("empty", "\n")]),
            Err(ImportError::InvalidTableHeader { .. })
        ));
        assert!(matches!(
            verify_headers::<MemoryTable>(&[]),
            Err(ImportError::NoTables)
        ));
    }
}

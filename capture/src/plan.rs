//! Column plans resolved from a table header.

use redlilium_core::mesh::VertexAttributeSemantic;
use thiserror::Error;

use crate::transform::ComponentTransform;

/// A component index past the width of an attribute.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("component {component} out of range for a {width}-component attribute")]
pub struct ComponentIndexError {
    pub component: usize,
    pub width: usize,
}

/// Source columns for the `N` components of one attribute.
///
/// Each slot holds the column feeding that component and an optional
/// transform. An attribute is modified as soon as any slot has a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSlots<const N: usize> {
    columns: [Option<usize>; N],
    transforms: [Option<ComponentTransform>; N],
}

impl<const N: usize> Default for ComponentSlots<N> {
    fn default() -> Self {
        Self {
            columns: [None; N],
            transforms: [None; N],
        }
    }
}

impl<const N: usize> ComponentSlots<N> {
    fn check(component: usize) -> Result<(), ComponentIndexError> {
        if component < N {
            Ok(())
        } else {
            Err(ComponentIndexError {
                component,
                width: N,
            })
        }
    }

    /// Column feeding `component`, if any.
    pub fn column(&self, component: usize) -> Result<Option<usize>, ComponentIndexError> {
        Self::check(component)?;
        Ok(self.columns[component])
    }

    /// Assign `column` (and its transform) to `component`.
    ///
    /// Returns the column previously assigned to the slot.
    pub fn assign(
        &mut self,
        component: usize,
        column: usize,
        transform: Option<ComponentTransform>,
    ) -> Result<Option<usize>, ComponentIndexError> {
        Self::check(component)?;
        self.transforms[component] = transform;
        Ok(self.columns[component].replace(column))
    }

    /// Every slot has a column.
    pub fn all_valid(&self) -> bool {
        self.columns.iter().all(Option::is_some)
    }

    /// Number of leading slots with a column.
    pub fn leading_valid(&self) -> usize {
        self.columns.iter().take_while(|c| c.is_some()).count()
    }

    /// Any slot carries a transform.
    pub fn is_modified(&self) -> bool {
        self.transforms.iter().any(Option::is_some)
    }

    pub fn view(&self) -> SlotsView<'_> {
        SlotsView {
            columns: &self.columns,
            transforms: &self.transforms,
        }
    }
}

/// Width-erased borrowed view of a [`ComponentSlots`].
#[derive(Debug, Clone, Copy)]
pub struct SlotsView<'a> {
    pub columns: &'a [Option<usize>],
    pub transforms: &'a [Option<ComponentTransform>],
}

/// Where every piece of a mesh row lives in a table.
///
/// Built once from the header of the first table and shared by all tables of
/// the import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableIndexPlan {
    pub vertex_id_column: Option<usize>,
    pub index_id_column: Option<usize>,
    pub position: ComponentSlots<3>,
    pub normal: ComponentSlots<3>,
    pub tangent: ComponentSlots<4>,
    pub color: ComponentSlots<4>,
    pub texcoords: [ComponentSlots<4>; VertexAttributeSemantic::TEXCOORD_SETS],
    pub blend_weight: ComponentSlots<4>,
    pub blend_indices: ComponentSlots<4>,
}

impl TableIndexPlan {
    /// Assign a column to one component of an attribute.
    ///
    /// Returns the column previously assigned to the same slot.
    pub fn assign(
        &mut self,
        semantic: VertexAttributeSemantic,
        component: usize,
        column: usize,
        transform: Option<ComponentTransform>,
    ) -> Result<Option<usize>, ComponentIndexError> {
        use VertexAttributeSemantic as S;
        match semantic {
            S::Position => self.position.assign(component, column, transform),
            S::Normal => self.normal.assign(component, column, transform),
            S::Tangent => self.tangent.assign(component, column, transform),
            S::Color => self.color.assign(component, column, transform),
            S::BlendWeight => self.blend_weight.assign(component, column, transform),
            S::BlendIndices => self.blend_indices.assign(component, column, transform),
            texcoord => {
                let set = texcoord.texcoord_set().unwrap_or_default();
                self.texcoords[set].assign(component, column, transform)
            }
        }
    }

    /// Slot view of one attribute.
    pub fn slots(&self, semantic: VertexAttributeSemantic) -> SlotsView<'_> {
        use VertexAttributeSemantic as S;
        match semantic {
            S::Position => self.position.view(),
            S::Normal => self.normal.view(),
            S::Tangent => self.tangent.view(),
            S::Color => self.color.view(),
            S::BlendWeight => self.blend_weight.view(),
            S::BlendIndices => self.blend_indices.view(),
            texcoord => self.texcoords[texcoord.texcoord_set().unwrap_or_default()].view(),
        }
    }

    /// Number of components the attribute contributes to the vertex, 0 when
    /// the attribute is disabled.
    ///
    /// Texture coordinates use their leading valid components (1-4). Every
    /// other attribute needs all of its components.
    pub fn enabled_components(&self, semantic: VertexAttributeSemantic) -> usize {
        use VertexAttributeSemantic as S;
        let full = |all_valid: bool, width: usize| if all_valid { width } else { 0 };
        match semantic {
            S::Position => full(self.position.all_valid(), 3),
            S::Normal => full(self.normal.all_valid(), 3),
            S::Tangent => full(self.tangent.all_valid(), 4),
            S::Color => full(self.color.all_valid(), 4),
            S::BlendWeight => full(self.blend_weight.all_valid(), 4),
            S::BlendIndices => full(self.blend_indices.all_valid(), 4),
            texcoord => self.texcoords[texcoord.texcoord_set().unwrap_or_default()].leading_valid(),
        }
    }

    /// Check that rows can be placed: both id columns and a full position.
    ///
    /// The error lists every missing requirement.
    pub fn validate(&self) -> Result<(), Vec<&'static str>> {
        let mut missing = Vec::new();
        if self.vertex_id_column.is_none() {
            missing.push("VTX");
        }
        if self.index_id_column.is_none() {
            missing.push("IDX");
        }
        for (component, name) in ["POSITION.x", "POSITION.y", "POSITION.z"]
            .into_iter()
            .enumerate()
        {
            if !matches!(self.position.column(component), Ok(Some(_))) {
                missing.push(name);
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Manipulation, Swizzle};

    #[test]
    fn test_slots_validity() {
        let mut slots = ComponentSlots::<4>::default();
        assert_eq!(slots.leading_valid(), 0);
        slots.assign(0, 5, None).unwrap();
        slots.assign(1, 6, None).unwrap();
        slots.assign(3, 8, None).unwrap();
        assert_eq!(slots.leading_valid(), 2);
        assert!(!slots.all_valid());
        slots.assign(2, 7, None).unwrap();
        assert!(slots.all_valid());
        assert_eq!(slots.leading_valid(), 4);
    }

    #[test]
    fn test_slots_out_of_range() {
        let mut slots = ComponentSlots::<3>::default();
        assert_eq!(
            slots.assign(3, 1, None),
            Err(ComponentIndexError {
                component: 3,
                width: 3
            })
        );
        assert!(slots.column(7).is_err());
    }

    #[test]
    fn test_later_assignment_overwrites() {
        let mut plan = TableIndexPlan::default();
        assert_eq!(
            plan.assign(VertexAttributeSemantic::Normal, 1, 4, None),
            Ok(None)
        );
        assert_eq!(
            plan.assign(VertexAttributeSemantic::Normal, 1, 9, None),
            Ok(Some(4))
        );
        assert_eq!(plan.normal.column(1), Ok(Some(9)));
    }

    #[test]
    fn test_modified_flag() {
        let mut plan = TableIndexPlan::default();
        plan.assign(VertexAttributeSemantic::TexCoord2, 0, 3, None)
            .unwrap();
        assert!(!plan.texcoords[2].is_modified());
        let negate_y = ComponentTransform::new(Swizzle::Y, Manipulation::Negate);
        plan.assign(VertexAttributeSemantic::TexCoord2, 1, 4, Some(negate_y))
            .unwrap();
        assert!(plan.texcoords[2].is_modified());
        assert_eq!(
            plan.slots(VertexAttributeSemantic::TexCoord2).transforms[1],
            Some(negate_y)
        );
        assert_eq!(plan.enabled_components(VertexAttributeSemantic::TexCoord2), 2);
    }

    #[test]
    fn test_validate_lists_missing() {
        let mut plan = TableIndexPlan::default();
        assert_eq!(
            plan.validate(),
            Err(vec!["VTX", "IDX", "POSITION.x", "POSITION.y", "POSITION.z"])
        );

        plan.vertex_id_column = Some(0);
        plan.index_id_column = Some(1);
        for c in 0..3 {
            plan.assign(VertexAttributeSemantic::Position, c, 2 + c, None)
                .unwrap();
        }
        assert_eq!(plan.validate(), Ok(()));
        assert_eq!(plan.enabled_components(VertexAttributeSemantic::Position), 3);
        assert_eq!(plan.enabled_components(VertexAttributeSemantic::Color), 0);
    }
}

//! Per-component value transforms.
//!
//! A transform picks one raw component of the row (swizzle) and optionally
//! negates it. Transforms let a mapping convert between API conventions while
//! reading, e.g. DirectX captures into a right-handed Y-up frame.

use serde::{Deserialize, Serialize};

/// Source component selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Swizzle {
    #[default]
    X,
    Y,
    Z,
    W,
}

impl Swizzle {
    pub const ALL: [Swizzle; 4] = [Swizzle::X, Swizzle::Y, Swizzle::Z, Swizzle::W];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Selector for component `index` (0-3).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Operation applied to the selected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Manipulation {
    #[default]
    Identity,
    Negate,
}

/// Transform producing one stored component from the raw components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ComponentTransform {
    pub source: Swizzle,
    #[serde(default)]
    pub manipulation: Manipulation,
}

impl ComponentTransform {
    pub const fn new(source: Swizzle, manipulation: Manipulation) -> Self {
        Self {
            source,
            manipulation,
        }
    }

    /// Transform that stores component `component` unchanged.
    pub fn identity(component: usize) -> Self {
        Self::new(
            Swizzle::from_index(component).unwrap_or_default(),
            Manipulation::Identity,
        )
    }

    /// Identity transforms for all four components.
    pub fn identity4() -> [Self; 4] {
        [0, 1, 2, 3].map(Self::identity)
    }

    /// Apply to float components. A source the attribute lacks reads as `0`.
    pub fn apply(&self, raw: &[f32]) -> f32 {
        let value = raw.get(self.source.index()).copied().unwrap_or(0.0);
        match self.manipulation {
            Manipulation::Identity => value,
            Manipulation::Negate => -value,
        }
    }

    /// Apply to integer components.
    pub fn apply_int(&self, raw: &[i32]) -> i32 {
        let value = raw.get(self.source.index()).copied().unwrap_or(0);
        match self.manipulation {
            Manipulation::Identity => value,
            Manipulation::Negate => value.wrapping_neg(),
        }
    }
}

/// Named transform sets offered to mapping editors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformPreset {
    /// Swap between DirectX and OpenGL style axes:
    /// `x = -z`, `y = -x`, `z = y`, `w = w`.
    DirectXToOpenGl,
}

impl TransformPreset {
    pub const ALL: [TransformPreset; 1] = [TransformPreset::DirectXToOpenGl];

    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectXToOpenGl => "DirectX <=> OpenGL",
        }
    }

    pub fn transforms(&self) -> [ComponentTransform; 4] {
        use Manipulation::{Identity, Negate};
        match self {
            Self::DirectXToOpenGl => [
                ComponentTransform::new(Swizzle::Z, Negate),
                ComponentTransform::new(Swizzle::X, Negate),
                ComponentTransform::new(Swizzle::Y, Identity),
                ComponentTransform::new(Swizzle::W, Identity),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swizzle_and_negate() {
        let raw = [1.0, 2.0, 3.0, 4.0];
        let t = ComponentTransform::new(Swizzle::Z, Manipulation::Negate);
        assert_eq!(t.apply(&raw), -3.0);
        assert_eq!(ComponentTransform::identity(0).apply(&raw), 1.0);
        assert_eq!(ComponentTransform::identity(3).apply(&raw), 4.0);
    }

    #[test]
    fn test_missing_source_reads_zero() {
        let t = ComponentTransform::new(Swizzle::W, Manipulation::Identity);
        assert_eq!(t.apply(&[1.0, 2.0]), 0.0);
        assert_eq!(t.apply_int(&[1, 2]), 0);
    }

    #[test]
    fn test_int_transform() {
        let t = ComponentTransform::new(Swizzle::Y, Manipulation::Negate);
        assert_eq!(t.apply_int(&[5, 7, 9, 11]), -7);
        assert_eq!(t.apply_int(&[0, i32::MIN]), i32::MIN);
    }

    #[test]
    fn test_directx_to_opengl_preset() {
        let raw = [1.0, 2.0, 3.0, 4.0];
        let out = TransformPreset::DirectXToOpenGl
            .transforms()
            .map(|t| t.apply(&raw));
        assert_eq!(out, [-3.0, -1.0, 2.0, 4.0]);
        assert_eq!(TransformPreset::DirectXToOpenGl.name(), "DirectX <=> OpenGL");
    }

    #[test]
    fn test_transform_ron_format() {
        let t = ComponentTransform::new(Swizzle::Z, Manipulation::Negate);
        let text = ron::to_string(&t).unwrap();
        assert!(text.contains("negate"));
        assert_eq!(ron::from_str::<ComponentTransform>(&text).unwrap(), t);
        let back: ComponentTransform = ron::from_str("(source: Y)").unwrap();
        assert_eq!(back, ComponentTransform::identity(1));
    }
}

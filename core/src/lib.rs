//! # RedLilium Core
//!
//! GPU-agnostic mesh model shared by the RedLilium capture tools: multi-buffer
//! vertex layouts, CPU meshes with submeshes, geometry passes and binary glTF
//! export.

#[cfg(feature = "gltf")]
pub mod gltf;
pub mod math;
pub mod mesh;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

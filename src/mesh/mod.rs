//! Tile layers to grid meshes.

mod builder;

pub use builder::{GridMeshBuilder, LayerMesh, MaterialSlot};

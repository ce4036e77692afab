#![warn(missing_docs)]

//! Tiled JSON and TMX maps turned into textured quad meshes for Macroquad.
//!
//! Every tile layer becomes one grid mesh: a quad per cell, UVs per face
//! corner, faces grouped by the atlas they sample. The geometry half
//! ([`GridMeshBuilder`], [`AtlasCatalog`], [`AtlasGrid`]) is pure and works
//! without a window; [`TiledScene`] uploads the result for drawing.

mod atlas;
mod config;
mod error;
mod gid;
mod import;
mod ir_map;
mod loader {
    pub mod json_loader;
    pub mod tmx_loader;
}
mod material;
mod mesh;
mod render;
mod uv;

pub use atlas::AtlasCatalog;
pub use config::{ImportOptions, TextureFilter, UnresolvedGid};
pub use error::MapError;
pub use gid::{TileId, FLIP_D, FLIP_H, FLIP_V, GID_MASK};
pub use import::{import_map, ImportedLayer};
pub use ir_map::{Atlas, IrLayer, IrLayerKind, IrMap, TileLayer};
pub use loader::json_loader::{decode_map_file_to_ir, decode_map_str};
pub use loader::tmx_loader::decode_tmx_file_to_ir;
pub use material::{material_name, texture_name, MaterialBinder, MaterialLibrary};
pub use mesh::{GridMeshBuilder, LayerMesh, MaterialSlot};
pub use render::{quad_batches, MeshBatch, SceneLayer, TextureBinder, TiledScene, MAX_QUADS_PER_BATCH};
pub use uv::{corner_uv, AtlasGrid, CORNER_OFFSETS};

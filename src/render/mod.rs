//! Macroquad upload and drawing.

mod scene;

pub use scene::{quad_batches, MeshBatch, SceneLayer, TextureBinder, TiledScene, MAX_QUADS_PER_BATCH};

use crate::config::ImportOptions;
use crate::error::MapError;
use crate::import::{import_map, ImportedLayer};
use crate::ir_map::Atlas;
use crate::loader::json_loader::decode_map_file_to_ir;
use crate::material::{MaterialBinder, MaterialLibrary};
use crate::mesh::LayerMesh;
use anyhow::Context;
use log::debug;
use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::prelude::*;
use std::path::{Path, PathBuf};

/// Macroquad meshes index with `u16`; four vertices per quad.
pub const MAX_QUADS_PER_BATCH: usize = (u16::MAX as usize + 1) / 4;

/// Loads atlas images from disk into GPU textures.
///
/// Needs a live macroquad context, i.e. must run inside `#[macroquad::main]`.
pub struct TextureBinder {
    filter: FilterMode,
}

impl TextureBinder {
    /// Binder whose textures sample with `filter`.
    pub fn new(filter: FilterMode) -> Self {
        Self { filter }
    }
}

impl MaterialBinder for TextureBinder {
    type Handle = Texture2D;

    fn create(&mut self, name: &str, atlas: &Atlas) -> Result<Texture2D, MapError> {
        let path = PathBuf::from(&atlas.image);
        let missing = |reason: String| MapError::MissingImage {
            path: path.clone(),
            reason,
        };

        let bytes = std::fs::read(&path).map_err(|e| missing(e.to_string()))?;
        let image = Image::from_file_with_format(&bytes, None).map_err(|e| missing(format!("{e:?}")))?;
        if image.width() as u32 != atlas.image_w || image.height() as u32 != atlas.image_h {
            debug!(
                "{name}: image is {}x{}, map declares {}x{}; UVs follow the map",
                image.width(),
                image.height(),
                atlas.image_w,
                atlas.image_h
            );
        }

        let tex = Texture2D::from_image(&image);
        tex.set_filter(self.filter);
        Ok(tex)
    }
}

/// Unshared vertices for up to [`MAX_QUADS_PER_BATCH`] faces of one material.
pub struct MeshBatch {
    /// Four per face, in winding order.
    pub vertices: Vec<Vertex>,
    /// Two triangles per face.
    pub indices: Vec<u16>,
}

/// Split the faces of material slot `slot` into drawable batches.
///
/// Every face gets its own four vertices so its corner UVs survive. V is
/// flipped because macroquad samples textures from a top-left origin.
pub fn quad_batches(mesh: &LayerMesh, slot: usize) -> Vec<MeshBatch> {
    let faces: Vec<usize> = mesh.faces_in_slot(slot).collect();

    faces
        .chunks(MAX_QUADS_PER_BATCH)
        .map(|chunk| {
            let mut batch = MeshBatch {
                vertices: Vec::with_capacity(chunk.len() * 4),
                indices: Vec::with_capacity(chunk.len() * 6),
            };
            for &face in chunk {
                let base = batch.vertices.len() as u16;
                for (corner, &vi) in mesh.faces[face].iter().enumerate() {
                    let p = mesh.vertices[vi as usize];
                    let uv = mesh.uvs[face][corner];
                    batch
                        .vertices
                        .push(Vertex::new(p.x, p.y, p.z, uv.x, 1.0 - uv.y, WHITE));
                }
                batch
                    .indices
                    .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }
            batch
        })
        .collect()
}

/// One map layer ready for `draw_mesh`.
pub struct SceneLayer {
    /// Position in the source map's layer list.
    pub index: usize,
    /// Layer name.
    pub name: String,
    /// Toggled by the host; hidden layers are skipped by [`TiledScene::draw`].
    pub visible: bool,
    meshes: Vec<Mesh>,
}

impl SceneLayer {
    fn from_imported(layer: ImportedLayer<Texture2D>) -> Self {
        let ImportedLayer {
            index,
            mesh,
            materials,
        } = layer;

        let mut meshes = Vec::new();
        for (slot, texture) in materials.into_iter().enumerate() {
            for batch in quad_batches(&mesh, slot) {
                meshes.push(Mesh {
                    vertices: batch.vertices,
                    indices: batch.indices,
                    texture: Some(texture.clone()),
                });
            }
        }

        Self {
            index,
            name: mesh.name,
            visible: mesh.visible,
            meshes,
        }
    }

    /// Number of draw calls this layer issues.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Draw every batch, visible or not.
    pub fn draw(&self) {
        for mesh in &self.meshes {
            draw_mesh(mesh);
        }
    }
}

/// A whole imported map as macroquad meshes.
pub struct TiledScene {
    /// Map width in cells.
    pub width: usize,
    /// Map height in cells.
    pub height: usize,
    /// Tile layers only, in map order.
    pub layers: Vec<SceneLayer>,
}

impl TiledScene {
    /// Parse, mesh and upload a Tiled JSON or TMX map. All-or-nothing: on error no
    /// layer is returned.
    pub fn load<P: AsRef<Path>>(path: P, options: &ImportOptions) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let (ir, _) = decode_map_file_to_ir(path)
            .with_context(|| format!("Reading map file {}", path.display()))?;

        let mut library = MaterialLibrary::new(TextureBinder::new(options.texture_filter.into()));
        let imported = import_map(&ir, options, &mut library)
            .with_context(|| format!("Building meshes for {}", path.display()))?;

        Ok(Self {
            width: ir.width,
            height: ir.height,
            layers: imported.into_iter().map(SceneLayer::from_imported).collect(),
        })
    }

    /// Centre of the map grid at `origin`, handy for pointing a camera.
    pub fn center(&self, origin: Vec3) -> Vec3 {
        origin + vec3(self.width as f32 * 0.5, 0.0, self.height as f32 * 0.5)
    }

    /// Draw visible layers in map order. Call with a 3D camera set.
    pub fn draw(&self) {
        for layer in self.layers.iter().filter(|l| l.visible) {
            layer.draw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{test_atlas, AtlasCatalog};
    use crate::ir_map::TileLayer;
    use crate::mesh::GridMeshBuilder;

    fn build(width: usize, height: usize, data: Vec<u32>) -> LayerMesh {
        let atlases = vec![test_atlas("a", 1), test_atlas("b", 5)];
        let catalog = AtlasCatalog::new(&atlases);
        let layer = TileLayer {
            name: "l".to_owned(),
            width,
            height,
            visible: true,
            data,
        };
        GridMeshBuilder::default().build(&layer, &catalog).expect("build")
    }

    #[test]
    fn batches_hold_one_slot_and_skip_empty_cells() {
        let mesh = build(3, 1, vec![1, 0, 5]);

        let a = quad_batches(&mesh, 0);
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].vertices.len(), 4);
        assert_eq!(a[0].indices, vec![0, 1, 2, 0, 2, 3]);

        let b = quad_batches(&mesh, 1);
        assert_eq!(b[0].vertices[0].position, vec3(2.0, 0.0, 0.0));
        assert!(quad_batches(&mesh, 2).is_empty());
    }

    #[test]
    fn batch_uvs_are_flipped_for_top_left_textures() {
        let mesh = build(1, 1, vec![1]);
        let batch = &quad_batches(&mesh, 0)[0];

        for (corner, vertex) in batch.vertices.iter().enumerate() {
            let uv = mesh.uvs[0][corner];
            assert_eq!(vertex.uv, vec2(uv.x, 1.0 - uv.y));
        }
        // top-left tile of the atlas: bottom-left corner samples v = 0.5
        assert_eq!(batch.vertices[0].uv, vec2(0.0, 0.5));
        assert_eq!(batch.vertices[3].uv, vec2(0.0, 0.0));
    }

    #[test]
    fn large_layers_split_at_the_index_limit() {
        let (w, h) = (200, 100);
        let mesh = build(w, h, vec![2; w * h]);
        let batches = quad_batches(&mesh, 0);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].vertices.len(), MAX_QUADS_PER_BATCH * 4);
        assert_eq!(batches[1].vertices.len(), (w * h - MAX_QUADS_PER_BATCH) * 4);
        assert_eq!(*batches[0].indices.iter().max().expect("indices"), u16::MAX);
    }
}

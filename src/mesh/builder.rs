use crate::atlas::AtlasCatalog;
use crate::config::UnresolvedGid;
use crate::error::MapError;
use crate::gid::TileId;
use crate::ir_map::{Atlas, TileLayer};
use crate::material::material_name;
use crate::uv::AtlasGrid;
use log::{debug, warn};
use macroquad::prelude::*;
use std::collections::HashMap;

/// One material group of a [`LayerMesh`]: every face whose tile lives in
/// `atlas`, keyed by the derived material name.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSlot {
    /// `<atlas name>_material`.
    pub name: String,
    /// The atlas the slot's faces sample.
    pub atlas: Atlas,
}

/// Geometry for a single tile layer.
///
/// Vertices form a `(width + 1) x (height + 1)` grid shared between faces;
/// UVs live on face corners so neighbouring faces can sample different tiles.
#[derive(Debug, Clone)]
pub struct LayerMesh {
    /// Name of the source layer.
    pub name: String,
    /// Hidden layers still carry geometry; the host decides what to draw.
    pub visible: bool,
    /// Width in cells.
    pub width: usize,
    /// Height in cells.
    pub height: usize,
    /// Row-major from the bottom row up.
    pub vertices: Vec<Vec3>,
    /// Bottom-left, bottom-right, top-right, top-left.
    pub faces: Vec<[u32; 4]>,
    /// Parallel to `faces`.
    pub uvs: Vec<[Vec2; 4]>,
    /// Parallel to `faces`; `None` for empty cells.
    pub face_materials: Vec<Option<usize>>,
    /// In order of first use.
    pub materials: Vec<MaterialSlot>,
}

impl LayerMesh {
    /// `(width + 1) * (height + 1)`.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// One face per cell.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Index of the face covering cell `(x, y)`, `y` counted from the bottom.
    #[inline]
    pub fn face_index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Faces that belong to material slot `slot`.
    pub fn faces_in_slot(&self, slot: usize) -> impl Iterator<Item = usize> + '_ {
        self.face_materials
            .iter()
            .enumerate()
            .filter(move |(_, m)| **m == Some(slot))
            .map(|(i, _)| i)
    }
}

/// Turns a [`TileLayer`] into a [`LayerMesh`]. Pure geometry: it records
/// which atlas every face needs but never creates host resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridMeshBuilder {
    /// World position of the layer's bottom-left vertex.
    pub origin: Vec3,
    /// What to do with a gid no atlas owns.
    pub unresolved: UnresolvedGid,
}

impl GridMeshBuilder {
    /// Builder placing the mesh at `origin`, rejecting unresolved gids.
    pub fn new(origin: Vec3) -> Self {
        Self {
            origin,
            unresolved: UnresolvedGid::Reject,
        }
    }

    /// Replace the unresolved-gid policy.
    pub fn with_unresolved(mut self, policy: UnresolvedGid) -> Self {
        self.unresolved = policy;
        self
    }

    /// Mesh one layer: a vertex grid, one quad per cell, corner UVs from the
    /// atlas that owns each gid, and a material slot per distinct atlas name.
    ///
    /// Fails on a data length that does not match the layer size, on a grid
    /// too large for `u32` vertex indices, on an unresolved gid under
    /// [`UnresolvedGid::Reject`], and on an atlas that cannot hold a tile.
    pub fn build(&self, layer: &TileLayer, catalog: &AtlasCatalog) -> Result<LayerMesh, MapError> {
        let (w, h) = (layer.width, layer.height);
        let too_large = || {
            MapError::InvalidMap(format!(
                "layer '{}' is too large to mesh: {w}x{h}",
                layer.name
            ))
        };

        let cells = w.checked_mul(h).ok_or_else(too_large)?;
        if layer.data.len() != cells {
            return Err(MapError::InvalidLayerSize {
                layer: layer.name.clone(),
                expected: cells,
                found: layer.data.len(),
            });
        }
        // vertex indices are u32
        let vertex_count = w
            .checked_add(1)
            .zip(h.checked_add(1))
            .and_then(|(vw, vh)| vw.checked_mul(vh))
            .filter(|&n| u32::try_from(n).is_ok())
            .ok_or_else(too_large)?;

        let stride = w + 1;
        let mut vertices = Vec::with_capacity(vertex_count);
        for y in 0..=h {
            for x in 0..=w {
                vertices.push(self.origin + vec3(x as f32, 0.0, y as f32));
            }
        }

        let mut faces = Vec::with_capacity(w * h);
        let mut uvs = Vec::with_capacity(w * h);
        let mut face_materials = Vec::with_capacity(w * h);
        let mut materials: Vec<MaterialSlot> = Vec::new();
        let mut slot_by_name: HashMap<String, usize> = HashMap::new();
        let mut grids: HashMap<u32, AtlasGrid> = HashMap::new();
        let mut flagged = false;

        for y in 0..h {
            for x in 0..w {
                let bl = (y * stride + x) as u32;
                let above = bl + stride as u32;
                faces.push([bl, bl + 1, above + 1, above]);

                // tile data is stored top row first, the mesh grows upwards
                let row = h - y - 1;
                let id = TileId(layer.gid_at(x, row));
                flagged |= id.flags() != 0;

                let located = if id.is_empty() {
                    None
                } else {
                    match (catalog.locate(id.clean()), self.unresolved) {
                        (Some(found), _) => Some(found),
                        (None, UnresolvedGid::Reject) => {
                            return Err(MapError::GidOutOfRange {
                                layer: layer.name.clone(),
                                gid: id.clean(),
                            });
                        }
                        (None, UnresolvedGid::Empty) => {
                            warn!(
                                "layer '{}': gid {} at ({x}, {row}) has no atlas, leaving it empty",
                                layer.name,
                                id.clean()
                            );
                            None
                        }
                    }
                };

                let Some((atlas, local)) = located else {
                    uvs.push([Vec2::ZERO; 4]);
                    face_materials.push(None);
                    continue;
                };

                let grid = match grids.get(&atlas.first_gid) {
                    Some(grid) => *grid,
                    None => {
                        let grid = AtlasGrid::new(atlas)?;
                        grids.insert(atlas.first_gid, grid);
                        grid
                    }
                };
                uvs.push(grid.tile_uvs(local));

                let name = material_name(atlas);
                let slot = match slot_by_name.get(&name) {
                    Some(&slot) => slot,
                    None => {
                        let slot = materials.len();
                        materials.push(MaterialSlot {
                            name: name.clone(),
                            atlas: atlas.clone(),
                        });
                        slot_by_name.insert(name, slot);
                        slot
                    }
                };
                face_materials.push(Some(slot));
            }
        }

        if flagged {
            warn!(
                "layer '{}': tile flip/rotation flags are not supported and were ignored",
                layer.name
            );
        }

        debug!(
            "built layer '{}': {} vertices, {} faces, {} material group(s)",
            layer.name,
            vertices.len(),
            faces.len(),
            materials.len()
        );

        Ok(LayerMesh {
            name: layer.name.clone(),
            visible: layer.visible,
            width: w,
            height: h,
            vertices,
            faces,
            uvs,
            face_materials,
            materials,
        })
    }
}

use crate::atlas::AtlasCatalog;
use crate::config::ImportOptions;
use crate::error::MapError;
use crate::ir_map::IrMap;
use crate::material::{MaterialBinder, MaterialLibrary};
use crate::mesh::{GridMeshBuilder, LayerMesh};
use log::{debug, info};

/// A built layer together with the host handles for its material slots.
#[derive(Debug, Clone)]
pub struct ImportedLayer<H> {
    /// Position of the layer in the source map.
    pub index: usize,
    /// Geometry of the layer.
    pub mesh: LayerMesh,
    /// Parallel to `mesh.materials`.
    pub materials: Vec<H>,
}

/// Build every tile layer of `map` and bind the materials they use.
///
/// Nothing is returned unless every layer succeeds. Non-tile layers are
/// skipped but still count towards stacking, so layer `i` always sits at
/// `options.layer_origin(i)`. Every tile layer must match the map's grid,
/// whether the map came from a loader or was built in code.
pub fn import_map<B: MaterialBinder>(
    map: &IrMap,
    options: &ImportOptions,
    library: &mut MaterialLibrary<B>,
) -> Result<Vec<ImportedLayer<B::Handle>>, MapError> {
    map.check_layer_sizes()?;
    let catalog = AtlasCatalog::new(&map.tilesets);
    let mut imported = Vec::new();

    for (index, layer) in map.layers.iter().enumerate() {
        let Some(tiles) = layer.as_tiles() else {
            debug!("skipping non-tile layer '{}'", layer.name);
            continue;
        };

        let mesh = GridMeshBuilder::new(options.layer_origin(index))
            .with_unresolved(options.unresolved_gid)
            .build(tiles, &catalog)?;

        let materials = mesh
            .materials
            .iter()
            .map(|slot| library.bind(&slot.atlas))
            .collect::<Result<Vec<_>, _>>()?;

        imported.push(ImportedLayer {
            index,
            mesh,
            materials,
        });
    }

    info!(
        "imported {} tile layer(s) of {} from a {}x{} map, {} material(s) bound",
        imported.len(),
        map.layers.len(),
        map.width,
        map.height,
        library.len()
    );

    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::test_atlas;
    use crate::config::UnresolvedGid;
    use crate::ir_map::{IrLayer, IrLayerKind, TileLayer};
    use crate::material::RecordingBinder;
    use macroquad::prelude::*;

    fn tile_layer(name: &str, visible: bool, data: Vec<u32>) -> IrLayer {
        IrLayer {
            name: name.to_owned(),
            visible,
            kind: IrLayerKind::Tiles(TileLayer {
                name: name.to_owned(),
                width: 2,
                height: 1,
                visible,
                data,
            }),
        }
    }

    fn map() -> IrMap {
        IrMap {
            width: 2,
            height: 1,
            tile_w: 32,
            tile_h: 32,
            tilesets: vec![test_atlas("ground", 1), test_atlas("props", 5)],
            layers: vec![
                tile_layer("floor", true, vec![1, 2]),
                IrLayer {
                    name: "spawns".to_owned(),
                    visible: true,
                    kind: IrLayerKind::Objects,
                },
                tile_layer("decor", false, vec![0, 6]),
                tile_layer("overlay", true, vec![3, 7]),
            ],
        }
    }

    #[test]
    fn skips_object_layers_and_keeps_stacking_index() {
        let mut library = MaterialLibrary::new(RecordingBinder::default());
        let layers = import_map(&map(), &ImportOptions::default(), &mut library).expect("import");

        let indices: Vec<usize> = layers.iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![0, 2, 3]);
        assert_eq!(layers[1].mesh.vertices[0], vec3(0.0, -2.0, 0.0));
        assert!(!layers[1].mesh.visible);
    }

    #[test]
    fn materials_are_bound_once_across_layers() {
        let mut library = MaterialLibrary::new(RecordingBinder::default());
        let layers = import_map(&map(), &ImportOptions::default(), &mut library).expect("import");

        assert_eq!(layers[0].materials, vec!["ground_material"]);
        assert_eq!(layers[1].materials, vec!["props_material"]);
        assert_eq!(layers[2].materials, vec!["ground_material", "props_material"]);
        assert_eq!(
            library.binder().created,
            vec!["ground_material", "props_material"]
        );
    }

    #[test]
    fn missing_image_aborts_the_import() {
        let binder = RecordingBinder {
            fail_on: Some("props".to_owned()),
            ..Default::default()
        };
        let mut library = MaterialLibrary::new(binder);
        let err = import_map(&map(), &ImportOptions::default(), &mut library).unwrap_err();
        assert!(matches!(err, MapError::MissingImage { .. }));
    }

    #[test]
    fn layers_must_match_the_map_grid() {
        let mut library = MaterialLibrary::new(RecordingBinder::default());

        let mut narrow = map();
        narrow.width = 1;
        let err = import_map(&narrow, &ImportOptions::default(), &mut library).unwrap_err();
        assert!(matches!(err, MapError::InvalidMap(msg) if msg.contains("floor")));

        let mut short = map();
        short.layers[3] = tile_layer("overlay", true, vec![3]);
        let err = import_map(&short, &ImportOptions::default(), &mut library).unwrap_err();
        assert!(matches!(err, MapError::InvalidLayerSize { layer, expected: 2, found: 1 } if layer == "overlay"));

        // nothing was bound for a map that never got meshed
        assert!(library.is_empty());
    }

    #[test]
    fn unresolved_gid_follows_the_configured_policy() {
        let mut broken = map();
        broken.tilesets = vec![test_atlas("props", 5)];

        let mut library = MaterialLibrary::new(RecordingBinder::default());
        let err = import_map(&broken, &ImportOptions::default(), &mut library).unwrap_err();
        assert!(matches!(err, MapError::GidOutOfRange { gid: 1, .. }));

        let options = ImportOptions {
            unresolved_gid: UnresolvedGid::Empty,
            ..Default::default()
        };
        let layers = import_map(&broken, &options, &mut library).expect("import");
        assert_eq!(layers[0].mesh.face_materials, vec![None, None]);
        assert_eq!(layers[1].mesh.face_materials, vec![None, Some(0)]);
    }
}

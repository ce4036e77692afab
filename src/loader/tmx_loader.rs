// src/loader/tmx_loader.rs
use crate::error::MapError;
use crate::gid::TileId;
use crate::ir_map::*;
use std::path::{Path, PathBuf};
use tiled::{LayerType, Loader, Map, Tileset};

/// Gids are rebuilt from each tileset's position and tile count, so a map
/// whose authored firstgids leave gaps ends up densely numbered. Cells keep
/// their tile either way.
fn first_gids(map: &Map) -> Result<Vec<u32>, MapError> {
    let mut current: u32 = 1;
    let mut firsts = Vec::with_capacity(map.tilesets().len());
    for tileset in map.tilesets() {
        firsts.push(current);
        current = current.checked_add(tileset.tilecount).ok_or_else(|| {
            MapError::InvalidMap(format!("tileset '{}' overflows the gid space", tileset.name))
        })?;
    }
    Ok(firsts)
}

fn tileset_to_atlas(ts: &Tileset, first_gid: u32) -> Result<Atlas, MapError> {
    let Some(image) = &ts.image else {
        return Err(MapError::InvalidMap(format!(
            "tileset '{}' has no single atlas image (image collections are not supported)",
            ts.name
        )));
    };
    let (Ok(image_w), Ok(image_h)) = (u32::try_from(image.width), u32::try_from(image.height)) else {
        return Err(MapError::InvalidAtlas {
            name: ts.name.clone(),
            reason: format!("image size {}x{} is negative", image.width, image.height),
        });
    };

    let atlas = Atlas {
        name: ts.name.clone(),
        first_gid,
        tile_w: ts.tile_width,
        tile_h: ts.tile_height,
        spacing: ts.spacing,
        margin: ts.margin,
        image: image.source.to_string_lossy().into_owned(),
        image_w,
        image_h,
        tilecount: ts.tilecount,
    };
    atlas.check_gid_range()?;
    Ok(atlas)
}

fn tile_layer_to_ir(
    name: &str,
    visible: bool,
    tiles: &tiled::TileLayer,
    firsts: &[u32],
) -> Result<TileLayer, MapError> {
    let (Some(width), Some(height)) = (tiles.width(), tiles.height()) else {
        return Err(MapError::InvalidMap(format!(
            "layer '{name}' is chunked; infinite maps are not supported"
        )));
    };
    let (Ok(w), Ok(h)) = (i32::try_from(width), i32::try_from(height)) else {
        return Err(MapError::InvalidMap(format!("layer '{name}' is too large: {width}x{height}")));
    };

    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..h {
        for x in 0..w {
            let Some(tile) = tiles.get_tile(x, y) else {
                data.push(0);
                continue;
            };
            let gid = firsts
                .get(tile.tileset_index())
                .and_then(|first| first.checked_add(tile.id()))
                .ok_or_else(|| {
                    MapError::InvalidMap(format!(
                        "layer '{name}': tile {} of tileset #{} at ({x}, {y}) has no gid",
                        tile.id(),
                        tile.tileset_index()
                    ))
                })?;
            data.push(TileId::with_flips(gid, tile.flip_h, tile.flip_v, tile.flip_d).0);
        }
    }

    Ok(TileLayer {
        name: name.to_owned(),
        width: width as usize,
        height: height as usize,
        visible,
        data,
    })
}

fn decode_tmx_map(map: &Map) -> Result<IrMap, MapError> {
    if map.infinite() {
        return Err(MapError::InvalidMap(
            "infinite (chunked) maps are not supported".to_owned(),
        ));
    }

    let firsts = first_gids(map)?;
    let mut tilesets = map
        .tilesets()
        .iter()
        .zip(&firsts)
        .map(|(ts, &first_gid)| tileset_to_atlas(ts, first_gid))
        .collect::<Result<Vec<_>, _>>()?;
    tilesets.sort_by_key(|t| t.first_gid);

    let mut layers = Vec::with_capacity(map.layers().len());
    for layer in map.layers() {
        let kind = match layer.layer_type() {
            LayerType::Tiles(tiles) => IrLayerKind::Tiles(tile_layer_to_ir(
                &layer.name,
                layer.visible,
                &tiles,
                &firsts,
            )?),
            LayerType::Objects(_) => IrLayerKind::Objects,
            LayerType::Image(_) => IrLayerKind::Other("imagelayer".to_owned()),
            LayerType::Group(_) => IrLayerKind::Other("group".to_owned()),
        };
        layers.push(IrLayer {
            name: layer.name.clone(),
            visible: layer.visible,
            kind,
        });
    }

    let ir = IrMap {
        width: map.width as usize,
        height: map.height as usize,
        tile_w: map.tile_width,
        tile_h: map.tile_height,
        tilesets,
        layers,
    };
    ir.validate()?;
    Ok(ir)
}

/// Parse a TMX map (and any `.tsx` tilesets it references) with the `tiled`
/// crate; returns the map and its directory.
pub fn decode_tmx_file_to_ir(path: &Path) -> Result<(IrMap, PathBuf), MapError> {
    let mut loader = Loader::new();
    let map = loader.load_tmx_map(path).map_err(|source| MapError::Tmx {
        path: path.to_path_buf(),
        source,
    })?;

    let map_dir = path
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));

    let ir = decode_tmx_map(&map)?;
    Ok((ir, map_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gid::FLIP_H;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock went backwards")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("mq_tiled_mesh_tmx_{nanos}"));
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    const WALLS_TSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" tiledversion="1.10.2" name="walls" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="art/walls.png" width="32" height="32"/>
</tileset>
"#;

    const LEVEL_TMX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" tiledversion="1.10.2" orientation="orthogonal" renderorder="right-down" width="3" height="2" tilewidth="16" tileheight="16" infinite="0" nextlayerid="4" nextobjectid="1">
 <tileset firstgid="1" name="floor" tilewidth="16" tileheight="16" spacing="2" tilecount="4" columns="2">
  <image source="floor.png" width="34" height="34"/>
 </tileset>
 <tileset firstgid="5" source="walls.tsx"/>
 <layer id="1" name="floor" width="3" height="2">
  <data encoding="csv">
1,2,3,
4,2147483650,0
</data>
 </layer>
 <objectgroup id="2" name="spawns"/>
 <layer id="3" name="walls" width="3" height="2" visible="0">
  <data encoding="csv">
0,5,0,
0,0,8
</data>
 </layer>
</map>
"#;

    #[test]
    fn parses_tmx_with_embedded_and_external_tilesets() {
        let dir = temp_dir();
        let map_path = dir.join("level.tmx");
        fs::write(&map_path, LEVEL_TMX).expect("failed to write map");
        fs::write(dir.join("walls.tsx"), WALLS_TSX).expect("failed to write tileset");

        let (ir, base) = decode_tmx_file_to_ir(&map_path).expect("decode");
        assert_eq!(base, dir);
        assert_eq!((ir.width, ir.height, ir.tile_w, ir.tile_h), (3, 2, 16, 16));

        assert_eq!(ir.tilesets[0].name, "floor");
        assert_eq!(ir.tilesets[0].spacing, 2);
        assert_eq!((ir.tilesets[0].image_w, ir.tilesets[0].image_h), (34, 34));
        assert_eq!(ir.tilesets[1].name, "walls");
        assert_eq!(ir.tilesets[1].first_gid, 5);
        assert_eq!(
            PathBuf::from(&ir.tilesets[1].image),
            dir.join("art").join("walls.png")
        );

        let floor = ir.layers[0].as_tiles().expect("tile layer");
        assert_eq!(floor.data, vec![1, 2, 3, 4, 2 | FLIP_H, 0]);
        assert!(matches!(ir.layers[1].kind, IrLayerKind::Objects));
        let walls = ir.layers[2].as_tiles().expect("tile layer");
        assert!(!walls.visible);
        assert_eq!(walls.data, vec![0, 5, 0, 0, 0, 8]);
    }

    #[test]
    fn map_file_dispatch_reads_tmx() {
        let dir = temp_dir();
        let map_path = dir.join("level.tmx");
        fs::write(&map_path, LEVEL_TMX).expect("failed to write map");
        fs::write(dir.join("walls.tsx"), WALLS_TSX).expect("failed to write tileset");

        let (ir, _) = crate::loader::json_loader::decode_map_file_to_ir(&map_path).expect("decode");
        assert_eq!(ir.layers.len(), 3);
    }

    #[test]
    fn rejects_infinite_tmx_maps() {
        let dir = temp_dir();
        let map_path = dir.join("endless.tmx");
        fs::write(
            &map_path,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" renderorder="right-down" width="16" height="16" tilewidth="16" tileheight="16" infinite="1">
</map>
"#,
        )
        .expect("failed to write map");

        let err = decode_tmx_file_to_ir(&map_path).unwrap_err();
        assert!(matches!(err, MapError::InvalidMap(msg) if msg.contains("infinite")));
    }

    #[test]
    fn returns_typed_error_for_missing_tmx_tileset() {
        let dir = temp_dir();
        let map_path = dir.join("level.tmx");
        fs::write(&map_path, LEVEL_TMX).expect("failed to write map");

        let err = decode_tmx_file_to_ir(&map_path).unwrap_err();
        assert!(matches!(err, MapError::Tmx { path, .. } if path == map_path));
    }
}

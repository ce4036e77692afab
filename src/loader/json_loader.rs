// src/loader/json_loader.rs
use crate::error::MapError;
use crate::ir_map::*;
use crate::loader::tmx_loader::decode_tmx_file_to_ir;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use flate2::read::{GzDecoder, ZlibDecoder};
use serde::Deserialize;
use serde_json::{Map as JsonObject, Value as JsonValue};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(default)]
    data: JsonValue,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    compression: Option<String>,
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>, // "tilelayer" expected here
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct JsonTilesetRef {
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    /// Everything else: the tileset itself when it is embedded.
    #[serde(flatten)]
    inline: JsonObject<String, JsonValue>,
}

#[derive(Deserialize)]
struct JsonMap {
    width: usize,
    height: usize,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    infinite: bool,
    layers: Vec<JsonLayer>,
    tilesets: Vec<JsonTilesetRef>,
}

#[derive(Deserialize)]
struct JsonTileset {
    #[serde(default)]
    name: String,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    tilecount: Option<u32>,
}

fn has_extension(p: &Path, allowed: &[&str]) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| allowed.contains(&e))
}

fn read_text(p: &Path) -> Result<String, MapError> {
    std::fs::read_to_string(p).map_err(|source| MapError::Io {
        path: p.to_path_buf(),
        source,
    })
}

/// Tiles that fit along one axis, accounting for margin and spacing.
/// `None` when the numbers overflow `u32`.
fn tiles_along(image: u32, tile: u32, margin: u32, spacing: u32) -> Option<u32> {
    let usable = image
        .checked_add(spacing)?
        .saturating_sub(margin.checked_mul(2)?);
    Some(usable / tile.checked_add(spacing)?.max(1))
}

fn tileset_to_atlas(
    ts: JsonTileset,
    first_gid: u32,
    fallback_name: &str,
    dir: &Path,
) -> Result<Atlas, MapError> {
    let name = if ts.name.is_empty() {
        fallback_name.to_owned()
    } else {
        ts.name
    };

    let Some(image) = ts.image else {
        return Err(MapError::InvalidMap(format!(
            "tileset '{name}' has no single atlas image (image collections are not supported)"
        )));
    };

    let tilecount = match ts.tilecount {
        Some(count) => Some(count),
        None => tiles_along(ts.imagewidth, ts.tilewidth, ts.margin, ts.spacing)
            .zip(tiles_along(ts.imageheight, ts.tileheight, ts.margin, ts.spacing))
            .and_then(|(columns, rows)| columns.checked_mul(rows)),
    };
    let Some(tilecount) = tilecount else {
        return Err(MapError::InvalidAtlas {
            name,
            reason: format!(
                "{}x{} image with {}px tiles, spacing {} and margin {} overflows",
                ts.imagewidth, ts.imageheight, ts.tilewidth, ts.spacing, ts.margin
            ),
        });
    };

    let atlas = Atlas {
        name,
        first_gid,
        tile_w: ts.tilewidth,
        tile_h: ts.tileheight,
        spacing: ts.spacing,
        margin: ts.margin,
        image: dir.join(&image).to_string_lossy().into_owned(),
        image_w: ts.imagewidth,
        image_h: ts.imageheight,
        tilecount,
    };
    atlas.check_gid_range()?;
    Ok(atlas)
}

fn load_tileset(entry: JsonTilesetRef, map_dir: &Path, map_path: &Path) -> Result<Atlas, MapError> {
    match entry.source {
        Some(source) => {
            let ts_path = map_dir.join(&source);
            if !has_extension(&ts_path, &["json", "tsj"]) {
                return Err(MapError::InvalidMap(format!(
                    "External tileset must be JSON: {source}"
                )));
            }
            let txt = read_text(&ts_path)?;
            let ts: JsonTileset = serde_json::from_str(&txt).map_err(|source| MapError::Json {
                path: ts_path.clone(),
                source,
            })?;

            let stem = ts_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let ts_dir = ts_path.parent().unwrap_or(map_dir);
            tileset_to_atlas(ts, entry.firstgid, &stem, ts_dir)
        }
        None => {
            let ts: JsonTileset = serde_json::from_value(JsonValue::Object(entry.inline))
                .map_err(|source| MapError::Json {
                    path: map_path.to_path_buf(),
                    source,
                })?;
            let fallback = format!("tileset_{}", entry.firstgid);
            tileset_to_atlas(ts, entry.firstgid, &fallback, map_dir)
        }
    }
}

/// Cell values from a layer's `data`: a plain array, or base64 of
/// little-endian `u32`s with optional zlib, gzip or zstd compression.
fn decode_layer_data(l: &mut JsonLayer, map_path: &Path) -> Result<Vec<u32>, MapError> {
    let data = l.data.take();
    let invalid = |what: String| MapError::InvalidMap(format!("layer '{}': {what}", l.name));

    match l.encoding.as_deref() {
        None | Some("csv") => serde_json::from_value(data).map_err(|source| MapError::Json {
            path: map_path.to_path_buf(),
            source,
        }),
        Some("base64") => {
            let JsonValue::String(text) = data else {
                return Err(invalid("base64 data must be a string".to_owned()));
            };
            let packed = BASE64_STANDARD
                .decode(text.trim())
                .map_err(|e| invalid(format!("bad base64 data: {e}")))?;
            let bytes = decompress(&packed, l.compression.as_deref())
                .map_err(|e| invalid(format!("cannot decompress tile data: {e}")))?;

            if bytes.len() % 4 != 0 {
                return Err(invalid(format!(
                    "{} bytes of tile data is not a whole number of gids",
                    bytes.len()
                )));
            }
            Ok(bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect())
        }
        Some(other) => Err(invalid(format!("unknown encoding '{other}'"))),
    }
}

fn decompress(packed: &[u8], compression: Option<&str>) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match compression {
        None | Some("") => bytes.extend_from_slice(packed),
        Some("zlib") => {
            ZlibDecoder::new(packed).read_to_end(&mut bytes)?;
        }
        Some("gzip") => {
            GzDecoder::new(packed).read_to_end(&mut bytes)?;
        }
        Some("zstd") => bytes = zstd::stream::decode_all(packed)?,
        Some(other) => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unsupported compression '{other}'"),
            ));
        }
    }
    Ok(bytes)
}

fn tile_layer_to_ir(mut l: JsonLayer, map_path: &Path) -> Result<TileLayer, MapError> {
    let data = decode_layer_data(&mut l, map_path)?;
    Ok(TileLayer {
        name: l.name,
        width: l.width,
        height: l.height,
        visible: l.visible,
        data,
    })
}

fn decode_map_json(j: JsonMap, map_dir: &Path, map_path: &Path) -> Result<IrMap, MapError> {
    if j.infinite {
        return Err(MapError::InvalidMap(
            "infinite (chunked) maps are not supported".to_owned(),
        ));
    }

    // Build IR tilesets
    let mut tilesets = j
        .tilesets
        .into_iter()
        .map(|entry| load_tileset(entry, map_dir, map_path))
        .collect::<Result<Vec<_>, _>>()?;

    // Sort by first_gid so resolution can search
    tilesets.sort_by_key(|t| t.first_gid);

    // Build IR layers
    let mut layers = Vec::with_capacity(j.layers.len());
    for l in j.layers {
        let name = l.name.clone();
        let visible = l.visible;
        let kind_name = l.kind.clone().unwrap_or_else(|| "tilelayer".to_owned());
        let kind = match kind_name.as_str() {
            "tilelayer" => IrLayerKind::Tiles(tile_layer_to_ir(l, map_path)?),
            "objectgroup" => IrLayerKind::Objects,
            other => IrLayerKind::Other(other.to_owned()),
        };
        layers.push(IrLayer {
            name,
            visible,
            kind,
        });
    }

    let ir = IrMap {
        width: j.width,
        height: j.height,
        tile_w: j.tilewidth,
        tile_h: j.tileheight,
        tilesets,
        layers,
    };
    ir.validate()?;
    Ok(ir)
}

/// Parse a Tiled map file (`.json`/`.tmj`, or `.tmx` through the `tiled`
/// crate); returns the map and its directory.
pub fn decode_map_file_to_ir<P: AsRef<Path>>(path: P) -> Result<(IrMap, PathBuf), MapError> {
    let p = path.as_ref();
    if has_extension(p, &["tmx"]) {
        return decode_tmx_file_to_ir(p);
    }
    if !has_extension(p, &["json", "tmj"]) {
        return Err(MapError::InvalidMap(format!(
            "Map file must be Tiled JSON or TMX: {}",
            p.display()
        )));
    }

    let txt = read_text(p)?;
    let j: JsonMap = serde_json::from_str(&txt).map_err(|source| MapError::Json {
        path: p.to_path_buf(),
        source,
    })?;

    let map_dir = p
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));

    let ir = decode_map_json(j, &map_dir, p)?;
    Ok((ir, map_dir))
}

/// Parse map JSON already in memory; relative paths resolve against `map_dir`.
pub fn decode_map_str(json: &str, map_dir: &Path) -> Result<IrMap, MapError> {
    let inline = PathBuf::from("<inline map>");
    let j: JsonMap = serde_json::from_str(json).map_err(|source| MapError::Json {
        path: inline.clone(),
        source,
    })?;
    decode_map_json(j, map_dir, &inline)
}

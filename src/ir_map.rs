use crate::error::MapError;
use crate::gid::GID_MASK;

/// Canonical, format-agnostic map.
#[derive(Debug, Clone)]
pub struct IrMap {
    /// Grid width in cells, shared by every tile layer.
    pub width: usize,
    /// Grid height in cells, shared by every tile layer.
    pub height: usize,
    /// Size of one cell in pixels, as authored.
    pub tile_w: u32,
    /// Size of one cell in pixels, as authored.
    pub tile_h: u32,
    /// Sorted by `first_gid`.
    pub tilesets: Vec<Atlas>,
    /// Draw order: array order.
    pub layers: Vec<IrLayer>,
}

impl IrMap {
    /// Run every structural check a loader owes its caller: atlas gid
    /// ranges, layer sizes and gid bounds.
    pub fn validate(&self) -> Result<(), MapError> {
        for atlas in &self.tilesets {
            atlas.check_gid_range()?;
        }
        self.check_layer_sizes()?;
        self.check_gid_bounds()
    }

    /// Highest gid owned by any atlas, 0 without atlases.
    pub fn max_gid(&self) -> u32 {
        self.tilesets.iter().map(Atlas::last_gid).max().unwrap_or(0)
    }

    /// Every tile layer must cover exactly the map grid.
    pub fn check_layer_sizes(&self) -> Result<(), MapError> {
        let Some(cells) = self.width.checked_mul(self.height) else {
            return Err(MapError::InvalidMap(format!(
                "map grid {}x{} is too large",
                self.width, self.height
            )));
        };

        for tiles in self.layers.iter().filter_map(IrLayer::as_tiles) {
            if tiles.width != self.width || tiles.height != self.height {
                return Err(MapError::InvalidMap(format!(
                    "layer '{}' is {}x{} but the map is {}x{}",
                    tiles.name, tiles.width, tiles.height, self.width, self.height
                )));
            }
            if tiles.data.len() != cells {
                return Err(MapError::InvalidLayerSize {
                    layer: tiles.name.clone(),
                    expected: cells,
                    found: tiles.data.len(),
                });
            }
        }
        Ok(())
    }

    /// No tile layer may reference a gid above [`IrMap::max_gid`].
    pub fn check_gid_bounds(&self) -> Result<(), MapError> {
        let max_gid = self.max_gid();
        for tiles in self.layers.iter().filter_map(IrLayer::as_tiles) {
            let over = tiles
                .data
                .iter()
                .map(|raw| raw & GID_MASK)
                .find(|&gid| gid > max_gid);
            if let Some(gid) = over {
                return Err(MapError::InvalidTileGid {
                    layer: tiles.name.clone(),
                    gid,
                    max_gid,
                });
            }
        }
        Ok(())
    }
}

/// One image atlas with a regular grid of tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct Atlas {
    /// Tileset name; material and texture names derive from it.
    pub name: String,
    /// Gid of the atlas's first tile.
    pub first_gid: u32,
    /// Tile width in image pixels.
    pub tile_w: u32,
    /// Tile height in image pixels.
    pub tile_h: u32,
    /// Pixel gap between neighbouring tiles in the image.
    pub spacing: u32,
    /// Border around the tile grid. Only used to derive `tilecount`.
    pub margin: u32,
    /// Image path, already resolved against the file that declared it.
    pub image: String,
    /// Image width as declared by the map.
    pub image_w: u32,
    /// Image height as declared by the map.
    pub image_h: u32,
    /// Number of tiles the atlas owns.
    pub tilecount: u32,
}

impl Atlas {
    /// Highest gid this atlas owns, or `first_gid - 1` when it owns none.
    /// Saturates at `u32::MAX`; the loaders reject atlases that far out.
    pub fn last_gid(&self) -> u32 {
        self.first_gid.saturating_add(self.tilecount).saturating_sub(1)
    }

    /// The atlas must start at gid 1 or above and every gid it owns must fit
    /// below the flip flags.
    pub fn check_gid_range(&self) -> Result<(), MapError> {
        let in_range = (1..=GID_MASK).contains(&self.first_gid)
            && self
                .first_gid
                .checked_add(self.tilecount)
                .is_some_and(|end| end - 1 <= GID_MASK);
        if in_range {
            Ok(())
        } else {
            Err(MapError::InvalidMap(format!(
                "tileset '{}' covers gids {}+{}, outside 1..={GID_MASK}",
                self.name, self.first_gid, self.tilecount
            )))
        }
    }
}

/// Cell data of a tile layer; only this variant is meshed.
#[derive(Debug, Clone)]
pub struct TileLayer {
    /// Layer name as authored; may be empty.
    pub name: String,
    /// Width in cells.
    pub width: usize,
    /// Height in cells.
    pub height: usize,
    /// Authored visibility flag.
    pub visible: bool,
    /// Row-major, top row first. Raw gids, flip flags included.
    pub data: Vec<u32>,
}

impl TileLayer {
    /// Raw gid at column `x` of data row `row` (row 0 is the top of the map).
    #[inline]
    pub fn gid_at(&self, x: usize, row: usize) -> u32 {
        self.data[row * self.width + x]
    }
}

/// What a layer holds.
#[derive(Debug, Clone)]
pub enum IrLayerKind {
    /// A grid of gids.
    Tiles(TileLayer),
    /// An object group. Objects themselves are not kept.
    Objects,
    /// Image layers, groups and anything else Tiled may emit.
    Other(String),
}

/// One entry of the map's layer list.
#[derive(Debug, Clone)]
pub struct IrLayer {
    /// Layer name as authored.
    pub name: String,
    /// Authored visibility flag.
    pub visible: bool,
    /// Payload.
    pub kind: IrLayerKind,
}

impl IrLayer {
    /// The tile data, if this is a tile layer.
    pub fn as_tiles(&self) -> Option<&TileLayer> {
        match &self.kind {
            IrLayerKind::Tiles(tiles) => Some(tiles),
            _ => None,
        }
    }
}

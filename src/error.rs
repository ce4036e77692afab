use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between reading a map file and handing
/// finished meshes to the host.
#[derive(Debug, Error)]
pub enum MapError {
    /// A map, tileset or options file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// A file was not valid JSON or did not match the expected schema.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// A TMX map or tileset was rejected by the `tiled` crate.
    #[error("TMX error in {path}: {source}")]
    Tmx {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: tiled::Error,
    },
    /// The map uses a feature this loader does not handle.
    #[error("invalid map: {0}")]
    InvalidMap(String),
    /// A tile layer's cell count does not match the map grid.
    #[error("layer '{layer}' has {found} cells, expected {expected}")]
    InvalidLayerSize {
        /// Layer name.
        layer: String,
        /// `width * height` of the map.
        expected: usize,
        /// Length of the layer data.
        found: usize,
    },
    /// A gid is larger than any gid owned by the map's atlases.
    #[error("layer '{layer}' references gid {gid}, highest known gid is {max_gid}")]
    InvalidTileGid {
        /// Layer name.
        layer: String,
        /// Offending gid (flip flags stripped).
        gid: u32,
        /// Highest gid covered by an atlas.
        max_gid: u32,
    },
    /// No atlas owns the gid (every atlas starts above it).
    #[error("gid {gid} out of range in layer '{layer}': no atlas has firstgid <= {gid}")]
    GidOutOfRange {
        /// Layer name.
        layer: String,
        /// Offending gid.
        gid: u32,
    },
    /// An atlas image could not be loaded or decoded.
    #[error("missing atlas image {path}: {reason}")]
    MissingImage {
        /// Resolved image path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
    /// An atlas whose geometry cannot address a single tile.
    #[error("invalid atlas '{name}': {reason}")]
    InvalidAtlas {
        /// Atlas name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

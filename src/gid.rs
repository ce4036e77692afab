//! Tiled cell values: a gid in the low 29 bits, flip flags above it.

/// Horizontal flip flag (bit 31).
pub const FLIP_H: u32 = 0x8000_0000;
/// Vertical flip flag (bit 30).
pub const FLIP_V: u32 = 0x4000_0000;
/// Diagonal flip flag (bit 29), the anti-diagonal swap used for rotation.
pub const FLIP_D: u32 = 0x2000_0000;
/// Bits that hold the gid itself.
pub const GID_MASK: u32 = 0x1FFF_FFFF;

/// A raw cell value from a tile layer, flip flags included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

impl TileId {
    /// Pack a gid and its flip flags into the cell value Tiled would store.
    pub fn with_flips(gid: u32, flip_h: bool, flip_v: bool, flip_d: bool) -> Self {
        let mut raw = gid & GID_MASK;
        for (set, bit) in [(flip_h, FLIP_H), (flip_v, FLIP_V), (flip_d, FLIP_D)] {
            if set {
                raw |= bit;
            }
        }
        Self(raw)
    }

    /// The gid with flip flags stripped.
    #[inline]
    pub fn clean(self) -> u32 {
        self.0 & GID_MASK
    }

    /// Gid 0 means no tile, whatever the flags say.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.clean() == 0
    }

    /// Only the flag bits.
    #[inline]
    pub fn flags(self) -> u32 {
        self.0 & !GID_MASK
    }
}

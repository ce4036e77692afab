use crate::ir_map::Atlas;

/// Ordered view over a map's atlases that answers "which atlas owns gid N".
///
/// Resolution picks the atlas with the highest `first_gid` not exceeding the
/// gid. Gid ranges are assumed contiguous as the map format guarantees; the
/// catalog does not check that an atlas actually has a tile at that offset.
#[derive(Debug, Clone)]
pub struct AtlasCatalog<'a> {
    atlases: Vec<&'a Atlas>,
}

impl<'a> AtlasCatalog<'a> {
    /// Catalog over `atlases`, in any order.
    pub fn new(atlases: &'a [Atlas]) -> Self {
        let mut atlases: Vec<&Atlas> = atlases.iter().collect();
        // stable, so duplicate first_gids keep declaration order and the last one wins
        atlases.sort_by_key(|a| a.first_gid);
        Self { atlases }
    }

    /// Atlas owning `gid`, or `None` if every atlas starts above it.
    ///
    /// `gid` must already be stripped of flip flags; `0` never resolves.
    pub fn resolve(&self, gid: u32) -> Option<&'a Atlas> {
        let upper = self.atlases.partition_point(|a| a.first_gid <= gid);
        upper.checked_sub(1).map(|i| self.atlases[i])
    }

    /// Owning atlas plus the zero-based index of the tile inside it.
    #[inline]
    pub fn locate(&self, gid: u32) -> Option<(&'a Atlas, u32)> {
        self.resolve(gid).map(|atlas| (atlas, gid - atlas.first_gid))
    }

    /// Highest gid any atlas owns, `0` without atlases.
    pub fn max_gid(&self) -> u32 {
        self.atlases.iter().map(|a| a.last_gid()).max().unwrap_or(0)
    }

    /// Atlases in ascending `first_gid` order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Atlas> + '_ {
        self.atlases.iter().copied()
    }

    /// Number of atlases.
    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    /// `true` for a map without atlases.
    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_atlas(name: &str, first_gid: u32) -> Atlas {
    Atlas {
        name: name.to_owned(),
        first_gid,
        tile_w: 32,
        tile_h: 32,
        spacing: 0,
        margin: 0,
        image: format!("{name}.png"),
        image_w: 64,
        image_h: 64,
        tilecount: 4,
    }
}

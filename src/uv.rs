use crate::error::MapError;
use crate::ir_map::Atlas;
use macroquad::prelude::*;

/// Unit-cell offset of each quad corner, in face winding order
/// (bottom-left, bottom-right, top-right, top-left). `y` is measured
/// downwards from the top of the tile, hence the `-1` on the bottom edge.
pub const CORNER_OFFSETS: [(f32, f32); 4] = [(0.0, -1.0), (1.0, -1.0), (1.0, 0.0), (0.0, 0.0)];

/// UV layout of one atlas image: how many tiles fit per row/column and how
/// far corners are pulled in to stay clear of the spacing gutter.
///
/// UVs follow the bottom-left origin convention: `v = 1` is the top edge of
/// the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasGrid {
    /// Whole tiles per image row; used to split a local index into column/row.
    pub columns: u32,
    /// Unfloored tiles per row; the U normalisation denominator.
    pub columns_f: f32,
    /// Whole tiles per image column.
    pub rows: u32,
    /// Unfloored tiles per column; the V normalisation denominator.
    pub rows_f: f32,
    inset_x: f32,
    inset_y: f32,
}

impl AtlasGrid {
    /// Grid of `atlas`. Rejects zero-sized tiles, strides that overflow and
    /// images too small for one full tile in either direction.
    pub fn new(atlas: &Atlas) -> Result<Self, MapError> {
        let invalid = |reason: String| MapError::InvalidAtlas {
            name: atlas.name.clone(),
            reason,
        };

        if atlas.tile_w == 0 || atlas.tile_h == 0 {
            return Err(invalid(format!(
                "tile size {}x{} must be non-zero",
                atlas.tile_w, atlas.tile_h
            )));
        }

        let (Some(stride_x), Some(stride_y)) = (
            atlas.tile_w.checked_add(atlas.spacing),
            atlas.tile_h.checked_add(atlas.spacing),
        ) else {
            return Err(invalid(format!(
                "spacing {} does not fit a {}x{} tile stride",
                atlas.spacing, atlas.tile_w, atlas.tile_h
            )));
        };
        let columns = atlas.image_w / stride_x;
        let rows = atlas.image_h / stride_y;
        if columns == 0 || rows == 0 {
            return Err(invalid(format!(
                "image {}x{} cannot hold a single {}x{} tile",
                atlas.image_w, atlas.image_h, stride_x, stride_y
            )));
        }

        let half_gap = atlas.spacing as f32 * 0.5;
        Ok(Self {
            columns,
            columns_f: atlas.image_w as f32 / stride_x as f32,
            rows,
            rows_f: atlas.image_h as f32 / stride_y as f32,
            inset_x: half_gap / atlas.tile_w as f32,
            inset_y: half_gap / atlas.tile_h as f32,
        })
    }

    /// Column and row (from the top) of a tile inside the atlas.
    #[inline]
    pub fn tile_coords(&self, local: u32) -> (u32, u32) {
        (local % self.columns, local / self.columns)
    }

    /// Corner offset shrunk towards the tile centre by half the spacing.
    pub fn adjusted_offset(&self, corner: usize) -> (f32, f32) {
        let (mut x, mut y) = CORNER_OFFSETS[corner];

        if x > 0.0 {
            x -= self.inset_x;
        } else {
            x += self.inset_x;
        }

        if y < 0.0 {
            y += self.inset_y;
        } else {
            y -= self.inset_y;
        }

        (x, y)
    }

    /// UV of one corner (`0..4`) of the tile at `local` inside the atlas.
    pub fn corner_uv(&self, local: u32, corner: usize) -> Vec2 {
        let (tx, ty) = self.tile_coords(local);
        let (ox, oy) = self.adjusted_offset(corner);

        // atlas rows count down from the top, v counts up from the bottom
        vec2(
            (tx as f32 + ox) / self.columns_f,
            ((self.rows_f - ty as f32) + oy) / self.rows_f,
        )
    }

    /// All four corner UVs in winding order.
    pub fn tile_uvs(&self, local: u32) -> [Vec2; 4] {
        std::array::from_fn(|corner| self.corner_uv(local, corner))
    }
}

/// One-shot form of [`AtlasGrid::corner_uv`].
pub fn corner_uv(atlas: &Atlas, local: u32, corner: usize) -> Result<Vec2, MapError> {
    Ok(AtlasGrid::new(atlas)?.corner_uv(local, corner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::test_atlas;

    const EPS: f32 = 1e-6;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).abs().max_element() < EPS
    }

    fn spaced_atlas() -> Atlas {
        Atlas {
            tile_w: 16,
            tile_h: 8,
            spacing: 2,
            image_w: 90,
            image_h: 50,
            ..test_atlas("spaced", 1)
        }
    }

    #[test]
    fn two_by_two_atlas_golden_uvs() {
        let grid = AtlasGrid::new(&test_atlas("grid", 1)).expect("valid atlas");
        assert_eq!(grid.columns, 2);
        assert_eq!(grid.rows, 2);

        let top_left = grid.tile_uvs(0);
        let expected = [vec2(0.0, 0.5), vec2(0.5, 0.5), vec2(0.5, 1.0), vec2(0.0, 1.0)];
        for (got, want) in top_left.iter().zip(expected) {
            assert!(close(*got, want), "{got:?} != {want:?}");
        }

        let bottom_right = grid.tile_uvs(3);
        let expected = [vec2(0.5, 0.0), vec2(1.0, 0.0), vec2(1.0, 0.5), vec2(0.5, 0.5)];
        for (got, want) in bottom_right.iter().zip(expected) {
            assert!(close(*got, want), "{got:?} != {want:?}");
        }
    }

    #[test]
    fn zero_spacing_leaves_offsets_untouched() {
        let grid = AtlasGrid::new(&test_atlas("plain", 1)).expect("valid atlas");
        for corner in 0..4 {
            assert_eq!(grid.adjusted_offset(corner), CORNER_OFFSETS[corner]);
        }
    }

    #[test]
    fn spacing_pulls_every_corner_inside_the_cell() {
        let atlas = spaced_atlas();
        let grid = AtlasGrid::new(&atlas).expect("valid atlas");
        let dx = 1.0 / 16.0;
        let dy = 1.0 / 8.0;

        // 90 / 18 = 5 columns, 50 / 10 = 5 rows
        assert_eq!(grid.columns, 5);
        for local in [0, 4, 7, 24] {
            let (tx, ty) = grid.tile_coords(local);
            for corner in 0..4 {
                let uv = grid.corner_uv(local, corner);
                let (raw_x, raw_y) = CORNER_OFFSETS[corner];

                let cell_x = uv.x * grid.columns_f - tx as f32;
                let cell_y = uv.y * grid.rows_f - (grid.rows_f - ty as f32);

                let want_x = if raw_x > 0.0 { raw_x - dx } else { raw_x + dx };
                let want_y = if raw_y < 0.0 { raw_y + dy } else { raw_y - dy };
                assert!((cell_x - want_x).abs() < 1e-5, "corner {corner}: x {cell_x} vs {want_x}");
                assert!((cell_y - want_y).abs() < 1e-5, "corner {corner}: y {cell_y} vs {want_y}");
                assert!(cell_x > 0.0 && cell_x < 1.0);
                assert!(cell_y > -1.0 && cell_y < 0.0);
            }
        }
    }

    #[test]
    fn unfloored_denominators_are_used() {
        let atlas = Atlas {
            image_w: 100,
            image_h: 100,
            ..test_atlas("ragged", 1)
        };
        let grid = AtlasGrid::new(&atlas).expect("valid atlas");
        assert_eq!(grid.columns, 3);
        assert!((grid.columns_f - 3.125).abs() < EPS);

        let uv = grid.corner_uv(1, 1);
        assert!((uv.x - 2.0 / 3.125).abs() < EPS);
        assert!((uv.y - 2.125 / 3.125).abs() < EPS);
    }

    #[test]
    fn rejects_zero_sized_tiles() {
        let atlas = Atlas {
            tile_w: 0,
            ..test_atlas("broken", 1)
        };
        assert!(matches!(AtlasGrid::new(&atlas), Err(MapError::InvalidAtlas { .. })));
    }

    #[test]
    fn rejects_image_narrower_than_a_tile() {
        let atlas = Atlas {
            image_w: 20,
            ..test_atlas("narrow", 1)
        };
        assert!(corner_uv(&atlas, 0, 0).is_err());
    }

    #[test]
    fn rejects_image_shorter_than_a_tile() {
        let atlas = Atlas {
            image_h: 20,
            ..test_atlas("short", 1)
        };
        let err = AtlasGrid::new(&atlas).unwrap_err();
        assert!(matches!(err, MapError::InvalidAtlas { name, .. } if name == "short"));
    }

    #[test]
    fn rejects_spacing_that_overflows_the_stride() {
        let atlas = Atlas {
            spacing: u32::MAX,
            ..test_atlas("gutter", 1)
        };
        assert!(matches!(AtlasGrid::new(&atlas), Err(MapError::InvalidAtlas { .. })));
    }
}

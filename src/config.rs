use crate::error::MapError;
use macroquad::prelude::*;
use serde::Deserialize;
use std::path::Path;

/// What to do with a non-zero gid that no atlas owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedGid {
    /// Fail the whole import with [`MapError::GidOutOfRange`].
    #[default]
    Reject,
    /// Treat the cell as empty and log a warning.
    Empty,
}

/// Sampling filter for textures created by the macroquad binder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFilter {
    /// Crisp pixels.
    #[default]
    Nearest,
    /// Bilinear.
    Linear,
}

impl From<TextureFilter> for FilterMode {
    fn from(filter: TextureFilter) -> Self {
        match filter {
            TextureFilter::Nearest => FilterMode::Nearest,
            TextureFilter::Linear => FilterMode::Linear,
        }
    }
}

/// Knobs for [`crate::import_map`] and [`crate::TiledScene`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Where layer 0's bottom-left grid vertex goes.
    pub origin: [f32; 3],
    /// Added once per layer index to stack layers apart.
    pub layer_step: [f32; 3],
    /// Policy for gids no atlas owns.
    pub unresolved_gid: UnresolvedGid,
    /// Filter set on every texture [`crate::TiledScene`] creates.
    pub texture_filter: TextureFilter,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            layer_step: [0.0, -1.0, 0.0],
            unresolved_gid: UnresolvedGid::Reject,
            texture_filter: TextureFilter::Nearest,
        }
    }
}

impl ImportOptions {
    /// Grid origin for the layer at `index` in map order.
    pub fn layer_origin(&self, index: usize) -> Vec3 {
        Vec3::from(self.origin) + Vec3::from(self.layer_step) * index as f32
    }

    /// Options from JSON text; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Options from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MapError> {
        let p = path.as_ref();
        let txt = std::fs::read_to_string(p).map_err(|source| MapError::Io {
            path: p.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&txt).map_err(|source| MapError::Json {
            path: p.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stacks_layers_down_the_y_axis() {
        let options = ImportOptions::default();
        assert_eq!(options.layer_origin(0), Vec3::ZERO);
        assert_eq!(options.layer_origin(3), vec3(0.0, -3.0, 0.0));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let options = ImportOptions::from_json_str(r#"{ "unresolved_gid": "empty" }"#)
            .expect("valid options");
        assert_eq!(options.unresolved_gid, UnresolvedGid::Empty);
        assert_eq!(options.layer_step, [0.0, -1.0, 0.0]);
        assert_eq!(options.texture_filter, TextureFilter::Nearest);
    }

    #[test]
    fn origin_and_step_combine() {
        let options = ImportOptions::from_json_str(
            r#"{ "origin": [10, 0, 5], "layer_step": [0, 0.5, 0], "texture_filter": "linear" }"#,
        )
        .expect("valid options");
        assert_eq!(options.layer_origin(2), vec3(10.0, 1.0, 5.0));
        assert_eq!(options.texture_filter, TextureFilter::Linear);
    }

    #[test]
    fn unknown_policy_is_a_json_error() {
        assert!(ImportOptions::from_json_str(r#"{ "unresolved_gid": "guess" }"#).is_err());
    }

    #[test]
    fn missing_options_file_is_io_error() {
        let err = ImportOptions::load("definitely_not_here_options.json").unwrap_err();
        assert!(matches!(err, MapError::Io { .. }));
    }
}

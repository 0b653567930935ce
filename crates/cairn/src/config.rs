//! Configuration types for block rendering.
//!
//! [`RenderConfig`] controls the geometry scale and the workspace styling.
//! All types implement [`serde::Deserialize`] for loading from external
//! sources.

use serde::Deserialize;

use cairn_core::color::Color;

/// Top-level rendering configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderConfig {
    /// Grid scale multiplier; `None` renders at the native grid size.
    #[serde(default)]
    scale: Option<f32>,

    /// Workspace background colour, as a colour string.
    #[serde(default)]
    background_color: Option<String>,
}

impl RenderConfig {
    pub fn new(scale: Option<f32>, background_color: Option<String>) -> Self {
        Self {
            scale,
            background_color,
        }
    }

    /// The effective grid scale. Non-positive configured values fall back to
    /// the native scale.
    pub fn scale(&self) -> f32 {
        match self.scale {
            Some(scale) if scale > 0.0 => scale,
            _ => 1.0,
        }
    }

    /// Returns the parsed background [`Color`], or `None` if no colour is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured colour string cannot be parsed.
    pub fn background_color(&self) -> Result<Option<Color>, String> {
        self.background_color
            .as_ref()
            .map(|color| Color::new(color))
            .transpose()
            .map_err(|err| format!("Invalid background color in config: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_default_scale_is_native() {
        assert_approx_eq!(f32, RenderConfig::default().scale(), 1.0);
    }

    #[test]
    fn test_non_positive_scale_falls_back() {
        let config = RenderConfig::new(Some(-2.0), None);
        assert_approx_eq!(f32, config.scale(), 1.0);
    }

    #[test]
    fn test_bad_background_color_is_an_error() {
        let config = RenderConfig::new(None, Some("not-a-color".to_string()));
        assert!(config.background_color().is_err());
    }
}

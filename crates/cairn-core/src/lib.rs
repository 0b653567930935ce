//! Cairn core primitives.
//!
//! Shared value types for the Cairn block editor: workspace-unit geometry,
//! the CSS colour wrapper, and the theme model consumed by the renderer's
//! constants provider.

pub mod color;
pub mod geometry;
pub mod theme;

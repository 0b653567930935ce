//! Cairn - geometry-driven SVG rendering for block programs.
//!
//! Measurement, outline drawing, and SVG emission for block workspaces built
//! with `cairn-model`. The pipeline is pure with respect to the workspace:
//! measuring the same block twice yields identical geometry.

pub mod config;
pub mod render;

mod error;

pub use cairn_core::{color, geometry, theme};

pub use error::CairnError;

use log::{debug, info};
use svg::{
    node::element::{Rectangle, Style},
    Document,
};

use cairn_core::geometry::Point;
use cairn_model::{Block, BlockId, Workspace};

use config::RenderConfig;
use render::Renderer;

/// Facade for rendering block workspaces to SVG.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use cairn::{config::RenderConfig, BlockRenderer};
/// use cairn_model::{catalog, Workspace};
///
/// let mut ws = Workspace::new(Rc::new(catalog::standard()));
/// ws.create_block("event_when_started")?;
///
/// let renderer = BlockRenderer::new(RenderConfig::default());
/// let document = renderer.render_document(&ws)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct BlockRenderer {
    config: RenderConfig,
    renderer: Renderer,
}

impl Default for BlockRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl BlockRenderer {
    /// Creates a renderer with the given configuration and the classic
    /// theme.
    pub fn new(config: RenderConfig) -> Self {
        let theme = theme::Theme::default();
        let renderer = Renderer::new(&theme, config.scale());
        Self { config, renderer }
    }

    /// Renders one block stack (the block, its children, and its next
    /// chain) as an SVG group at the origin.
    pub fn render_stack(
        &self,
        ws: &Workspace,
        id: &BlockId,
    ) -> Result<svg::node::element::Group, CairnError> {
        self.renderer.render_stack(ws, id, Point::default())
    }

    /// Renders every top-level stack of the workspace into one SVG
    /// document, stacked vertically in creation order.
    pub fn render_document(&self, ws: &Workspace) -> Result<Document, CairnError> {
        info!(blocks = ws.len(); "Rendering workspace");
        let margin = self.renderer.constants().min_row_height() / 2.0;
        let spacing = self.renderer.constants().min_row_height();

        let tops: Vec<BlockId> = ws.top_blocks().map(Block::id).cloned().collect();
        let mut groups = Vec::with_capacity(tops.len());
        let mut width: f32 = 0.0;
        let mut y = margin;
        for id in &tops {
            let size = self.renderer.stack_size(ws, id)?;
            groups.push(self.renderer.render_stack(ws, id, Point::new(margin, y))?);
            width = width.max(size.width());
            y += size.height() + spacing;
        }
        let height = if tops.is_empty() { 2.0 * margin } else { y };
        debug!(stacks = tops.len(); "Workspace stacks rendered");

        let mut document = Document::new()
            .set("viewBox", (0.0, 0.0, width + 2.0 * margin, height))
            .set("width", width + 2.0 * margin)
            .set("height", height);

        let mut css = String::from(":root{");
        for (name, value) in self.renderer.constants().css_variables() {
            css.push_str(&format!("{name}:{value};"));
        }
        css.push('}');
        document = document.add(Style::new(css));

        if let Some(background) = self
            .config
            .background_color()
            .map_err(CairnError::Config)?
        {
            document = document.add(
                Rectangle::new()
                    .set("width", "100%")
                    .set("height", "100%")
                    .set("fill", &background),
            );
        }

        for group in groups {
            document = document.add(group);
        }
        Ok(document)
    }

    /// Renders the workspace and writes the document to `path`.
    pub fn save(&self, ws: &Workspace, path: impl AsRef<std::path::Path>) -> Result<(), CairnError> {
        let document = self.render_document(ws)?;
        svg::save(path, &document)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_model::catalog;
    use std::rc::Rc;

    #[test]
    fn test_document_contains_every_top_stack() {
        let mut ws = Workspace::new(Rc::new(catalog::standard()));
        ws.create_block("event_when_started").unwrap();
        ws.create_block("control_wait").unwrap();

        let renderer = BlockRenderer::default();
        let markup = renderer.render_document(&ws).unwrap().to_string();
        assert!(markup.contains("event_when_started"));
        assert!(markup.contains("control_wait"));
        assert!(markup.contains("--cairn-workspace"));
    }

    #[test]
    fn test_empty_workspace_still_renders_a_document() {
        let ws = Workspace::new(Rc::new(catalog::standard()));
        let renderer = BlockRenderer::default();
        let markup = renderer.render_document(&ws).unwrap().to_string();
        assert!(markup.contains("svg"));
    }

    #[test]
    fn test_configured_background_is_painted() {
        let mut ws = Workspace::new(Rc::new(catalog::standard()));
        ws.create_block("looks_say").unwrap();

        let config = RenderConfig::new(None, Some("#f9f9f9".to_string()));
        let markup = BlockRenderer::new(config)
            .render_document(&ws)
            .unwrap()
            .to_string();
        assert!(markup.contains("rect"));
    }
}

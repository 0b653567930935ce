//! The per-pass render factory.
//!
//! A [`Renderer`] holds the shared [`ConstantProvider`] and builds a fresh
//! measure/draw/paint pipeline for every block it renders. Recursion into
//! attached children uses the socket placements from the measure pass, so
//! child positions always agree with the parent's outline.

use std::rc::Rc;

use log::{debug, trace};
use svg::node::element::{Group, Text};

use cairn_core::{
    geometry::{Point, Size},
    theme::Theme,
};
use cairn_model::{BlockId, Connection, FieldKind, PortRef, Workspace};

use crate::{
    error::CairnError,
    render::{
        constants::ConstantProvider,
        draw::Drawer,
        measure::{ConnectionPosition, Element, RenderInfo},
        path_object::PathObject,
    },
};

/// One rendered block: its SVG subtree, measured geometry, and attachable
/// points.
pub struct RenderedBlock {
    pub element: Group,
    pub info: RenderInfo,
    pub connections: Vec<ConnectionPosition>,
}

pub struct Renderer {
    constants: Rc<ConstantProvider>,
}

impl Renderer {
    pub fn new(theme: &Theme, scale: f32) -> Self {
        let mut constants = ConstantProvider::new(scale);
        constants.set_theme(theme);
        Self {
            constants: Rc::new(constants),
        }
    }

    pub fn constants(&self) -> &Rc<ConstantProvider> {
        &self.constants
    }

    /// Renders a single block, without its attached children.
    pub fn render_block(
        &self,
        ws: &Workspace,
        id: &BlockId,
    ) -> Result<RenderedBlock, CairnError> {
        let block = ws
            .get(id)
            .ok_or_else(|| CairnError::MissingBlock(id.clone()))?;
        let info = RenderInfo::measure(ws, id, &self.constants)?;
        let outline = Drawer::new(&self.constants).draw(&info);
        trace!(block_id = id.as_str(), rows = info.rows().len(); "block measured");

        let path = PathObject::new(outline.data).apply_colour(block).finish();
        let mut element = Group::new()
            .set("class", format!("cairn-block cairn-{}", block.category()))
            .set("data-kind", block.kind())
            .add(path);

        for row in info.rows() {
            for measurable in &row.elements {
                let Element::Field { kind, text, .. } = &measurable.element else {
                    continue;
                };
                if matches!(kind, FieldKind::Icon) {
                    continue;
                }
                let label = Text::new(text.clone())
                    .set("class", "cairn-block-text")
                    .set("x", measurable.offset.x() + self.constants.padding())
                    .set("y", row.y + measurable.centerline)
                    .set("dominant-baseline", "central");
                element = element.add(label);
            }
        }

        Ok(RenderedBlock {
            element,
            info,
            connections: outline.connections,
        })
    }

    /// Renders a block and everything attached inside and below it, placed
    /// at `origin` in the parent's coordinate space.
    pub fn render_stack(
        &self,
        ws: &Workspace,
        id: &BlockId,
        origin: Point,
    ) -> Result<Group, CairnError> {
        let rendered = self.render_block(ws, id)?;
        let mut group = Group::new().set(
            "transform",
            format!("translate({},{})", origin.x(), origin.y()),
        );
        group = group.add(rendered.element);

        for socket in rendered.info.sockets() {
            let target = ws
                .connection_at(&PortRef::input(id.clone(), socket.input.clone()))
                .and_then(Connection::target);
            if let Some(target) = target {
                let child = self.render_stack(ws, &target.block.clone(), socket.origin)?;
                group = group.add(child);
            }
        }

        let below = ws
            .connection_at(&PortRef::next(id.clone()))
            .and_then(Connection::target)
            .map(|target| target.block.clone());
        if let Some(below) = below {
            let next_origin = Point::new(0.0, rendered.info.size().height());
            group = group.add(self.render_stack(ws, &below, next_origin)?);
        }

        debug!(block_id = id.as_str(); "stack rendered");
        Ok(group)
    }

    /// The bounding size of a block stack: the head block merged vertically
    /// with everything chained below it.
    pub fn stack_size(&self, ws: &Workspace, id: &BlockId) -> Result<Size, CairnError> {
        let mut size = Size::default();
        let mut cursor = Some(id.clone());
        while let Some(id) = cursor {
            let info = RenderInfo::measure(ws, &id, &self.constants)?;
            size = size.merge_vertical(info.size());
            cursor = ws
                .connection_at(&PortRef::next(id))
                .and_then(Connection::target)
                .map(|target| target.block.clone());
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_model::catalog;
    use float_cmp::assert_approx_eq;

    fn renderer() -> Renderer {
        Renderer::new(&Theme::default(), 1.0)
    }

    fn workspace() -> Workspace {
        Workspace::new(Rc::new(catalog::standard()))
    }

    #[test]
    fn test_missing_block_is_an_error() {
        let ws = workspace();
        assert!(matches!(
            renderer().render_block(&ws, &"ghost".into()),
            Err(CairnError::MissingBlock(_))
        ));
    }

    #[test]
    fn test_rendered_block_carries_category_class_and_kind() {
        let mut ws = workspace();
        let say = ws.create_block("looks_say").unwrap();
        let rendered = renderer().render_block(&ws, &say).unwrap();
        let markup = rendered.element.to_string();
        assert!(markup.contains("cairn-looks"));
        assert!(markup.contains("looks_say"));
    }

    #[test]
    fn test_stack_renders_children_recursively() {
        let mut ws = workspace();
        let hat = ws.create_block("event_when_started").unwrap();
        let say = ws.create_block("looks_say").unwrap();
        ws.connect(PortRef::next(hat.clone()), PortRef::previous(say))
            .unwrap();

        let group = renderer().render_stack(&ws, &hat, Point::default()).unwrap();
        let markup = group.to_string();
        // The hat, the say block, and the say block's text shadow.
        assert_eq!(markup.matches("data-kind").count(), 3);
        assert!(markup.contains("Hello!"));
    }

    #[test]
    fn test_stack_size_spans_the_next_chain() {
        let mut ws = workspace();
        let r = renderer();
        let a = ws.create_block("control_wait").unwrap();
        let b = ws.create_block("control_wait").unwrap();
        let single = r.stack_size(&ws, &a).unwrap();
        ws.connect(PortRef::next(a.clone()), PortRef::previous(b))
            .unwrap();

        let stacked = r.stack_size(&ws, &a).unwrap();
        assert_approx_eq!(f32, stacked.height(), single.height() * 2.0);
        assert_approx_eq!(f32, stacked.width(), single.width());
    }
}
